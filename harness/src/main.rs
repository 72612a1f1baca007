use api::RequestWaveClient;
use clap::{Parser, Subcommand};
use harness::{
    standard_registry, ExitCode, HarnessConfig, HarnessError, HarnessResult, Runner, Session,
    SessionOptions,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "Smoke and acceptance checks against a RequestWave backend")]
struct Cli {
    /// TOML file with run settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log request-level detail (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run check suites against the backend
    Run {
        /// Suite to run; repeat for several (default: all)
        #[arg(short, long = "suite")]
        suites: Vec<String>,
        /// Backend base URL
        #[arg(long)]
        base_url: Option<String>,
        /// Musician login email
        #[arg(long)]
        email: Option<String>,
        /// Musician login password
        #[arg(long)]
        password: Option<String>,
        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Plain output without ANSI colors
        #[arg(long)]
        no_color: bool,
        /// Also write the full report as JSON
        #[arg(long)]
        json_out: Option<PathBuf>,
        /// Leave created songs and playlists on the backend
        #[arg(long)]
        no_cleanup: bool,
    },
    /// List suites and their checks
    List,
    /// Check that the backend answers /api/health
    Health {
        /// Backend base URL
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let fallback = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("✗ {}", e);
            error!("Run aborted: {}", e);
            ExitCode::from_error(&e)
        }
    };
    std::process::exit(code.as_i32());
}

async fn execute(cli: Cli) -> HarnessResult<ExitCode> {
    let mut config = HarnessConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            suites,
            base_url,
            email,
            password,
            timeout,
            no_color,
            json_out,
            no_cleanup,
        } => {
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            if email.is_some() {
                config.email = email;
            }
            if password.is_some() {
                config.password = password;
            }
            if let Some(timeout) = timeout {
                config.timeout_secs = timeout;
            }
            if !suites.is_empty() {
                config.suites = suites;
            }
            config.color &= !no_color;
            config.cleanup &= !no_cleanup;

            run(&config, json_out).await
        }
        Commands::List => {
            list_suites();
            Ok(ExitCode::Success)
        }
        Commands::Health { base_url } => {
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            health_check(&config).await
        }
    }
}

async fn run(config: &HarnessConfig, json_out: Option<PathBuf>) -> HarnessResult<ExitCode> {
    config.validate()?;

    let client = RequestWaveClient::new(config.client_config())?;
    let mut session =
        Session::new(client, config.credentials()?).with_options(SessionOptions::from(config));
    let mut runner = Runner::new(standard_registry())
        .with_color(config.color)
        .with_cleanup(config.cleanup);

    println!("RequestWave smoke run against {}", config.base_url);
    info!("Selected suites: {:?}", config.suites);

    let report = runner.run(&mut session, &config.suites).await?;
    println!("{}", report.render_summary(config.color));

    if let Some(path) = json_out {
        std::fs::write(&path, report.to_json()?)?;
        println!("Report written to {}", path.display());
    }

    Ok(ExitCode::from_report(&report))
}

fn list_suites() {
    println!("Available suites:");
    for suite in standard_registry().iter() {
        println!("  - {}: {}", suite.name(), suite.description());
        for check in suite.checks() {
            println!("      {}", check);
        }
    }
}

async fn health_check(config: &HarnessConfig) -> HarnessResult<ExitCode> {
    config
        .client_config()
        .validate()
        .map_err(HarnessError::config)?;
    let client = RequestWaveClient::new(config.client_config())?;

    println!("Performing health check against {}...", client.base_url());
    match client.health().await {
        Ok(()) => {
            println!("✓ Health check passed. Backend is running and accessible.");
            Ok(ExitCode::Success)
        }
        Err(e) => {
            println!("✗ Health check failed: {}", e);
            Err(e.into())
        }
    }
}
