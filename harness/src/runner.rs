use crate::error::HarnessResult;
use crate::report::{Report, RunReport, TestResult};
use crate::scenario::{Suite, SuiteRegistry};
use crate::session::Session;
use std::time::Instant;
use tracing::{error, info};

pub const SESSION_SUITE: &str = "session";

#[derive(Debug, Clone, Copy)]
struct RunSettings {
    color: bool,
    cleanup: bool,
    echo: bool,
}

impl RunSettings {
    fn new_report(&self, name: &str) -> Report {
        let report = Report::new(name).with_color(self.color);
        if self.echo {
            report
        } else {
            report.silent()
        }
    }

    async fn run_suite(&self, session: &mut Session, suite: &mut dyn Suite) -> Report {
        let mut report = self.new_report(suite.name());
        if self.echo {
            println!("\n▶ {}: {}", suite.name(), suite.description());
        }
        info!("Running suite {}", suite.name());

        for check in suite.checks() {
            let start = Instant::now();

            let result = if suite.requires_auth(check) && !session.is_authenticated() {
                TestResult::new(*check, false, "not authenticated")
            } else {
                match suite.run_check(check, session).await {
                    Ok(outcome) => TestResult::new(*check, outcome.success, outcome.message),
                    Err(e) => TestResult::new(*check, false, e.to_string()),
                }
            };

            if !result.success {
                error!("{}::{} failed: {}", suite.name(), check, result.message);
            }
            report.record(result.with_duration(start.elapsed()));
        }

        info!(
            "Suite {} finished: {}/{} passed",
            suite.name(),
            report.passed(),
            report.total()
        );
        report
    }
}

pub struct Runner {
    registry: SuiteRegistry,
    settings: RunSettings,
}

impl Runner {
    pub fn new(registry: SuiteRegistry) -> Self {
        Self {
            registry,
            settings: RunSettings {
                color: false,
                cleanup: true,
                echo: true,
            },
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.settings.color = color;
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.settings.cleanup = cleanup;
        self
    }

    /// Suppress per-result and header output.
    pub fn quiet(mut self) -> Self {
        self.settings.echo = false;
        self
    }

    pub fn registry(&self) -> &SuiteRegistry {
        &self.registry
    }

    /// Runs every check of `suite` in order. Errors become failed results and
    /// the next check still runs.
    pub async fn run_suite(&self, session: &mut Session, suite: &mut dyn Suite) -> Report {
        self.settings.run_suite(session, suite).await
    }

    /// Logs in, runs the selected suites (all when `names` is empty) and
    /// cleans up. Login and cleanup get their own results under the
    /// `session` suite.
    pub async fn run(
        &mut self,
        session: &mut Session,
        names: &[String],
    ) -> HarnessResult<RunReport> {
        let settings = self.settings;
        let suites = self.registry.select_mut(names)?;
        let mut run = RunReport::new(session.client().base_url());

        let mut session_report = settings.new_report(SESSION_SUITE);
        if settings.echo {
            println!(
                "\n▶ {}: authenticate as {}",
                SESSION_SUITE,
                session.credentials().email
            );
        }
        let start = Instant::now();
        let login = match session.authenticate().await {
            Ok(musician) => TestResult::new(
                "login",
                true,
                format!("authenticated as musician {}", musician.id),
            ),
            Err(e) => {
                error!("Login failed: {}", e);
                TestResult::new("login", false, e.to_string())
            }
        };
        session_report.record(login.with_duration(start.elapsed()));

        let mut reports = Vec::with_capacity(suites.len());
        for suite in suites {
            reports.push(settings.run_suite(session, suite.as_mut()).await);
        }

        if settings.cleanup {
            let start = Instant::now();
            let failures = session.cleanup().await;
            let message = if failures == 0 {
                "removed resources created by this run".to_string()
            } else {
                format!("{} resources could not be removed", failures)
            };
            let result = TestResult::new("cleanup", failures == 0, message);
            session_report.record(result.with_duration(start.elapsed()));
        }

        run.push(session_report);
        for report in reports {
            run.push(report);
        }
        run.finish();
        Ok(run)
    }
}
