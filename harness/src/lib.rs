pub mod config;
pub mod error;
pub mod exit_codes;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod suites;

pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};
pub use exit_codes::ExitCode;
pub use report::{Report, RunReport, TestResult};
pub use runner::{Runner, SESSION_SUITE};
pub use scenario::{CheckOutcome, Suite, SuiteRegistry};
pub use session::{Session, SessionOptions};
pub use suites::standard_registry;
