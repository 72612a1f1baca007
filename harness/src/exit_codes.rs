use crate::error::HarnessError;
use crate::report::RunReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// One or more checks failed.
    ChecksFailed = 10,

    /// Bad flags, config file or credentials; nothing was run.
    InvalidInput = 30,

    /// The run itself could not complete (IO errors, backend unreachable for health).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        if report.all_passed() {
            Self::Success
        } else {
            Self::ChecksFailed
        }
    }

    #[must_use]
    pub fn from_error(error: &HarnessError) -> Self {
        match error {
            HarnessError::Config { .. }
            | HarnessError::Toml(_)
            | HarnessError::UnknownSuite { .. }
            | HarnessError::UnknownCheck { .. } => Self::InvalidInput,
            _ => Self::RuntimeError,
        }
    }
}
