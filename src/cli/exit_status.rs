use std::process::ExitCode;

/// Process exit status.
///
/// - `Success` (0): command completed
/// - `Failure` (1): command refused to act, e.g. `init` over an existing file
/// - `Error` (2): configuration, network or API error
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::Failure => ExitCode::from(1),
            ExitStatus::Error => ExitCode::from(2),
        }
    }
}
