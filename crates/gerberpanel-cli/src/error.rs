//! CLI errors and their exit codes.

use std::process::ExitCode;

use gerberpanel::error::PanelError;
use thiserror::Error;

/// Failures of one CLI run.
#[derive(Debug, Error)]
pub enum CliError {
    /// An argument combination the pipeline cannot honour.
    #[error("{0}")]
    Usage(String),

    /// The library failed.
    #[error(transparent)]
    Panel(#[from] PanelError),
}

impl CliError {
    /// Process exit code: 2 for bad input, 3 for an invalid layout, 4 for
    /// I/O, 1 otherwise.
    pub const fn code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Panel(err) => match err {
                PanelError::Parse { .. }
                | PanelError::MissingLayer(_)
                | PanelError::UnsupportedFormat(_)
                | PanelError::Macro(_)
                | PanelError::Archive(_)
                | PanelError::Config { .. } => 2,
                PanelError::LayoutInvalid { .. } => 3,
                PanelError::Io { .. } => 4,
                PanelError::InternalInvariant(_) | PanelError::Cancelled => 1,
            },
        }
    }

    /// [`Self::code`] as an [`ExitCode`].
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ut_cli_001_exit_codes() {
        assert_eq!(CliError::Usage("x".into()).code(), 2);
        assert_eq!(
            CliError::from(PanelError::parse("a.gtl", 1, "X", "bad")).code(),
            2
        );
        assert_eq!(
            CliError::from(PanelError::LayoutInvalid { disconnected: 1 }).code(),
            3
        );
        let io = PanelError::io("out", std::io::Error::other("denied"));
        assert_eq!(CliError::from(io).code(), 4);
        assert_eq!(CliError::from(PanelError::Cancelled).code(), 1);
    }
}
