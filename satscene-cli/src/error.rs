//! CLI error type.

use std::fmt;

use satscene::SceneError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// A library operation failed.
    Scene(SceneError),
    /// Invalid command-line input.
    Usage(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Scene(e) => write!(f, "{}", e),
            CliError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Scene(e) => Some(e),
            CliError::Usage(_) => None,
        }
    }
}

impl From<SceneError> for CliError {
    fn from(e: SceneError) -> Self {
        CliError::Scene(e)
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Scene(e) if e.is_configuration() => 3,
            CliError::Scene(_) => 1,
        }
    }
}
