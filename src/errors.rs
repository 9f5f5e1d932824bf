use thiserror::Error;

/// Outcome of a command executor: the success text shown in the transcript,
/// or a tagged failure the dispatcher renders into exactly one output entry.
pub type CommandResult = Result<String, CommandError>;

/// Failure kinds a command can produce. None of these are fatal to the
/// session; the dispatcher converts each into an output string.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Malformed argument count or shape. Rendered verbatim.
    #[error("Usage: {0}")]
    Usage(&'static str),

    /// Unknown snippet id, connection name, or similar lookup miss.
    #[error("{0}")]
    NotFound(String),

    /// A name that must be unique is already taken.
    #[error("{0}")]
    Conflict(String),

    /// An external collaborator failed (network, file I/O, subprocess).
    #[error("Error: {0}")]
    Collaborator(#[from] anyhow::Error),

    /// A network-backed command exceeded the configured timeout.
    #[error("Error: {what} timed out after {secs}s")]
    Timeout { what: String, secs: u64 },
}

impl CommandError {
    /// True for failures caused by something outside the terminal
    /// (collaborator or timeout), as opposed to bad user input.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            CommandError::Collaborator(_) | CommandError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_usage_rendering() {
        let err = CommandError::Usage("theme <dark|light>");
        assert_eq!(err.to_string(), "Usage: theme <dark|light>");
    }

    #[test]
    fn test_not_found_rendering() {
        let err = CommandError::NotFound("Snippet 'x' not found".to_string());
        assert_eq!(err.to_string(), "Snippet 'x' not found");
    }

    #[test]
    fn test_collaborator_rendering() {
        let err = CommandError::Collaborator(anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Error: connection refused");
    }

    #[test]
    fn test_timeout_rendering() {
        let err = CommandError::Timeout {
            what: "ws connect to wss://x".to_string(),
            secs: 10,
        };
        assert_eq!(err.to_string(), "Error: ws connect to wss://x timed out after 10s");
    }

    #[test]
    fn test_external_classification() {
        assert!(!CommandError::Usage("ping <host>").is_external());
        assert!(!CommandError::NotFound("nope".into()).is_external());
        assert!(CommandError::Collaborator(anyhow!("boom")).is_external());
        assert!(CommandError::Timeout { what: "ping".into(), secs: 5 }.is_external());
    }
}
