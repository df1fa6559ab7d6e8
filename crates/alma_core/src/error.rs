use thiserror::Error;

/// Failure of a whole turn, as seen by the transport layer.
///
/// Secondary steps (emotion analysis, narrative retrieval, memory writes)
/// never surface here: they degrade and log instead.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("collaborator not configured: {0}")]
    NotConfigured(&'static str),

    #[error("no profile for user '{0}'")]
    ProfileNotFound(String),

    #[error("{stage} failed: {message}")]
    Upstream { stage: &'static str, message: String },

    #[error("{stage} timed out")]
    Timeout { stage: &'static str },

    #[error("model reply contained no usable text")]
    MalformedOutput,
}

impl TurnError {
    /// Wrap a collaborator error, keeping its context chain in the message.
    pub fn upstream(stage: &'static str, err: anyhow::Error) -> Self {
        TurnError::Upstream {
            stage,
            message: format!("{:#}", err),
        }
    }

    /// Whether the caller could reasonably retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(self, TurnError::Upstream { .. } | TurnError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_upstream_keeps_context_chain() {
        let err: anyhow::Result<()> = Err(anyhow::anyhow!("connection refused"));
        let err = err.context("generate call").unwrap_err();
        let turn = TurnError::upstream("generation", err);
        let text = turn.to_string();
        assert!(text.contains("generation failed"));
        assert!(text.contains("connection refused"));
        assert!(turn.is_transient());
    }

    #[test]
    fn test_invalid_input_is_not_transient() {
        assert!(!TurnError::InvalidInput("blank".into()).is_transient());
        assert!(!TurnError::NotConfigured("oracle").is_transient());
    }
}
