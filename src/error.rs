use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrerollError {
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON body.")]
    InvalidBody,

    #[error("Prompt is required.")]
    EmptyPrompt,

    #[error("Prompt too long. Max {max} characters.")]
    PromptTooLong { max: usize },

    #[error("GROQ_API_KEY not configured.")]
    ProviderConfig,

    #[error("{0}")]
    ProviderRequest(String),
}

impl PrerollError {
    /// True for failures caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PrerollError::InvalidBody
                | PrerollError::EmptyPrompt
                | PrerollError::PromptTooLong { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PrerollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_match_wire_contract() {
        assert_eq!(PrerollError::EmptyPrompt.to_string(), "Prompt is required.");
        assert_eq!(
            PrerollError::PromptTooLong { max: 3000 }.to_string(),
            "Prompt too long. Max 3000 characters."
        );
        assert_eq!(PrerollError::InvalidBody.to_string(), "Invalid JSON body.");
    }

    #[test]
    fn provider_errors_surface_upstream_text() {
        let err = PrerollError::ProviderRequest("rate limit exceeded".into());
        assert_eq!(err.to_string(), "rate limit exceeded");
        assert!(!err.is_client_error());
        assert_eq!(PrerollError::ProviderConfig.to_string(), "GROQ_API_KEY not configured.");
    }

    #[test]
    fn client_error_classification() {
        assert!(PrerollError::EmptyPrompt.is_client_error());
        assert!(PrerollError::PromptTooLong { max: 1 }.is_client_error());
        assert!(PrerollError::InvalidBody.is_client_error());
        assert!(!PrerollError::ProviderConfig.is_client_error());
        assert!(!PrerollError::Config("x".into()).is_client_error());
    }
}
