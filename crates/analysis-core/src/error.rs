use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider rejected request: {0}")]
    ProviderRejected(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Transient provider error: {0}")]
    Transient(String),

    #[error("Insufficient data: {0}")]
    Insufficient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Whether a fetch hitting this error is worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::RateLimited(_) | AnalysisError::Transient(_)
        )
    }
}
