/// Custom error type for webhook relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Repository not configured")]
    NotConfigured,

    #[error("Signature header not provided")]
    SignatureMissing,

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Missing required payload field: {0}")]
    MalformedPayload(&'static str),

    #[error("Outbound request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Destination responded with status {status}: {body}")]
    Delivery { status: u16, body: String },
}

/// Helper type for Results that use RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
