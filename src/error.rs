use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An upstream record had no usable identifier under any known alias.
    #[error("{record} record is missing required field `{field}`")]
    MissingRequiredField {
        record: &'static str,
        field: &'static str,
    },

    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Every base/header/parameter combination was tried and none succeeded.
    #[error("{operation} failed after {} attempts: {}", attempts.len(), attempts.join(" | "))]
    UpstreamExhausted {
        operation: &'static str,
        attempts: Vec<String>,
    },

    #[error("upstream error: {0}")]
    Upstream(String),

    /// Storage failure. Chunks written before the failure stay committed.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
