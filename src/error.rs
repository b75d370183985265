use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input violates a referential or value invariant. Nothing is computed.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// A lookup failed while assembling one artifact.
    #[error("missing reference data: {kind} `{key}`")]
    MissingReferenceData { kind: &'static str, key: String },

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl PipelineError {
    pub fn integrity(message: impl Into<String>) -> Self {
        PipelineError::DataIntegrity(message.into())
    }

    pub fn missing_store(store_id: &str) -> Self {
        PipelineError::MissingReferenceData {
            kind: "store",
            key: store_id.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("backup of {artifact} failed: {reason}")]
    Backup { artifact: String, reason: String },

    #[error("mail to {recipient} failed: {reason}")]
    Mail { recipient: String, reason: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("{operation} aborted: {reason}")]
    Aborted { operation: String, reason: String },
}
