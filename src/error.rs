use thiserror::Error;

/// Failures of the key-value persistence layer
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures talking to the AI chat collaborator
#[derive(Debug, Error)]
pub enum AiError {
    #[error("API key not set: export {0}")]
    MissingApiKey(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("AI service returned no text")]
    EmptyResponse,

    #[error("malformed practice problem: {0}")]
    MalformedProblem(String),

    #[error("invalid JSON from AI service: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures loading the embedded master lists
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content list not found: {0}")]
    NotFound(String),

    #[error("content list is not valid utf-8: {0}")]
    Encoding(String),

    #[error("content list could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}
