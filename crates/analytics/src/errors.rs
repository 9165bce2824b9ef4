use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Statement submission failed: {message}")]
    Submission { message: String },

    #[error("Failed to describe statement {id}: {message}")]
    Describe { id: String, message: String },

    #[error("{message}")]
    StatementFailed { message: String },

    #[error("Failed to get statement status for {id} after {attempts} attempts, took too long.")]
    StatementTimeout { id: String, attempts: u32 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Missing configuration: {key}")]
    Config { key: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
