use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Code extraction failed: {0}")]
    CodeExtraction(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Repair exhausted: {0}")]
    RepairExhausted(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Pipeline busy: {0}")]
    Busy(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
