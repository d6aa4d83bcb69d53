use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Code table errors
    #[error("Invalid code {name}: {message}")]
    InvalidCode { name: String, message: String },

    #[error("Invalid code name: {0}")]
    InvalidCodeName(String),

    #[error("Duplicate code name: {0}")]
    DuplicateCode(String),

    #[error("Codes {first} and {second} share the same sequence")]
    DuplicateSequence { first: String, second: String },

    #[error("Code table must contain at least one code")]
    EmptyCodeTable,

    #[error("Invalid zone symbol: {0}")]
    InvalidZone(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
