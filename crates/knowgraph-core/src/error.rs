use thiserror::Error;

#[derive(Error, Debug)]
pub enum KnowGraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Monitor error: {0}")]
    Monitor(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl From<globset::Error> for KnowGraphError {
    fn from(e: globset::Error) -> Self {
        KnowGraphError::Pattern(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KnowGraphError>;
