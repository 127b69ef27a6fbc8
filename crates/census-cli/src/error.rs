use std::path::PathBuf;
use symcensus::engine::error::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Census(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Interrupted; completed work was saved to '{path}'. Rerun the same command to resume.", path = path.display())]
    Interrupted { path: PathBuf },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
