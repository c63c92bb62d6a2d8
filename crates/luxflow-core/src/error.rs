//! Error types for the dispatch engine

use thiserror::Error;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Universe index outside the router's configured range
    #[error("invalid universe index: {0}")]
    InvalidUniverse(usize),

    /// No backend registered under the given name
    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    /// A backend with this name is already registered
    #[error("backend already registered: {0}")]
    DuplicateBackend(String),

    /// Output index not present on the backend
    #[error("invalid output index {output} on backend {backend}")]
    InvalidOutput {
        /// Backend name
        backend: String,
        /// Requested output index
        output: usize,
    },

    /// Backend-side I/O failure (open/close/write)
    #[error("backend I/O error: {0}")]
    BackendIo(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
