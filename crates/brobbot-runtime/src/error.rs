//! Runtime error types.

use brobbot_core::{AdapterError, ScriptError, StoreError};
use thiserror::Error;

/// Errors that abort runtime startup or surface from the adapter loop.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration loading or parsing failed.
    #[error("failed to load configuration: {0}")]
    Config(#[from] figment::Error),

    /// The runtime was built without an adapter.
    #[error("no adapter registered")]
    MissingAdapter,

    /// The store failed to become ready.
    #[error("store failed to initialize: {0}")]
    Brain(#[from] StoreError),

    /// A handler provider failed to load.
    #[error("script '{name}' failed to load: {source}")]
    Script {
        /// The failing script's name.
        name: String,
        /// The underlying failure.
        #[source]
        source: ScriptError,
    },

    /// Adapter error.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
