//! Unified error types for the Brobbot core.
//!
//! Each subsystem gets its own `thiserror` enum plus a `Result` alias.
//! Handler code crosses the boundary as a boxed error ([`BoxError`]) so
//! scripts are free to use whatever error types they like.

use thiserror::Error;

/// Type-erased error used at the handler boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Store Errors
// =============================================================================

/// Entry classification reported by the store's `kind` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A plain value.
    Scalar,
    /// An ordered list.
    List,
    /// An unordered set of unique members.
    Set,
    /// A field-to-value hash table.
    Hash,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EntryKind::Scalar => "scalar",
            EntryKind::List => "list",
            EntryKind::Set => "set",
            EntryKind::Hash => "hash",
        })
    }
}

/// Errors that can occur in store operations.
///
/// Reads never produce [`StoreError::WrongKind`]; a read against a missing or
/// differently-typed entry yields a `None`/empty result instead. Only writes
/// that would silently clobber an existing entry of another kind report it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A container write targeted an entry of a different kind.
    #[error("key '{key}' holds a {found} entry, expected {expected}")]
    WrongKind {
        /// User-facing key of the conflicting entry.
        key: String,
        /// Kind required by the operation.
        expected: EntryKind,
        /// Kind actually stored.
        found: EntryKind,
    },

    /// A pluggable backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors that can occur in adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Delivery to the chat source failed.
    #[error("failed to send to the chat source: {0}")]
    Send(String),

    /// I/O error while talking to the chat source.
    #[error("adapter I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter touched the store and it failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Internal adapter error.
    #[error("adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Creates an internal adapter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

// =============================================================================
// Script Errors
// =============================================================================

/// Errors raised while a script registers its listeners.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script could not complete its setup.
    #[error("script initialization failed: {0}")]
    Init(#[source] BoxError),

    /// The store rejected an operation during load.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScriptError {
    /// Wraps an arbitrary error as an initialization failure.
    pub fn init(err: impl Into<BoxError>) -> Self {
        Self::Init(err.into())
    }
}
