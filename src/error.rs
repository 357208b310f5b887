use std::ffi::NulError;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported synchronously to callers of `bind`/`unbind`.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("bind requires a function")]
    NotAFunction,
    #[error("bound function may only return a value or a value and an error")]
    TooManyReturns,
    #[error("function name already bound: {0}")]
    NameAlreadyBound(String),
    #[error("function name not bound: {0}")]
    NameNotBound(String),
    #[error("failed to allocate context")]
    ContextAllocationFailed,
    #[error("native call failed: {0}")]
    Native(#[from] NativeError),
}

/// Failures raised while servicing a single script call.
///
/// These never reach a host caller. They are encoded into a failed reply
/// and the script side observes a rejected promise carrying the message.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("arguments are not a JSON array: {0}")]
    MalformedRequest(#[source] serde_json::Error),
    #[error("argument count mismatch: expected {expected}, got {got}")]
    ArgCountMismatch { expected: String, got: usize },
    #[error("argument {index}: {source}")]
    ArgDecodeError {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    ResultEncode(#[source] serde_json::Error),
    #[error("bound function panicked: {0}")]
    Panicked(String),
}

/// Failures of the native window facade.
#[derive(Debug, Error)]
pub enum NativeError {
    #[error("webview library not found (searched {searched:?})")]
    LibraryNotFound { searched: Vec<PathBuf> },
    #[error("failed to load webview library: {0}")]
    Load(#[from] libloading::Error),
    #[error("failed to load symbol {name}: {source}")]
    MissingSymbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("failed to create webview window")]
    CreateFailed,
    #[error("string contains an interior NUL byte: {0}")]
    InteriorNul(#[from] NulError),
    #[error("native layer rejected the call: {0}")]
    Rejected(String),
}
