// Library exports for the demo binaries and integration tests

pub mod bridge;
pub mod config;
pub mod error;
pub mod native;
pub mod webview;

// Re-export commonly used types
pub use bridge::dynamic::{DynamicFunction, DynamicOutput, OutputKind, ParamType, Signature};
pub use bridge::handler::{IntoHandler, IntoReply, Json, Variadic};
pub use bridge::marshal::{CallStatus, FunctionShape, OutputArity, Reply};
pub use bridge::token::{ContextKey, Ticket};
pub use bridge::Bridge;
pub use config::WebviewConfig;
pub use error::{BindError, CallError, NativeError};
pub use native::{NativeWindow, SizeHint};
pub use webview::Webview;
