//! Window facade: the thin set of native operations the bridge issues calls
//! through. [`LibraryWindow`] drives the real native library; tests supply
//! their own implementations.

mod library;
mod window;

use std::ffi::{c_char, c_void};

use serde::{Deserialize, Serialize};

pub use crate::bridge::marshal::CallStatus;
use crate::bridge::token::{ContextKey, Ticket};
use crate::error::NativeError;

pub use library::{library_candidates, WebviewLibrary};
pub use window::LibraryWindow;

/// Native dispatch callback signature.
pub type DispatchFn = extern "C" fn(*mut c_void, *mut c_void);

/// Native binding callback signature.
pub type BindFn = extern "C" fn(*const c_char, *const c_char, *mut c_void);

/// How `set_size` constrains the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeHint {
    /// Width and height are the default size.
    #[default]
    None,
    /// The user cannot resize the window.
    Fixed,
    /// Width and height are minimum bounds.
    Min,
    /// Width and height are maximum bounds.
    Max,
}

impl SizeHint {
    pub fn code(self) -> i32 {
        match self {
            SizeHint::None => 0,
            SizeHint::Fixed => 1,
            SizeHint::Min => 2,
            SizeHint::Max => 3,
        }
    }
}

/// Operations on one native window.
///
/// `dispatch` and `terminate` may be called from any thread. Everything else
/// belongs to the UI thread that created the window.
pub trait NativeWindow: Send + Sync {
    /// Run the event loop until terminated.
    fn run(&self);

    fn terminate(&self);

    fn destroy(&self);

    /// Platform window pointer (GtkWindow, NSWindow or HWND).
    fn window_handle(&self) -> *mut c_void;

    fn set_title(&self, title: &str) -> Result<(), NativeError>;

    fn set_size(&self, width: i32, height: i32, hint: SizeHint);

    fn navigate(&self, url: &str) -> Result<(), NativeError>;

    fn set_html(&self, html: &str) -> Result<(), NativeError>;

    /// Inject script that runs on every page load before `window.onload`.
    fn init(&self, js: &str) -> Result<(), NativeError>;

    /// Evaluate script asynchronously; the result is discarded.
    fn eval(&self, js: &str) -> Result<(), NativeError>;

    /// Ask the loop to call the dispatch trampoline with `ticket` on the UI thread.
    fn dispatch(&self, ticket: Ticket) -> Result<(), NativeError>;

    /// Make `name` callable from script, routed to the binding trampoline with `key`.
    fn bind(&self, name: &str, key: ContextKey) -> Result<(), NativeError>;

    fn unbind(&self, name: &str) -> Result<(), NativeError>;

    /// Settle the script-side promise for `call_id`.
    fn resolve(&self, call_id: &str, status: CallStatus, result_json: &str)
        -> Result<(), NativeError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Window that accepts every call and does nothing.
    pub struct NullWindow;

    impl NativeWindow for NullWindow {
        fn run(&self) {}

        fn terminate(&self) {}

        fn destroy(&self) {}

        fn window_handle(&self) -> *mut c_void {
            std::ptr::null_mut()
        }

        fn set_title(&self, _title: &str) -> Result<(), NativeError> {
            Ok(())
        }

        fn set_size(&self, _width: i32, _height: i32, _hint: SizeHint) {}

        fn navigate(&self, _url: &str) -> Result<(), NativeError> {
            Ok(())
        }

        fn set_html(&self, _html: &str) -> Result<(), NativeError> {
            Ok(())
        }

        fn init(&self, _js: &str) -> Result<(), NativeError> {
            Ok(())
        }

        fn eval(&self, _js: &str) -> Result<(), NativeError> {
            Ok(())
        }

        fn dispatch(&self, _ticket: Ticket) -> Result<(), NativeError> {
            Ok(())
        }

        fn bind(&self, _name: &str, _key: ContextKey) -> Result<(), NativeError> {
            Ok(())
        }

        fn unbind(&self, _name: &str) -> Result<(), NativeError> {
            Ok(())
        }

        fn resolve(
            &self,
            _call_id: &str,
            _status: CallStatus,
            _result_json: &str,
        ) -> Result<(), NativeError> {
            Ok(())
        }
    }

    #[test]
    fn size_hint_codes_match_native_enum() {
        assert_eq!(SizeHint::None.code(), 0);
        assert_eq!(SizeHint::Fixed.code(), 1);
        assert_eq!(SizeHint::Min.code(), 2);
        assert_eq!(SizeHint::Max.code(), 3);
    }
}
