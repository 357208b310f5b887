use std::ffi::{c_void, CString};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use super::library::WebviewLibrary;
use super::{CallStatus, NativeWindow, SizeHint};
use crate::bridge::token::{ContextKey, Ticket};
use crate::bridge::trampoline::{binding_entry, dispatch_entry};
use crate::error::NativeError;

/// A window created through the loaded native library.
pub struct LibraryWindow {
    lib: &'static WebviewLibrary,
    handle: NonNull<c_void>,
    destroyed: AtomicBool,
}

// SAFETY: the native library documents `webview_dispatch` and
// `webview_terminate` as callable from any thread. Every other entry point is
// only reached through `Webview`, which keeps those calls on the UI thread.
unsafe impl Send for LibraryWindow {}
// SAFETY: see above; the handle itself is never mutated after creation.
unsafe impl Sync for LibraryWindow {}

impl LibraryWindow {
    /// Create a window. `dev_tools` enables the inspector; `parent` is an
    /// existing platform window to embed into, or null for a new top-level window.
    pub fn create(
        lib: &'static WebviewLibrary,
        dev_tools: bool,
        parent: *mut c_void,
    ) -> Result<Self, NativeError> {
        // SAFETY: `create` accepts a null parent.
        let raw = unsafe { (lib.create)(i32::from(dev_tools), parent) };
        let handle = NonNull::new(raw).ok_or(NativeError::CreateFailed)?;
        debug!(target: "native", handle = ?handle, dev_tools, "webview created");
        Ok(Self {
            lib,
            handle,
            destroyed: AtomicBool::new(false),
        })
    }

    fn live(&self) -> Result<*mut c_void, NativeError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(NativeError::Rejected("window destroyed".into()));
        }
        Ok(self.handle.as_ptr())
    }

    fn call_str(
        &self,
        entry: unsafe extern "C" fn(*mut c_void, *const std::ffi::c_char),
        value: &str,
    ) -> Result<(), NativeError> {
        let handle = self.live()?;
        let value = CString::new(value)?;
        // SAFETY: `handle` is live and `value` outlives the call.
        unsafe { entry(handle, value.as_ptr()) };
        Ok(())
    }
}

impl NativeWindow for LibraryWindow {
    fn run(&self) {
        if let Ok(handle) = self.live() {
            // SAFETY: handle is live.
            unsafe { (self.lib.run)(handle) };
        }
    }

    fn terminate(&self) {
        if let Ok(handle) = self.live() {
            // SAFETY: handle is live.
            unsafe { (self.lib.terminate)(handle) };
        }
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        // SAFETY: the flag above guarantees a single destroy.
        unsafe { (self.lib.destroy)(self.handle.as_ptr()) };
        debug!(target: "native", handle = ?self.handle, "webview destroyed");
    }

    fn window_handle(&self) -> *mut c_void {
        match self.live() {
            // SAFETY: handle is live.
            Ok(handle) => unsafe { (self.lib.get_window)(handle) },
            Err(_) => ptr::null_mut(),
        }
    }

    fn set_title(&self, title: &str) -> Result<(), NativeError> {
        self.call_str(self.lib.set_title, title)
    }

    fn set_size(&self, width: i32, height: i32, hint: SizeHint) {
        match self.live() {
            // SAFETY: handle is live.
            Ok(handle) => unsafe { (self.lib.set_size)(handle, width, height, hint.code()) },
            Err(err) => warn!(target: "native", error = %err, "set_size ignored"),
        }
    }

    fn navigate(&self, url: &str) -> Result<(), NativeError> {
        self.call_str(self.lib.navigate, url)
    }

    fn set_html(&self, html: &str) -> Result<(), NativeError> {
        self.call_str(self.lib.set_html, html)
    }

    fn init(&self, js: &str) -> Result<(), NativeError> {
        self.call_str(self.lib.init, js)
    }

    fn eval(&self, js: &str) -> Result<(), NativeError> {
        self.call_str(self.lib.eval, js)
    }

    fn dispatch(&self, ticket: Ticket) -> Result<(), NativeError> {
        let handle = self.live()?;
        // SAFETY: handle is live; the ticket is a plain integer the
        // trampoline resolves without dereferencing.
        unsafe { (self.lib.dispatch)(handle, dispatch_entry, ticket.as_ptr()) };
        Ok(())
    }

    fn bind(&self, name: &str, key: ContextKey) -> Result<(), NativeError> {
        let handle = self.live()?;
        let name = CString::new(name)?;
        // SAFETY: handle is live; the library copies `name`.
        unsafe { (self.lib.bind)(handle, name.as_ptr(), binding_entry, key.as_ptr()) };
        Ok(())
    }

    fn unbind(&self, name: &str) -> Result<(), NativeError> {
        self.call_str(self.lib.unbind, name)
    }

    fn resolve(
        &self,
        call_id: &str,
        status: CallStatus,
        result_json: &str,
    ) -> Result<(), NativeError> {
        let handle = self.live()?;
        let call_id = CString::new(call_id)?;
        let result = CString::new(result_json)?;
        // SAFETY: handle is live and both strings outlive the call.
        unsafe { (self.lib.return_)(handle, call_id.as_ptr(), status.code(), result.as_ptr()) };
        Ok(())
    }
}
