//! Host-facing window handle.

use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use tracing::{info, warn};

use crate::bridge::dynamic::DynamicFunction;
use crate::bridge::handler::IntoHandler;
use crate::bridge::token::{ContextKey, Ticket};
use crate::bridge::Bridge;
use crate::config::WebviewConfig;
use crate::error::{BindError, NativeError};
use crate::native::{LibraryWindow, NativeWindow, SizeHint, WebviewLibrary};

/// One native window plus the bridge its bindings and tasks go through.
///
/// Clones refer to the same window. `dispatch` and `terminate` are safe from
/// any thread; the rest should be called on the thread that created the
/// window, or from a dispatched task.
#[derive(Clone)]
pub struct Webview {
    bridge: Bridge,
    window: Arc<dyn NativeWindow>,
    ui_thread: ThreadId,
}

impl Webview {
    /// Load the native library, open a window and apply the configured
    /// title and size. The calling thread becomes the UI thread.
    pub fn create(bridge: &Bridge, config: &WebviewConfig) -> Result<Self, NativeError> {
        Self::create_in(bridge, config, ptr::null_mut())
    }

    /// Like [`Webview::create`], embedding into an existing platform window.
    pub fn create_in(
        bridge: &Bridge,
        config: &WebviewConfig,
        parent: *mut c_void,
    ) -> Result<Self, NativeError> {
        let library = WebviewLibrary::load(config)?;
        let window = LibraryWindow::create(library, config.debug, parent)?;
        let webview = Self::from_window(bridge.clone(), Arc::new(window));
        webview.set_title(&config.title)?;
        webview.set_size(config.width, config.height, config.hint);
        info!(
            target: "native",
            title = %config.title,
            width = config.width,
            height = config.height,
            "window ready"
        );
        Ok(webview)
    }

    /// Wrap an existing facade. The calling thread becomes the UI thread.
    pub fn from_window(bridge: Bridge, window: Arc<dyn NativeWindow>) -> Self {
        Self {
            bridge,
            window,
            ui_thread: thread::current().id(),
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn native(&self) -> &Arc<dyn NativeWindow> {
        &self.window
    }

    fn check_ui_thread(&self, op: &'static str) {
        if thread::current().id() != self.ui_thread {
            warn!(target: "native", op, "UI-thread operation called from another thread");
        }
    }

    /// Expose `f` to scripts as `window.<name>`, returning a promise.
    pub fn bind<M, F>(&self, name: &str, f: F) -> Result<ContextKey, BindError>
    where
        F: IntoHandler<M>,
    {
        self.check_ui_thread("bind");
        self.bridge.bind(&self.window, name, f)
    }

    pub fn bind_dynamic(
        &self,
        name: &str,
        function: Arc<dyn DynamicFunction>,
    ) -> Result<ContextKey, BindError> {
        self.check_ui_thread("bind");
        self.bridge.bind_dynamic(&self.window, name, function)
    }

    pub fn unbind(&self, name: &str) -> Result<(), BindError> {
        self.check_ui_thread("unbind");
        self.bridge.unbind(name)
    }

    /// Run `task` on the UI thread at the loop's next opportunity.
    pub fn dispatch(&self, task: impl FnOnce() + Send + 'static) -> Option<Ticket> {
        self.bridge.dispatch(&*self.window, task)
    }

    /// Block running the event loop until `terminate`.
    pub fn run(&self) {
        self.check_ui_thread("run");
        self.window.run();
    }

    pub fn terminate(&self) {
        self.window.terminate();
    }

    pub fn destroy(&self) {
        self.check_ui_thread("destroy");
        self.window.destroy();
    }

    /// Platform window pointer.
    pub fn window(&self) -> *mut c_void {
        self.window.window_handle()
    }

    pub fn set_title(&self, title: &str) -> Result<(), NativeError> {
        self.check_ui_thread("set_title");
        self.window.set_title(title)
    }

    pub fn set_size(&self, width: i32, height: i32, hint: SizeHint) {
        self.check_ui_thread("set_size");
        self.window.set_size(width, height, hint);
    }

    /// Navigate to `url`; a `data:text/html,` URL loads inline content.
    pub fn navigate(&self, url: &str) -> Result<(), NativeError> {
        self.check_ui_thread("navigate");
        self.window.navigate(url)
    }

    pub fn set_html(&self, html: &str) -> Result<(), NativeError> {
        self.check_ui_thread("set_html");
        self.window.set_html(html)
    }

    pub fn init(&self, js: &str) -> Result<(), NativeError> {
        self.check_ui_thread("init");
        self.window.init(js)
    }

    pub fn eval(&self, js: &str) -> Result<(), NativeError> {
        self.check_ui_thread("eval");
        self.window.eval(js)
    }
}
