#![allow(dead_code)]

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use webview_bridge::{
    Bridge, CallStatus, ContextKey, NativeError, NativeWindow, SizeHint, Ticket, Webview,
};

/// One `resolve` call as the native layer would have received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub call_id: String,
    pub status: CallStatus,
    pub payload: String,
}

#[derive(Default)]
struct Log {
    bound: Vec<(String, ContextKey)>,
    unbound: Vec<String>,
    dispatched: Vec<Ticket>,
    resolved: Vec<Resolved>,
    evaluated: Vec<String>,
    title: Option<String>,
}

/// Fake window that records every call instead of talking to a native loop.
#[derive(Default)]
pub struct RecordingWindow {
    log: Mutex<Log>,
    reject_bind: AtomicBool,
    reject_dispatch: AtomicBool,
}

impl RecordingWindow {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reject_bind(&self, reject: bool) {
        self.reject_bind.store(reject, Ordering::SeqCst);
    }

    pub fn reject_dispatch(&self, reject: bool) {
        self.reject_dispatch.store(reject, Ordering::SeqCst);
    }

    pub fn bound(&self) -> Vec<(String, ContextKey)> {
        self.log.lock().unwrap().bound.clone()
    }

    pub fn unbound(&self) -> Vec<String> {
        self.log.lock().unwrap().unbound.clone()
    }

    pub fn dispatched(&self) -> Vec<Ticket> {
        self.log.lock().unwrap().dispatched.clone()
    }

    pub fn resolved(&self) -> Vec<Resolved> {
        self.log.lock().unwrap().resolved.clone()
    }

    pub fn last_resolved(&self) -> Option<Resolved> {
        self.log.lock().unwrap().resolved.last().cloned()
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.log.lock().unwrap().evaluated.clone()
    }

    pub fn title(&self) -> Option<String> {
        self.log.lock().unwrap().title.clone()
    }

    /// Deliver every recorded ticket the way the native loop would.
    pub fn pump(&self, bridge: &Bridge) -> usize {
        let tickets = std::mem::take(&mut self.log.lock().unwrap().dispatched);
        tickets
            .into_iter()
            .filter(|ticket| bridge.run_dispatched(*ticket))
            .count()
    }
}

impl NativeWindow for RecordingWindow {
    fn run(&self) {}

    fn terminate(&self) {}

    fn destroy(&self) {}

    fn window_handle(&self) -> *mut c_void {
        ptr::null_mut()
    }

    fn set_title(&self, title: &str) -> Result<(), NativeError> {
        self.log.lock().unwrap().title = Some(title.to_string());
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

    fn eval(&self, js: &str) -> Result<(), NativeError> {
        self.log.lock().unwrap().evaluated.push(js.to_string());
        Ok(())
    }

    fn dispatch(&self, ticket: Ticket) -> Result<(), NativeError> {
        if self.reject_dispatch.load(Ordering::SeqCst) {
            return Err(NativeError::Rejected("dispatch refused".into()));
        }
        self.log.lock().unwrap().dispatched.push(ticket);
        Ok(())
    }

    fn bind(&self, name: &str, key: ContextKey) -> Result<(), NativeError> {
        if self.reject_bind.load(Ordering::SeqCst) {
            return Err(NativeError::Rejected(format!("bind {name} refused")));
        }
        self.log.lock().unwrap().bound.push((name.to_string(), key));
        Ok(())
    }

    fn unbind(&self, name: &str) -> Result<(), NativeError> {
        self.log.lock().unwrap().unbound.push(name.to_string());
        Ok(())
    }

    fn resolve(
        &self,
        call_id: &str,
        status: CallStatus,
        result_json: &str,
    ) -> Result<(), NativeError> {
        self.log.lock().unwrap().resolved.push(Resolved {
            call_id: call_id.to_string(),
            status,
            payload: result_json.to_string(),
        });
        Ok(())
    }
}

/// A bridge, its recording window and a `Webview` over both.
pub fn harness() -> (Bridge, Arc<RecordingWindow>, Webview) {
    let bridge = Bridge::new().unwrap();
    let window = RecordingWindow::new();
    let webview = Webview::from_window(bridge.clone(), window.clone());
    (bridge, window, webview)
}
