//! The two fixed entry points the native loop calls back into.
//!
//! Native callbacks are plain function addresses shared by every window and
//! binding in the process, so the route from a token back to its bridge has
//! to live in process-wide state. Everything arriving from the native layer
//! is treated as untrusted: unknown generations, dropped bridges, stale keys
//! and stale tickets are all silent no-ops.
//!
//! A native window routes each bound name to exactly one key, so names are
//! also claimed here, per window, across every bridge in the process.

use std::borrow::Cow;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, Weak};

use tracing::{error, trace};

use super::token::{ContextKey, Generation, Ticket, Token};
use super::{panic_message, Bridge, Shared};
use crate::native::NativeWindow;

type Routes = RwLock<HashMap<Generation, Weak<Shared>>>;

/// Address of a window object; stable while any binding holds its `Arc`.
pub(crate) type WindowId = usize;

type Claims = Mutex<HashMap<(WindowId, String), ContextKey>>;

static ROUTES: OnceLock<Routes> = OnceLock::new();
static CLAIMS: OnceLock<Claims> = OnceLock::new();

fn routes() -> &'static Routes {
    ROUTES.get_or_init(|| RwLock::new(HashMap::new()))
}

fn claims() -> MutexGuard<'static, HashMap<(WindowId, String), ContextKey>> {
    CLAIMS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn window_id(window: &Arc<dyn NativeWindow>) -> WindowId {
    Arc::as_ptr(window) as *const () as usize
}

/// Reserve `name` on `window` for `key`. Fails when any bridge in the
/// process already holds the name on that window.
pub(crate) fn claim_name(window: WindowId, name: &str, key: ContextKey) -> bool {
    let mut claims = claims();
    let slot = (window, name.to_string());
    if claims.contains_key(&slot) {
        return false;
    }
    claims.insert(slot, key);
    true
}

/// Drop the claim on `name` if it still belongs to `key`.
pub(crate) fn release_name(window: WindowId, name: &str, key: ContextKey) {
    let mut claims = claims();
    let slot = (window, name.to_string());
    if claims.get(&slot) == Some(&key) {
        claims.remove(&slot);
    }
}

/// Drop every claim issued by `generation`.
pub(crate) fn release_generation(generation: Generation) {
    claims().retain(|_, key| key.token().generation() != generation);
}

pub(crate) fn register(generation: Generation, shared: Weak<Shared>) {
    routes()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(generation, shared);
}

pub(crate) fn retire(generation: Generation) {
    routes()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&generation);
    release_generation(generation);
}

/// Find the live bridge that issued `token`.
pub fn resolve(token: Token) -> Option<Bridge> {
    let shared = routes()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&token.generation())
        .cloned()?;
    shared.upgrade().map(Bridge::from_shared)
}

/// Native dispatch callback: `void (*)(webview_t, void *arg)`.
pub extern "C" fn dispatch_entry(_window: *mut c_void, arg: *mut c_void) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let Some(token) = Token::from_ptr(arg) else {
            trace!(target: "bridge", "dispatch callback without ticket ignored");
            return;
        };
        if let Some(bridge) = resolve(token) {
            bridge.run_dispatched(Ticket(token));
        } else {
            trace!(target: "bridge", ticket = ?token, "dispatch for retired bridge ignored");
        }
    }));
    if let Err(payload) = outcome {
        error!(
            target: "bridge",
            panic = %panic_message(payload.as_ref()),
            "dispatched task panicked"
        );
    }
}

/// Native binding callback: `void (*)(const char *id, const char *req, void *arg)`.
pub extern "C" fn binding_entry(id: *const c_char, req: *const c_char, arg: *mut c_void) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let Some(token) = Token::from_ptr(arg) else {
            trace!(target: "bridge", "binding callback without context key ignored");
            return;
        };
        let Some(bridge) = resolve(token) else {
            trace!(target: "bridge", key = ?token, "call for retired bridge ignored");
            return;
        };
        // SAFETY: the native loop passes NUL-terminated strings that stay
        // valid for the duration of the callback.
        let (call_id, raw_args) = unsafe { (c_str(id), c_str(req)) };
        bridge.invoke(&call_id, &raw_args, ContextKey(token));
    }));
    if let Err(payload) = outcome {
        error!(
            target: "bridge",
            panic = %panic_message(payload.as_ref()),
            "binding callback panicked"
        );
    }
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn c_str<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        return Cow::Borrowed("");
    }
    CStr::from_ptr(ptr).to_string_lossy()
}
