mod common;

use std::ffi::CString;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use webview_bridge::bridge::trampoline::binding_entry;
use webview_bridge::{
    BindError, CallStatus, DynamicFunction, DynamicOutput, NativeError, OutputKind, ParamType,
    Signature,
};

use common::harness;

#[test]
fn count_binding_updates_shared_state() {
    let (bridge, window, webview) = harness();
    let state = Arc::new(AtomicI64::new(2));
    let current = Arc::clone(&state);
    let key = webview
        .bind("count", move |delta: i64| {
            current.fetch_add(delta, Ordering::SeqCst) + delta
        })
        .unwrap();

    let reply = bridge.invoke("1", "[1]", key).unwrap();
    assert_eq!(reply.status, CallStatus::Ok);
    assert_eq!(reply.status.code(), 0);
    assert_eq!(reply.payload, "3");
    assert_eq!(state.load(Ordering::SeqCst), 3);

    let reply = bridge.invoke("2", "[]", key).unwrap();
    assert_eq!(reply.status, CallStatus::Failed);
    assert!(reply.payload.contains("argument count mismatch"));
    assert_eq!(state.load(Ordering::SeqCst), 3);

    let reply = bridge.invoke("3", "[\"x\"]", key).unwrap();
    assert_eq!(reply.status, CallStatus::Failed);
    assert!(reply.payload.starts_with("\"argument 0:"));
    assert_eq!(state.load(Ordering::SeqCst), 3);

    let ids: Vec<String> = window
        .resolved()
        .into_iter()
        .map(|resolved| resolved.call_id)
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[test]
fn failing_binding_rejects_with_message() {
    let (bridge, window, webview) = harness();
    let key = webview
        .bind("fail", || -> Result<(), String> { Err("boom".to_string()) })
        .unwrap();

    bridge.invoke("9", "[]", key).unwrap();
    let resolved = window.last_resolved().unwrap();
    assert_eq!(resolved.call_id, "9");
    assert_ne!(resolved.status.code(), 0);
    assert_eq!(resolved.payload, "\"boom\"");
}

#[test]
fn undefined_argument_needs_optional_parameter() {
    let (bridge, _window, webview) = harness();
    let strict = webview.bind("strict", |n: i64| n).unwrap();
    let lenient = webview
        .bind("lenient", |n: Option<i64>| n.unwrap_or_default())
        .unwrap();

    let reply = bridge.invoke("1", "[null]", strict).unwrap();
    assert_eq!(reply.status, CallStatus::Failed);
    assert!(reply.payload.starts_with("\"argument 0:"));

    let reply = bridge.invoke("2", "[null]", lenient).unwrap();
    assert_eq!(reply.status, CallStatus::Ok);
    assert_eq!(reply.payload, "0");
}

#[test]
fn malformed_request_is_rejected() {
    let (bridge, _window, webview) = harness();
    let key = webview.bind("noop", || {}).unwrap();

    for raw in ["", "{}", "[1,", "\"text\""] {
        let reply = bridge.invoke("id", raw, key).unwrap();
        assert_eq!(reply.status, CallStatus::Failed, "{raw:?}");
        let message: Value = serde_json::from_str(&reply.payload).unwrap();
        assert!(message.is_string());
    }
}

#[test]
fn panicking_binding_still_answers() {
    let (bridge, window, webview) = harness();
    let key = webview
        .bind("explode", || -> i64 { panic!("kaboom") })
        .unwrap();

    let reply = bridge.invoke("p", "[]", key).unwrap();
    assert_eq!(reply.status, CallStatus::Failed);
    assert!(reply.payload.contains("kaboom"));
    assert_eq!(window.resolved().len(), 1);

    // The binding stays usable after a panic.
    assert!(bridge.invoke("q", "[]", key).is_some());
}

#[test]
fn native_bind_failure_rolls_back() {
    let (bridge, window, webview) = harness();
    window.reject_bind(true);

    let err = webview.bind("late", || 1).unwrap_err();
    assert!(matches!(err, BindError::Native(NativeError::Rejected(_))));
    assert!(!bridge.is_bound("late"));

    window.reject_bind(false);
    webview.bind("late", || 1).unwrap();
    assert!(bridge.is_bound("late"));
}

#[test]
fn native_dispatch_failure_drops_task() {
    let (bridge, window, webview) = harness();
    window.reject_dispatch(true);

    assert!(webview.dispatch(|| panic!("must not run")).is_none());
    assert_eq!(bridge.pending_dispatches(), 0);
}

#[test]
fn binding_can_reenter_the_bridge() {
    let (bridge, window, webview) = harness();
    let inner = webview.clone();
    let key = webview
        .bind("install", move |name: String| -> Result<usize, String> {
            inner.bind(&name, || "installed").map_err(|err| err.to_string())?;
            inner.unbind("install").map_err(|err| err.to_string())?;
            let ui = inner.clone();
            inner.dispatch(move || {
                let _ = ui.eval("window.ready = true");
            });
            Ok(inner.bridge().bound_names().len())
        })
        .unwrap();

    let reply = bridge.invoke("1", "[\"extra\"]", key).unwrap();
    assert_eq!(reply.status, CallStatus::Ok);
    assert_eq!(reply.payload, "1");
    assert_eq!(bridge.bound_names(), vec!["extra".to_string()]);

    assert_eq!(window.pump(&bridge), 1);
    assert_eq!(window.evaluated(), vec!["window.ready = true".to_string()]);
}

#[test]
fn trampoline_routes_to_owning_window() {
    let (_bridge, window, webview) = harness();
    let key = webview.bind("double", |n: i64| n * 2).unwrap();
    let recorded_key = window.bound()[0].1;
    assert_eq!(recorded_key, key);

    let id = CString::new("42").unwrap();
    let req = CString::new("[21]").unwrap();
    binding_entry(id.as_ptr(), req.as_ptr(), recorded_key.as_ptr());

    let resolved = window.last_resolved().unwrap();
    assert_eq!(resolved.call_id, "42");
    assert_eq!(resolved.payload, "42");
}

struct Forwarded {
    signature: Option<Signature>,
}

impl DynamicFunction for Forwarded {
    fn signature(&self) -> Option<Signature> {
        self.signature.clone()
    }

    fn call(&self, args: Vec<Value>) -> Vec<DynamicOutput> {
        vec![DynamicOutput::Value(Value::from(args.len())), DynamicOutput::Error(None)]
    }
}

#[test]
fn dynamic_bindings_are_validated() {
    let (bridge, _window, webview) = harness();

    let err = webview
        .bind_dynamic("opaque", Arc::new(Forwarded { signature: None }))
        .unwrap_err();
    assert!(matches!(err, BindError::NotAFunction));

    let three = Signature::new(vec![]).returns(vec![
        OutputKind::Value,
        OutputKind::Value,
        OutputKind::Error,
    ]);
    let err = webview
        .bind_dynamic("three", Arc::new(Forwarded { signature: Some(three) }))
        .unwrap_err();
    assert!(matches!(err, BindError::TooManyReturns));
    assert!(bridge.bound_names().is_empty());

    let counted = Signature::new(vec![ParamType::String, ParamType::Integer])
        .variadic()
        .returns(vec![OutputKind::Value, OutputKind::Error]);
    let key = webview
        .bind_dynamic("count_args", Arc::new(Forwarded { signature: Some(counted) }))
        .unwrap();

    assert_eq!(bridge.invoke("a", "[\"s\", 1, 2, 3]", key).unwrap().payload, "4");
    let reply = bridge.invoke("b", "[\"s\", 1, \"no\"]", key).unwrap();
    assert_eq!(reply.status, CallStatus::Failed);
    assert_eq!(bridge.invoke("c", "[]", key).unwrap().status, CallStatus::Failed);
}
