mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use webview_bridge::bridge::trampoline::dispatch_entry;

use common::harness;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn background_tasks_land_on_the_loop() {
    let (bridge, window, webview) = harness();
    let runs = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let webview = webview.clone();
        let counter = Arc::clone(&runs);
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            webview.dispatch(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(bridge.pending_dispatches(), 16);
    assert_eq!(window.pump(&bridge), 16);
    assert_eq!(runs.load(Ordering::SeqCst), 16);
}

#[test]
fn cleared_tickets_become_no_ops() {
    let (bridge, window, webview) = harness();
    let runs = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let counter = Arc::clone(&runs);
        webview.dispatch(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert_eq!(bridge.clear_dispatches(), 3);
    assert_eq!(window.pump(&bridge), 0);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn native_reentry_runs_task_once() {
    let (bridge, window, webview) = harness();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    webview.dispatch(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let ticket = window.dispatched()[0];
    dispatch_entry(std::ptr::null_mut(), ticket.as_ptr());
    dispatch_entry(std::ptr::null_mut(), ticket.as_ptr());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(bridge.pending_dispatches(), 0);
}

#[test]
fn task_may_dispatch_follow_up_work() {
    let (bridge, window, webview) = harness();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let inner = webview.clone();
    webview.dispatch(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let counter = Arc::clone(&counter);
        inner.dispatch(move || {
            counter.fetch_add(10, Ordering::SeqCst);
        });
    });

    assert_eq!(window.pump(&bridge), 1);
    assert_eq!(window.pump(&bridge), 1);
    assert_eq!(runs.load(Ordering::SeqCst), 11);
}
