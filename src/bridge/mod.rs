//! Binding and dispatch bridge between host code and the native event loop.
//!
//! A [`Bridge`] owns one binding registry and one dispatch queue. Host code
//! registers callables and schedules work through it; the native loop calls
//! back through the fixed trampolines in [`trampoline`], which route each
//! context key or ticket to the bridge that issued it.

pub mod dispatch;
pub mod dynamic;
pub mod handler;
pub mod marshal;
pub mod registry;
pub mod token;
pub mod trampoline;

use std::any::Any;
use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::error::BindError;
use crate::native::NativeWindow;

use self::dispatch::{DispatchQueue, Task};
use self::dynamic::{adapt_dynamic, DynamicFunction};
use self::handler::{adapt, IntoHandler, Invoker};
use self::marshal::{FunctionShape, Reply};
use self::registry::BindingRegistry;
use self::token::{ContextKey, Generation, Ticket};

pub(crate) struct Shared {
    generation: Generation,
    registry: BindingRegistry,
    queue: DispatchQueue,
}

impl Drop for Shared {
    fn drop(&mut self) {
        trampoline::retire(self.generation);
    }
}

/// Handle to one binding/dispatch context. Clones share the same state.
#[derive(Clone)]
pub struct Bridge {
    shared: Arc<Shared>,
}

impl Bridge {
    /// Create an independent context and make it reachable from the trampolines.
    pub fn new() -> Result<Self, BindError> {
        let generation = Generation::allocate().ok_or(BindError::ContextAllocationFailed)?;
        let shared = Arc::new(Shared {
            generation,
            registry: BindingRegistry::new(generation),
            queue: DispatchQueue::new(generation),
        });
        trampoline::register(generation, Arc::downgrade(&shared));
        debug!(target: "bridge", generation = generation.get(), "bridge created");
        Ok(Self { shared })
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn generation(&self) -> Generation {
        self.shared.generation
    }

    /// Expose a typed closure to scripts running in `window` under `name`.
    pub fn bind<M, F>(
        &self,
        window: &Arc<dyn NativeWindow>,
        name: &str,
        f: F,
    ) -> Result<ContextKey, BindError>
    where
        F: IntoHandler<M>,
    {
        let (shape, invoker) = adapt(f);
        self.register(window, name, shape, invoker)
    }

    /// Expose a runtime-described callable under `name`.
    pub fn bind_dynamic(
        &self,
        window: &Arc<dyn NativeWindow>,
        name: &str,
        function: Arc<dyn DynamicFunction>,
    ) -> Result<ContextKey, BindError> {
        let (shape, invoker) = adapt_dynamic(function)?;
        self.register(window, name, shape, invoker)
    }

    fn register(
        &self,
        window: &Arc<dyn NativeWindow>,
        name: &str,
        shape: FunctionShape,
        invoker: Invoker,
    ) -> Result<ContextKey, BindError> {
        let binding = self
            .shared
            .registry
            .insert(name, shape, invoker, Arc::clone(window))?;
        let window_id = trampoline::window_id(window);
        if !trampoline::claim_name(window_id, name, binding.key()) {
            self.shared.registry.rollback(&binding);
            debug!(target: "bridge", name, "name held by another bridge on this window");
            return Err(BindError::NameAlreadyBound(name.to_string()));
        }
        if let Err(err) = window.bind(name, binding.key()) {
            trampoline::release_name(window_id, name, binding.key());
            self.shared.registry.rollback(&binding);
            return Err(err.into());
        }
        debug!(
            target: "bridge",
            name,
            key = ?binding.key(),
            shape = %binding.shape(),
            "bound function"
        );
        Ok(binding.key())
    }

    /// Remove `name` and tell the window it was bound in to forget it.
    pub fn unbind(&self, name: &str) -> Result<(), BindError> {
        let binding = self.shared.registry.remove(name)?;
        trampoline::release_name(trampoline::window_id(binding.window()), name, binding.key());
        debug!(target: "bridge", name, key = ?binding.key(), "unbound function");
        binding.window().unbind(name)?;
        Ok(())
    }

    /// Schedule `task` to run on the UI thread of `window`.
    pub fn dispatch(
        &self,
        window: &dyn NativeWindow,
        task: impl FnOnce() + Send + 'static,
    ) -> Option<Ticket> {
        let Some(ticket) = self.shared.queue.enqueue(Box::new(task) as Task) else {
            error!(target: "bridge", "dispatch ticket space exhausted; task dropped");
            return None;
        };
        if let Err(err) = window.dispatch(ticket) {
            error!(target: "bridge", ticket = ?ticket, error = %err, "native dispatch failed");
            self.shared.queue.drain(ticket);
            return None;
        }
        trace!(target: "bridge", ticket = ?ticket, "dispatched task");
        Some(ticket)
    }

    /// Body of the binding trampoline: run the call for `key` and hand the
    /// reply to the owning window. `None` when the key names no live binding.
    pub fn invoke(&self, call_id: &str, raw_args: &str, key: ContextKey) -> Option<Reply> {
        let Some(binding) = self.shared.registry.lookup(key) else {
            trace!(target: "bridge", key = ?key, "call for unknown context key ignored");
            return None;
        };
        let reply = binding.call(raw_args);
        if let Err(err) = binding
            .window()
            .resolve(call_id, reply.status, &reply.payload)
        {
            error!(
                target: "bridge",
                name = binding.name(),
                call_id,
                error = %err,
                "failed to deliver bound call result"
            );
        }
        Some(reply)
    }

    /// Body of the dispatch trampoline. Returns whether a task ran.
    pub fn run_dispatched(&self, ticket: Ticket) -> bool {
        match self.shared.queue.drain(ticket) {
            Some(task) => {
                task();
                true
            }
            None => {
                trace!(target: "bridge", ticket = ?ticket, "unknown dispatch ticket ignored");
                false
            }
        }
    }

    /// Discard all pending tasks. Their tickets become no-ops.
    pub fn clear_dispatches(&self) -> usize {
        let cleared = self.shared.queue.clear();
        if cleared > 0 {
            debug!(target: "bridge", cleared, "cleared pending dispatches");
        }
        cleared
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.shared.registry.contains(name)
    }

    pub fn key_of(&self, name: &str) -> Option<ContextKey> {
        self.shared.registry.key_of(name)
    }

    pub fn bound_names(&self) -> Vec<String> {
        self.shared.registry.names()
    }

    pub fn pending_dispatches(&self) -> usize {
        self.shared.queue.len()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
