use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::handler::Invoker;
use super::marshal::{self, FunctionShape, Outputs, Reply};
use super::panic_message;
use super::token::{ContextKey, Generation, Token};
use crate::error::{BindError, CallError};
use crate::native::NativeWindow;

/// A named, script-invocable host callable.
pub struct Binding {
    name: String,
    key: ContextKey,
    shape: FunctionShape,
    invoker: Invoker,
    window: Arc<dyn NativeWindow>,
}

impl Binding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> ContextKey {
        self.key
    }

    pub fn shape(&self) -> &FunctionShape {
        &self.shape
    }

    /// Window whose native `return` receives this binding's replies.
    pub fn window(&self) -> &Arc<dyn NativeWindow> {
        &self.window
    }

    /// Decode, invoke and encode one script call. Always produces a reply.
    pub fn call(&self, raw_args: &str) -> Reply {
        match self.try_call(raw_args) {
            Ok(outputs) => marshal::encode(outputs),
            Err(err) => {
                debug!(target: "bridge", name = %self.name, error = %err, "bound call rejected");
                Reply::from_call_error(&err)
            }
        }
    }

    fn try_call(&self, raw_args: &str) -> Result<Outputs, CallError> {
        let args = marshal::parse_request(raw_args)?;
        self.shape.check_arity(args.len())?;
        panic::catch_unwind(AssertUnwindSafe(|| (self.invoker)(&args)))
            .map_err(|payload| CallError::Panicked(panic_message(payload.as_ref())))?
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("shape", &self.shape.to_string())
            .finish()
    }
}

#[derive(Default)]
struct Indexes {
    names: HashMap<String, ContextKey>,
    bindings: HashMap<ContextKey, Arc<Binding>>,
    last_serial: u64,
}

/// Name and context-key indexes over all live bindings of one bridge.
pub struct BindingRegistry {
    generation: Generation,
    indexes: Mutex<Indexes>,
}

impl BindingRegistry {
    pub(crate) fn new(generation: Generation) -> Self {
        Self {
            generation,
            indexes: Mutex::new(Indexes::default()),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_last_serial(generation: Generation, last_serial: u64) -> Self {
        let registry = Self::new(generation);
        registry.lock().last_serial = last_serial;
        registry
    }

    fn lock(&self) -> MutexGuard<'_, Indexes> {
        self.indexes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `name`. The existence check, key allocation and insert happen
    /// under one critical section.
    pub fn insert(
        &self,
        name: &str,
        shape: FunctionShape,
        invoker: Invoker,
        window: Arc<dyn NativeWindow>,
    ) -> Result<Arc<Binding>, BindError> {
        let mut indexes = self.lock();
        if indexes.names.contains_key(name) {
            return Err(BindError::NameAlreadyBound(name.to_string()));
        }

        let serial = indexes
            .last_serial
            .checked_add(1)
            .ok_or(BindError::ContextAllocationFailed)?;
        let token = Token::new(self.generation, serial).ok_or(BindError::ContextAllocationFailed)?;
        indexes.last_serial = serial;
        let key = ContextKey(token);

        let binding = Arc::new(Binding {
            name: name.to_string(),
            key,
            shape,
            invoker,
            window,
        });
        indexes.names.insert(name.to_string(), key);
        indexes.bindings.insert(key, Arc::clone(&binding));
        Ok(binding)
    }

    /// Drop `name` from both indexes at once.
    pub fn remove(&self, name: &str) -> Result<Arc<Binding>, BindError> {
        let mut indexes = self.lock();
        let key = indexes
            .names
            .remove(name)
            .ok_or_else(|| BindError::NameNotBound(name.to_string()))?;
        indexes
            .bindings
            .remove(&key)
            .ok_or_else(|| BindError::NameNotBound(name.to_string()))
    }

    /// Undo an insert whose native registration failed. A later binding that
    /// reused the name is left alone.
    pub(crate) fn rollback(&self, binding: &Binding) {
        let mut indexes = self.lock();
        if indexes.names.get(binding.name()) == Some(&binding.key()) {
            indexes.names.remove(binding.name());
        }
        indexes.bindings.remove(&binding.key());
    }

    /// Resolve a context key handed back by the native layer.
    pub fn lookup(&self, key: ContextKey) -> Option<Arc<Binding>> {
        self.lock().bindings.get(&key).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().names.contains_key(name)
    }

    pub fn key_of(&self, name: &str) -> Option<ContextKey> {
        self.lock().names.get(name).copied()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().names.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
