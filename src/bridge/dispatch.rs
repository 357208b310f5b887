use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::token::{Generation, Ticket, Token};

/// Zero-argument work item destined for the UI thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Pending {
    tasks: HashMap<Ticket, Task>,
    last_serial: u64,
}

/// Tickets awaiting delivery by the native loop.
pub struct DispatchQueue {
    generation: Generation,
    pending: Mutex<Pending>,
}

impl DispatchQueue {
    pub(crate) fn new(generation: Generation) -> Self {
        Self {
            generation,
            pending: Mutex::new(Pending::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `task` under the next ticket. `None` once the ticket space of
    /// this bridge is spent.
    pub fn enqueue(&self, task: Task) -> Option<Ticket> {
        let mut pending = self.lock();
        let serial = pending.last_serial.checked_add(1)?;
        let ticket = Ticket(Token::new(self.generation, serial)?);
        pending.last_serial = serial;
        pending.tasks.insert(ticket, task);
        Some(ticket)
    }

    /// Take the task for `ticket`. A ticket yields its task at most once.
    pub fn drain(&self, ticket: Ticket) -> Option<Task> {
        self.lock().tasks.remove(&ticket)
    }

    /// Drop every pending task, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let drained: Vec<Task> = self.lock().tasks.drain().map(|(_, task)| task).collect();
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
