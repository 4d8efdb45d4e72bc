//! Cancellable units of background work bound to display slots.
//!
//! A slot holds at most one live task. Binding a new task to a slot cancels
//! the previous one; cancellation is cooperative, so workers check the flag
//! and the interactive side re-checks the binding before using a result.

pub mod manager;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub use manager::SlotRegistry;

/// Unique identifier for a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        TaskId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a display target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u64);

impl SlotId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        SlotId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared cancellation flag handed to the worker side of a task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The interactive side of a task: what it works on and how to stop it.
#[derive(Debug)]
pub struct TaskHandle {
    pub id: TaskId,
    path: String,
    token: CancelToken,
    finished: bool,
}

impl TaskHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            path: path.into(),
            token: CancelToken::default(),
            finished: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Request cancellation of this task.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The result has been handed to the slot. The handle stays bound so a
    /// repeat request for the same path can skip the placeholder.
    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
