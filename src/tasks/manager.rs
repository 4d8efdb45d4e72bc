//! Slot-to-task bindings.

use std::collections::HashMap;

use super::{SlotId, TaskHandle, TaskId};

/// Tracks the one live task per display slot.
pub struct SlotRegistry {
    bindings: HashMap<SlotId, TaskHandle>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Bind a task to a slot, cancelling and returning whatever was bound before.
    pub fn bind(&mut self, slot: SlotId, task: TaskHandle) -> Option<TaskHandle> {
        let previous = self.bindings.insert(slot, task);
        if let Some(ref old) = previous {
            old.cancel();
        }
        previous
    }

    /// Cancel and unbind the slot's task, if any.
    pub fn cancel(&mut self, slot: SlotId) -> Option<TaskHandle> {
        let previous = self.bindings.remove(&slot);
        if let Some(ref old) = previous {
            old.cancel();
        }
        previous
    }

    pub fn current(&self, slot: SlotId) -> Option<&TaskHandle> {
        self.bindings.get(&slot)
    }

    /// Whether `task` is still the slot's bound task, neither cancelled nor finished.
    pub fn is_current(&self, slot: SlotId, task: TaskId) -> bool {
        self.bindings
            .get(&slot)
            .is_some_and(|t| t.id == task && !t.is_cancelled() && !t.is_finished())
    }

    /// Called when a task has come back. Returns true if it was still the
    /// slot's live task, in which case it stays bound, marked finished, until
    /// the slot is given another request or cancelled.
    pub fn finish(&mut self, slot: SlotId, task: TaskId) -> bool {
        if !self.is_current(slot, task) {
            return false;
        }
        if let Some(bound) = self.bindings.get_mut(&slot) {
            bound.mark_finished();
        }
        true
    }

    /// Cancel every bound task.
    pub fn cancel_all(&mut self) {
        for task in self.bindings.values() {
            task.cancel();
        }
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new()
    }
}
