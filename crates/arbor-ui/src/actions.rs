use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Queue of action names raised by widgets, drained by the application.
///
/// Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct UiActions {
    queue: Arc<Mutex<VecDeque<String>>>,
}

impl UiActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, action: impl Into<String>) {
        self.lock().push_back(action.into());
    }

    /// Removes and returns every pending action, oldest first.
    pub fn drain(&self) -> Vec<String> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_queue() {
        let actions = UiActions::new();
        let widget_side = actions.clone();
        widget_side.push("play");
        widget_side.push("quit");

        assert_eq!(actions.len(), 2);
        assert_eq!(actions.drain(), vec!["play", "quit"]);
        assert!(widget_side.is_empty());
    }
}
