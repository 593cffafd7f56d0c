//! Undo history.

use crate::types::Field;

/// Unbounded stack of full board snapshots, newest last.
///
/// Lives only in memory and is cleared whenever the session changes.
#[derive(Debug, Default, Clone)]
pub struct History {
    snapshots: Vec<Vec<Field>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the board as it was before a move.
    pub fn push(&mut self, fields: Vec<Field>) {
        self.snapshots.push(fields);
    }

    /// Removes and returns the most recent snapshot.
    pub fn pop(&mut self) -> Option<Vec<Field>> {
        self.snapshots.pop()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::initial_fields;

    #[test]
    fn pops_in_reverse_order() {
        let mut history = History::new();
        let first = initial_fields();
        let mut second = initial_fields();
        second.pop();

        history.push(first.clone());
        history.push(second.clone());
        assert_eq!(history.len(), 2);
        assert_eq!(history.pop(), Some(second));
        assert_eq!(history.pop(), Some(first));
        assert_eq!(history.pop(), None);
        assert!(history.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut history = History::new();
        history.push(initial_fields());
        history.clear();
        assert!(history.is_empty());
    }
}
