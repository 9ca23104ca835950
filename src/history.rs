/// Undo/redo arena: a bounded list of snapshots with a cursor. Entries at or
/// before the cursor are the undo stack, entries after it the redo stack.
/// The entry at index 0 is the baseline and always stays reachable.
#[derive(Clone, Debug)]
pub struct UndoHistory<T: Clone + PartialEq> {
    stack: Vec<T>,
    cursor: usize,
    cap: usize,
}

impl<T: Clone + PartialEq> UndoHistory<T> {
    pub fn new(initial: T, cap: usize) -> Self {
        Self {
            stack: vec![initial],
            cursor: 0,
            cap: cap.max(2),
        }
    }

    /// Commits a snapshot: clears the redo side, drops structural no-ops,
    /// and evicts the oldest entry once the cap is reached.
    pub fn push_snapshot(&mut self, value: T) {
        if self.cursor + 1 < self.stack.len() {
            self.stack.truncate(self.cursor + 1);
        }
        if self.stack[self.cursor] == value {
            return;
        }
        if self.stack.len() >= self.cap {
            self.stack.remove(0);
        }
        self.stack.push(value);
        self.cursor = self.stack.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.stack.len()
    }

    pub fn undo(&mut self) -> Option<T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.stack[self.cursor].clone())
    }

    pub fn redo(&mut self) -> Option<T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.stack[self.cursor].clone())
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn current(&self) -> &T {
        &self.stack[self.cursor]
    }
}

#[cfg(test)]
mod tests {
    use super::UndoHistory;

    #[test]
    fn undo_redo_flow() {
        let mut history = UndoHistory::new(vec![1], 50);
        history.push_snapshot(vec![1, 2]);
        history.push_snapshot(vec![1, 2, 3]);

        assert_eq!(history.undo(), Some(vec![1, 2]));
        assert_eq!(history.undo(), Some(vec![1]));
        // Baseline stays current; further undo is a silent no-op.
        assert_eq!(history.undo(), None);

        assert_eq!(history.redo(), Some(vec![1, 2]));
        history.push_snapshot(vec![9]);
        // A commit clears the redo side.
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn undo_then_redo_are_exact_inverses() {
        let mut history = UndoHistory::new(vec![0], 50);
        history.push_snapshot(vec![0, 1]);
        let before = history.current().clone();
        assert_eq!(history.undo(), Some(vec![0]));
        assert_eq!(history.redo(), Some(before));
    }

    #[test]
    fn identical_snapshot_is_dropped() {
        let mut history = UndoHistory::new(vec![1], 50);
        history.push_snapshot(vec![1, 2]);
        history.push_snapshot(vec![1, 2]);
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
    }

    #[test]
    fn cap_evicts_oldest_entry() {
        let mut history = UndoHistory::new(vec![0], 5);
        for i in 1..10 {
            history.push_snapshot(vec![i]);
        }
        assert_eq!(history.len(), 5);
        // Walk back to the oldest reachable state: the early entries are gone.
        let mut last = None;
        while let Some(value) = history.undo() {
            last = Some(value);
        }
        assert_eq!(last, Some(vec![5]));
    }

    #[test]
    fn depth_never_leaves_bounds() {
        let mut history = UndoHistory::new(vec![0], 5);
        for i in 1..20 {
            history.push_snapshot(vec![i]);
            assert!(!history.is_empty() && history.len() <= 5);
        }
    }
}
