/// Linear undo log of full snapshots with a cursor at the current state.
///
/// Entries are owned copies, so later edits to the live state can never
/// reach back into history.
#[derive(Debug, Clone)]
pub struct EditHistory<T> {
    entries: Vec<T>,
    cursor: usize,
    limit: usize,
}

impl<T: Clone + PartialEq> EditHistory<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Drop everything and start over from `initial`.
    pub fn reset(&mut self, initial: T) {
        self.entries.clear();
        self.entries.push(initial);
        self.cursor = 0;
    }

    /// Record `snapshot` as the new current state.
    ///
    /// Returns `false` without touching the log when `snapshot` equals the
    /// current entry.
    pub fn push(&mut self, snapshot: T) -> bool {
        if self.current() == Some(&snapshot) {
            return false;
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(snapshot);
        self.cursor = self.entries.len() - 1;

        if self.entries.len() > self.limit {
            self.entries.remove(0);
            self.cursor -= 1;
        }
        true
    }

    pub fn undo(&mut self) -> Option<&T> {
        if self.can_undo() {
            self.cursor -= 1;
            self.entries.get(self.cursor)
        } else {
            None
        }
    }

    pub fn redo(&mut self) -> Option<&T> {
        if self.can_redo() {
            self.cursor += 1;
            self.entries.get(self.cursor)
        } else {
            None
        }
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_push_is_ignored() {
        let mut h = EditHistory::new(50);
        h.reset(vec![1]);
        assert!(h.push(vec![1, 2]));
        assert!(!h.push(vec![1, 2]));
        assert_eq!(h.len(), 2);
        assert_eq!(h.cursor(), 1);
    }

    #[test]
    fn push_discards_redo_branch() {
        let mut h = EditHistory::new(50);
        h.reset(0);
        h.push(1);
        h.push(2);
        h.undo();
        h.undo();
        assert!(h.push(5));
        assert_eq!(h.len(), 2);
        assert_eq!(h.current(), Some(&5));
        assert!(!h.can_redo());
    }

    #[test]
    fn eviction_keeps_cursor_valid() {
        let mut h = EditHistory::new(50);
        h.reset(0);
        for i in 1..=80 {
            h.push(i);
            assert!(h.len() <= 50);
            assert_eq!(h.current(), Some(&i));
        }
        let mut oldest = 80;
        while let Some(&v) = h.undo() {
            oldest = v;
        }
        assert_eq!(oldest, 31);
        assert_eq!(h.cursor(), 0);
    }

    #[test]
    fn undo_redo_clamp_at_bounds() {
        let mut h = EditHistory::new(50);
        h.reset("a");
        assert_eq!(h.undo(), None);
        assert_eq!(h.redo(), None);
        h.push("b");
        assert_eq!(h.redo(), None);
        assert_eq!(h.undo(), Some(&"a"));
        assert_eq!(h.undo(), None);
        assert_eq!(h.redo(), Some(&"b"));
    }

    #[test]
    fn push_into_empty_history_starts_at_zero() {
        let mut h = EditHistory::new(3);
        assert!(h.is_empty());
        assert!(h.push(7));
        assert_eq!(h.cursor(), 0);
        assert_eq!(h.current(), Some(&7));
    }
}
