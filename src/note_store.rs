use crate::constants::HISTORY_LIMIT;
use crate::history::EditHistory;
use crate::model::Note;

/// The authoritative note sequence plus its undo log.
///
/// The live notes are only ever replaced wholesale, through [`NoteStore::load`],
/// [`NoteStore::commit`], [`NoteStore::undo`] and [`NoteStore::redo`].
#[derive(Debug, Clone)]
pub struct NoteStore {
    notes: Vec<Note>,
    history: EditHistory<Vec<Note>>,
}

impl Default for NoteStore {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl NoteStore {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            notes: Vec::new(),
            history: EditHistory::new(limit),
        }
    }

    pub fn load(&mut self, notes: Vec<Note>) {
        self.history.reset(notes.clone());
        self.notes = notes;
    }

    /// Make `notes` the current state. Returns `false` if nothing changed.
    pub fn commit(&mut self, notes: Vec<Note>) -> bool {
        if !self.history.push(notes.clone()) {
            return false;
        }
        self.notes = notes;
        true
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.notes = snapshot.clone();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.notes = snapshot.clone();
                true
            }
            None => false,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn history(&self) -> &EditHistory<Vec<Note>> {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Latest end time of any note.
    pub fn end_time(&self) -> f64 {
        self.notes.iter().map(Note::end_time).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shifted(notes: &[Note], dt: f64) -> Vec<Note> {
        notes
            .iter()
            .map(|n| Note {
                start_time: n.start_time + dt,
                ..*n
            })
            .collect()
    }

    #[test]
    fn undo_and_redo_walk_the_commits() {
        let mut store = NoteStore::default();
        store.load(vec![Note::new(60, 0.0, 1.0), Note::new(62, 1.0, 1.0)]);
        let original = store.notes().to_vec();

        let mut states = vec![original.clone()];
        for i in 1..=5 {
            let next = shifted(&original, i as f64);
            assert!(store.commit(next.clone()));
            states.push(next);
        }

        for _ in 0..5 {
            assert!(store.undo());
        }
        assert!(!store.undo());
        assert_eq!(store.notes(), original.as_slice());

        for _ in 0..5 {
            assert!(store.redo());
        }
        assert!(!store.redo());
        assert_eq!(store.notes(), states[5].as_slice());
    }

    #[test]
    fn committing_the_current_state_is_a_no_op() {
        let mut store = NoteStore::default();
        store.load(vec![Note::new(60, 0.0, 1.0)]);
        let same = store.notes().to_vec();
        assert!(!store.commit(same));
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history().cursor(), 0);
    }

    #[test]
    fn load_resets_history() {
        let mut store = NoteStore::default();
        store.load(vec![Note::new(60, 0.0, 1.0)]);
        store.commit(vec![]);
        store.load(vec![Note::new(70, 0.0, 1.0)]);
        assert_eq!(store.history().len(), 1);
        assert!(!store.can_undo());
    }

    #[test]
    fn end_time_is_latest_note_end() {
        let mut store = NoteStore::default();
        store.load(vec![Note::new(60, 0.0, 4.0), Note::new(62, 1.0, 1.0)]);
        assert_eq!(store.end_time(), 4.0);
    }
}
