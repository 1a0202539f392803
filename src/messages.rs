use std::collections::BTreeSet;

use crate::model::Note;

/// Notifications from the editing session to whoever hosts it.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The full note sequence after a load, edit, undo or redo.
    NotesChanged(Vec<Note>),
    /// Pitches sounding at the playhead, sent only when the set changes.
    ActivePitches(BTreeSet<u8>),
    PlaybackEnded,
    OffsetChanged(f64),
    TempoChanged(f64),
    AudioReady {
        duration: f64,
    },
    Error(String),
}
