use serde::{Deserialize, Serialize};

use crate::idgen;

/// A single note on the roll. Times are in seconds of audio.
///
/// `id` is assigned once when the note enters the session and survives every
/// edit, so selections can refer to notes independently of their position in
/// the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: u64,
    pub pitch: u8,
    pub start_time: f64,
    pub duration: f64,
    pub velocity: Option<u8>,
}

impl Note {
    pub fn new(pitch: u8, start_time: f64, duration: f64) -> Self {
        Self {
            id: idgen::next(),
            pitch: pitch.min(127),
            start_time: start_time.max(0.0),
            duration,
            velocity: None,
        }
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = Some(velocity.min(127));
        self
    }

    #[inline]
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Half-open interval test: sounding at `start`, silent again at `end`.
    #[inline]
    pub fn is_active_at(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }
}

/// Sort ascending by start time, the order notes are loaded in.
pub fn sort_by_start(notes: &mut [Note]) {
    notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_interval_is_half_open() {
        let note = Note::new(60, 2.0, 1.0);
        assert!(note.is_active_at(2.0));
        assert!(note.is_active_at(2.99));
        assert!(!note.is_active_at(1.99));
        assert!(!note.is_active_at(3.0));
    }

    #[test]
    fn ids_are_unique() {
        let a = Note::new(60, 0.0, 1.0);
        let b = Note::new(60, 0.0, 1.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn constructor_clamps_inputs() {
        let n = Note::new(200, -1.0, 0.5).with_velocity(255);
        assert_eq!(n.pitch, 127);
        assert_eq!(n.start_time, 0.0);
        assert_eq!(n.velocity, Some(127));
    }
}
