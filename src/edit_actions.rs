use crate::model::{GridParams, Note};
use crate::selection::Selection;
use crate::time_utils::{PitchRange, quantize_to_grid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Backward => -1.0,
            Direction::Forward => 1.0,
        }
    }
}

/// Note edits over a selection.
///
/// Each operation builds a fresh note sequence for the store to commit and
/// leaves its input untouched. `None` means there was nothing to edit.
pub struct EditProcessor;

impl EditProcessor {
    fn map_selected(
        notes: &[Note],
        selection: &Selection,
        f: impl Fn(&Note) -> Note,
    ) -> Option<Vec<Note>> {
        if selection.is_empty() {
            return None;
        }
        Some(
            notes
                .iter()
                .map(|n| if selection.contains(n.id) { f(n) } else { *n })
                .collect(),
        )
    }

    pub fn quantize(notes: &[Note], selection: &Selection, grid: &GridParams) -> Option<Vec<Note>> {
        Self::map_selected(notes, selection, |n| Note {
            start_time: quantize_to_grid(n.start_time, grid),
            ..*n
        })
    }

    /// Move by one grid step and land back on the grid, so notes that started
    /// off-grid line up after the first nudge.
    pub fn nudge_time(
        notes: &[Note],
        selection: &Selection,
        grid: &GridParams,
        direction: Direction,
    ) -> Option<Vec<Note>> {
        let step = grid.seconds_per_step() * direction.sign();
        Self::map_selected(notes, selection, |n| {
            let moved = (n.start_time + step).max(0.0);
            Note {
                start_time: quantize_to_grid(moved, grid),
                ..*n
            }
        })
    }

    pub fn nudge_pitch(
        notes: &[Note],
        selection: &Selection,
        range: PitchRange,
        semitones: i32,
    ) -> Option<Vec<Note>> {
        Self::map_selected(notes, selection, |n| Note {
            pitch: range.clamp(n.pitch as i32 + semitones),
            ..*n
        })
    }

    pub fn delete(notes: &[Note], selection: &Selection) -> Option<Vec<Note>> {
        if selection.is_empty() {
            return None;
        }
        Some(
            notes
                .iter()
                .filter(|n| !selection.contains(n.id))
                .copied()
                .collect(),
        )
    }
}
