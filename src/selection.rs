//! Note selection and pointer hit testing.

use std::collections::BTreeSet;

use egui::{Pos2, Rect};

use crate::model::Note;
use crate::time_utils::RollLayout;

/// Selected notes, referenced by their stable ids.
///
/// Positional indices are rebuilt from the current note sequence whenever
/// they are needed, so a reorder can never make the selection point at the
/// wrong note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<u64>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.iter().copied()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn select_only(&mut self, id: u64) {
        self.ids.clear();
        self.ids.insert(id);
    }

    pub fn toggle(&mut self, id: u64) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn select_all(&mut self, notes: &[Note]) {
        self.ids = notes.iter().map(|n| n.id).collect();
    }

    /// Replace the selection with the notes at `indices`; out-of-range
    /// indices are ignored.
    pub fn select_indices(&mut self, notes: &[Note], indices: &[usize]) {
        self.ids = indices
            .iter()
            .filter_map(|&i| notes.get(i))
            .map(|n| n.id)
            .collect();
    }

    /// Positions of the selected notes in `notes`, in store order.
    pub fn indices(&self, notes: &[Note]) -> Vec<usize> {
        notes
            .iter()
            .enumerate()
            .filter(|(_, n)| self.ids.contains(&n.id))
            .map(|(i, _)| i)
            .collect()
    }

    /// Forget ids that no longer exist in `notes`.
    pub fn retain_existing(&mut self, notes: &[Note]) {
        let present: BTreeSet<u64> = notes.iter().map(|n| n.id).collect();
        self.ids.retain(|id| present.contains(id));
    }
}

/// First note, in store order, whose rendered rectangle contains `pos`.
pub fn hit_test_point(notes: &[Note], layout: &RollLayout, pos: Pos2) -> Option<usize> {
    notes
        .iter()
        .position(|note| layout.note_rect(note).contains(pos))
}

/// Every note whose rendered rectangle overlaps the box spanned by `a` and `b`.
pub fn hit_test_rect(notes: &[Note], layout: &RollLayout, a: Pos2, b: Pos2) -> Vec<usize> {
    let area = Rect::from_two_pos(a, b);
    notes
        .iter()
        .enumerate()
        .filter(|(_, note)| layout.note_rect(note).intersects(area))
        .map(|(i, _)| i)
        .collect()
}

/// Modifier keys relevant to a pointer press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerModifiers {
    /// Add or remove the clicked note from the selection.
    pub toggle: bool,
    /// Use the clicked note's start as the downbeat.
    pub set_downbeat: bool,
}

/// What a press/release pair on the roll resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerOutcome {
    None,
    SetDownbeat(usize),
    SelectOnly(usize),
    Toggle(usize),
    BoxSelect(Vec<usize>),
    Seek(f64),
}

/// Pointer interaction in progress on the roll.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum PointerGesture {
    #[default]
    Idle,
    SelectionBox {
        start: Pos2,
        current: Pos2,
    },
}

impl PointerGesture {
    /// Resolve a press at `pos` (content coordinates).
    pub fn press(
        &mut self,
        notes: &[Note],
        layout: &RollLayout,
        pos: Pos2,
        modifiers: PointerModifiers,
    ) -> PointerOutcome {
        *self = PointerGesture::Idle;
        match hit_test_point(notes, layout, pos) {
            Some(idx) if modifiers.set_downbeat => PointerOutcome::SetDownbeat(idx),
            Some(idx) if modifiers.toggle => PointerOutcome::Toggle(idx),
            Some(idx) => PointerOutcome::SelectOnly(idx),
            None => {
                *self = PointerGesture::SelectionBox {
                    start: pos,
                    current: pos,
                };
                PointerOutcome::None
            }
        }
    }

    pub fn drag(&mut self, pos: Pos2) {
        if let PointerGesture::SelectionBox { current, .. } = self {
            *current = pos;
        }
    }

    /// Finish the gesture. A rubber band that caught nothing turns into a
    /// seek to the time under its starting point.
    pub fn release(&mut self, notes: &[Note], layout: &RollLayout, pos: Pos2) -> PointerOutcome {
        let gesture = std::mem::take(self);
        match gesture {
            PointerGesture::Idle => PointerOutcome::None,
            PointerGesture::SelectionBox { start, .. } => {
                let hits = hit_test_rect(notes, layout, start, pos);
                if hits.is_empty() {
                    PointerOutcome::Seek(layout.x_to_time(start.x).max(0.0))
                } else {
                    PointerOutcome::BoxSelect(hits)
                }
            }
        }
    }

    pub fn cancel(&mut self) {
        *self = PointerGesture::Idle;
    }

    pub fn selection_box(&self) -> Option<Rect> {
        match self {
            PointerGesture::SelectionBox { start, current } => {
                Some(Rect::from_two_pos(*start, *current))
            }
            PointerGesture::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn layout_for(notes: &[Note]) -> RollLayout {
        RollLayout::compute(notes, 100.0, 200.0)
    }

    #[test]
    fn point_hit_respects_rendered_width() {
        let notes = vec![Note::new(60, 10.0, 0.1)];
        let layout = layout_for(&notes);
        let y = layout.row_top(60) + 1.0;
        assert_eq!(layout.note_rect(&notes[0]).width(), 10.0);
        assert_eq!(hit_test_point(&notes, &layout, pos2(1005.0, y)), Some(0));
        assert_eq!(hit_test_point(&notes, &layout, pos2(1010.0, y)), Some(0));
        assert_eq!(hit_test_point(&notes, &layout, pos2(1011.0, y)), None);
        assert_eq!(hit_test_point(&notes, &layout, pos2(999.0, y)), None);
    }

    #[test]
    fn first_match_in_store_order_wins() {
        let notes = vec![Note::new(60, 1.0, 2.0), Note::new(60, 1.5, 2.0)];
        let layout = layout_for(&notes);
        let y = layout.row_top(60) + 1.0;
        assert_eq!(hit_test_point(&notes, &layout, pos2(200.0, y)), Some(0));
    }

    #[test]
    fn rect_hit_normalizes_corners() {
        let notes = vec![
            Note::new(60, 0.0, 1.0),
            Note::new(62, 2.0, 1.0),
            Note::new(64, 5.0, 1.0),
        ];
        let layout = layout_for(&notes);
        let top = layout.row_top(64);
        let bottom = layout.row_top(60) + layout.row_height;
        let hits = hit_test_rect(&notes, &layout, pos2(350.0, bottom), pos2(50.0, top));
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn selection_indices_follow_ids() {
        let mut notes = vec![
            Note::new(60, 0.0, 1.0),
            Note::new(62, 1.0, 1.0),
            Note::new(64, 2.0, 1.0),
        ];
        let mut sel = Selection::new();
        sel.select_indices(&notes, &[2, 9]);
        assert_eq!(sel.len(), 1);
        notes.swap(0, 2);
        assert_eq!(sel.indices(&notes), vec![0]);
        sel.toggle(notes[1].id);
        assert_eq!(sel.indices(&notes), vec![0, 1]);
        notes.remove(1);
        sel.retain_existing(&notes);
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn press_priority_downbeat_then_toggle() {
        let notes = vec![Note::new(60, 1.0, 1.0)];
        let layout = layout_for(&notes);
        let on_note = pos2(150.0, layout.row_top(60) + 1.0);
        let mut gesture = PointerGesture::default();

        let both = PointerModifiers {
            toggle: true,
            set_downbeat: true,
        };
        assert_eq!(gesture.press(&notes, &layout, on_note, both), PointerOutcome::SetDownbeat(0));
        let toggle = PointerModifiers {
            toggle: true,
            set_downbeat: false,
        };
        assert_eq!(gesture.press(&notes, &layout, on_note, toggle), PointerOutcome::Toggle(0));
        assert_eq!(
            gesture.press(&notes, &layout, on_note, PointerModifiers::default()),
            PointerOutcome::SelectOnly(0)
        );
        assert_eq!(gesture, PointerGesture::Idle);
    }

    #[test]
    fn empty_drag_becomes_a_seek() {
        let notes = vec![Note::new(60, 1.0, 1.0)];
        let layout = layout_for(&notes);
        let mut gesture = PointerGesture::default();
        let start = pos2(450.0, 2.0);
        assert_eq!(
            gesture.press(&notes, &layout, start, PointerModifiers::default()),
            PointerOutcome::None
        );
        gesture.drag(pos2(480.0, 10.0));
        assert!(gesture.selection_box().is_some());
        assert_eq!(gesture.release(&notes, &layout, pos2(480.0, 10.0)), PointerOutcome::Seek(4.5));
        assert_eq!(gesture.selection_box(), None);
    }

    #[test]
    fn drag_over_notes_selects_them() {
        let notes = vec![Note::new(60, 1.0, 1.0), Note::new(61, 3.0, 1.0)];
        let layout = layout_for(&notes);
        let mut gesture = PointerGesture::default();
        gesture.press(&notes, &layout, pos2(20.0, 0.0), PointerModifiers::default());
        let out = gesture.release(&notes, &layout, pos2(250.0, layout.content_height()));
        assert_eq!(out, PointerOutcome::BoxSelect(vec![0]));
    }
}
