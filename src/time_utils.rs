//! Time, pixel and grid conversions for the piano roll.
//!
//! Everything here is a pure function of the current session state. Layouts
//! are rebuilt on every render pass instead of being cached, so geometry can
//! never go stale after a tempo, zoom or note change.

use std::collections::BTreeSet;

use egui::{Pos2, Rect, pos2, vec2};

use crate::constants::{
    BEATS_PER_BAR, EMPTY_RANGE_HIGH, EMPTY_RANGE_LOW, GRID_EPSILON, GRID_PADDING_SECONDS,
    MIN_NOTE_WIDTH, MIN_ROW_HEIGHT, PITCH_PADDING,
};
use crate::model::{GridParams, Note};

/// Horizontal mapping between seconds and content pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeMapper {
    pub pixels_per_second: f32,
}

impl TimeMapper {
    pub fn new(pixels_per_second: f32) -> Self {
        Self { pixels_per_second }
    }

    #[inline]
    pub fn time_to_x(&self, seconds: f64) -> f32 {
        (seconds * self.pixels_per_second as f64) as f32
    }

    #[inline]
    pub fn x_to_time(&self, x: f32) -> f64 {
        x as f64 / self.pixels_per_second as f64
    }
}

/// Inclusive band of pitches shown on the roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchRange {
    pub min: u8,
    pub max: u8,
}

impl PitchRange {
    /// Lowest to highest pitch in use, with a little headroom on each side.
    pub fn from_notes(notes: &[Note]) -> Self {
        let lowest = notes.iter().map(|n| n.pitch).min();
        let highest = notes.iter().map(|n| n.pitch).max();
        match (lowest, highest) {
            (Some(lo), Some(hi)) => Self {
                min: lo.saturating_sub(PITCH_PADDING),
                max: hi.saturating_add(PITCH_PADDING).min(127),
            },
            _ => Self {
                min: EMPTY_RANGE_LOW,
                max: EMPTY_RANGE_HIGH,
            },
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    #[inline]
    pub fn contains(&self, pitch: u8) -> bool {
        (self.min..=self.max).contains(&pitch)
    }

    pub fn clamp(&self, pitch: i32) -> u8 {
        pitch.clamp(self.min as i32, self.max as i32) as u8
    }

    /// Row index counted from the top of the roll.
    #[inline]
    pub fn pitch_to_row(&self, pitch: u8) -> i32 {
        self.max as i32 - pitch as i32
    }
}

/// Geometry for one render pass of the roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollLayout {
    pub mapper: TimeMapper,
    pub range: PitchRange,
    pub row_height: f32,
}

impl RollLayout {
    /// Spread the displayed pitch range over `available_height`, never going
    /// below the minimum row height.
    pub fn compute(notes: &[Note], pixels_per_second: f32, available_height: f32) -> Self {
        let range = PitchRange::from_notes(notes);
        let row_height = (available_height / range.rows() as f32).max(MIN_ROW_HEIGHT);
        Self {
            mapper: TimeMapper::new(pixels_per_second),
            range,
            row_height,
        }
    }

    #[inline]
    pub fn time_to_x(&self, seconds: f64) -> f32 {
        self.mapper.time_to_x(seconds)
    }

    #[inline]
    pub fn x_to_time(&self, x: f32) -> f64 {
        self.mapper.x_to_time(x)
    }

    pub fn row_top(&self, pitch: u8) -> f32 {
        self.range.pitch_to_row(pitch) as f32 * self.row_height
    }

    pub fn content_height(&self) -> f32 {
        self.range.rows() as f32 * self.row_height
    }

    /// Rendered rectangle of a note in content coordinates.
    pub fn note_rect(&self, note: &Note) -> Rect {
        let x = self.time_to_x(note.start_time);
        let width = (note.duration as f32 * self.mapper.pixels_per_second).max(MIN_NOTE_WIDTH);
        let y = self.row_top(note.pitch);
        let height = self.row_height - 1.0;
        Rect::from_min_size(pos2(x, y), vec2(width, height))
    }

    pub fn pitch_at(&self, pos: Pos2) -> Option<u8> {
        if pos.y < 0.0 {
            return None;
        }
        let row = (pos.y / self.row_height).floor() as i32;
        let pitch = self.range.max as i32 - row;
        (pitch >= self.range.min as i32).then_some(pitch as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLineKind {
    Bar,
    Beat,
    Subdivision,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub time: f64,
    pub kind: GridLineKind,
}

#[inline]
fn near_integer(value: f64) -> bool {
    (value - value.round()).abs() < GRID_EPSILON
}

/// Vertical grid lines between `from` and `to` seconds, limited to t=0 up to
/// `duration` plus padding.
///
/// Lines are anchored on the downbeat offset, so material before the downbeat
/// (a pickup) gets lines too.
pub fn grid_lines(grid: &GridParams, duration: f64, from: f64, to: f64) -> Vec<GridLine> {
    let step = grid.seconds_per_step();
    if !(step.is_finite() && step > 0.0) {
        return Vec::new();
    }
    let fraction = grid.subdivision.beat_fraction();
    let start = from.max(0.0);
    let end = (duration.max(0.0) + GRID_PADDING_SECONDS).min(to);
    if !(start <= end) {
        return Vec::new();
    }

    let first = ((start - grid.offset) / step - GRID_EPSILON).ceil() as i64;
    let last = ((end - grid.offset) / step + GRID_EPSILON).floor() as i64;

    (first..=last)
        .map(|k| {
            let time = grid.offset + k as f64 * step;
            let beats = k as f64 * fraction;
            let kind = if near_integer(beats / BEATS_PER_BAR) {
                GridLineKind::Bar
            } else if near_integer(beats) {
                GridLineKind::Beat
            } else {
                GridLineKind::Subdivision
            };
            GridLine {
                time: time.max(0.0),
                kind,
            }
        })
        .collect()
}

/// Snap `time` to the nearest grid step measured from the downbeat.
#[inline]
pub fn quantize_to_grid(time: f64, grid: &GridParams) -> f64 {
    let step = grid.seconds_per_step();
    if step > 0.0 {
        (grid.offset + ((time - grid.offset) / step).round() * step).max(0.0)
    } else {
        time.max(0.0)
    }
}

/// Pitches sounding at `time`.
pub fn active_pitches(notes: &[Note], time: f64) -> BTreeSet<u8> {
    notes
        .iter()
        .filter(|n| n.is_active_at(time))
        .map(|n| n.pitch)
        .collect()
}

/// Format time in minutes:seconds.milliseconds
pub fn format_minutes_seconds(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0) as i32;
    let secs = seconds % 60.0;
    format!("{:02}:{:06.3}", minutes, secs)
}

/// Format a position as bar.beat relative to the downbeat (1-based).
pub fn format_bar_beat(seconds: f64, grid: &GridParams) -> String {
    let beats = (seconds - grid.offset) / grid.seconds_per_beat();
    let bar = (beats / BEATS_PER_BAR).floor();
    let beat = beats - bar * BEATS_PER_BAR;
    format!("{}.{}", bar as i64 + 1, beat.floor() as i64 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Subdivision;
    use approx::assert_abs_diff_eq;

    fn kind_at(lines: &[GridLine], time: f64) -> GridLineKind {
        lines
            .iter()
            .find(|l| (l.time - time).abs() < 1e-3)
            .map(|l| l.kind)
            .unwrap_or_else(|| panic!("no grid line at {time}"))
    }

    #[test]
    fn grid_lines_are_classified_against_the_downbeat() {
        let grid = GridParams::new(120.0, 0.0, Subdivision::EighthTriplet);
        let lines = grid_lines(&grid, 8.0, 0.0, f64::INFINITY);
        assert_eq!(kind_at(&lines, 2.0), GridLineKind::Bar);
        assert_eq!(kind_at(&lines, 0.5), GridLineKind::Beat);
        assert_eq!(kind_at(&lines, 0.1667), GridLineKind::Subdivision);
        assert_eq!(kind_at(&lines, 0.0), GridLineKind::Bar);
    }

    #[test]
    fn grid_lines_cover_pickup_and_padding() {
        let grid = GridParams::new(120.0, 1.25, Subdivision::Quarter);
        let lines = grid_lines(&grid, 10.0, 0.0, f64::INFINITY);
        let first = lines.first().unwrap();
        let last = lines.last().unwrap();
        assert_abs_diff_eq!(first.time, 0.25, epsilon = 1e-9);
        assert!(last.time <= 14.0 + 1e-9);
        assert!(last.time > 13.5);
        // The downbeat itself starts a bar, the line one beat earlier does not.
        assert_eq!(kind_at(&lines, 1.25), GridLineKind::Bar);
        assert_eq!(kind_at(&lines, 0.75), GridLineKind::Beat);
        assert!(lines.iter().all(|l| l.time >= 0.0));
    }

    #[test]
    fn grid_lines_stay_inside_the_visible_window() {
        let grid = GridParams::new(300.0, 0.0, Subdivision::ThirtySecond);
        let lines = grid_lines(&grid, 3600.0, 1800.0, 1802.0);
        // 300 BPM in 32nds: 0.025s per step
        assert_eq!(lines.len(), 81);
        assert_abs_diff_eq!(lines[0].time, 1800.0, epsilon = 1e-9);
        assert_eq!(lines[0].kind, GridLineKind::Bar);
        assert!(lines.iter().all(|l| (1800.0 - 1e-6..=1802.0 + 1e-6).contains(&l.time)));

        assert!(grid_lines(&grid, 10.0, 20.0, 30.0).is_empty());
    }

    #[test]
    fn quantize_snaps_relative_to_offset() {
        let grid = GridParams::new(120.0, 0.1, Subdivision::Quarter);
        assert_abs_diff_eq!(quantize_to_grid(0.32, &grid), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(quantize_to_grid(0.40, &grid), 0.6, epsilon = 1e-12);
        // Snapping below zero clamps to the start of the audio.
        assert_eq!(quantize_to_grid(0.0, &GridParams::new(120.0, 0.7, Subdivision::Half)), 0.0);
    }

    #[test]
    fn quantize_is_idempotent() {
        let grid = GridParams::new(97.0, 0.37, Subdivision::SixteenthTriplet);
        for raw in [0.0, 0.123, 1.777, 5.5, 12.34] {
            let once = quantize_to_grid(raw, &grid);
            assert_eq!(quantize_to_grid(once, &grid), once);
        }
    }

    #[test]
    fn note_rect_has_minimum_width() {
        let notes = [Note::new(60, 10.0, 0.01)];
        let layout = RollLayout::compute(&notes, 100.0, 500.0);
        let rect = layout.note_rect(&notes[0]);
        assert_eq!(rect.width(), MIN_NOTE_WIDTH);
        assert_eq!(rect.height(), layout.row_height - 1.0);
    }

    #[test]
    fn rows_never_shrink_below_minimum() {
        let notes = [Note::new(0, 0.0, 1.0), Note::new(127, 0.0, 1.0)];
        let layout = RollLayout::compute(&notes, 100.0, 100.0);
        assert_eq!(layout.range.rows(), 128);
        assert_eq!(layout.row_height, MIN_ROW_HEIGHT);
    }

    #[test]
    fn pitch_rows_count_down_from_the_top() {
        let notes = [Note::new(60, 0.0, 1.0), Note::new(64, 0.0, 1.0)];
        let layout = RollLayout::compute(&notes, 100.0, 90.0);
        assert_eq!(layout.range, PitchRange { min: 58, max: 66 });
        assert_eq!(layout.range.pitch_to_row(66), 0);
        assert_eq!(layout.pitch_at(pos2(0.0, 1.0)), Some(66));
        assert_eq!(layout.pitch_at(pos2(0.0, layout.content_height() + 1.0)), None);
    }

    #[test]
    fn time_format() {
        assert_eq!(format_minutes_seconds(75.25), "01:15.250");
        let grid = GridParams::new(120.0, 0.0, Subdivision::Quarter);
        assert_eq!(format_bar_beat(2.6, &grid), "2.2");
    }
}
