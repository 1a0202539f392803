use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BPM, MAX_BPM, MIN_BPM};

/// Smallest grid unit used by quantize and nudge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Subdivision {
    Whole,
    Half,
    Quarter,
    #[default]
    Eighth,
    EighthTriplet,
    Sixteenth,
    SixteenthTriplet,
    ThirtySecond,
}

impl Subdivision {
    pub const ALL: [Subdivision; 8] = [
        Subdivision::Whole,
        Subdivision::Half,
        Subdivision::Quarter,
        Subdivision::Eighth,
        Subdivision::EighthTriplet,
        Subdivision::Sixteenth,
        Subdivision::SixteenthTriplet,
        Subdivision::ThirtySecond,
    ];

    /// Length of one grid step in beats.
    pub fn beat_fraction(self) -> f64 {
        match self {
            Subdivision::Whole => 4.0,
            Subdivision::Half => 2.0,
            Subdivision::Quarter => 1.0,
            Subdivision::Eighth => 0.5,
            Subdivision::EighthTriplet => 1.0 / 3.0,
            Subdivision::Sixteenth => 0.25,
            Subdivision::SixteenthTriplet => 1.0 / 6.0,
            Subdivision::ThirtySecond => 0.125,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Subdivision::Whole => "1/1",
            Subdivision::Half => "1/2",
            Subdivision::Quarter => "1/4",
            Subdivision::Eighth => "1/8",
            Subdivision::EighthTriplet => "1/8T",
            Subdivision::Sixteenth => "1/16",
            Subdivision::SixteenthTriplet => "1/16T",
            Subdivision::ThirtySecond => "1/32",
        }
    }
}

/// Tempo, downbeat offset and subdivision of the editing session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GridParams {
    pub tempo: f64,
    pub offset: f64,
    pub subdivision: Subdivision,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_BPM,
            offset: 0.0,
            subdivision: Subdivision::default(),
        }
    }
}

impl GridParams {
    pub fn new(tempo: f64, offset: f64, subdivision: Subdivision) -> Self {
        Self {
            tempo: clamp_tempo(tempo),
            offset: sanitize_offset(offset),
            subdivision,
        }
    }

    #[inline]
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.tempo
    }

    /// Seconds covered by one subdivision step.
    #[inline]
    pub fn seconds_per_step(&self) -> f64 {
        self.seconds_per_beat() * self.subdivision.beat_fraction()
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.tempo = clamp_tempo(bpm);
    }

    pub fn set_offset(&mut self, seconds: f64) {
        self.offset = sanitize_offset(seconds);
    }
}

/// Tempo input boundary shared by the tempo field, tap tempo and MIDI metadata.
pub fn clamp_tempo(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        DEFAULT_BPM
    }
}

fn sanitize_offset(seconds: f64) -> f64 {
    if seconds.is_finite() { seconds } else { 0.0 }
}
