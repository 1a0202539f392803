use crate::constants::{TAP_HISTORY, TAP_RESET_MS};
use crate::model::clamp_tempo;

/// Tempo from the average interval between recent taps.
#[derive(Debug, Clone, Default)]
pub struct TapTempo {
    taps: Vec<f64>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tap at `now_ms`. Returns the tempo once at least two taps
    /// are in the current sequence. A pause longer than two seconds starts a
    /// new sequence.
    pub fn tap(&mut self, now_ms: f64) -> Option<f64> {
        if let Some(&last) = self.taps.last()
            && (now_ms - last > TAP_RESET_MS || now_ms < last)
        {
            self.taps.clear();
        }
        self.taps.push(now_ms);
        if self.taps.len() > TAP_HISTORY {
            self.taps.remove(0);
        }
        self.bpm()
    }

    pub fn bpm(&self) -> Option<f64> {
        if self.taps.len() < 2 {
            return None;
        }
        let span = self.taps[self.taps.len() - 1] - self.taps[0];
        let intervals = (self.taps.len() - 1) as f64;
        let average = span / intervals;
        if average <= 0.0 {
            return None;
        }
        Some(clamp_tempo((60_000.0 / average).round()))
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }
}
