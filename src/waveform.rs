/// Min/max envelope of a mono signal at a fixed resolution.
///
/// Built once per decoded file; drawing at any zoom level folds the stored
/// buckets that fall into each pixel column.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformPeaks {
    peaks_per_second: f32,
    peaks: Vec<(f32, f32)>,
}

impl WaveformPeaks {
    pub fn from_samples(samples: &[f32], sample_rate: u32, peaks_per_second: f32) -> Self {
        let samples_per_peak =
            ((sample_rate as f32 / peaks_per_second).round() as usize).max(1);

        let peaks = samples
            .chunks(samples_per_peak)
            .map(|chunk| {
                chunk.iter().fold((0.0f32, 0.0f32), |(lo, hi), &s| {
                    (lo.min(s), hi.max(s))
                })
            })
            .collect();

        Self {
            peaks_per_second: sample_rate as f32 / samples_per_peak as f32,
            peaks,
        }
    }

    pub fn peaks_per_second(&self) -> f32 {
        self.peaks_per_second
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.peaks.len() as f64 / self.peaks_per_second as f64
    }

    /// Envelope over `[start, end)` seconds, `None` past the end of audio.
    pub fn range(&self, start: f64, end: f64) -> Option<(f32, f32)> {
        let pps = self.peaks_per_second as f64;
        let first = (start.max(0.0) * pps).floor() as usize;
        if first >= self.peaks.len() {
            return None;
        }
        let last = ((end * pps).ceil() as usize).clamp(first + 1, self.peaks.len());
        Some(
            self.peaks[first..last]
                .iter()
                .fold((0.0f32, 0.0f32), |(lo, hi), &(a, b)| (lo.min(a), hi.max(b))),
        )
    }
}
