use std::collections::HashMap;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::error::{Result, RollError};

/// Shortest duration given to a note whose off event lands on its on event.
const MIN_NOTE_SECONDS: f64 = 1e-3;
const DEFAULT_TEMPO_US: u32 = 500_000;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNote {
    pub pitch: u8,
    pub start_seconds: f64,
    pub duration_seconds: f64,
    /// Normalized to 0..=1.
    pub velocity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TempoEvent {
    pub bpm: f64,
    pub time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedMidi {
    pub notes: Vec<ParsedNote>,
    pub tempo_events: Vec<TempoEvent>,
    pub total_duration_seconds: f64,
}

impl ParsedMidi {
    pub fn initial_bpm(&self) -> Option<f64> {
        self.tempo_events.first().map(|t| t.bpm)
    }
}

pub trait MidiParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedMidi>;
}

/// Standard MIDI file parser on top of `midly`. All tracks are merged.
#[derive(Debug, Default, Clone, Copy)]
pub struct MidlyParser;

/// Absolute ticks to seconds, honoring tempo changes.
struct TickClock {
    timing: Timing,
    /// (tick, microseconds per quarter), sorted by tick, starting at tick 0.
    tempo_map: Vec<(u64, u32)>,
}

impl TickClock {
    fn new(timing: Timing, mut changes: Vec<(u64, u32)>) -> Self {
        changes.sort_by_key(|&(tick, _)| tick);
        if changes.first().is_none_or(|&(tick, _)| tick > 0) {
            changes.insert(0, (0, DEFAULT_TEMPO_US));
        }
        Self {
            timing,
            tempo_map: changes,
        }
    }

    fn seconds(&self, tick: u64) -> f64 {
        match self.timing {
            Timing::Metrical(ppqn) => {
                let ppqn = ppqn.as_int().max(1) as f64;
                let mut seconds = 0.0;
                for (i, &(seg_start, tempo)) in self.tempo_map.iter().enumerate() {
                    if seg_start >= tick {
                        break;
                    }
                    let seg_end = self
                        .tempo_map
                        .get(i + 1)
                        .map(|&(t, _)| t)
                        .unwrap_or(u64::MAX)
                        .min(tick);
                    seconds += (seg_end - seg_start) as f64 / ppqn * tempo as f64 / 1_000_000.0;
                }
                seconds
            }
            Timing::Timecode(fps, subframe) => {
                let ticks_per_second = (fps.as_f32() as f64 * subframe as f64).max(1.0);
                tick as f64 / ticks_per_second
            }
        }
    }

    fn ticks_per_quarter(&self) -> u64 {
        match self.timing {
            Timing::Metrical(ppqn) => ppqn.as_int().max(1) as u64,
            Timing::Timecode(fps, subframe) => {
                (fps.as_f32() as f64 * subframe as f64 / 2.0).max(1.0) as u64
            }
        }
    }
}

struct RawNote {
    pitch: u8,
    velocity: u8,
    start_tick: u64,
    end_tick: u64,
}

impl MidiParser for MidlyParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedMidi> {
        let smf = Smf::parse(bytes).map_err(|e| RollError::Midi(format!("MIDI parse failed: {e}")))?;

        let mut tempo_changes: Vec<(u64, u32)> = Vec::new();
        let mut raw_notes: Vec<RawNote> = Vec::new();
        let mut last_tick: u64 = 0;

        for (track_idx, track) in smf.tracks.iter().enumerate() {
            let mut abs_ticks: u64 = 0;
            // Overlapping notes on the same key close in the order they opened.
            let mut open: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();

            for ev in track {
                abs_ticks = abs_ticks.saturating_add(ev.delta.as_int() as u64);
                match ev.kind {
                    TrackEventKind::Midi { channel, message } => {
                        let ch = channel.as_int();
                        match message {
                            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                                open.entry((ch, key.as_int()))
                                    .or_default()
                                    .push((abs_ticks, vel.as_int()));
                            }
                            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                                let pitch = key.as_int();
                                if let Some(stack) = open.get_mut(&(ch, pitch))
                                    && !stack.is_empty()
                                {
                                    let (start_tick, velocity) = stack.remove(0);
                                    raw_notes.push(RawNote {
                                        pitch,
                                        velocity,
                                        start_tick,
                                        end_tick: abs_ticks,
                                    });
                                }
                            }
                            _ => {}
                        }
                    }
                    TrackEventKind::Meta(MetaMessage::Tempo(us)) => {
                        tempo_changes.push((abs_ticks, us.as_int()));
                    }
                    _ => {}
                }
            }

            last_tick = last_tick.max(abs_ticks);

            // Notes never switched off end with their track, or a beat later
            // when the track ends right there.
            let mut dangling = 0;
            for ((_, pitch), stack) in open {
                for (start_tick, velocity) in stack {
                    dangling += 1;
                    raw_notes.push(RawNote {
                        pitch,
                        velocity,
                        start_tick,
                        end_tick: abs_ticks,
                    });
                }
            }
            if dangling > 0 {
                log::warn!("track {track_idx}: closed {dangling} notes without note-off");
            }
        }

        let clock = TickClock::new(smf.header.timing, tempo_changes.clone());
        let quarter = clock.ticks_per_quarter();

        let mut notes: Vec<ParsedNote> = raw_notes
            .into_iter()
            .map(|raw| {
                let end_tick = if raw.end_tick > raw.start_tick {
                    raw.end_tick
                } else if raw.end_tick == raw.start_tick && raw.end_tick == last_tick {
                    raw.start_tick + quarter
                } else {
                    raw.end_tick
                };
                let start = clock.seconds(raw.start_tick);
                let end = clock.seconds(end_tick);
                ParsedNote {
                    pitch: raw.pitch,
                    start_seconds: start,
                    duration_seconds: (end - start).max(MIN_NOTE_SECONDS),
                    velocity: raw.velocity as f32 / 127.0,
                }
            })
            .collect();
        notes.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));

        let mut tempo_sorted = tempo_changes;
        tempo_sorted.sort_by_key(|&(tick, _)| tick);
        let tempo_events = tempo_sorted
            .into_iter()
            .filter(|&(_, us)| us > 0)
            .map(|(tick, us)| TempoEvent {
                bpm: 60_000_000.0 / us as f64,
                time_seconds: clock.seconds(tick),
            })
            .collect();

        let notes_end = notes
            .iter()
            .map(|n| n.start_seconds + n.duration_seconds)
            .fold(0.0, f64::max);
        let total_duration_seconds = notes_end.max(clock.seconds(last_tick));

        log::info!(
            "parsed MIDI: {} notes, {} tracks, {:.2}s",
            notes.len(),
            smf.tracks.len(),
            total_duration_seconds
        );

        Ok(ParsedMidi {
            notes,
            tempo_events,
            total_duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use midly::{Format, Header, TrackEvent};

    fn note_on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Midi {
                channel: 0u8.into(),
                message: MidiMessage::NoteOn {
                    key: key.into(),
                    vel: vel.into(),
                },
            },
        }
    }

    fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Midi {
                channel: 0u8.into(),
                message: MidiMessage::NoteOff {
                    key: key.into(),
                    vel: 0u8.into(),
                },
            },
        }
    }

    fn tempo(delta: u32, us: u32) -> TrackEvent<'static> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(us.into())),
        }
    }

    fn end(delta: u32) -> TrackEvent<'static> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        }
    }

    fn encode(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        let format = if tracks.len() > 1 {
            Format::Parallel
        } else {
            Format::SingleTrack
        };
        let mut smf = Smf::new(Header::new(format, Timing::Metrical(480u16.into())));
        smf.tracks = tracks;
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn converts_ticks_with_tempo() {
        let bytes = encode(vec![vec![
            tempo(0, 500_000),
            note_on(0, 60, 127),
            note_off(480, 60),
            note_on(480, 64, 64),
            // zero velocity note-on acts as note-off
            note_on(960, 64, 0),
            end(0),
        ]]);
        let parsed = MidlyParser.parse(&bytes).unwrap();
        assert_eq!(parsed.notes.len(), 2);
        assert_relative_eq!(parsed.notes[0].start_seconds, 0.0);
        assert_relative_eq!(parsed.notes[0].duration_seconds, 0.5);
        assert_relative_eq!(parsed.notes[0].velocity, 1.0);
        assert_relative_eq!(parsed.notes[1].start_seconds, 1.0);
        assert_relative_eq!(parsed.notes[1].duration_seconds, 1.0);
        assert_eq!(parsed.initial_bpm(), Some(120.0));
        assert_relative_eq!(parsed.total_duration_seconds, 2.0);
    }

    #[test]
    fn tempo_change_mid_file_shifts_later_notes() {
        let bytes = encode(vec![
            vec![tempo(0, 500_000), tempo(960, 1_000_000), end(0)],
            vec![note_on(960, 72, 100), note_off(480, 72), end(0)],
        ]);
        let parsed = MidlyParser.parse(&bytes).unwrap();
        assert_relative_eq!(parsed.notes[0].start_seconds, 1.0);
        assert_relative_eq!(parsed.notes[0].duration_seconds, 1.0);
        assert_eq!(parsed.tempo_events.len(), 2);
        assert_relative_eq!(parsed.tempo_events[1].bpm, 60.0);
        assert_relative_eq!(parsed.tempo_events[1].time_seconds, 1.0);
    }

    #[test]
    fn notes_are_sorted_across_tracks() {
        let bytes = encode(vec![
            vec![note_on(960, 60, 90), note_off(480, 60), end(0)],
            vec![note_on(0, 48, 90), note_off(480, 48), end(0)],
        ]);
        let parsed = MidlyParser.parse(&bytes).unwrap();
        let pitches: Vec<u8> = parsed.notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![48, 60]);
    }

    #[test]
    fn dangling_note_ends_with_track() {
        let bytes = encode(vec![vec![note_on(0, 60, 90), end(960)]]);
        let parsed = MidlyParser.parse(&bytes).unwrap();
        assert_eq!(parsed.notes.len(), 1);
        assert_relative_eq!(parsed.notes[0].duration_seconds, 1.0);
    }

    #[test]
    fn garbage_is_a_midi_error() {
        let err = MidlyParser.parse(b"definitely not midi").unwrap_err();
        assert!(matches!(err, RollError::Midi(_)));
    }
}
