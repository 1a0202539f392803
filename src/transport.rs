//! Transport seam and the per-frame playback synchronizer.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::config::WaveformConfig;
use crate::constants::AUTO_SCROLL_MARGIN;
use crate::model::Note;
use crate::time_utils::{TimeMapper, active_pitches};
use crate::waveform::WaveformPeaks;

/// Notifications from an audio transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Ready,
    Error(String),
    Finish,
}

/// Audio playback engine driven by the editor.
///
/// Loading is asynchronous: `load` returns immediately and the outcome
/// arrives later as [`TransportEvent::Ready`] or [`TransportEvent::Error`] on
/// the channel the engine was created with.
pub trait TransportEngine {
    fn load(&mut self, path: &Path);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    /// Jump to `ratio` (0..=1) of the total duration.
    fn seek_to(&mut self, ratio: f64);
    fn set_playback_rate(&mut self, rate: f64);
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn is_playing(&self) -> bool;
    fn waveform(&self) -> Option<Arc<WaveformPeaks>> {
        None
    }
    /// Release the audio device and decoded data. The engine is unusable
    /// afterwards.
    fn destroy(&mut self);
}

pub trait TransportFactory {
    fn create(
        &mut self,
        config: &WaveformConfig,
        events: Sender<TransportEvent>,
    ) -> Box<dyn TransportEngine>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Token for one scheduled frame callback. A handle that no longer matches
/// the pending one belongs to a cancelled callback and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub time: f64,
    pub rescheduled: bool,
}

/// Keeps playhead, scroll window and sounding notes in step with the
/// transport.
#[derive(Debug, Clone)]
pub struct PlaybackSync {
    state: PlaybackState,
    pending_frame: Option<FrameHandle>,
    next_frame: u64,
    current_time: f64,
    playhead_x: f32,
    scroll_left: f32,
    viewport_width: f32,
    auto_scroll_margin: f32,
    active: BTreeSet<u8>,
}

impl Default for PlaybackSync {
    fn default() -> Self {
        Self::new(AUTO_SCROLL_MARGIN)
    }
}

impl PlaybackSync {
    pub fn new(auto_scroll_margin: f32) -> Self {
        Self {
            state: PlaybackState::Stopped,
            pending_frame: None,
            next_frame: 1,
            current_time: 0.0,
            playhead_x: 0.0,
            scroll_left: 0.0,
            viewport_width: 0.0,
            auto_scroll_margin,
            active: BTreeSet::new(),
        }
    }

    fn schedule_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_frame);
        self.next_frame += 1;
        self.pending_frame = Some(handle);
        handle
    }

    pub fn cancel_frame(&mut self) {
        self.pending_frame = None;
    }

    fn reset_position(&mut self) {
        self.current_time = 0.0;
        self.playhead_x = 0.0;
        self.scroll_left = 0.0;
        self.active.clear();
    }

    /// Start or resume. The caller has already checked that audio is ready.
    pub fn play(&mut self, engine: &mut dyn TransportEngine) -> bool {
        if self.state == PlaybackState::Playing {
            return false;
        }
        // Starting from the very beginning: drop whatever a previous run left
        // on screen.
        if engine.current_time() == 0.0 {
            self.reset_position();
        }
        engine.play();
        self.state = PlaybackState::Playing;
        self.schedule_frame();
        log::debug!("playback started at {:.3}s", engine.current_time());
        true
    }

    pub fn pause(&mut self, engine: &mut dyn TransportEngine) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        engine.pause();
        self.cancel_frame();
        self.state = PlaybackState::Paused;
        self.current_time = engine.current_time();
        log::debug!("playback paused at {:.3}s", self.current_time);
        true
    }

    pub fn stop(&mut self, engine: &mut dyn TransportEngine) {
        engine.stop();
        self.cancel_frame();
        self.state = PlaybackState::Stopped;
        self.reset_position();
    }

    /// The transport gave up mid-playback. Keep the position, drop the
    /// frame loop. Returns `false` when nothing was running.
    pub fn interrupt(&mut self, engine: &dyn TransportEngine) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.cancel_frame();
        self.state = PlaybackState::Paused;
        self.current_time = engine.current_time();
        true
    }

    /// End of media. Returns `true` when this ended an active playback, so
    /// the caller announces the end exactly once.
    pub fn finish(&mut self, engine: &mut dyn TransportEngine) -> bool {
        if self.state == PlaybackState::Stopped {
            return false;
        }
        self.stop(engine);
        true
    }

    /// One display refresh: read the transport clock, derive sounding notes,
    /// move the playhead, keep it ahead of the right edge, and reschedule
    /// while the transport is still running.
    pub fn on_frame(
        &mut self,
        handle: FrameHandle,
        engine: &dyn TransportEngine,
        notes: &[Note],
        mapper: TimeMapper,
    ) -> Option<FrameReport> {
        if self.pending_frame != Some(handle) {
            return None;
        }
        self.pending_frame = None;
        if self.state != PlaybackState::Playing {
            return None;
        }

        let time = engine.current_time();
        self.current_time = time;
        self.active = active_pitches(notes, time);
        self.playhead_x = mapper.time_to_x(time);

        if self.viewport_width > 0.0 {
            let right_edge = self.scroll_left + self.viewport_width;
            if self.playhead_x > right_edge - self.auto_scroll_margin {
                self.scroll_left =
                    (self.playhead_x - self.viewport_width + self.auto_scroll_margin).max(0.0);
            }
        }

        let rescheduled = engine.is_playing();
        if rescheduled {
            self.schedule_frame();
        } else {
            // Halted underneath us without an end-of-media notification.
            self.state = PlaybackState::Paused;
            log::debug!("transport halted at {time:.3}s");
        }
        Some(FrameReport { time, rescheduled })
    }

    /// Jump to `time`, updating the display right away instead of on the next
    /// frame.
    pub fn seek(
        &mut self,
        engine: &mut dyn TransportEngine,
        time: f64,
        notes: &[Note],
        mapper: TimeMapper,
    ) -> bool {
        let duration = engine.duration();
        if !(duration > 0.0) {
            return false;
        }
        let ratio = (time / duration).clamp(0.0, 1.0);
        engine.seek_to(ratio);
        self.current_time = ratio * duration;
        self.playhead_x = mapper.time_to_x(self.current_time);
        self.active = active_pitches(notes, self.current_time);
        true
    }

    /// Re-derive sounding notes after the notes or zoom changed.
    pub fn refresh(&mut self, notes: &[Note], mapper: TimeMapper) {
        self.playhead_x = mapper.time_to_x(self.current_time);
        // Stopped at the origin shows nothing; anywhere else follows the notes.
        if self.state != PlaybackState::Stopped || self.current_time > 0.0 {
            self.active = active_pitches(notes, self.current_time);
        }
    }

    pub fn set_viewport_width(&mut self, width: f32) {
        self.viewport_width = width.max(0.0);
    }

    pub fn set_scroll_left(&mut self, x: f32) {
        self.scroll_left = x.max(0.0);
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn playhead_x(&self) -> f32 {
        self.playhead_x
    }

    pub fn scroll_left(&self) -> f32 {
        self.scroll_left
    }

    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    pub fn active(&self) -> &BTreeSet<u8> {
        &self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct ManualClock {
        time: f64,
        duration: f64,
        playing: bool,
        seeks: Vec<f64>,
    }

    impl TransportEngine for ManualClock {
        fn load(&mut self, _path: &Path) {}
        fn play(&mut self) {
            self.playing = true;
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn stop(&mut self) {
            self.playing = false;
            self.time = 0.0;
        }
        fn seek_to(&mut self, ratio: f64) {
            self.seeks.push(ratio);
            self.time = ratio * self.duration;
        }
        fn set_playback_rate(&mut self, _rate: f64) {}
        fn current_time(&self) -> f64 {
            self.time
        }
        fn duration(&self) -> f64 {
            self.duration
        }
        fn is_playing(&self) -> bool {
            self.playing
        }
        fn destroy(&mut self) {}
    }

    fn clock(duration: f64) -> ManualClock {
        ManualClock {
            duration,
            ..Default::default()
        }
    }

    #[test]
    fn frame_updates_playhead_and_active_notes() {
        let notes = [Note::new(60, 2.0, 1.0), Note::new(64, 2.5, 1.0)];
        let mut engine = clock(10.0);
        let mut sync = PlaybackSync::default();
        sync.set_viewport_width(1000.0);
        assert!(sync.play(&mut engine));

        engine.time = 2.75;
        let handle = sync.pending_frame().unwrap();
        let report = sync.on_frame(handle, &engine, &notes, TimeMapper::new(100.0)).unwrap();
        assert!(report.rescheduled);
        assert_eq!(sync.playhead_x(), 275.0);
        assert_eq!(sync.active().iter().copied().collect::<Vec<_>>(), vec![60, 64]);
    }

    #[test]
    fn stale_handles_are_ignored() {
        let mut engine = clock(10.0);
        let mut sync = PlaybackSync::default();
        sync.play(&mut engine);
        let handle = sync.pending_frame().unwrap();
        sync.pause(&mut engine);
        assert_eq!(sync.pending_frame(), None);
        engine.time = 3.0;
        assert!(sync.on_frame(handle, &engine, &[], TimeMapper::new(100.0)).is_none());
        assert_eq!(sync.playhead_x(), 0.0);
    }

    #[test]
    fn auto_scroll_keeps_margin_to_right_edge() {
        let mut engine = clock(60.0);
        let mut sync = PlaybackSync::new(200.0);
        sync.set_viewport_width(800.0);
        sync.play(&mut engine);

        engine.time = 5.0;
        let h = sync.pending_frame().unwrap();
        sync.on_frame(h, &engine, &[], TimeMapper::new(100.0));
        assert_eq!(sync.scroll_left(), 0.0);

        engine.time = 7.0;
        let h = sync.pending_frame().unwrap();
        sync.on_frame(h, &engine, &[], TimeMapper::new(100.0));
        assert_eq!(sync.scroll_left(), 100.0);
        assert_eq!(sync.playhead_x() - sync.scroll_left(), 600.0);
    }

    #[test]
    fn loop_stops_rescheduling_when_transport_stops() {
        let mut engine = clock(10.0);
        let mut sync = PlaybackSync::default();
        sync.play(&mut engine);
        engine.playing = false;
        engine.time = 10.0;
        let h = sync.pending_frame().unwrap();
        let report = sync.on_frame(h, &engine, &[], TimeMapper::new(100.0)).unwrap();
        assert!(!report.rescheduled);
        assert_eq!(sync.pending_frame(), None);
        assert_eq!(sync.state(), PlaybackState::Paused);
        assert!(sync.finish(&mut engine));
        assert!(!sync.finish(&mut engine));
    }

    #[test]
    fn resume_keeps_position_and_restart_resets() {
        let notes = [Note::new(60, 0.0, 5.0)];
        let mut engine = clock(10.0);
        let mut sync = PlaybackSync::default();
        sync.set_viewport_width(100.0);
        sync.play(&mut engine);
        engine.time = 4.0;
        let h = sync.pending_frame().unwrap();
        sync.on_frame(h, &engine, &notes, TimeMapper::new(100.0));
        sync.pause(&mut engine);
        let scroll = sync.scroll_left();
        assert!(scroll > 0.0);

        sync.play(&mut engine);
        assert_eq!(sync.scroll_left(), scroll);
        assert_eq!(sync.current_time(), 4.0);

        sync.stop(&mut engine);
        assert_eq!(sync.state(), PlaybackState::Stopped);
        assert_eq!(sync.scroll_left(), 0.0);
        assert!(sync.active().is_empty());
    }

    #[test]
    fn seek_clamps_ratio_and_updates_immediately() {
        let notes = [Note::new(67, 1.0, 1.0)];
        let mut engine = clock(4.0);
        let mut sync = PlaybackSync::default();
        assert!(sync.seek(&mut engine, 1.5, &notes, TimeMapper::new(50.0)));
        assert_eq!(engine.seeks, vec![0.375]);
        assert_eq!(sync.current_time(), 1.5);
        assert_eq!(sync.playhead_x(), 75.0);
        assert!(sync.active().contains(&67));

        sync.seek(&mut engine, 99.0, &notes, TimeMapper::new(50.0));
        assert_eq!(engine.seeks.last(), Some(&1.0));
        assert_eq!(sync.current_time(), 4.0);

        let mut silent = clock(0.0);
        assert!(!sync.seek(&mut silent, 1.0, &notes, TimeMapper::new(50.0)));
    }

    #[test]
    fn refresh_after_stopped_seek_tracks_edits() {
        let notes = vec![Note::new(60, 1.0, 0.5)];
        let mut engine = clock(10.0);
        let mut sync = PlaybackSync::default();
        sync.seek(&mut engine, 1.2, &notes, TimeMapper::new(100.0));
        assert_eq!(sync.state(), PlaybackState::Stopped);
        assert!(sync.active().contains(&60));

        sync.refresh(&[], TimeMapper::new(100.0));
        assert!(sync.active().is_empty());

        sync.refresh(&notes, TimeMapper::new(100.0));
        assert!(sync.active().contains(&60));
    }

    #[test]
    fn refresh_at_origin_while_stopped_stays_empty() {
        let notes = [Note::new(60, 0.0, 1.0)];
        let mut sync = PlaybackSync::default();
        sync.refresh(&notes, TimeMapper::new(100.0));
        assert!(sync.active().is_empty());
    }

    #[test]
    fn interrupt_keeps_position_and_drops_the_loop() {
        let mut engine = clock(10.0);
        let mut sync = PlaybackSync::default();
        assert!(!sync.interrupt(&engine));
        sync.play(&mut engine);
        engine.playing = false;
        engine.time = 3.0;

        assert!(sync.interrupt(&engine));
        assert_eq!(sync.state(), PlaybackState::Paused);
        assert_eq!(sync.pending_frame(), None);
        assert_eq!(sync.current_time(), 3.0);
        assert!(!sync.interrupt(&engine));
    }
}
