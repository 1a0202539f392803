//! The editing session: notes, grid, selection and transport kept in step.
//!
//! Everything runs on the UI thread. The host forwards pointer and keyboard
//! input, calls [`EditorSession::dispatch_transport_events`] and
//! [`EditorSession::on_frame`] once per repaint, and listens for
//! [`SessionEvent`]s.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use egui::Pos2;

use crate::config::Config;
use crate::constants::{
    MAX_PIXELS_PER_SECOND, MAX_PLAYBACK_RATE, MIN_PIXELS_PER_SECOND, MIN_PLAYBACK_RATE,
    ZOOM_FACTOR,
};
use crate::edit_actions::{Direction, EditProcessor};
use crate::error::{Result, RollError};
use crate::input::actions::EditorAction;
use crate::messages::SessionEvent;
use crate::midi_import::{MidiParser, MidlyParser, ParsedMidi};
use crate::model::note::sort_by_start;
use crate::model::{GridParams, Note, Subdivision};
use crate::musicxml;
use crate::notation::NotationEngraver;
use crate::note_store::NoteStore;
use crate::project::Project;
use crate::selection::{PointerGesture, PointerModifiers, PointerOutcome, Selection};
use crate::tap_tempo::TapTempo;
use crate::time_utils::{GridLine, PitchRange, RollLayout, TimeMapper, grid_lines};
use crate::transport::{
    FrameHandle, FrameReport, PlaybackState, PlaybackSync, TransportEngine, TransportEvent,
    TransportFactory,
};
use crate::waveform::WaveformPeaks;

pub struct EditorSession {
    config: Config,
    store: NoteStore,
    grid: GridParams,
    selection: Selection,
    gesture: PointerGesture,
    sync: PlaybackSync,
    pixels_per_second: f32,
    roll_height: f32,
    playback_speed: f64,

    factory: Box<dyn TransportFactory>,
    engine: Option<Box<dyn TransportEngine>>,
    transport_tx: Sender<TransportEvent>,
    transport_rx: Receiver<TransportEvent>,
    loading: bool,
    audio_ready: bool,
    audio_path: Option<PathBuf>,
    midi_path: Option<PathBuf>,

    parser: Box<dyn MidiParser>,
    notation: Box<dyn NotationEngraver>,
    events: Option<Sender<SessionEvent>>,
    last_published: BTreeSet<u8>,

    tap: TapTempo,
    started: Instant,
}

impl EditorSession {
    pub fn new(
        config: Config,
        factory: Box<dyn TransportFactory>,
        notation: Box<dyn NotationEngraver>,
    ) -> Self {
        let (transport_tx, transport_rx) = crossbeam_channel::unbounded();
        let grid = GridParams::new(
            config.editor.default_tempo,
            0.0,
            config.editor.default_subdivision,
        );
        Self {
            store: NoteStore::with_limit(config.editor.history_limit.max(1)),
            grid,
            selection: Selection::new(),
            gesture: PointerGesture::default(),
            sync: PlaybackSync::new(config.view.auto_scroll_margin),
            pixels_per_second: clamp_zoom(config.view.pixels_per_second),
            roll_height: 0.0,
            playback_speed: config
                .editor
                .playback_speed
                .clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE),
            factory,
            engine: None,
            transport_tx,
            transport_rx,
            loading: false,
            audio_ready: false,
            audio_path: None,
            midi_path: None,
            parser: Box::new(MidlyParser),
            notation,
            events: None,
            last_published: BTreeSet::new(),
            tap: TapTempo::new(),
            started: Instant::now(),
            config,
        }
    }

    /// Register the listener for [`SessionEvent`]s. Keyboard edits stay
    /// disabled until one is present.
    pub fn with_events(mut self, events: Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_parser(mut self, parser: Box<dyn MidiParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn set_event_sender(&mut self, events: Option<Sender<SessionEvent>>) {
        self.events = events;
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn mapper(&self) -> TimeMapper {
        TimeMapper::new(self.pixels_per_second)
    }

    // ---- loading ----

    /// Replace the notes with the contents of a standard MIDI file. A file
    /// that fails to parse leaves the session exactly as it was.
    pub fn load_midi(&mut self, bytes: &[u8]) -> Result<usize> {
        let parsed = match self.parser.parse(bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("MIDI load failed: {e}");
                self.emit(SessionEvent::Error(e.to_string()));
                return Err(e);
            }
        };
        Ok(self.apply_parsed_midi(parsed))
    }

    pub fn load_midi_file(&mut self, path: &Path) -> Result<usize> {
        let bytes = std::fs::read(path).map_err(|e| {
            let err = RollError::File(format!("{}: {e}", path.display()));
            self.emit(SessionEvent::Error(err.to_string()));
            err
        })?;
        let count = self.load_midi(&bytes)?;
        self.midi_path = Some(path.to_path_buf());
        Ok(count)
    }

    fn apply_parsed_midi(&mut self, parsed: ParsedMidi) -> usize {
        let mut notes: Vec<Note> = parsed
            .notes
            .iter()
            .filter(|n| n.duration_seconds > 0.0)
            .map(|n| {
                Note::new(n.pitch, n.start_seconds, n.duration_seconds)
                    .with_velocity((n.velocity.clamp(0.0, 1.0) * 127.0).round() as u8)
            })
            .collect();
        sort_by_start(&mut notes);
        let count = notes.len();

        self.store.load(notes);
        self.selection.clear();
        self.gesture.cancel();

        if let Some(bpm) = parsed.initial_bpm() {
            self.set_tempo(bpm);
        }

        log::info!(
            "loaded {} notes ({:.2}s)",
            count,
            parsed.total_duration_seconds
        );
        self.notes_changed();
        count
    }

    /// Start loading an audio file. The previous transport is torn down
    /// first; the new one reports back through [`TransportEvent`]s.
    pub fn load_audio(&mut self, path: &Path) {
        if let Some(mut old) = self.engine.take() {
            self.sync.stop(old.as_mut());
            old.destroy();
        }
        self.sync.cancel_frame();
        // Whatever the old engine still had in flight is meaningless now.
        while self.transport_rx.try_recv().is_ok() {}

        let mut waveform = self.config.waveform.clone();
        waveform.samples_per_pixel = self.pixels_per_second;
        let mut engine = self.factory.create(&waveform, self.transport_tx.clone());
        engine.set_playback_rate(self.playback_speed);
        engine.load(path);

        self.engine = Some(engine);
        self.loading = true;
        self.audio_ready = false;
        self.audio_path = Some(path.to_path_buf());
        self.publish_active_if_changed();
        log::info!("loading audio {}", path.display());
    }

    /// Drain pending transport notifications. Call once per repaint.
    pub fn dispatch_transport_events(&mut self) {
        while let Ok(event) = self.transport_rx.try_recv() {
            self.on_transport_event(event);
        }
    }

    pub fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Ready => {
                self.loading = false;
                self.audio_ready = self.engine.is_some();
                let duration = self.duration_of_audio();
                log::info!("audio ready ({duration:.2}s)");
                self.emit(SessionEvent::AudioReady { duration });
            }
            TransportEvent::Error(msg) => {
                // A failed load leaves nothing to play; a failed playback
                // keeps the decoded audio for another try.
                if self.loading {
                    self.audio_ready = false;
                }
                self.loading = false;
                if let Some(engine) = self.engine.as_deref() {
                    self.sync.interrupt(engine);
                }
                log::warn!("audio failed: {msg}");
                self.emit(SessionEvent::Error(msg));
            }
            TransportEvent::Finish => {
                let Some(engine) = self.engine.as_mut() else {
                    return;
                };
                if self.sync.finish(engine.as_mut()) {
                    log::info!("playback finished");
                    self.publish_active_if_changed();
                    self.emit(SessionEvent::PlaybackEnded);
                }
            }
        }
    }

    // ---- transport ----

    /// Audio decoded, nothing loading, and something to look at.
    pub fn can_play(&self) -> bool {
        self.engine.is_some() && self.audio_ready && !self.loading && !self.store.is_empty()
    }

    pub fn play(&mut self) -> bool {
        if !self.can_play() {
            return false;
        }
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };
        let started = self.sync.play(engine.as_mut());
        self.publish_active_if_changed();
        started
    }

    pub fn pause(&mut self) -> bool {
        match self.engine.as_mut() {
            Some(engine) => self.sync.pause(engine.as_mut()),
            None => false,
        }
    }

    pub fn stop(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            self.sync.stop(engine.as_mut());
        } else {
            self.sync.cancel_frame();
        }
        self.publish_active_if_changed();
    }

    pub fn toggle_playback(&mut self) -> bool {
        if self.sync.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn set_playback_speed(&mut self, rate: f64) {
        let rate = if rate.is_finite() { rate } else { 1.0 };
        self.playback_speed = rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);
        if let Some(engine) = self.engine.as_mut() {
            engine.set_playback_rate(self.playback_speed);
        }
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.sync.pending_frame()
    }

    /// Run the frame callback for `handle`. Stale handles are ignored.
    pub fn on_frame(&mut self, handle: FrameHandle) -> Option<FrameReport> {
        let mapper = self.mapper();
        let engine = self.engine.as_deref()?;
        let report = self.sync.on_frame(handle, engine, self.store.notes(), mapper);
        if report.is_some() {
            self.publish_active_if_changed();
        }
        report
    }

    /// Run whatever frame callback is pending.
    pub fn tick(&mut self) -> Option<FrameReport> {
        let handle = self.pending_frame()?;
        self.on_frame(handle)
    }

    pub fn seek(&mut self, time: f64) -> bool {
        let mapper = self.mapper();
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };
        if !self.audio_ready {
            return false;
        }
        let moved = self.sync.seek(engine.as_mut(), time, self.store.notes(), mapper);
        if moved {
            self.publish_active_if_changed();
        }
        moved
    }

    /// Size of the visible roll area, in pixels.
    pub fn set_view(&mut self, viewport_width: f32, roll_height: f32) {
        self.sync.set_viewport_width(viewport_width);
        self.roll_height = roll_height.max(0.0);
    }

    pub fn scroll_by(&mut self, dx: f32) {
        let max_scroll = (self.mapper().time_to_x(self.duration()) - self.sync.viewport_width()).max(0.0);
        let next = (self.sync.scroll_left() + dx).clamp(0.0, max_scroll);
        self.sync.set_scroll_left(next);
    }

    /// Tear everything down before the window goes away.
    pub fn teardown(&mut self) {
        self.sync.cancel_frame();
        if let Some(mut engine) = self.engine.take() {
            self.sync.stop(engine.as_mut());
            engine.destroy();
        }
        self.loading = false;
        self.audio_ready = false;
        self.notation.clear();
        self.last_published.clear();
        log::info!("session torn down");
    }

    // ---- grid & view ----

    pub fn set_zoom(&mut self, pixels_per_second: f32) {
        let next = clamp_zoom(pixels_per_second);
        let ratio = next / self.pixels_per_second;
        self.pixels_per_second = next;
        self.sync.set_scroll_left(self.sync.scroll_left() * ratio);
        let mapper = self.mapper();
        self.sync.refresh(self.store.notes(), mapper);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.pixels_per_second * ZOOM_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.pixels_per_second / ZOOM_FACTOR);
    }

    /// Set the tempo, clamped to 1..=300 BPM. Returns the value applied.
    pub fn set_tempo(&mut self, bpm: f64) -> f64 {
        self.grid.set_tempo(bpm);
        self.emit(SessionEvent::TempoChanged(self.grid.tempo));
        self.grid.tempo
    }

    pub fn set_offset(&mut self, seconds: f64) {
        self.grid.set_offset(seconds);
        self.emit(SessionEvent::OffsetChanged(self.grid.offset));
    }

    pub fn set_subdivision(&mut self, subdivision: Subdivision) {
        self.grid.subdivision = subdivision;
    }

    /// Register a tap at `now_ms` and adopt the tapped tempo once there is one.
    pub fn tap_tempo(&mut self, now_ms: f64) -> Option<f64> {
        let bpm = self.tap.tap(now_ms)?;
        Some(self.set_tempo(bpm))
    }

    // ---- pointer ----

    /// Press on the roll at `pos`, in roll content coordinates.
    pub fn pointer_down(&mut self, pos: Pos2, modifiers: PointerModifiers) {
        let layout = self.layout();
        let outcome = self
            .gesture
            .press(self.store.notes(), &layout, pos, modifiers);
        self.apply_pointer_outcome(outcome);
    }

    pub fn pointer_drag(&mut self, pos: Pos2) {
        self.gesture.drag(pos);
    }

    pub fn pointer_up(&mut self, pos: Pos2) {
        let layout = self.layout();
        let outcome = self.gesture.release(self.store.notes(), &layout, pos);
        self.apply_pointer_outcome(outcome);
    }

    fn apply_pointer_outcome(&mut self, outcome: PointerOutcome) {
        let notes = self.store.notes();
        match outcome {
            PointerOutcome::None => {}
            PointerOutcome::SetDownbeat(idx) => {
                if let Some(start) = notes.get(idx).map(|n| n.start_time) {
                    self.set_offset(start);
                }
            }
            PointerOutcome::SelectOnly(idx) => {
                if let Some(id) = notes.get(idx).map(|n| n.id) {
                    self.selection.select_only(id);
                }
            }
            PointerOutcome::Toggle(idx) => {
                if let Some(id) = notes.get(idx).map(|n| n.id) {
                    self.selection.toggle(id);
                }
            }
            PointerOutcome::BoxSelect(indices) => {
                self.selection.select_indices(notes, &indices);
            }
            PointerOutcome::Seek(time) => {
                self.selection.clear();
                self.seek(time);
            }
        }
    }

    // ---- editing ----

    /// Run a keyboard action. Returns whether anything happened.
    ///
    /// Note edits need a selection and an attached event listener; select-all
    /// and escape always work. File actions need a path and are left to the
    /// host.
    pub fn perform(&mut self, action: EditorAction) -> bool {
        if action.edits_selection() && (self.selection.is_empty() || self.events.is_none()) {
            return false;
        }
        match action {
            EditorAction::PlayPause => self.toggle_playback(),
            EditorAction::Stop => {
                self.stop();
                true
            }
            EditorAction::TapTempo => {
                let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
                self.tap_tempo(now_ms).is_some()
            }
            EditorAction::Undo => self.undo(),
            EditorAction::Redo => self.redo(),
            EditorAction::Quantize => self.quantize_selected(),
            EditorAction::NudgeLeft => self.nudge_selected_time(Direction::Backward),
            EditorAction::NudgeRight => self.nudge_selected_time(Direction::Forward),
            EditorAction::NudgeUp => self.nudge_selected_pitch(1),
            EditorAction::NudgeDown => self.nudge_selected_pitch(-1),
            EditorAction::Delete => self.delete_selected(),
            EditorAction::SelectAll => {
                self.select_all();
                true
            }
            EditorAction::Escape => {
                self.gesture.cancel();
                self.clear_selection();
                true
            }
            EditorAction::ZoomIn => {
                self.zoom_in();
                true
            }
            EditorAction::ZoomOut => {
                self.zoom_out();
                true
            }
            EditorAction::OpenProject
            | EditorAction::SaveProject
            | EditorAction::ExportMusicXml => false,
        }
    }

    fn commit(&mut self, edited: Option<Vec<Note>>) -> bool {
        let Some(notes) = edited else {
            return false;
        };
        if !self.store.commit(notes) {
            return false;
        }
        self.notes_changed();
        true
    }

    pub fn quantize_selected(&mut self) -> bool {
        let edited = EditProcessor::quantize(self.store.notes(), &self.selection, &self.grid);
        self.commit(edited)
    }

    pub fn nudge_selected_time(&mut self, direction: Direction) -> bool {
        let edited =
            EditProcessor::nudge_time(self.store.notes(), &self.selection, &self.grid, direction);
        self.commit(edited)
    }

    pub fn nudge_selected_pitch(&mut self, semitones: i32) -> bool {
        let range = PitchRange::from_notes(self.store.notes());
        let edited =
            EditProcessor::nudge_pitch(self.store.notes(), &self.selection, range, semitones);
        self.commit(edited)
    }

    pub fn delete_selected(&mut self) -> bool {
        let edited = EditProcessor::delete(self.store.notes(), &self.selection);
        let changed = self.commit(edited);
        self.selection.clear();
        changed
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(self.store.notes());
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn undo(&mut self) -> bool {
        if !self.store.undo() {
            return false;
        }
        self.notes_changed();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.store.redo() {
            return false;
        }
        self.notes_changed();
        true
    }

    fn notes_changed(&mut self) {
        self.selection.retain_existing(self.store.notes());
        let mapper = self.mapper();
        self.sync.refresh(self.store.notes(), mapper);
        log::debug!(
            "notes changed: {} notes, history {}/{}",
            self.store.len(),
            self.store.history().cursor() + 1,
            self.store.history().len()
        );
        self.emit(SessionEvent::NotesChanged(self.store.notes().to_vec()));
        self.publish_active_if_changed();
    }

    /// Push the sounding pitches to the engraver and the listener when they
    /// differ from what was last published.
    pub fn publish_active_if_changed(&mut self) {
        let active = self.sync.active();
        if *active == self.last_published {
            return;
        }
        self.last_published = active.clone();
        self.notation.render(&self.last_published);
        self.emit(SessionEvent::ActivePitches(self.last_published.clone()));
    }

    // ---- export & projects ----

    pub fn export_musicxml(&self) -> String {
        musicxml::export(self.store.notes(), &self.grid)
    }

    pub fn export_musicxml_to(&self, path: &Path) -> Result<()> {
        musicxml::export_to_file(self.store.notes(), &self.grid, path)?;
        Ok(())
    }

    pub fn to_project(&self, name: &str) -> Project {
        let mut project = Project::new(name, self.store.notes().to_vec(), self.grid);
        project.pixels_per_second = self.pixels_per_second;
        project.audio_path = self.audio_path.clone();
        project.midi_path = self.midi_path.clone();
        project
    }

    pub fn save_project(&self, path: &Path) -> Result<()> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled");
        self.to_project(name).save(path)?;
        Ok(())
    }

    /// Restore a saved session; the referenced audio is reloaded when it is
    /// still on disk.
    pub fn load_project(&mut self, path: &Path) -> Result<()> {
        let project = Project::load(path).map_err(|e| {
            self.emit(SessionEvent::Error(e.to_string()));
            RollError::File(e.to_string())
        })?;

        self.store.load(project.notes);
        self.selection.clear();
        self.gesture.cancel();
        self.grid.subdivision = project.grid.subdivision;
        self.set_tempo(project.grid.tempo);
        self.set_offset(project.grid.offset);
        self.set_zoom(project.pixels_per_second);
        self.midi_path = project.midi_path;
        self.notes_changed();

        match project.audio_path {
            Some(audio) if audio.exists() => self.load_audio(&audio),
            Some(audio) => {
                log::warn!("project audio {} is missing", audio.display());
                self.audio_path = Some(audio);
            }
            None => {}
        }
        Ok(())
    }

    // ---- read-only views ----

    pub fn notes(&self) -> &[Note] {
        self.store.notes()
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_box(&self) -> Option<egui::Rect> {
        self.gesture.selection_box()
    }

    pub fn grid(&self) -> &GridParams {
        &self.grid
    }

    /// Geometry for this render pass.
    pub fn layout(&self) -> RollLayout {
        RollLayout::compute(self.store.notes(), self.pixels_per_second, self.roll_height)
    }

    /// Grid lines between `from` and `to` seconds.
    pub fn grid_lines(&self, from: f64, to: f64) -> Vec<GridLine> {
        grid_lines(&self.grid, self.duration(), from, to)
    }

    fn duration_of_audio(&self) -> f64 {
        self.engine.as_ref().map(|e| e.duration()).unwrap_or(0.0)
    }

    /// Longer of the audio and the notes.
    pub fn duration(&self) -> f64 {
        self.duration_of_audio().max(self.store.end_time())
    }

    pub fn waveform(&self) -> Option<Arc<WaveformPeaks>> {
        self.engine.as_ref().and_then(|e| e.waveform())
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.sync.state()
    }

    pub fn is_playing(&self) -> bool {
        self.sync.is_playing()
    }

    pub fn current_time(&self) -> f64 {
        self.sync.current_time()
    }

    pub fn playhead_x(&self) -> f32 {
        self.sync.playhead_x()
    }

    pub fn scroll_left(&self) -> f32 {
        self.sync.scroll_left()
    }

    pub fn active_pitches(&self) -> &BTreeSet<u8> {
        self.sync.active()
    }

    pub fn pixels_per_second(&self) -> f32 {
        self.pixels_per_second
    }

    pub fn playback_speed(&self) -> f64 {
        self.playback_speed
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn audio_ready(&self) -> bool {
        self.audio_ready
    }

    pub fn audio_path(&self) -> Option<&Path> {
        self.audio_path.as_deref()
    }

    pub fn midi_path(&self) -> Option<&Path> {
        self.midi_path.as_deref()
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the stored settings. Only paths and view preferences take
    /// effect on a live session.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }
}

fn clamp_zoom(pixels_per_second: f32) -> f32 {
    if pixels_per_second.is_finite() {
        pixels_per_second.clamp(MIN_PIXELS_PER_SECOND, MAX_PIXELS_PER_SECOND)
    } else {
        MIN_PIXELS_PER_SECOND
    }
}
