use super::dialogs::{FileDialogs, FileRequest, MessageBox, has_extension, remember_dir};
use super::piano_roll::PianoRollView;
use super::staff::draw_grand_staff;
use super::transport::TransportBar;
use super::waveform::draw_waveform;
use crate::config::Config;
use crate::constants::{AUDIO_EXTENSIONS, MIDI_EXTENSIONS, PROJECT_EXTENSION};
use crate::input::InputManager;
use crate::input::actions::EditorAction;
use crate::messages::SessionEvent;
use crate::notation::Engraving;
use crate::project::with_project_extension;
use crate::session::EditorSession;
use crossbeam_channel::Receiver;
use eframe::egui;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

pub struct RollsyncApp {
    session: EditorSession,
    events_rx: Receiver<SessionEvent>,
    engraving: Rc<RefCell<Engraving>>,
    input: InputManager,

    transport_ui: TransportBar,
    piano_roll: PianoRollView,
    dialogs: FileDialogs,
    message_box: Option<MessageBox>,

    project_path: Option<PathBuf>,
    status: String,
    closing: bool,
}

impl RollsyncApp {
    pub fn new(
        session: EditorSession,
        events_rx: Receiver<SessionEvent>,
        engraving: Rc<RefCell<Engraving>>,
        input: InputManager,
    ) -> Self {
        Self {
            session,
            events_rx,
            engraving,
            input,
            transport_ui: TransportBar::new(),
            piano_roll: PianoRollView::new(),
            dialogs: FileDialogs::new(),
            message_box: None,
            project_path: None,
            status: String::from("Open a MIDI file and its audio to begin"),
            closing: false,
        }
    }

    /// Route a file by its extension: MIDI, audio or project.
    pub fn open_file_from_path(&mut self, path: &Path) {
        if has_extension(path, MIDI_EXTENSIONS) {
            self.handle_file(FileRequest::OpenMidi, path.to_path_buf());
        } else if has_extension(path, AUDIO_EXTENSIONS) {
            self.handle_file(FileRequest::OpenAudio, path.to_path_buf());
        } else if has_extension(path, &[PROJECT_EXTENSION]) {
            self.handle_file(FileRequest::OpenProject, path.to_path_buf());
        } else {
            self.show_message(format!("Unsupported file: {}", path.display()));
        }
    }

    fn handle_file(&mut self, request: FileRequest, path: PathBuf) {
        let mut paths = self.session.config().paths.clone();
        remember_dir(&mut paths, request, &path);
        self.update_paths(paths);

        match request {
            FileRequest::OpenMidi => {
                if let Ok(count) = self.session.load_midi_file(&path) {
                    self.status = format!("{count} notes from {}", path.display());
                }
            }
            FileRequest::OpenAudio => {
                self.session.load_audio(&path);
                self.status = format!("Loading {}", path.display());
            }
            FileRequest::OpenProject => {
                if self.session.load_project(&path).is_ok() {
                    self.status = format!("Opened {}", path.display());
                    self.project_path = Some(path);
                }
            }
            FileRequest::SaveProject => {
                let path = with_project_extension(&path);
                match self.session.save_project(&path) {
                    Ok(()) => {
                        self.status = format!("Saved {}", path.display());
                        self.project_path = Some(path);
                    }
                    Err(e) => self.show_message(format!("Could not save project: {e}")),
                }
            }
            FileRequest::ExportMusicXml => {
                let path = path.with_extension("musicxml");
                match self.session.export_musicxml_to(&path) {
                    Ok(()) => self.status = format!("Exported {}", path.display()),
                    Err(e) => self.show_message(format!("Export failed: {e}")),
                }
            }
        }
    }

    fn update_paths(&mut self, paths: crate::config::PathConfig) {
        if paths == self.session.config().paths {
            return;
        }
        let mut config: Config = self.session.config().clone();
        config.paths = paths;
        if let Err(e) = config.save() {
            log::warn!("could not save config: {e}");
        }
        self.session.set_config(config);
    }

    fn request_file(&mut self, request: FileRequest) {
        let default_name = self
            .project_path
            .as_deref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled")
            .to_string();
        let paths = self.session.config().paths.clone();
        self.dialogs.open(request, &paths, &default_name);
    }

    fn show_message(&mut self, message: String) {
        log::warn!("{message}");
        self.message_box = Some(MessageBox::new(message));
    }

    fn process_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::AudioReady { duration } => {
                self.status = format!("Audio ready ({duration:.1}s)");
            }
            SessionEvent::PlaybackEnded => {
                self.status = String::from("Playback finished");
            }
            SessionEvent::Error(msg) => self.show_message(msg),
            SessionEvent::TempoChanged(bpm) => log::debug!("tempo {bpm:.1}"),
            SessionEvent::OffsetChanged(offset) => log::debug!("downbeat at {offset:.3}s"),
            SessionEvent::NotesChanged(_) | SessionEvent::ActivePitches(_) => {}
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        for action in self.input.poll_actions(ctx) {
            match action {
                EditorAction::OpenProject => self.request_file(FileRequest::OpenProject),
                EditorAction::SaveProject => match self.project_path.clone() {
                    Some(path) => self.handle_file(FileRequest::SaveProject, path),
                    None => self.request_file(FileRequest::SaveProject),
                },
                EditorAction::ExportMusicXml => self.request_file(FileRequest::ExportMusicXml),
                other => {
                    self.session.perform(other);
                }
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        for path in dropped {
            self.open_file_from_path(&path);
        }
    }

    fn show_main_panels(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let active = self.session.active_pitches();
                    if !active.is_empty() {
                        let names: Vec<String> = active.iter().map(|&p| pitch_name(p)).collect();
                        ui.monospace(names.join(" "));
                    }
                });
            });
        });

        let staff_height = self.session.config().view.staff_height;
        egui::TopBottomPanel::bottom("staff_panel")
            .resizable(true)
            .default_height(staff_height)
            .show(ctx, |ui| {
                let engraving = self.engraving.borrow();
                draw_grand_staff(ui, &engraving);
            });

        let wave_height = self.session.config().waveform.height_px;
        egui::TopBottomPanel::top("waveform_panel")
            .exact_height(wave_height)
            .show(ctx, |ui| {
                let rect = ui.available_rect_before_wrap();
                let show_keyboard = self.session.config().view.show_keyboard;
                let key_width = if show_keyboard {
                    crate::constants::PIANO_KEY_WIDTH
                } else {
                    0.0
                };
                let wave_rect = egui::Rect::from_min_max(rect.min + egui::vec2(key_width, 0.0), rect.max);
                let peaks = self.session.waveform();
                draw_waveform(
                    &ui.painter_at(wave_rect),
                    wave_rect,
                    peaks.as_deref(),
                    &self.session.config().waveform,
                    self.session.pixels_per_second(),
                    self.session.scroll_left(),
                    self.session.playhead_x(),
                );
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let show_keyboard = self.session.config().view.show_keyboard;
            self.piano_roll.show(ui, &mut self.session, show_keyboard);
        });
    }
}

fn pitch_name(pitch: u8) -> String {
    let spelling = crate::notation::Spelling::of(pitch);
    format!(
        "{}{}{}",
        spelling.step_name(),
        if spelling.sharp { "#" } else { "" },
        spelling.octave
    )
}

impl eframe::App for RollsyncApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.closing {
            return;
        }
        if ctx.input(|i| i.viewport().close_requested()) {
            self.closing = true;
            self.session.teardown();
            if let Err(e) = self.session.config().save() {
                log::warn!("could not save config: {e}");
            }
            return;
        }

        // Transport notifications, then session events they produced
        self.session.dispatch_transport_events();
        while let Ok(event) = self.events_rx.try_recv() {
            self.process_session_event(event);
        }

        self.handle_dropped_files(ctx);
        self.handle_shortcuts(ctx);

        if let Some(request) =
            self.transport_ui
                .show(ctx, &mut self.session, self.input.shortcuts())
        {
            self.request_file(request);
        }
        if let Some((request, path)) = self.dialogs.update(ctx) {
            self.handle_file(request, path);
        }

        // One frame callback per repaint while playing
        self.session.tick();
        self.show_main_panels(ctx);

        if let Some(mut message) = self.message_box.take() {
            message.show(ctx);
            if !message.is_closed() {
                self.message_box = Some(message);
            }
        }

        while let Ok(event) = self.events_rx.try_recv() {
            self.process_session_event(event);
        }

        if self.session.is_playing() {
            ctx.request_repaint();
        } else if self.session.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_names_use_sharps() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(61), "C#4");
        assert_eq!(pitch_name(21), "A0");
    }
}
