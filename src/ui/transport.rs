use super::dialogs::FileRequest;
use crate::constants::{MAX_BPM, MAX_PLAYBACK_RATE, MIN_BPM, MIN_PLAYBACK_RATE};
use crate::input::actions::EditorAction;
use crate::input::shortcuts::ShortcutRegistry;
use crate::model::Subdivision;
use crate::session::EditorSession;
use crate::time_utils::{format_bar_beat, format_minutes_seconds};
use eframe::egui;

const SPEEDS: [f64; 7] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// Toolbar above the waveform: files, transport, tempo grid, view and edit.
#[derive(Default)]
pub struct TransportBar;

impl TransportBar {
    pub fn new() -> Self {
        Self
    }

    /// Draw the bar. File buttons are returned for the host to open a dialog.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        session: &mut EditorSession,
        keys: &ShortcutRegistry,
    ) -> Option<FileRequest> {
        let mut request = None;
        egui::TopBottomPanel::top("transport_panel").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                request = self.draw_file_buttons(ui);
                ui.separator();
                self.draw_transport_controls(ui, session, keys);
                ui.separator();
                self.draw_time_display(ui, session);
                ui.separator();
                self.draw_tempo_controls(ui, session, keys);
                ui.separator();
                self.draw_view_controls(ui, session, keys);
                ui.separator();
                self.draw_edit_controls(ui, session, keys);
            });
        });
        request
    }

    fn draw_file_buttons(&mut self, ui: &mut egui::Ui) -> Option<FileRequest> {
        let mut request = None;
        if ui.button("Open MIDI…").clicked() {
            request = Some(FileRequest::OpenMidi);
        }
        if ui.button("Open Audio…").clicked() {
            request = Some(FileRequest::OpenAudio);
        }
        ui.menu_button("Project", |ui| {
            if ui.button("Open…").clicked() {
                request = Some(FileRequest::OpenProject);
                ui.close();
            }
            if ui.button("Save As…").clicked() {
                request = Some(FileRequest::SaveProject);
                ui.close();
            }
            if ui.button("Export MusicXML…").clicked() {
                request = Some(FileRequest::ExportMusicXml);
                ui.close();
            }
        });
        request
    }

    fn draw_transport_controls(
        &mut self,
        ui: &mut egui::Ui,
        session: &mut EditorSession,
        keys: &ShortcutRegistry,
    ) {
        let playing = session.is_playing();
        let label = if playing { "⏸" } else { "▶" };
        let enabled = playing || session.can_play();
        if ui
            .add_enabled(enabled, egui::Button::new(label))
            .on_hover_text(keys.hint(EditorAction::PlayPause, "Play/Pause"))
            .clicked()
        {
            session.toggle_playback();
        }

        if ui.button("⏹").on_hover_text(keys.hint(EditorAction::Stop, "Stop")).clicked() {
            session.stop();
        }

        if session.is_loading() {
            ui.spinner();
            ui.label("Loading audio…");
        }
    }

    fn draw_time_display(&self, ui: &mut egui::Ui, session: &EditorSession) {
        let now = session.current_time();
        ui.monospace(format!(
            "{} / {}",
            format_minutes_seconds(now),
            format_minutes_seconds(session.duration())
        ));
        ui.monospace(format!("Bar {}", format_bar_beat(now, session.grid())));
    }

    fn draw_tempo_controls(
        &mut self,
        ui: &mut egui::Ui,
        session: &mut EditorSession,
        keys: &ShortcutRegistry,
    ) {
        ui.label("BPM:");
        let mut bpm = session.grid().tempo;
        if ui
            .add(
                egui::DragValue::new(&mut bpm)
                    .speed(0.5)
                    .range(MIN_BPM..=MAX_BPM),
            )
            .changed()
        {
            session.set_tempo(bpm);
        }
        if ui.button("Tap").on_hover_text(keys.hint(EditorAction::TapTempo, "Tap Tempo")).clicked() {
            session.perform(EditorAction::TapTempo);
        }

        ui.label("Downbeat:");
        let mut offset = session.grid().offset;
        if ui
            .add(
                egui::DragValue::new(&mut offset)
                    .speed(0.005)
                    .max_decimals(3)
                    .suffix(" s"),
            )
            .on_hover_text("Alt-click a note to use its start")
            .changed()
        {
            session.set_offset(offset);
        }

        let mut subdivision = session.grid().subdivision;
        egui::ComboBox::from_id_salt("subdivision")
            .selected_text(subdivision.label())
            .width(64.0)
            .show_ui(ui, |ui| {
                for s in Subdivision::ALL {
                    ui.selectable_value(&mut subdivision, s, s.label());
                }
            });
        if subdivision != session.grid().subdivision {
            session.set_subdivision(subdivision);
        }
    }

    fn draw_view_controls(
        &mut self,
        ui: &mut egui::Ui,
        session: &mut EditorSession,
        keys: &ShortcutRegistry,
    ) {
        if ui.button("−").on_hover_text(keys.hint(EditorAction::ZoomOut, "Zoom Out")).clicked() {
            session.zoom_out();
        }
        ui.monospace(format!("{:.0} px/s", session.pixels_per_second()));
        if ui.button("+").on_hover_text(keys.hint(EditorAction::ZoomIn, "Zoom In")).clicked() {
            session.zoom_in();
        }

        let mut speed = session.playback_speed();
        egui::ComboBox::from_id_salt("playback_speed")
            .selected_text(format!("{speed}×"))
            .width(56.0)
            .show_ui(ui, |ui| {
                for s in SPEEDS {
                    ui.selectable_value(&mut speed, s, format!("{s}×"));
                }
            });
        if speed != session.playback_speed() {
            session.set_playback_speed(speed.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE));
        }
    }

    fn draw_edit_controls(
        &mut self,
        ui: &mut egui::Ui,
        session: &mut EditorSession,
        keys: &ShortcutRegistry,
    ) {
        if ui
            .add_enabled(session.can_undo(), egui::Button::new("↶"))
            .on_hover_text(keys.hint(EditorAction::Undo, "Undo"))
            .clicked()
        {
            session.undo();
        }
        if ui
            .add_enabled(session.can_redo(), egui::Button::new("↷"))
            .on_hover_text(keys.hint(EditorAction::Redo, "Redo"))
            .clicked()
        {
            session.redo();
        }

        let has_selection = !session.selection().is_empty();
        if ui
            .add_enabled(has_selection, egui::Button::new("Quantize"))
            .on_hover_text(keys.hint(EditorAction::Quantize, "Snap selected notes to the grid"))
            .clicked()
        {
            session.perform(EditorAction::Quantize);
        }
        if ui
            .add_enabled(has_selection, egui::Button::new("Delete"))
            .on_hover_text(keys.hint(EditorAction::Delete, "Delete selected notes"))
            .clicked()
        {
            session.perform(EditorAction::Delete);
        }
        ui.label(format!(
            "{} notes, {} selected",
            session.notes().len(),
            session.selection().len()
        ));
    }
}
