use crate::config::PathConfig;
use crate::constants::{AUDIO_EXTENSIONS, MIDI_EXTENSIONS, PROJECT_EXTENSION};
use eframe::egui;
use egui_file_dialog::FileDialog;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a file dialog was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRequest {
    OpenMidi,
    OpenAudio,
    OpenProject,
    SaveProject,
    ExportMusicXml,
}

impl FileRequest {
    fn title(self) -> &'static str {
        match self {
            FileRequest::OpenMidi => "Open MIDI File",
            FileRequest::OpenAudio => "Open Audio File",
            FileRequest::OpenProject => "Open Project",
            FileRequest::SaveProject => "Save Project",
            FileRequest::ExportMusicXml => "Export MusicXML",
        }
    }

    fn is_save(self) -> bool {
        matches!(self, FileRequest::SaveProject | FileRequest::ExportMusicXml)
    }

    fn start_dir(self, paths: &PathConfig) -> Option<PathBuf> {
        match self {
            FileRequest::OpenMidi => paths.last_midi_dir.clone(),
            FileRequest::OpenAudio => paths.last_audio_dir.clone(),
            FileRequest::OpenProject | FileRequest::SaveProject => crate::paths::projects_dir(),
            FileRequest::ExportMusicXml => paths.last_export_dir.clone(),
        }
    }
}

pub(super) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// One in-app file dialog, reused for every file request.
pub struct FileDialogs {
    dialog: FileDialog,
    pending: Option<FileRequest>,
}

impl Default for FileDialogs {
    fn default() -> Self {
        Self {
            dialog: FileDialog::new(),
            pending: None,
        }
    }
}

impl FileDialogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, request: FileRequest, paths: &PathConfig, default_name: &str) {
        let mut dialog = FileDialog::new().title(request.title());
        if let Some(dir) = request.start_dir(paths) {
            dialog = dialog.initial_directory(dir);
        }
        dialog = match request {
            FileRequest::OpenMidi => dialog
                .add_file_filter(
                    "MIDI files",
                    Arc::new(|p: &Path| has_extension(p, MIDI_EXTENSIONS)),
                )
                .default_file_filter("MIDI files"),
            FileRequest::OpenAudio => dialog
                .add_file_filter(
                    "Audio files",
                    Arc::new(|p: &Path| has_extension(p, AUDIO_EXTENSIONS)),
                )
                .default_file_filter("Audio files"),
            FileRequest::OpenProject => dialog
                .add_file_filter(
                    "Projects",
                    Arc::new(|p: &Path| has_extension(p, &[PROJECT_EXTENSION])),
                )
                .default_file_filter("Projects"),
            FileRequest::SaveProject | FileRequest::ExportMusicXml => {
                dialog.default_file_name(default_name)
            }
        };

        self.dialog = dialog;
        if request.is_save() {
            self.dialog.save_file();
        } else {
            self.dialog.pick_file();
        }
        self.pending = Some(request);
    }

    /// Drive the dialog; returns the request and path once the user picks one.
    pub fn update(&mut self, ctx: &egui::Context) -> Option<(FileRequest, PathBuf)> {
        self.pending?;
        self.dialog.update(ctx);
        let path = self.dialog.take_picked()?;
        let request = self.pending.take()?;
        Some((request, path))
    }
}

/// Remember the directory of a picked file for the next dialog of its kind.
pub fn remember_dir(paths: &mut PathConfig, request: FileRequest, path: &Path) {
    let Some(dir) = path.parent().map(Path::to_path_buf) else {
        return;
    };
    match request {
        FileRequest::OpenMidi => paths.last_midi_dir = Some(dir),
        FileRequest::OpenAudio => paths.last_audio_dir = Some(dir),
        FileRequest::ExportMusicXml => paths.last_export_dir = Some(dir),
        FileRequest::OpenProject | FileRequest::SaveProject => {}
    }
}

pub struct MessageBox {
    message: String,
    closed: bool,
}

impl MessageBox {
    pub fn new(message: String) -> Self {
        Self {
            message,
            closed: false,
        }
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        egui::Window::new("Message")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(&self.message);
                ui.separator();

                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        self.closed = true;
                    }
                });
            });
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_extension(Path::new("take.MID"), MIDI_EXTENSIONS));
        assert!(has_extension(Path::new("mix.flac"), AUDIO_EXTENSIONS));
        assert!(!has_extension(Path::new("notes.txt"), MIDI_EXTENSIONS));
        assert!(!has_extension(Path::new("noext"), AUDIO_EXTENSIONS));
    }

    #[test]
    fn picked_directories_are_remembered_per_kind() {
        let mut paths = PathConfig::default();
        remember_dir(&mut paths, FileRequest::OpenMidi, Path::new("/music/a.mid"));
        remember_dir(&mut paths, FileRequest::OpenProject, Path::new("/p/x.rollsync"));
        assert_eq!(paths.last_midi_dir, Some(PathBuf::from("/music")));
        assert_eq!(paths.last_audio_dir, None);
    }
}
