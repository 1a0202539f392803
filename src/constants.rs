use eframe::egui;

// Editing session defaults
pub const DEFAULT_BPM: f64 = 120.0;
pub const MIN_BPM: f64 = 1.0;
pub const MAX_BPM: f64 = 300.0;
pub const HISTORY_LIMIT: usize = 50;

// Time/grid mapping
pub const DEFAULT_PIXELS_PER_SECOND: f32 = 100.0;
pub const MIN_PIXELS_PER_SECOND: f32 = 10.0;
pub const MAX_PIXELS_PER_SECOND: f32 = 1000.0;
pub const ZOOM_FACTOR: f32 = 1.25;
pub const GRID_PADDING_SECONDS: f64 = 4.0;
pub const GRID_EPSILON: f64 = 1e-3;
pub const BEATS_PER_BAR: f64 = 4.0;

// Piano roll geometry
pub const MIN_NOTE_WIDTH: f32 = 6.0;
pub const MIN_ROW_HEIGHT: f32 = 4.0;
pub const PITCH_PADDING: u8 = 2;
pub const EMPTY_RANGE_LOW: u8 = 48;
pub const EMPTY_RANGE_HIGH: u8 = 72;
pub const AUTO_SCROLL_MARGIN: f32 = 200.0;
pub const PIANO_KEY_WIDTH: f32 = 48.0;
pub const DEFAULT_WAVEFORM_HEIGHT: f32 = 96.0;
pub const DEFAULT_STAFF_HEIGHT: f32 = 150.0;

// Transport
pub const MIN_PLAYBACK_RATE: f64 = 0.25;
pub const MAX_PLAYBACK_RATE: f64 = 4.0;
pub const WAVEFORM_PEAKS_PER_SECOND: f32 = 200.0;

// Tap tempo
pub const TAP_RESET_MS: f64 = 2000.0;
pub const TAP_HISTORY: usize = 8;

// Notation / export
pub const MIDDLE_C: u8 = 60;
pub const CHORD_TOLERANCE_SECONDS: f64 = 1e-3;
pub const MUSICXML_DIVISIONS: u32 = 480;

// File Extensions
pub const PROJECT_EXTENSION: &str = "rollsync";
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg"];
pub const MIDI_EXTENSIONS: &[&str] = &["mid", "midi"];

// Colors
pub const COLOR_ROLL_BG: egui::Color32 = egui::Color32::from_gray(22);
pub const COLOR_ROW_BLACK_KEY: egui::Color32 = egui::Color32::from_gray(17);
pub const COLOR_GRID_BAR: egui::Color32 = egui::Color32::from_gray(95);
pub const COLOR_GRID_BEAT: egui::Color32 = egui::Color32::from_gray(60);
pub const COLOR_GRID_SUBDIVISION: egui::Color32 = egui::Color32::from_gray(38);
pub const COLOR_NOTE: egui::Color32 = egui::Color32::from_rgb(80, 120, 200);
pub const COLOR_NOTE_SELECTED: egui::Color32 = egui::Color32::from_rgb(255, 190, 90);
pub const COLOR_NOTE_ACTIVE: egui::Color32 = egui::Color32::from_rgb(120, 200, 255);
pub const COLOR_PLAYHEAD: egui::Color32 = egui::Color32::from_rgb(255, 100, 100);
pub const COLOR_SELECTION_BOX: egui::Color32 = egui::Color32::from_rgba_premultiplied(60, 90, 160, 60);
