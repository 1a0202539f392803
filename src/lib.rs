pub mod audio_engine;
pub mod audio_import;
pub mod config;
pub mod constants;
pub mod edit_actions;
pub mod entry;
pub mod error;
pub mod history;
pub mod idgen;
pub mod input;
pub mod messages;
pub mod midi_import;
pub mod model;
pub mod musicxml;
pub mod notation;
pub mod note_store;
pub mod paths;
pub mod project;
pub mod selection;
pub mod session;
pub mod tap_tempo;
pub mod time_utils;
pub mod transport;
pub mod ui;
pub mod waveform;
