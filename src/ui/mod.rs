mod app;
mod dialogs;
mod piano_roll;
mod staff;
mod transport;
mod waveform;

pub use app::RollsyncApp;
pub use dialogs::FileRequest;
