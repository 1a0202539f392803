pub mod grid;
pub mod note;

pub use grid::{GridParams, Subdivision, clamp_tempo};
pub use note::Note;
