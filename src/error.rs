use std::fmt;

#[derive(Debug)]
pub enum RollError {
    Midi(String),
    Audio(String),
    File(String),
    State(String),
}

impl fmt::Display for RollError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RollError::Midi(msg) => write!(f, "MIDI error: {}", msg),
            RollError::Audio(msg) => write!(f, "Audio error: {}", msg),
            RollError::File(msg) => write!(f, "File error: {}", msg),
            RollError::State(msg) => write!(f, "State error: {}", msg),
        }
    }
}

impl std::error::Error for RollError {}

pub type Result<T> = std::result::Result<T, RollError>;

// Conversion helpers
impl From<std::io::Error> for RollError {
    fn from(err: std::io::Error) -> Self {
        RollError::File(err.to_string())
    }
}

impl From<anyhow::Error> for RollError {
    fn from(err: anyhow::Error) -> Self {
        RollError::State(err.to_string())
    }
}

impl From<serde_json::Error> for RollError {
    fn from(err: serde_json::Error) -> Self {
        RollError::File(err.to_string())
    }
}
