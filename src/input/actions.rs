use serde::{Deserialize, Serialize};

/// All possible user actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditorAction {
    // Transport
    PlayPause,
    Stop,
    TapTempo,

    // Edit
    Undo,
    Redo,
    Quantize,
    NudgeLeft,
    NudgeRight,
    NudgeUp,
    NudgeDown,
    Delete,
    SelectAll,
    Escape,

    // File
    OpenProject,
    SaveProject,
    ExportMusicXml,

    // View
    ZoomIn,
    ZoomOut,
}

impl EditorAction {
    /// Get all actions (for UI enumeration)
    pub fn all() -> &'static [EditorAction] {
        use EditorAction::*;
        &[
            PlayPause,
            Stop,
            TapTempo,
            Undo,
            Redo,
            Quantize,
            NudgeLeft,
            NudgeRight,
            NudgeUp,
            NudgeDown,
            Delete,
            SelectAll,
            Escape,
            OpenProject,
            SaveProject,
            ExportMusicXml,
            ZoomIn,
            ZoomOut,
        ]
    }

    /// Edits of the selected notes. These do nothing without a selection.
    pub fn edits_selection(&self) -> bool {
        matches!(
            self,
            Self::Quantize
                | Self::NudgeLeft
                | Self::NudgeRight
                | Self::NudgeUp
                | Self::NudgeDown
                | Self::Delete
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayPause => "Play/Pause",
            Self::Stop => "Stop",
            Self::TapTempo => "Tap Tempo",

            Self::Undo => "Undo",
            Self::Redo => "Redo",
            Self::Quantize => "Quantize",
            Self::NudgeLeft => "Nudge Earlier",
            Self::NudgeRight => "Nudge Later",
            Self::NudgeUp => "Semitone Up",
            Self::NudgeDown => "Semitone Down",
            Self::Delete => "Delete",
            Self::SelectAll => "Select All",
            Self::Escape => "Clear Selection",

            Self::OpenProject => "Open Project",
            Self::SaveProject => "Save Project",
            Self::ExportMusicXml => "Export MusicXML",

            Self::ZoomIn => "Zoom In",
            Self::ZoomOut => "Zoom Out",
        }
    }
}
