use super::actions::EditorAction;
use egui::{Key, Modifiers};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single keybind (modifier + key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keybind {
    pub modifiers: ModifierSet,
    pub key: KeyCode,
}

/// Serializable modifier flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierSet {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub command: bool,
}

impl From<ModifierSet> for Modifiers {
    fn from(m: ModifierSet) -> Self {
        let mut mods = Modifiers::NONE;

        #[cfg(target_os = "macos")]
        {
            if m.command {
                mods = mods | Modifiers::COMMAND;
            }
            if m.ctrl {
                mods = mods | Modifiers::CTRL;
            }
        }

        #[cfg(not(target_os = "macos"))]
        {
            // Treat "command" as "ctrl"
            if m.ctrl || m.command {
                mods = mods | Modifiers::CTRL | Modifiers::COMMAND;
            }
        }

        if m.shift {
            mods = mods | Modifiers::SHIFT;
        }
        if m.alt {
            mods = mods | Modifiers::ALT;
        }
        mods
    }
}

/// Serializable key enum (the keys the editor binds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    A,
    E,
    O,
    Q,
    S,
    T,
    Y,
    Z,
    Space,
    Enter,
    Escape,
    Backspace,
    Delete,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    Plus,
    Minus,
    Equals,
}

impl From<KeyCode> for Key {
    fn from(k: KeyCode) -> Self {
        use egui::Key as K;
        match k {
            KeyCode::A => K::A,
            KeyCode::E => K::E,
            KeyCode::O => K::O,
            KeyCode::Q => K::Q,
            KeyCode::S => K::S,
            KeyCode::T => K::T,
            KeyCode::Y => K::Y,
            KeyCode::Z => K::Z,

            KeyCode::Space => K::Space,
            KeyCode::Enter => K::Enter,
            KeyCode::Escape => K::Escape,
            KeyCode::Backspace => K::Backspace,
            KeyCode::Delete => K::Delete,

            KeyCode::ArrowUp => K::ArrowUp,
            KeyCode::ArrowDown => K::ArrowDown,
            KeyCode::ArrowLeft => K::ArrowLeft,
            KeyCode::ArrowRight => K::ArrowRight,

            KeyCode::Home => K::Home,
            KeyCode::Plus => K::Plus,
            KeyCode::Minus => K::Minus,
            KeyCode::Equals => K::Equals,
        }
    }
}

impl Keybind {
    /// Exact modifier match, with Cmd and Ctrl interchangeable off macOS.
    pub fn modifiers_match(&self, pressed: &Modifiers) -> bool {
        let wanted: Modifiers = self.modifiers.into();
        pressed.shift == wanted.shift
            && pressed.alt == wanted.alt
            && pressed.command == wanted.command
            && (cfg!(not(target_os = "macos")) || pressed.ctrl == wanted.ctrl)
    }

    /// Format for display ("Ctrl+Shift+Z")
    pub fn label(&self) -> String {
        let mut parts = Vec::new();

        #[cfg(target_os = "macos")]
        let cmd_key = "Cmd";
        #[cfg(not(target_os = "macos"))]
        let cmd_key = "Ctrl";

        if self.modifiers.command {
            parts.push(cmd_key);
        }
        if self.modifiers.ctrl && !self.modifiers.command {
            parts.push("Ctrl");
        }
        if self.modifiers.shift {
            parts.push("Shift");
        }
        if self.modifiers.alt {
            parts.push("Alt");
        }

        let key_str = format!("{:?}", self.key);
        parts.push(&key_str);

        parts.join("+")
    }
}

/// Central shortcut registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortcutRegistry {
    /// Action -> List of keybinds (allows multiple binds per action)
    pub bindings: HashMap<EditorAction, Vec<Keybind>>,

    /// Reverse lookup for conflict detection
    #[serde(skip)]
    keybind_to_action: HashMap<Keybind, EditorAction>,
}

impl Default for ShortcutRegistry {
    fn default() -> Self {
        Self::default_bindings()
    }
}

impl ShortcutRegistry {
    /// Load default keybinds
    pub fn default_bindings() -> Self {
        let mut reg = Self {
            bindings: HashMap::new(),
            keybind_to_action: HashMap::new(),
        };

        use EditorAction::*;
        use KeyCode::*;

        // Transport
        reg.bind(PlayPause, Keybind::none(Space));
        reg.bind(Stop, Keybind::none(Home));
        reg.bind(TapTempo, Keybind::none(T));

        // Edit (Cmd/Ctrl)
        reg.bind(Undo, Keybind::cmd(Z));
        reg.bind(Redo, Keybind::cmd_shift(Z));
        reg.bind(Redo, Keybind::cmd(Y));
        reg.bind(SelectAll, Keybind::cmd(A));
        reg.bind(EditorAction::Delete, Keybind::none(KeyCode::Delete));
        reg.bind(EditorAction::Delete, Keybind::none(Backspace));
        reg.bind(EditorAction::Escape, Keybind::none(KeyCode::Escape));

        // Note edits
        reg.bind(Quantize, Keybind::none(Q));
        reg.bind(NudgeLeft, Keybind::none(ArrowLeft));
        reg.bind(NudgeRight, Keybind::none(ArrowRight));
        reg.bind(NudgeUp, Keybind::none(ArrowUp));
        reg.bind(NudgeDown, Keybind::none(ArrowDown));

        // File
        reg.bind(OpenProject, Keybind::cmd(O));
        reg.bind(SaveProject, Keybind::cmd(S));
        reg.bind(ExportMusicXml, Keybind::cmd(E));

        // View
        reg.bind(ZoomIn, Keybind::none(Plus));
        reg.bind(ZoomIn, Keybind::none(Equals));
        reg.bind(ZoomOut, Keybind::none(Minus));

        reg
    }

    /// Add a binding (allows duplicates)
    pub fn bind(&mut self, action: EditorAction, keybind: Keybind) {
        self.bindings.entry(action).or_default().push(keybind);
        self.keybind_to_action.insert(keybind, action);
    }

    /// Remove a specific binding
    pub fn unbind(&mut self, keybind: &Keybind) {
        self.keybind_to_action.remove(keybind);
        for binds in self.bindings.values_mut() {
            binds.retain(|b| b != keybind);
        }
    }

    /// Get all keybinds for an action
    pub fn get_bindings(&self, action: EditorAction) -> &[Keybind] {
        self.bindings
            .get(&action)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Find action for a keybind
    pub fn get_action(&self, keybind: &Keybind) -> Option<EditorAction> {
        self.keybind_to_action.get(keybind).copied()
    }

    /// Hover text naming the first binding of `action`, if any.
    pub fn hint(&self, action: EditorAction, text: &str) -> String {
        match self.get_bindings(action).first() {
            Some(bind) => format!("{text} ({bind})"),
            None => text.to_string(),
        }
    }

    /// Save to file
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from file
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let mut reg: Self = serde_json::from_str(&json)?;
        reg.rebuild_reverse_index();
        Ok(reg)
    }

    fn rebuild_reverse_index(&mut self) {
        self.keybind_to_action.clear();
        for (&action, binds) in &self.bindings {
            for &bind in binds {
                self.keybind_to_action.insert(bind, action);
            }
        }
    }
}

impl Keybind {
    pub fn none(key: KeyCode) -> Self {
        Self {
            modifiers: ModifierSet::NONE,
            key,
        }
    }

    pub fn cmd(key: KeyCode) -> Self {
        Self {
            modifiers: ModifierSet::COMMAND,
            key,
        }
    }

    pub fn shift(key: KeyCode) -> Self {
        Self {
            modifiers: ModifierSet::SHIFT,
            key,
        }
    }

    pub fn cmd_shift(key: KeyCode) -> Self {
        Self {
            modifiers: ModifierSet {
                command: true,
                shift: true,
                ..Default::default()
            },
            key,
        }
    }
}

impl ModifierSet {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
        command: false,
    };
    pub const COMMAND: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
        command: true,
    };
    pub const SHIFT: Self = Self {
        ctrl: false,
        shift: true,
        alt: false,
        command: false,
    };
}

impl Default for ModifierSet {
    fn default() -> Self {
        Self::NONE
    }
}

impl std::fmt::Display for Keybind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_editing_keys() {
        let reg = ShortcutRegistry::default();
        assert_eq!(
            reg.get_action(&Keybind::none(KeyCode::Q)),
            Some(EditorAction::Quantize)
        );
        assert_eq!(
            reg.get_action(&Keybind::cmd(KeyCode::Y)),
            Some(EditorAction::Redo)
        );
        assert_eq!(reg.get_bindings(EditorAction::Delete).len(), 2);
        assert_eq!(reg.hint(EditorAction::Quantize, "Quantize"), "Quantize (Q)");
        assert_eq!(reg.hint(EditorAction::Escape, "Clear"), "Clear (Escape)");
    }

    #[test]
    fn modifier_matching_is_exact() {
        let undo = Keybind::cmd(KeyCode::Z);
        assert!(undo.modifiers_match(&Modifiers::COMMAND));
        assert!(!undo.modifiers_match(&(Modifiers::COMMAND | Modifiers::SHIFT)));
        assert!(!undo.modifiers_match(&Modifiers::NONE));
        assert!(Keybind::none(KeyCode::Q).modifiers_match(&Modifiers::NONE));
    }

    #[test]
    fn rebinding_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shortcuts.json");
        let mut reg = ShortcutRegistry::default();
        reg.unbind(&Keybind::none(KeyCode::Q));
        reg.bind(EditorAction::Quantize, Keybind::shift(KeyCode::Q));
        reg.save(&path).unwrap();

        let loaded = ShortcutRegistry::load(&path).unwrap();
        assert_eq!(loaded.get_action(&Keybind::none(KeyCode::Q)), None);
        assert_eq!(
            loaded.get_action(&Keybind::shift(KeyCode::Q)),
            Some(EditorAction::Quantize)
        );
    }
}
