pub mod actions;
pub mod shortcuts;

use actions::EditorAction;
use shortcuts::ShortcutRegistry;

use egui::{Context, Key};

#[derive(Default)]
pub struct InputManager {
    shortcuts: ShortcutRegistry,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load custom shortcuts from config
    pub fn load_shortcuts(&mut self, path: &std::path::Path) -> anyhow::Result<()> {
        self.shortcuts = ShortcutRegistry::load(path)?;
        Ok(())
    }

    /// Process input and return triggered actions
    pub fn poll_actions(&mut self, ctx: &Context) -> Vec<EditorAction> {
        // Don't process shortcuts when text input has focus (tempo field, dialogs)
        if ctx.wants_keyboard_input() {
            if ctx.input(|i| i.key_pressed(Key::Escape)) {
                return vec![EditorAction::Escape];
            }
            return vec![];
        }

        let mut actions = Vec::new();
        let modifiers = ctx.input(|i| i.modifiers);

        for &action in EditorAction::all() {
            for bind in self.shortcuts.get_bindings(action) {
                let key: Key = bind.key.into();
                if !ctx.input(|i| i.key_pressed(key)) {
                    continue;
                }
                if bind.modifiers_match(&modifiers) {
                    actions.push(action);
                    break;
                }
            }
        }

        actions
    }

    /// Bindings in effect, for hover hints
    pub fn shortcuts(&self) -> &ShortcutRegistry {
        &self.shortcuts
    }
}
