use serde::{Deserialize, Serialize};

use super::{ChangeHook, StoreCell};
use crate::model::{Language, ThemeMode};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 900.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub is_initialized: bool,
    pub language: Language,
    pub theme: ThemeMode,
    pub window_size: WindowSize,
    pub current_workspace: Option<String>,
    pub workspaces: Vec<String>,
}

/// The `app-storage` subset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSnapshot {
    pub language: Language,
    pub theme: ThemeMode,
    pub current_workspace: Option<String>,
    pub workspaces: Vec<String>,
}

#[derive(Clone)]
pub struct AppStore {
    cell: StoreCell<AppState>,
}

impl AppStore {
    pub fn new(hook: ChangeHook) -> Self {
        Self::with_state(AppState::default(), hook)
    }

    pub fn with_state(state: AppState, hook: ChangeHook) -> Self {
        Self {
            cell: StoreCell::new(state, hook),
        }
    }

    pub fn state(&self) -> AppState {
        self.cell.snapshot()
    }

    pub fn theme(&self) -> ThemeMode {
        self.cell.read(|state| state.theme)
    }

    pub fn language(&self) -> Language {
        self.cell.read(|state| state.language)
    }

    pub fn current_workspace(&self) -> Option<String> {
        self.cell.read(|state| state.current_workspace.clone())
    }

    pub fn workspaces(&self) -> Vec<String> {
        self.cell.read(|state| state.workspaces.clone())
    }

    pub fn set_language(&self, language: Language) {
        self.cell.update(|state| state.language = language);
    }

    pub fn set_theme(&self, theme: ThemeMode) {
        self.cell.update(|state| state.theme = theme);
    }

    pub fn toggle_theme(&self) -> ThemeMode {
        self.cell.update(|state| {
            state.theme = state.theme.toggled();
            state.theme
        })
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.cell.update(|state| state.is_initialized = initialized);
    }

    pub fn set_window_size(&self, width: f32, height: f32) {
        self.cell
            .update(|state| state.window_size = WindowSize { width, height });
    }

    pub fn set_current_workspace(&self, workspace: Option<String>) {
        self.cell.update(|state| state.current_workspace = workspace);
    }

    pub fn add_workspace(&self, workspace: impl Into<String>) {
        let workspace = workspace.into();
        self.cell.update(|state| {
            if !state.workspaces.contains(&workspace) {
                state.workspaces.push(workspace);
            }
        });
    }

    pub fn remove_workspace(&self, workspace: &str) {
        self.cell.update(|state| {
            state.workspaces.retain(|existing| existing != workspace);
            if state.current_workspace.as_deref() == Some(workspace) {
                state.current_workspace = None;
            }
        });
    }

    pub fn persisted(&self) -> AppSnapshot {
        self.cell.read(|state| AppSnapshot {
            language: state.language,
            theme: state.theme,
            current_workspace: state.current_workspace.clone(),
            workspaces: state.workspaces.clone(),
        })
    }

    pub fn hydrate(&self, snapshot: AppSnapshot) {
        self.cell.update(|state| {
            state.language = snapshot.language;
            state.theme = snapshot.theme;
            state.current_workspace = snapshot.current_workspace;
            state.workspaces = snapshot.workspaces;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::no_hook;

    #[test]
    fn workspaces_are_deduplicated_and_removal_clears_current() {
        let store = AppStore::new(no_hook());
        store.add_workspace("/a");
        store.add_workspace("/b");
        store.add_workspace("/a");
        store.set_current_workspace(Some("/b".to_string()));
        assert_eq!(store.workspaces(), vec!["/a".to_string(), "/b".to_string()]);

        store.remove_workspace("/a");
        assert_eq!(store.current_workspace().as_deref(), Some("/b"));
        store.remove_workspace("/b");
        assert_eq!(store.current_workspace(), None);
        assert!(store.workspaces().is_empty());
    }

    #[test]
    fn snapshot_leaves_out_transient_fields() {
        let store = AppStore::new(no_hook());
        store.set_initialized(true);
        store.set_window_size(800.0, 600.0);
        store.set_language(Language::EnUs);

        let restored = AppStore::new(no_hook());
        restored.hydrate(store.persisted());
        let state = restored.state();
        assert_eq!(state.language, Language::EnUs);
        assert!(!state.is_initialized);
        assert_eq!(state.window_size, WindowSize::default());
    }

    #[test]
    fn toggle_theme_flips_mode() {
        let store = AppStore::new(no_hook());
        let first = store.theme();
        assert_eq!(store.toggle_theme(), first.toggled());
    }
}
