use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;

use eframe::egui::{self, RichText};

use crate::error::HostError;
use crate::event::AppEvent;
use crate::host::HostKind;
use crate::model::{Settings, ThemeMode};
use crate::preferences::Preferences;
use crate::storage::KeyValueStorage;
use crate::store::Stores;
use crate::theme::Theme;
use crate::ui::chat::ChatPanel;
use crate::ui::editor::EditorPanel;
use crate::ui::settings::{SavedSettings, SettingsWindow};
use crate::ui::sidebar::Sidebar;
use crate::ui::welcome::{self, WelcomeChoice};
use crate::ui::{text, Dispatcher, View};

const MAX_NOTICES: usize = 5;

pub struct CoworkApp {
    rx: Receiver<AppEvent>,
    stores: Stores,
    dispatcher: Dispatcher,
    preferences: Preferences,
    storage: Arc<dyn KeyValueStorage>,
    host_kind: HostKind,
    theme: Theme,
    font_size: u32,
    applied: Option<(ThemeMode, u32)>,
    notices: Vec<String>,
    sidebar: Sidebar,
    editor: EditorPanel,
    chat: ChatPanel,
    settings: SettingsWindow,
    show_welcome: bool,
}

impl CoworkApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        stores: Stores,
        dispatcher: Dispatcher,
        storage: Arc<dyn KeyValueStorage>,
        host_kind: HostKind,
    ) -> Self {
        let preferences = Preferences::new(storage.clone());
        let show_welcome = !preferences.has_visited();
        let font_size = preferences.settings().font_size;
        Self {
            rx,
            theme: Theme::for_mode(stores.app.theme()),
            stores,
            dispatcher,
            preferences,
            storage,
            host_kind,
            font_size,
            applied: None,
            notices: Vec::new(),
            sidebar: Sidebar::default(),
            editor: EditorPanel::default(),
            chat: ChatPanel::default(),
            settings: SettingsWindow::default(),
            show_welcome,
        }
    }

    /// Kicks off the initial loads. The workspace falls back to `default_workspace`.
    pub fn start(&self, default_workspace: String) {
        let config = self.stores.config.clone();
        self.dispatcher.spawn("load config", async move { config.load_config().await });

        let chat = self.stores.chat.clone();
        self.dispatcher.spawn("load sessions", async move { chat.load_sessions().await });

        let skills = self.stores.skills.clone();
        self.dispatcher.spawn("load skills", async move { skills.refresh_skills().await });

        let saved = self.preferences.settings().workspace;
        let workspace = self
            .stores
            .app
            .current_workspace()
            .or_else(|| (!saved.trim().is_empty()).then_some(saved))
            .unwrap_or(default_workspace);
        tracing::info!(workspace = %workspace, host = self.host_kind.label(), "starting");
        self.open_workspace(workspace);
        self.stores.app.set_initialized(true);
    }

    fn open_workspace(&self, workspace: String) {
        self.stores.app.set_current_workspace(Some(workspace.clone()));
        self.stores.app.add_workspace(workspace.clone());
        let files = self.stores.files.clone();
        self.dispatcher.spawn("load file tree", async move {
            if !files.file_exists(&workspace).await {
                return Err(HostError::not_found("workspace", workspace));
            }
            files.load_file_tree(&workspace).await
        });
    }

    fn notify(&mut self, message: String) {
        self.notices.push(message);
        if self.notices.len() > MAX_NOTICES {
            self.notices.remove(0);
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ActionFailed { action, message } => self.notify(format!("{action}: {message}")),
            AppEvent::Notice(message) => self.notify(message),
            AppEvent::DirectorySelected(path) => self.settings.set_workspace(path),
        }
    }

    fn apply_theme(&mut self, ctx: &egui::Context) {
        let wanted = (self.stores.app.theme(), self.font_size);
        if self.applied == Some(wanted) {
            return;
        }
        self.theme = Theme::for_mode(wanted.0);
        self.theme.apply_visuals(ctx, wanted.1 as f32);
        self.applied = Some(wanted);
    }

    fn save_preferences(&self, settings: &Settings) -> crate::error::Result<()> {
        self.preferences.save_settings(settings)?;
        self.preferences.set_theme(settings.theme)?;
        self.preferences.set_language(settings.language)
    }

    fn apply_settings(&mut self, saved: SavedSettings) {
        let SavedSettings { settings, workspace_changed } = saved;
        if let Err(err) = self.save_preferences(&settings) {
            tracing::error!(error = %err, "failed to save settings");
            self.notify(err.to_string());
            return;
        }

        self.stores.app.set_theme(settings.theme);
        self.stores.app.set_language(settings.language);
        self.font_size = settings.font_size;

        let stores = self.stores.clone();
        let storage = self.storage.clone();
        let api_config = settings.api_config();
        self.dispatcher.spawn("save config", async move {
            stores.apply_api_config(api_config, storage).await
        });

        if workspace_changed {
            self.open_workspace(settings.workspace.trim().to_string());
        }

        let text = text::strings(settings.language);
        self.notify(text.settings_saved.to_string());
    }

    fn toggle_theme(&mut self) {
        let theme = self.stores.app.toggle_theme();
        if let Err(err) = self.preferences.set_theme(theme) {
            tracing::warn!(error = %err, "failed to remember theme");
        }
    }

    fn open_settings(&mut self) {
        self.settings
            .open(&self.preferences, self.stores.app.current_workspace());
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let text = text::strings(self.stores.app.language());
        let workspace = self.stores.app.current_workspace().unwrap_or_default();
        let recent = self.stores.app.workspaces();
        let mut toggle = false;
        let mut settings = false;
        let mut open: Option<String> = None;
        let mut remove: Option<String> = None;

        egui::TopBottomPanel::top("top_bar")
            .frame(self.theme.panel_frame(self.theme.surface_1, 6))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.strong(text.app_title);
                    ui.separator();
                    ui.menu_button(RichText::new(&workspace).color(self.theme.text_muted), |ui| {
                        ui.label(RichText::new(text.recent_workspaces).small().strong());
                        for path in &recent {
                            ui.horizontal(|ui| {
                                if ui.selectable_label(*path == workspace, path).clicked() {
                                    open = Some(path.clone());
                                    ui.close_menu();
                                }
                                if ui.small_button("✕").on_hover_text(text.remove).clicked() {
                                    remove = Some(path.clone());
                                }
                            });
                        }
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        settings = ui.button(text.settings).clicked();
                        let icon = match self.theme.mode {
                            ThemeMode::Light => "🌙",
                            ThemeMode::Dark => "☀",
                        };
                        toggle = ui.button(icon).clicked();
                        let color = match self.host_kind {
                            HostKind::Local => self.theme.success,
                            HostKind::Mock => self.theme.warning,
                        };
                        ui.label(RichText::new(self.host_kind.label()).color(color));
                    });
                });
            });

        if let Some(path) = open.filter(|path| *path != workspace) {
            self.open_workspace(path);
        }
        if let Some(path) = remove {
            self.stores.app.remove_workspace(&path);
        }
        if toggle {
            self.toggle_theme();
        }
        if settings {
            self.open_settings();
        }
    }

    fn render_notices(&mut self, ctx: &egui::Context) {
        if self.notices.is_empty() {
            return;
        }
        let text = text::strings(self.stores.app.language());
        let mut dismiss = false;
        egui::TopBottomPanel::bottom("notices")
            .frame(self.theme.panel_frame(self.theme.surface_2, 6))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        for notice in &self.notices {
                            ui.label(RichText::new(notice).small().color(self.theme.warning));
                        }
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                        dismiss = ui.button(text.dismiss).clicked();
                    });
                });
            });
        if dismiss {
            self.notices.clear();
        }
    }
}

impl eframe::App for CoworkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.apply_theme(ctx);
        self.render_top_bar(ctx);
        self.render_notices(ctx);

        let stores = self.stores.clone();
        let dispatcher = self.dispatcher.clone();
        let theme = self.theme.clone();
        let view = View {
            stores: &stores,
            dispatcher: &dispatcher,
            theme: &theme,
            text: text::strings(stores.app.language()),
        };

        egui::SidePanel::left("sidebar")
            .resizable(true)
            .default_width(260.0)
            .frame(theme.panel_frame(theme.surface_1, 8))
            .show(ctx, |ui| self.sidebar.show(ui, &view));

        egui::SidePanel::right("chat")
            .resizable(true)
            .default_width(360.0)
            .frame(theme.panel_frame(theme.surface_1, 8))
            .show(ctx, |ui| self.chat.show(ui, &view));

        egui::CentralPanel::default()
            .frame(theme.panel_frame(theme.surface_0, 8))
            .show(ctx, |ui| self.editor.show(ui, &view));

        if let Some(saved) = self.settings.show(ctx, &view) {
            self.apply_settings(saved);
        }

        if self.show_welcome && !self.settings.is_open() {
            if let Some(choice) = welcome::show(ctx, &view) {
                self.show_welcome = false;
                if let Err(err) = self.preferences.mark_visited() {
                    tracing::warn!(error = %err, "failed to remember first visit");
                }
                if choice == WelcomeChoice::GetStarted {
                    self.open_settings();
                }
            }
        }

        let size = ctx.screen_rect().size();
        let known = stores.app.state().window_size;
        if (known.width - size.x).abs() > 1.0 || (known.height - size.y).abs() > 1.0 {
            stores.app.set_window_size(size.x, size.y);
        }
    }
}
