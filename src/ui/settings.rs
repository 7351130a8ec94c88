use eframe::egui::{self, RichText};

use super::View;
use crate::event::AppEvent;
use crate::model::settings::{FONT_FAMILIES, FONT_SIZE_RANGE};
use crate::model::{Language, Provider, Settings, ThemeMode};
use crate::preferences::Preferences;

/// What the app must apply after the form was saved.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSettings {
    pub settings: Settings,
    pub workspace_changed: bool,
}

#[derive(Debug, Default)]
pub struct SettingsWindow {
    open: bool,
    draft: Settings,
    saved_workspace: String,
    errors: Vec<String>,
}

impl SettingsWindow {
    pub fn open(&mut self, preferences: &Preferences, workspace: Option<String>) {
        let mut draft = preferences.settings();
        if draft.workspace.trim().is_empty() {
            draft.workspace = workspace.unwrap_or_default();
        }
        self.saved_workspace = draft.workspace.clone();
        self.draft = draft;
        self.errors.clear();
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_workspace(&mut self, workspace: String) {
        self.draft.workspace = workspace;
    }

    pub fn show(&mut self, ctx: &egui::Context, view: &View<'_>) -> Option<SavedSettings> {
        if !self.open {
            return None;
        }

        let text = view.text;
        let mut saved = None;
        let mut close = false;
        let mut window_open = true;

        egui::Window::new(text.settings)
            .open(&mut window_open)
            .collapsible(false)
            .resizable(false)
            .default_width(420.0)
            .show(ctx, |ui| {
                egui::Grid::new("settings_grid")
                    .num_columns(2)
                    .spacing([12.0, 8.0])
                    .show(ui, |ui| {
                        ui.label(text.provider);
                        egui::ComboBox::from_id_salt("provider")
                            .selected_text(self.draft.api_provider.label())
                            .show_ui(ui, |ui| {
                                for provider in Provider::ALL {
                                    ui.selectable_value(&mut self.draft.api_provider, provider, provider.label());
                                }
                            });
                        ui.end_row();

                        ui.label(text.api_key);
                        ui.add(egui::TextEdit::singleline(&mut self.draft.api_key).password(true));
                        ui.end_row();

                        ui.label(text.endpoint);
                        ui.text_edit_singleline(&mut self.draft.endpoint);
                        ui.end_row();

                        ui.label(text.workspace);
                        ui.horizontal(|ui| {
                            ui.add(egui::TextEdit::singleline(&mut self.draft.workspace).desired_width(220.0));
                            if ui.button(text.browse).clicked() {
                                let files = view.stores.files.clone();
                                let dispatcher = view.dispatcher.clone();
                                view.dispatcher.spawn("select directory", async move {
                                    if let Some(path) = files.select_directory().await? {
                                        dispatcher.send(AppEvent::DirectorySelected(path));
                                    }
                                    Ok(())
                                });
                            }
                        });
                        ui.end_row();

                        ui.label(text.font_size);
                        ui.add(egui::Slider::new(&mut self.draft.font_size, FONT_SIZE_RANGE));
                        ui.end_row();

                        ui.label(text.font_family);
                        egui::ComboBox::from_id_salt("font_family")
                            .selected_text(self.draft.font_family.as_str())
                            .show_ui(ui, |ui| {
                                for family in FONT_FAMILIES {
                                    ui.selectable_value(&mut self.draft.font_family, family.to_string(), family);
                                }
                            });
                        ui.end_row();

                        ui.label(text.theme);
                        ui.horizontal(|ui| {
                            ui.radio_value(&mut self.draft.theme, ThemeMode::Light, text.light);
                            ui.radio_value(&mut self.draft.theme, ThemeMode::Dark, text.dark);
                        });
                        ui.end_row();

                        ui.label(text.language);
                        egui::ComboBox::from_id_salt("language")
                            .selected_text(self.draft.language.label())
                            .show_ui(ui, |ui| {
                                for language in Language::ALL {
                                    ui.selectable_value(&mut self.draft.language, language, language.label());
                                }
                            });
                        ui.end_row();
                    });

                for error in &self.errors {
                    ui.label(RichText::new(error).color(view.theme.danger));
                }

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button(text.save).clicked() {
                        match self.draft.validate() {
                            Ok(()) => {
                                self.errors.clear();
                                saved = Some(SavedSettings {
                                    settings: self.draft.clone(),
                                    workspace_changed: self.draft.workspace != self.saved_workspace,
                                });
                                close = true;
                            }
                            Err(errors) => self.errors = errors,
                        }
                    }
                    if ui.button(text.test_connection).clicked() {
                        let config = view.stores.config.clone();
                        let api_config = self.draft.api_config();
                        let dispatcher = view.dispatcher.clone();
                        let (valid, invalid) = (text.config_valid, text.config_invalid);
                        view.dispatcher.spawn("validate config", async move {
                            let message = if config.validate_config(&api_config).await { valid } else { invalid };
                            dispatcher.send(AppEvent::Notice(message.to_string()));
                            Ok(())
                        });
                    }
                    if ui.button(text.clear_config).clicked() {
                        view.stores.config.clear_config();
                        self.draft.api_key.clear();
                    }
                    if ui.button(text.cancel).clicked() {
                        close = true;
                    }
                });
            });

        if close || !window_open {
            self.open = false;
        }
        saved
    }
}
