use eframe::egui::{self, RichText, ScrollArea};

use super::View;

#[derive(Debug, Default)]
pub struct EditorPanel {
    buffer: String,
    buffer_id: Option<String>,
}

impl EditorPanel {
    pub fn show(&mut self, ui: &mut egui::Ui, view: &View<'_>) {
        let editor = &view.stores.editor;
        let state = editor.state();
        let text = view.text;

        ui.horizontal_wrapped(|ui| {
            for file in &state.open_files {
                let active = state.active_file_id.as_deref() == Some(file.id.as_str());
                let title = if editor.is_file_dirty(&file.id) {
                    format!("● {}", file.name)
                } else {
                    file.name.clone()
                };
                if ui.selectable_label(active, title).on_hover_text(&file.path).clicked() {
                    editor.set_active_file(&file.id);
                }
                if ui.small_button("×").on_hover_text(text.close).clicked() {
                    editor.close_file(&file.id);
                }
                ui.separator();
            }
        });

        let Some(active) = state.active_file() else {
            self.buffer_id = None;
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new(text.no_open_files).color(view.theme.text_muted));
            });
            return;
        };

        let any_dirty = state.open_files.iter().any(|file| file.is_dirty);
        ui.horizontal(|ui| {
            ui.label(RichText::new(&active.path).small().color(view.theme.text_muted));
            ui.label(RichText::new(&active.language).small().color(view.theme.accent_primary));
            let save_shortcut = ui.input_mut(|input| input.consume_key(egui::Modifiers::COMMAND, egui::Key::S));
            if ui.add_enabled(active.is_dirty, egui::Button::new(text.save)).clicked()
                || (save_shortcut && active.is_dirty)
            {
                let editor = editor.clone();
                let id = active.id.clone();
                view.dispatcher
                    .spawn("save file", async move { editor.save_file(&id).await });
            }
            if ui.add_enabled(any_dirty, egui::Button::new(text.save_all)).clicked() {
                let editor = editor.clone();
                view.dispatcher
                    .spawn("save all files", async move { editor.save_all_files().await });
            }
            if ui.button(text.close_all).clicked() {
                editor.close_all_files();
            }
        });
        ui.separator();

        // The text widget edits a local copy; it is reloaded when the tab changes or the store diverges.
        if self.buffer_id.as_deref() != Some(active.id.as_str()) || self.buffer != active.content {
            self.buffer = active.content.clone();
            self.buffer_id = Some(active.id.clone());
        }

        ScrollArea::both().id_salt("code_editor").show(ui, |ui| {
            let response = ui.add(
                egui::TextEdit::multiline(&mut self.buffer)
                    .code_editor()
                    .desired_width(f32::INFINITY)
                    .desired_rows(30)
                    .lock_focus(true),
            );
            if response.changed() {
                editor.update_file_content(&active.id, self.buffer.clone());
            }
        });
    }
}
