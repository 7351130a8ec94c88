use eframe::egui::{self, RichText};

use super::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WelcomeChoice {
    GetStarted,
    Skip,
}

/// First-visit window; returns the user's choice once a button is pressed.
pub fn show(ctx: &egui::Context, view: &View<'_>) -> Option<WelcomeChoice> {
    let text = view.text;
    let mut choice = None;

    egui::Window::new(text.welcome)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(RichText::new(text.welcome_body).color(view.theme.text_muted));
            ui.add_space(view.theme.spacing_12);
            ui.horizontal(|ui| {
                for feature in [text.files, text.chat, text.skills] {
                    view.theme.card_frame().show(ui, |ui| {
                        ui.strong(feature);
                    });
                }
            });
            ui.add_space(view.theme.spacing_12);
            ui.horizontal(|ui| {
                if ui.button(RichText::new(text.get_started).strong()).clicked() {
                    choice = Some(WelcomeChoice::GetStarted);
                }
                if ui.button(text.skip).clicked() {
                    choice = Some(WelcomeChoice::Skip);
                }
            });
        });

    choice
}
