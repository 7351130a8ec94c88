use eframe::egui::{self, RichText, ScrollArea};

use super::View;
use crate::model::{ChatSession, Role};

#[derive(Debug, Default)]
pub struct ChatPanel {
    input: String,
    attach_active_file: bool,
}

fn is_replying(session: Option<&ChatSession>) -> bool {
    session
        .and_then(|session| session.messages.last())
        .is_some_and(|message| message.is_streaming)
}

impl ChatPanel {
    pub fn show(&mut self, ui: &mut egui::Ui, view: &View<'_>) {
        let text = view.text;
        let theme = view.theme;
        let chat = &view.stores.chat;
        let session = chat.current_session();
        let replying = is_replying(session.as_ref());

        ui.horizontal(|ui| {
            ui.heading(text.chat);
            if let Some(session) = &session {
                ui.label(RichText::new(&session.name).color(theme.text_muted));
            }
        });
        ui.separator();

        let transcript_height = (ui.available_height() - 150.0).max(120.0);
        ScrollArea::vertical()
            .id_salt("chat_transcript")
            .max_height(transcript_height)
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let messages = session.as_ref().map(|session| session.messages.as_slice()).unwrap_or_default();
                if messages.is_empty() {
                    ui.label(RichText::new(text.empty_chat).color(theme.text_muted));
                }
                for message in messages {
                    let from_user = message.role == Role::User;
                    let author = if from_user { text.you } else { text.assistant };
                    theme
                        .card_frame()
                        .fill(theme.message_fill(from_user))
                        .show(ui, |ui| {
                            ui.set_width(ui.available_width());
                            ui.label(RichText::new(author).small().strong());
                            let body = if message.is_streaming {
                                format!("{}▌", message.content)
                            } else {
                                message.content.clone()
                            };
                            ui.label(body);
                            for attachment in &message.attachments {
                                ui.label(RichText::new(format!("📎 {attachment}")).small().color(theme.text_muted));
                            }
                        });
                }
            });

        ui.separator();
        let active_path = view.stores.editor.active_file().map(|file| file.path);
        theme.composer_frame().show(ui, |ui| {
            ui.add_enabled(
                !replying,
                egui::TextEdit::multiline(&mut self.input)
                    .hint_text(text.message_hint)
                    .desired_rows(3)
                    .desired_width(f32::INFINITY),
            );
            ui.horizontal(|ui| {
                ui.add_enabled(
                    active_path.is_some(),
                    egui::Checkbox::new(&mut self.attach_active_file, text.attach_active_file),
                );
                if replying {
                    ui.spinner();
                }
                let ready = !replying && !self.input.trim().is_empty();
                let enter = ui.input(|input| input.key_pressed(egui::Key::Enter) && input.modifiers.command);
                if ui.add_enabled(ready, egui::Button::new(text.send)).clicked() || (ready && enter) {
                    let attachments = match (&active_path, self.attach_active_file) {
                        (Some(path), true) => vec![path.clone()],
                        _ => Vec::new(),
                    };
                    self.send(view, attachments);
                }
            });
        });
    }

    /// Sends the composer text, creating a session first when none is current.
    fn send(&mut self, view: &View<'_>, attachments: Vec<String>) {
        let content = std::mem::take(&mut self.input).trim().to_string();
        let chat = view.stores.chat.clone();
        let session_name = view.text.new_chat.to_string();
        view.dispatcher.spawn("send message", async move {
            let session_id = match chat.current_session_id() {
                Some(session_id) => session_id,
                None => chat.create_session(&session_name).await?,
            };
            chat.send_message(&session_id, &content, attachments).await
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChatMessage;

    #[test]
    fn replying_tracks_last_message_flag() {
        let mut session = ChatSession::new("s", "S");
        assert!(!is_replying(Some(&session)));
        session.messages.push(ChatMessage::user("hi", Vec::new()));
        session.messages.push(ChatMessage::assistant_placeholder());
        assert!(is_replying(Some(&session)));
        assert!(!is_replying(None));
    }

    #[tokio::test]
    async fn composer_unlocks_after_failed_send() {
        use crate::host::local::tests::local_host;
        use crate::store::{no_hook, ChatStore};
        use std::sync::Arc;

        let (_data, _workspace, host) = local_host("cowork-missing-assistant-binary");
        let chat = ChatStore::new(Arc::new(host), no_hook());
        let session_id = chat.create_session("Chat").await.expect("create");

        assert!(chat.send_message(&session_id, "hi", Vec::new()).await.is_err());
        let session = chat.current_session();
        assert_eq!(session.as_ref().map(|session| session.messages.len()), Some(2));
        assert!(!is_replying(session.as_ref()));
    }
}
