//! Chat sessions and the streaming send flow.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ChangeHook, StoreCell};
use crate::error::{HostError, Result};
use crate::host::{SendRequest, SessionAccess};
use crate::model::{ChatMessage, ChatSession};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub sessions: Vec<ChatSession>,
    pub current_session_id: Option<String>,
    pub is_loading: bool,
}

impl ChatState {
    fn session_mut(&mut self, session_id: &str) -> Option<&mut ChatSession> {
        self.sessions.iter_mut().find(|session| session.id == session_id)
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        let current = self.current_session_id.as_deref()?;
        self.sessions.iter().find(|session| session.id == current)
    }
}

/// The `chat-storage` subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSnapshot {
    pub sessions: Vec<ChatSession>,
    pub current_session_id: Option<String>,
}

#[derive(Clone)]
pub struct ChatStore {
    cell: StoreCell<ChatState>,
    host: Arc<dyn SessionAccess>,
}

impl ChatStore {
    pub fn new(host: Arc<dyn SessionAccess>, hook: ChangeHook) -> Self {
        Self {
            cell: StoreCell::new(ChatState::default(), hook),
            host,
        }
    }

    pub fn state(&self) -> ChatState {
        self.cell.snapshot()
    }

    pub fn sessions(&self) -> Vec<ChatSession> {
        self.cell.read(|state| state.sessions.clone())
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.cell.read(|state| state.current_session_id.clone())
    }

    pub fn current_session(&self) -> Option<ChatSession> {
        self.cell.read(|state| state.current_session().cloned())
    }

    pub fn session(&self, session_id: &str) -> Option<ChatSession> {
        self.cell.read(|state| {
            state
                .sessions
                .iter()
                .find(|session| session.id == session_id)
                .cloned()
        })
    }

    pub fn is_loading(&self) -> bool {
        self.cell.read(|state| state.is_loading)
    }

    pub fn set_loading(&self, loading: bool) {
        self.cell.update(|state| state.is_loading = loading);
    }

    pub async fn load_sessions(&self) -> Result<()> {
        tracing::info!("loading chat sessions");
        self.set_loading(true);
        match self.host.list_sessions().await {
            Ok(sessions) => {
                let count = sessions.len();
                self.cell.update(|state| {
                    state.sessions = sessions;
                    state.is_loading = false;
                });
                tracing::info!(count, "chat sessions loaded");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load chat sessions");
                self.set_loading(false);
                Err(err)
            }
        }
    }

    /// Creates a session on the host, appends it and makes it current.
    pub async fn create_session(&self, name: &str) -> Result<String> {
        tracing::info!(name, "creating chat session");
        self.set_loading(true);
        match self.host.create_session(name).await {
            Ok(session_id) => {
                let session = ChatSession::new(session_id.clone(), name);
                self.cell.update(|state| {
                    state.sessions.push(session);
                    state.current_session_id = Some(session_id.clone());
                    state.is_loading = false;
                });
                tracing::info!(session_id = %session_id, name, "chat session created");
                Ok(session_id)
            }
            Err(err) => {
                tracing::error!(name, error = %err, "failed to create chat session");
                self.set_loading(false);
                Err(err)
            }
        }
    }

    pub fn insert_session(&self, session: ChatSession) {
        self.cell.update(|state| {
            state.current_session_id = Some(session.id.clone());
            state.sessions.push(session);
        });
    }

    /// Unknown ids leave the current session untouched.
    pub fn switch_session(&self, session_id: &str) {
        self.cell.update(|state| {
            if state.sessions.iter().any(|session| session.id == session_id) {
                tracing::info!(session_id, "switching chat session");
                state.current_session_id = Some(session_id.to_string());
            } else {
                tracing::warn!(session_id, "attempted to switch to non-existent session");
            }
        });
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        tracing::info!(session_id, "deleting chat session");
        self.set_loading(true);
        if let Err(err) = self.host.delete_session(session_id).await {
            tracing::error!(session_id, error = %err, "failed to delete chat session");
            self.set_loading(false);
            return Err(err);
        }

        self.cell.update(|state| {
            state.sessions.retain(|session| session.id != session_id);
            if state.current_session_id.as_deref() == Some(session_id) {
                state.current_session_id = state.sessions.first().map(|session| session.id.clone());
            }
            state.is_loading = false;
        });
        tracing::info!(session_id, "chat session deleted");
        Ok(())
    }

    pub fn add_message(&self, session_id: &str, message: ChatMessage) {
        tracing::debug!(session_id, message_id = %message.id, "adding message");
        self.cell.update(|state| match state.session_mut(session_id) {
            Some(session) => {
                session.messages.push(message);
                session.touch();
            }
            None => tracing::warn!(session_id, "message added to unknown session"),
        });
    }

    /// Replaces the content of a message; the streaming flag is left as is.
    pub fn update_message(&self, session_id: &str, message_id: &str, content: impl Into<String>) {
        let content = content.into();
        self.cell.update(|state| {
            if let Some(session) = state.session_mut(session_id) {
                if let Some(message) = session.message_mut(message_id) {
                    message.content = content;
                    session.touch();
                }
            }
        });
    }

    pub fn finish_message(&self, session_id: &str, message_id: &str) {
        tracing::debug!(session_id, message_id, "message finished streaming");
        self.cell.update(|state| {
            if let Some(session) = state.session_mut(session_id) {
                if let Some(message) = session.message_mut(message_id) {
                    message.is_streaming = false;
                    session.touch();
                }
            }
        });
    }

    /// Sends `content` and streams the reply into a new assistant message.
    ///
    /// Resolves once the reply is complete. The stream subscription is
    /// opened before the request goes out and dropped on every return path.
    /// Messages already appended stay in place when the send fails.
    pub async fn send_message(&self, session_id: &str, content: &str, attachments: Vec<String>) -> Result<()> {
        tracing::info!(session_id, attachments = attachments.len(), "sending message");
        if self.session(session_id).is_none() {
            return Err(HostError::not_found("session", session_id));
        }

        self.add_message(session_id, ChatMessage::user(content, attachments.clone()));
        let placeholder = ChatMessage::assistant_placeholder();
        let message_id = placeholder.id.clone();
        self.add_message(session_id, placeholder);

        let mut subscription = self.host.subscribe(session_id, &message_id);

        let request = SendRequest {
            session_id: session_id.to_string(),
            message_id: message_id.clone(),
            content: content.to_string(),
            attachments,
        };
        if let Err(err) = self.host.send_message(request).await {
            tracing::error!(session_id, error = %err, "failed to send message");
            self.finish_message(session_id, &message_id);
            return Err(err);
        }
        if let Err(err) = self.save(session_id).await {
            self.finish_message(session_id, &message_id);
            return Err(err);
        }

        while let Some(event) = subscription.next().await {
            self.update_message(session_id, &message_id, event.content);
        }
        tracing::debug!(
            message_id = subscription.message_id(),
            finished = subscription.is_finished(),
            "reply stream ended"
        );
        drop(subscription);

        self.finish_message(session_id, &message_id);
        self.save(session_id).await?;
        tracing::info!(session_id, message_id = %message_id, "message sent");
        Ok(())
    }

    async fn save(&self, session_id: &str) -> Result<()> {
        let Some(session) = self.session(session_id) else {
            tracing::warn!(session_id, "session vanished before it could be saved");
            return Ok(());
        };
        self.host.save_session(&session).await.inspect_err(|err| {
            tracing::error!(session_id, error = %err, "failed to save session");
        })
    }

    pub fn clear_current_session(&self) {
        tracing::info!("clearing current session");
        self.cell.update(|state| state.current_session_id = None);
    }

    pub fn persisted(&self) -> ChatSnapshot {
        self.cell.read(|state| ChatSnapshot {
            sessions: state.sessions.clone(),
            current_session_id: state.current_session_id.clone(),
        })
    }

    /// No reply is in flight at startup, so restored messages are never streaming.
    pub fn hydrate(&self, snapshot: ChatSnapshot) {
        let mut sessions = snapshot.sessions;
        for message in sessions.iter_mut().flat_map(|session| session.messages.iter_mut()) {
            message.is_streaming = false;
        }
        self.cell.update(|state| {
            state.sessions = sessions;
            state.current_session_id = snapshot.current_session_id;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{StreamEvent, StreamHub, StreamSubscription};
    use crate::model::Role;
    use crate::store::no_hook;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed list of cumulative chunks, plus one event for another message.
    #[derive(Default)]
    struct ScriptedSessions {
        hub: StreamHub,
        chunks: Vec<&'static str>,
        fail_send: bool,
        fail_save: bool,
        saved: Mutex<Vec<ChatSession>>,
        deleted: Mutex<Vec<String>>,
    }

    impl ScriptedSessions {
        fn replying(chunks: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                chunks,
                ..Self::default()
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail_send: true,
                ..Self::default()
            })
        }

        fn unsaveable(chunks: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                chunks,
                fail_save: true,
                ..Self::default()
            })
        }

        fn last_saved(&self) -> ChatSession {
            self.saved.lock().unwrap().last().cloned().expect("a saved session")
        }
    }

    #[async_trait]
    impl SessionAccess for ScriptedSessions {
        async fn create_session(&self, name: &str) -> Result<String> {
            Ok(format!("id-{name}"))
        }

        async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
            Ok(vec![ChatSession::new("a", "A"), ChatSession::new("b", "B")])
        }

        async fn load_session(&self, session_id: &str) -> Result<ChatSession> {
            Err(HostError::not_found("session", session_id))
        }

        async fn save_session(&self, session: &ChatSession) -> Result<()> {
            if self.fail_save {
                return Err(HostError::Storage("disk full".to_string()));
            }
            self.saved.lock().unwrap().push(session.clone());
            Ok(())
        }

        async fn delete_session(&self, session_id: &str) -> Result<()> {
            self.deleted.lock().unwrap().push(session_id.to_string());
            Ok(())
        }

        async fn send_message(&self, request: SendRequest) -> Result<()> {
            if self.fail_send {
                return Err(HostError::Assistant("offline".to_string()));
            }
            self.hub.publish(StreamEvent {
                session_id: request.session_id.clone(),
                message_id: "someone-else".to_string(),
                content: "ignored".to_string(),
                done: true,
            });
            let last = self.chunks.len().saturating_sub(1);
            for (index, chunk) in self.chunks.iter().enumerate() {
                self.hub.publish(StreamEvent {
                    session_id: request.session_id.clone(),
                    message_id: request.message_id.clone(),
                    content: chunk.to_string(),
                    done: index == last,
                });
            }
            Ok(())
        }

        fn subscribe(&self, session_id: &str, message_id: &str) -> StreamSubscription {
            self.hub.subscribe(session_id, message_id)
        }
    }

    fn store_with(host: Arc<ScriptedSessions>) -> ChatStore {
        let store = ChatStore::new(host, no_hook());
        store.insert_session(ChatSession::new("s-1", "Chat"));
        store
    }

    #[tokio::test]
    async fn reply_streams_into_placeholder_until_done() {
        let host = ScriptedSessions::replying(vec!["Hel", "Hello", "Hello there"]);
        let store = store_with(host.clone());

        store
            .send_message("s-1", "hi", vec!["src/main.rs".to_string()])
            .await
            .expect("send");

        let session = store.session("s-1").expect("session");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].attachments, vec!["src/main.rs".to_string()]);
        let reply = &session.messages[1];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "Hello there");
        assert!(!reply.is_streaming);

        let saved = host.last_saved();
        assert_eq!(saved.messages[1].content, "Hello there");
        assert!(!saved.messages[1].is_streaming);
        assert_eq!(host.saved.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_send_keeps_appended_messages() {
        let store = store_with(ScriptedSessions::failing());
        let error = store.send_message("s-1", "hi", Vec::new()).await.expect_err("send fails");
        assert!(matches!(error, HostError::Assistant(_)));

        let session = store.session("s-1").expect("session");
        assert_eq!(session.messages.len(), 2);
        assert!(!session.messages[1].is_streaming);
        assert!(session.messages[1].content.is_empty());
    }

    #[tokio::test]
    async fn session_accepts_new_sends_after_a_failure() {
        let store = store_with(ScriptedSessions::failing());
        assert!(store.send_message("s-1", "first", Vec::new()).await.is_err());
        assert!(store.send_message("s-1", "second", Vec::new()).await.is_err());

        let session = store.session("s-1").expect("session");
        assert_eq!(session.messages.len(), 4);
        assert!(session.messages.iter().all(|message| !message.is_streaming));
        assert_eq!(session.messages[2].content, "second");
    }

    #[tokio::test]
    async fn failed_save_after_send_clears_streaming_flag() {
        let store = store_with(ScriptedSessions::unsaveable(vec!["late"]));
        let error = store.send_message("s-1", "hi", Vec::new()).await.expect_err("save fails");
        assert!(matches!(error, HostError::Storage(_)));
        let session = store.session("s-1").expect("session");
        assert!(!session.messages[1].is_streaming);
    }

    #[test]
    fn hydrated_messages_are_not_streaming() {
        let mut session = ChatSession::new("s-1", "Restored");
        session.messages.push(ChatMessage::user("hi", Vec::new()));
        session.messages.push(ChatMessage::assistant_placeholder());
        let store = ChatStore::new(ScriptedSessions::replying(Vec::new()), no_hook());

        store.hydrate(ChatSnapshot {
            sessions: vec![session],
            current_session_id: Some("s-1".to_string()),
        });
        let restored = store.current_session().expect("current session");
        assert!(restored.messages.iter().all(|message| !message.is_streaming));
    }

    #[tokio::test]
    async fn send_to_unknown_session_is_not_found() {
        let store = store_with(ScriptedSessions::replying(vec!["x"]));
        let error = store.send_message("nope", "hi", Vec::new()).await.expect_err("unknown");
        assert!(error.is_not_found());
        assert!(store.session("s-1").expect("session").messages.is_empty());
    }

    #[tokio::test]
    async fn switching_to_unknown_session_keeps_current() {
        let store = store_with(ScriptedSessions::replying(Vec::new()));
        store.switch_session("missing");
        assert_eq!(store.current_session_id().as_deref(), Some("s-1"));
    }

    #[tokio::test]
    async fn deleting_current_session_selects_first_remaining() {
        let host = ScriptedSessions::replying(Vec::new());
        let store = ChatStore::new(host.clone(), no_hook());
        store.load_sessions().await.expect("load");
        store.create_session("C").await.expect("create");
        assert_eq!(store.current_session_id().as_deref(), Some("id-C"));

        store.delete_session("id-C").await.expect("delete");
        assert_eq!(store.current_session_id().as_deref(), Some("a"));
        assert_eq!(host.deleted.lock().unwrap().as_slice(), ["id-C".to_string()]);

        store.delete_session("b").await.expect("delete other");
        assert_eq!(store.current_session_id().as_deref(), Some("a"));
        store.delete_session("a").await.expect("delete last");
        assert_eq!(store.current_session_id(), None);
        assert!(!store.is_loading());
    }

    #[test]
    fn update_keeps_streaming_flag_and_finish_clears_it() {
        let store = store_with(ScriptedSessions::replying(Vec::new()));
        let placeholder = ChatMessage::assistant_placeholder();
        let id = placeholder.id.clone();
        store.add_message("s-1", placeholder);

        store.update_message("s-1", &id, "partial");
        let message = store.session("s-1").expect("session").messages[0].clone();
        assert_eq!(message.content, "partial");
        assert!(message.is_streaming);

        store.finish_message("s-1", &id);
        assert!(!store.session("s-1").expect("session").messages[0].is_streaming);
    }

    #[test]
    fn clearing_current_session_keeps_sessions() {
        let store = store_with(ScriptedSessions::replying(Vec::new()));
        store.clear_current_session();
        assert_eq!(store.current_session(), None);
        assert_eq!(store.sessions().len(), 1);
    }
}
