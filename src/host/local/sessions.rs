use async_trait::async_trait;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use uuid::Uuid;

use super::{blocking, ensure_safe_id, read_json_file, write_json_file, LocalHost};
use crate::error::{HostError, Result};
use crate::host::stream::{StreamEvent, StreamHub, StreamSubscription};
use crate::host::{SendRequest, SessionAccess};
use crate::model::ChatSession;

impl LocalHost {
    fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        let id = ensure_safe_id("session", session_id)?;
        Ok(self.sessions_dir().join(format!("{id}.json")))
    }

    fn assistant_command(&self, request: &SendRequest) -> Result<Command> {
        let mut prompt = request.content.clone();
        if !request.attachments.is_empty() {
            prompt.push_str("\n\nAttached files:");
            for attachment in &request.attachments {
                prompt.push_str("\n- ");
                prompt.push_str(attachment);
            }
        }

        let mut command = Command::new(&self.assistant.program);
        command
            .args(&self.assistant.args)
            .arg(prompt)
            .current_dir(&self.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(config) = self.read_config()? {
            command.env("COWORK_API_KEY", &config.api_key);
            if let Some(endpoint) = &config.api_endpoint {
                command.env("COWORK_API_ENDPOINT", endpoint);
            }
        }
        Ok(command)
    }
}

fn load_all(dir: PathBuf) -> Vec<ChatSession> {
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "failed to read sessions directory");
            return Vec::new();
        }
    };

    let mut sessions = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension() != Some(OsStr::new("json")) {
            continue;
        }
        match read_json_file::<ChatSession>(&path) {
            Ok(Some(session)) => sessions.push(session),
            Ok(None) => {}
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "skipping session file"),
        }
    }

    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    sessions
}

/// Streams the assistant's stdout as cumulative content, then a final `done` event.
async fn pump_reply(mut child: tokio::process::Child, hub: StreamHub, session_id: String, message_id: String) {
    let event = |content: &str, done: bool| StreamEvent {
        session_id: session_id.clone(),
        message_id: message_id.clone(),
        content: content.to_string(),
        done,
    };

    let stderr_task = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buffer = String::new();
            let _ = stderr.read_to_string(&mut buffer).await;
            buffer
        })
    });

    let mut reply = String::new();
    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if !reply.is_empty() {
                        reply.push('\n');
                    }
                    reply.push_str(&line);
                    hub.publish(event(&reply, false));
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::error!(message_id = %message_id, error = %err, "failed to read assistant output");
                    break;
                }
            }
        }
    }

    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    match child.wait().await {
        Ok(status) if status.success() => {
            tracing::info!(message_id = %message_id, bytes = reply.len(), "assistant reply complete");
        }
        Ok(status) => {
            tracing::error!(message_id = %message_id, %status, stderr = %stderr.trim(), "assistant exited with failure");
            if !reply.is_empty() {
                reply.push_str("\n\n");
            }
            reply.push_str(&format!("[assistant exited with {status}] {}", stderr.trim()));
        }
        Err(err) => {
            tracing::error!(message_id = %message_id, error = %err, "failed to wait for assistant");
        }
    }

    hub.publish(event(reply.trim_end(), true));
}

#[async_trait]
impl SessionAccess for LocalHost {
    async fn create_session(&self, name: &str) -> Result<String> {
        tracing::debug!(name, "creating session");
        let session = ChatSession::new(Uuid::new_v4().to_string(), name);
        write_json_file(&self.session_path(&session.id)?, &session)?;
        tracing::info!(session_id = %session.id, name, "session created");
        Ok(session.id)
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        tracing::debug!("listing sessions");
        let dir = self.sessions_dir();
        let sessions = blocking(move || Ok(load_all(dir))).await?;
        tracing::info!(count = sessions.len(), "sessions listed");
        Ok(sessions)
    }

    async fn load_session(&self, session_id: &str) -> Result<ChatSession> {
        tracing::debug!(session_id, "loading session");
        let session: ChatSession = read_json_file(&self.session_path(session_id)?)?
            .ok_or_else(|| HostError::not_found("session", session_id))?;
        tracing::info!(session_id, "session loaded");
        Ok(session)
    }

    async fn save_session(&self, session: &ChatSession) -> Result<()> {
        tracing::debug!(session_id = %session.id, "saving session");
        write_json_file(&self.session_path(&session.id)?, session)?;
        tracing::info!(session_id = %session.id, messages = session.messages.len(), "session saved");
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        tracing::debug!(session_id, "deleting session");
        let path = self.session_path(session_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::info!(session_id, "session deleted"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(session_id, "session file already gone");
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    async fn send_message(&self, request: SendRequest) -> Result<()> {
        tracing::debug!(
            session_id = %request.session_id,
            message_id = %request.message_id,
            attachments = request.attachments.len(),
            "sending message"
        );

        let child = self
            .assistant_command(&request)?
            .spawn()
            .map_err(|err| {
                HostError::Assistant(format!("failed to start '{}': {err}", self.assistant.program))
            })?;

        tokio::spawn(pump_reply(
            child,
            self.hub.clone(),
            request.session_id.clone(),
            request.message_id.clone(),
        ));

        tracing::info!(session_id = %request.session_id, "message accepted by assistant");
        Ok(())
    }

    fn subscribe(&self, session_id: &str, message_id: &str) -> StreamSubscription {
        self.hub.subscribe(session_id, message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::local_host;
    use super::*;
    use crate::model::ChatMessage;

    #[tokio::test]
    async fn sessions_persist_and_list_newest_first() {
        let (_data, _workspace, host) = local_host("echo");
        let first = host.create_session("First").await.expect("create first");
        let second = host.create_session("Second").await.expect("create second");

        let mut loaded = host.load_session(&first).await.expect("load first");
        loaded.messages.push(ChatMessage::user("hello", Vec::new()));
        loaded.updated_at += 10_000;
        host.save_session(&loaded).await.expect("save first");

        let sessions = host.list_sessions().await.expect("list");
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![first.as_str(), second.as_str()]);
        assert_eq!(sessions[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_session_files_are_skipped() {
        let (data, _workspace, host) = local_host("echo");
        host.create_session("Good").await.expect("create");
        fs::write(data.path().join("sessions/broken.json"), "{").expect("write corrupt file");

        let sessions = host.list_sessions().await.expect("list");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "Good");
    }

    #[tokio::test]
    async fn loading_unknown_session_is_not_found_and_delete_is_idempotent() {
        let (_data, _workspace, host) = local_host("echo");
        let error = host.load_session("missing").await.expect_err("unknown id");
        assert!(error.is_not_found());
        host.delete_session("missing").await.expect("delete of missing id is ok");

        let error = host.load_session("../etc").await.expect_err("unsafe id");
        assert!(matches!(error, HostError::InvalidArgument(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn assistant_stdout_streams_as_cumulative_content() {
        let (_data, _workspace, host) = local_host("echo");
        let session_id = host.create_session("Chat").await.expect("create");
        let mut subscription = host.subscribe(&session_id, "msg-1");

        host.send_message(SendRequest {
            session_id: session_id.clone(),
            message_id: "msg-1".to_string(),
            content: "hello there".to_string(),
            attachments: Vec::new(),
        })
        .await
        .expect("send should be accepted");

        let mut last = None;
        while let Some(event) = subscription.next().await {
            last = Some(event);
        }
        let last = last.expect("at least the done event");
        assert!(last.done);
        assert_eq!(last.content, "hello there");
    }

    #[tokio::test]
    async fn missing_assistant_program_fails_the_send() {
        let (_data, _workspace, host) = local_host("cowork-no-such-assistant-binary");
        let error = host
            .send_message(SendRequest {
                session_id: "s".to_string(),
                message_id: "m".to_string(),
                content: "hi".to_string(),
                attachments: Vec::new(),
            })
            .await
            .expect_err("spawn should fail");
        assert!(matches!(error, HostError::Assistant(_)));
    }
}
