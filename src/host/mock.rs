//! Stand-in host for running without the local machine's services.
//!
//! Configuration and chat sessions persist in local storage; everything
//! else answers with fixed sample data.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use super::stream::{StreamEvent, StreamHub, StreamSubscription};
use super::{ConfigAccess, FileAccess, SendRequest, SessionAccess, SkillsAccess};
use crate::error::{HostError, Result};
use crate::model::{
    ApiConfig, ChatSession, FileTreeNode, NewSkill, Skill, SkillCategory, SkillPack, SkillUpdate,
};
use crate::storage::{self, KeyValueStorage};

pub const OFFLINE_REPLY: &str =
    "The assistant is not available in mock mode. Start with COWORK_HOST=local to chat.";

pub struct MockHost {
    storage: Arc<dyn KeyValueStorage>,
    hub: StreamHub,
}

impl MockHost {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        tracing::warn!("using mock host; files and assistant replies are simulated");
        Self {
            storage,
            hub: StreamHub::new(),
        }
    }

    fn sessions(&self) -> Result<Vec<ChatSession>> {
        Ok(storage::load_json(self.storage.as_ref(), storage::CHAT_SESSIONS)?.unwrap_or_default())
    }

    fn store_sessions(&self, sessions: &[ChatSession]) -> Result<()> {
        storage::save_json(self.storage.as_ref(), storage::CHAT_SESSIONS, sessions)
    }
}

#[async_trait]
impl FileAccess for MockHost {
    async fn read_file(&self, path: &str) -> Result<String> {
        tracing::debug!(path, "mock read");
        Ok(format!("// Mock content for {path}"))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        tracing::info!(path, bytes = content.len(), "mock file written");
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        tracing::info!(path, "mock file deleted");
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<FileTreeNode>> {
        tracing::debug!(path, "mock listing");
        let root = path.trim_end_matches('/');
        Ok(vec![FileTreeNode::folder(
            format!("{root}/src"),
            vec![FileTreeNode::file(format!("{root}/src/index.ts"))],
        )])
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        tracing::info!(path, "mock directory created");
        Ok(())
    }

    async fn rename_file(&self, old_path: &str, new_path: &str) -> Result<()> {
        tracing::info!(old_path, new_path, "mock file renamed");
        Ok(())
    }

    async fn select_directory(&self) -> Result<Option<String>> {
        Ok(Some("/mock/workspace".to_string()))
    }

    async fn file_exists(&self, _path: &str) -> Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl ConfigAccess for MockHost {
    async fn load_config(&self) -> Result<Option<ApiConfig>> {
        let config: Option<ApiConfig> = storage::load_json(self.storage.as_ref(), storage::API_CONFIG)?;
        tracing::info!(has_config = config.is_some(), "mock config loaded from local storage");
        Ok(config)
    }

    async fn save_config(&self, config: &ApiConfig) -> Result<()> {
        storage::save_json(self.storage.as_ref(), storage::API_CONFIG, config)?;
        tracing::info!(provider = ?config.provider, "mock config saved to local storage");
        Ok(())
    }

    async fn validate_config(&self, config: &ApiConfig) -> Result<bool> {
        Ok(!config.api_key.is_empty())
    }

    async fn update_api_key(&self, api_key: &str) -> Result<()> {
        let existing: Option<ApiConfig> = storage::load_json(self.storage.as_ref(), storage::API_CONFIG)?;
        if let Some(mut config) = existing {
            config.api_key = api_key.to_string();
            storage::save_json(self.storage.as_ref(), storage::API_CONFIG, &config)?;
            tracing::info!("mock API key updated in local storage");
        }
        Ok(())
    }
}

#[async_trait]
impl SessionAccess for MockHost {
    async fn create_session(&self, name: &str) -> Result<String> {
        let session_id = format!("session-{}", Uuid::new_v4().simple());
        tracing::info!(session_id = %session_id, name, "mock session created");
        Ok(session_id)
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let sessions = self.sessions()?;
        tracing::info!(count = sessions.len(), "mock sessions loaded from local storage");
        Ok(sessions)
    }

    async fn load_session(&self, session_id: &str) -> Result<ChatSession> {
        self.sessions()?
            .into_iter()
            .find(|session| session.id == session_id)
            .ok_or_else(|| HostError::not_found("session", session_id))
    }

    async fn save_session(&self, session: &ChatSession) -> Result<()> {
        let mut sessions = self.sessions()?;
        match sessions.iter_mut().find(|existing| existing.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }
        self.store_sessions(&sessions)?;
        tracing::info!(session_id = %session.id, "mock session saved to local storage");
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions()?;
        sessions.retain(|session| session.id != session_id);
        self.store_sessions(&sessions)?;
        tracing::info!(session_id, "mock session deleted from local storage");
        Ok(())
    }

    async fn send_message(&self, request: SendRequest) -> Result<()> {
        tracing::warn!(session_id = %request.session_id, "using mock chat service");
        self.hub.publish(StreamEvent {
            session_id: request.session_id,
            message_id: request.message_id,
            content: OFFLINE_REPLY.to_string(),
            done: true,
        });
        Ok(())
    }

    fn subscribe(&self, session_id: &str, message_id: &str) -> StreamSubscription {
        self.hub.subscribe(session_id, message_id)
    }
}

#[async_trait]
impl SkillsAccess for MockHost {
    async fn load_skills(&self) -> Result<Vec<Skill>> {
        tracing::warn!("using mock skills service");
        Ok(vec![Skill {
            id: "1".to_string(),
            name: "Mock Skill".to_string(),
            description: "A mock skill for development".to_string(),
            category: SkillCategory::Official,
            path: "/skills/mock".to_string(),
            content: "skill content".to_string(),
            metadata: BTreeMap::new(),
        }])
    }

    async fn load_skill_packs(&self) -> Result<Vec<SkillPack>> {
        Ok(Vec::new())
    }

    async fn create_skill(&self, skill: &NewSkill) -> Result<String> {
        let skill_id = format!("skill-{}", Uuid::new_v4().simple());
        tracing::info!(skill_id = %skill_id, name = %skill.name, "mock skill created");
        Ok(skill_id)
    }

    async fn update_skill(&self, skill_id: &str, _update: &SkillUpdate) -> Result<()> {
        tracing::info!(skill_id, "mock skill updated");
        Ok(())
    }

    async fn delete_skill(&self, skill_id: &str) -> Result<()> {
        tracing::info!(skill_id, "mock skill deleted");
        Ok(())
    }

    async fn install_skill_pack(&self, pack_path: &str) -> Result<String> {
        let pack_id = format!("pack-{}", Uuid::new_v4().simple());
        tracing::info!(pack_id = %pack_id, pack_path, "mock skill pack installed");
        Ok(pack_id)
    }

    async fn uninstall_skill_pack(&self, pack_id: &str) -> Result<()> {
        tracing::info!(pack_id, "mock skill pack uninstalled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provider;
    use crate::storage::MemoryStorage;

    fn mock() -> (Arc<MemoryStorage>, MockHost) {
        let storage = Arc::new(MemoryStorage::new());
        let host = MockHost::new(storage.clone());
        (storage, host)
    }

    #[tokio::test]
    async fn sessions_upsert_into_local_storage() {
        let (storage, host) = mock();
        let mut session = ChatSession::new("s-1", "Demo");
        host.save_session(&session).await.expect("insert");
        session.name = "Renamed".to_string();
        host.save_session(&session).await.expect("update");

        let stored: Vec<ChatSession> = storage::load_json(storage.as_ref(), storage::CHAT_SESSIONS)
            .expect("decode")
            .expect("present");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Renamed");

        host.delete_session("s-1").await.expect("delete");
        assert!(host.list_sessions().await.expect("list").is_empty());
        assert!(host.load_session("s-1").await.expect_err("gone").is_not_found());
    }

    #[tokio::test]
    async fn api_key_update_requires_existing_config() {
        let (_storage, host) = mock();
        host.update_api_key("k").await.expect("no-op");
        assert_eq!(host.load_config().await.expect("load"), None);

        host.save_config(&ApiConfig {
            provider: Provider::ChatGlm,
            api_key: "old".to_string(),
            api_endpoint: None,
        })
        .await
        .expect("save");
        host.update_api_key("new").await.expect("update");
        let config = host.load_config().await.expect("load").expect("present");
        assert_eq!(config.api_key, "new");
    }

    #[tokio::test]
    async fn send_finishes_the_stream_with_offline_reply() {
        let (_storage, host) = mock();
        let mut subscription = host.subscribe("s-1", "m-1");
        host.send_message(SendRequest {
            session_id: "s-1".to_string(),
            message_id: "m-1".to_string(),
            content: "hi".to_string(),
            attachments: Vec::new(),
        })
        .await
        .expect("send");

        let event = subscription.next().await.expect("one event");
        assert!(event.done);
        assert_eq!(event.content, OFFLINE_REPLY);
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn listing_returns_sample_tree_under_root() {
        let (_storage, host) = mock();
        let nodes = host.list_directory("/ws/").await.expect("list");
        assert_eq!(nodes[0].path, "/ws/src");
        assert_eq!(
            host.read_file("/ws/a.rs").await.expect("read"),
            "// Mock content for /ws/a.rs"
        );
    }
}
