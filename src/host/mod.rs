//! Capabilities the stores depend on.
//!
//! Each resource (files, configuration, chat sessions, skills) is a trait.
//! A [`Host`] bundles one implementation of each and is chosen once at
//! startup: [`LocalHost`] talks to the real filesystem and the assistant
//! process, [`MockHost`] answers from local storage.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::CoworkConfig;
use crate::error::Result;
use crate::model::{ApiConfig, ChatSession, FileTreeNode, NewSkill, Skill, SkillPack, SkillUpdate};
use crate::storage::KeyValueStorage;

pub mod local;
pub mod mock;
pub mod paths;
pub mod stream;

pub use local::LocalHost;
pub use mock::MockHost;
pub use stream::{StreamEvent, StreamHub, StreamSubscription};

#[async_trait]
pub trait FileAccess: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<String>;
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;
    async fn delete_file(&self, path: &str) -> Result<()>;
    async fn list_directory(&self, path: &str) -> Result<Vec<FileTreeNode>>;
    async fn create_directory(&self, path: &str) -> Result<()>;
    async fn rename_file(&self, old_path: &str, new_path: &str) -> Result<()>;
    /// `Ok(None)` when the user cancelled.
    async fn select_directory(&self) -> Result<Option<String>>;
    async fn file_exists(&self, path: &str) -> Result<bool>;
}

#[async_trait]
pub trait ConfigAccess: Send + Sync {
    async fn load_config(&self) -> Result<Option<ApiConfig>>;
    async fn save_config(&self, config: &ApiConfig) -> Result<()>;
    async fn validate_config(&self, config: &ApiConfig) -> Result<bool>;
    async fn update_api_key(&self, api_key: &str) -> Result<()>;
}

/// A prompt for the assistant; `message_id` names the placeholder the reply streams into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub session_id: String,
    pub message_id: String,
    pub content: String,
    pub attachments: Vec<String>,
}

#[async_trait]
pub trait SessionAccess: Send + Sync {
    async fn create_session(&self, name: &str) -> Result<String>;
    async fn list_sessions(&self) -> Result<Vec<ChatSession>>;
    async fn load_session(&self, session_id: &str) -> Result<ChatSession>;
    async fn save_session(&self, session: &ChatSession) -> Result<()>;
    async fn delete_session(&self, session_id: &str) -> Result<()>;
    /// Resolves once the request is accepted; the reply arrives as stream events.
    async fn send_message(&self, request: SendRequest) -> Result<()>;
    fn subscribe(&self, session_id: &str, message_id: &str) -> StreamSubscription;
}

#[async_trait]
pub trait SkillsAccess: Send + Sync {
    async fn load_skills(&self) -> Result<Vec<Skill>>;
    async fn load_skill_packs(&self) -> Result<Vec<SkillPack>>;
    async fn create_skill(&self, skill: &NewSkill) -> Result<String>;
    async fn update_skill(&self, skill_id: &str, update: &SkillUpdate) -> Result<()>;
    async fn delete_skill(&self, skill_id: &str) -> Result<()>;
    async fn install_skill_pack(&self, pack_path: &str) -> Result<String>;
    async fn uninstall_skill_pack(&self, pack_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Local,
    Mock,
}

impl HostKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Local => "Local host",
            Self::Mock => "Mock host",
        }
    }
}

#[derive(Clone)]
pub struct Host {
    pub kind: HostKind,
    pub files: Arc<dyn FileAccess>,
    pub config: Arc<dyn ConfigAccess>,
    pub sessions: Arc<dyn SessionAccess>,
    pub skills: Arc<dyn SkillsAccess>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").field("kind", &self.kind).finish_non_exhaustive()
    }
}

impl Host {
    pub fn local(config: &CoworkConfig) -> Result<Self> {
        let host = Arc::new(LocalHost::new(
            config.data_dir.clone(),
            config.workspace.clone(),
            config.assistant.clone(),
        )?);
        Ok(Self {
            kind: HostKind::Local,
            files: host.clone(),
            config: host.clone(),
            sessions: host.clone(),
            skills: host,
        })
    }

    pub fn mock(storage: Arc<dyn KeyValueStorage>) -> Self {
        let host = Arc::new(MockHost::new(storage));
        Self {
            kind: HostKind::Mock,
            files: host.clone(),
            config: host.clone(),
            sessions: host.clone(),
            skills: host,
        }
    }
}
