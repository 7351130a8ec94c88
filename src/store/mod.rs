//! State containers behind the three panes.
//!
//! A store is a cloneable handle over shared state. Async actions call the
//! host, then patch state; the lock is never held across an `.await`. Every
//! patch fires the change hook so the window can repaint.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Result;
use crate::host::Host;
use crate::model::ApiConfig;
use crate::storage::{self, KeyValueStorage};

pub mod app;
pub mod chat;
pub mod config;
pub mod editor;
pub mod filesystem;
pub mod skills;

pub use app::AppStore;
pub use chat::ChatStore;
pub use config::ConfigStore;
pub use editor::EditorStore;
pub use filesystem::FileSystemStore;
pub use skills::SkillsStore;

pub type ChangeHook = Arc<dyn Fn() + Send + Sync>;

pub fn no_hook() -> ChangeHook {
    Arc::new(|| {})
}

pub struct StoreCell<S> {
    state: Arc<RwLock<S>>,
    hook: ChangeHook,
}

impl<S> Clone for StoreCell<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            hook: Arc::clone(&self.hook),
        }
    }
}

impl<S> StoreCell<S> {
    pub fn new(state: S, hook: ChangeHook) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            hook,
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let result = {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        };
        (self.hook)();
        result
    }
}

impl<S: Clone> StoreCell<S> {
    pub fn snapshot(&self) -> S {
        self.read(S::clone)
    }
}

/// Every store, wired to one host.
#[derive(Clone)]
pub struct Stores {
    pub app: AppStore,
    pub chat: ChatStore,
    pub config: ConfigStore,
    pub editor: EditorStore,
    pub files: FileSystemStore,
    pub skills: SkillsStore,
}

impl Stores {
    pub fn new(host: &Host, hook: ChangeHook) -> Self {
        Self {
            app: AppStore::new(hook.clone()),
            chat: ChatStore::new(host.sessions.clone(), hook.clone()),
            config: ConfigStore::new(host.config.clone(), hook.clone()),
            editor: EditorStore::new(host.files.clone(), hook.clone()),
            files: FileSystemStore::new(host.files.clone(), hook.clone()),
            skills: SkillsStore::new(host.skills.clone(), hook),
        }
    }

    /// Restores the persisted subsets; unreadable snapshots are ignored.
    pub fn hydrate(&self, storage: &dyn KeyValueStorage) {
        match storage::load_json(storage, storage::APP_STORAGE) {
            Ok(Some(snapshot)) => self.app.hydrate(snapshot),
            Ok(None) => {}
            Err(err) => tracing::warn!(key = storage::APP_STORAGE, error = %err, "ignoring snapshot"),
        }
        match storage::load_json(storage, storage::CHAT_STORAGE) {
            Ok(Some(snapshot)) => self.chat.hydrate(snapshot),
            Ok(None) => {}
            Err(err) => tracing::warn!(key = storage::CHAT_STORAGE, error = %err, "ignoring snapshot"),
        }
        match storage::load_json(storage, storage::CONFIG_STORAGE) {
            Ok(Some(snapshot)) => self.config.hydrate(snapshot),
            Ok(None) => {}
            Err(err) => tracing::warn!(key = storage::CONFIG_STORAGE, error = %err, "ignoring snapshot"),
        }
    }

    pub fn persist(&self, storage: &dyn KeyValueStorage) -> Result<()> {
        storage::save_json(storage, storage::APP_STORAGE, &self.app.persisted())?;
        storage::save_json(storage, storage::CHAT_STORAGE, &self.chat.persisted())?;
        storage::save_json(storage, storage::CONFIG_STORAGE, &self.config.persisted())?;
        tracing::debug!("store snapshots persisted");
        Ok(())
    }

    /// Saves `config` through the host, then persists the snapshots. Only the
    /// key is sent when provider and endpoint are unchanged.
    pub async fn apply_api_config(
        &self,
        config: ApiConfig,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Result<()> {
        let key_only = self.config.api_config().is_some_and(|current| {
            current.provider == config.provider && current.api_endpoint == config.api_endpoint
        });
        if key_only {
            self.config.update_api_key(&config.api_key).await?;
        } else {
            self.config.save_config(config).await?;
        }
        self.persist(storage.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChatSession, Provider, ThemeMode};
    use crate::storage::MemoryStorage;
    use crate::store::config::ConfigSnapshot;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn update_fires_hook_and_read_does_not() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cell = StoreCell::new(1_u32, Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(cell.read(|value| *value), 1);
        cell.update(|value| *value += 1);
        assert_eq!(cell.snapshot(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn snapshots_round_trip_through_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let host = Host::mock(storage.clone());

        let stores = Stores::new(&host, no_hook());
        stores.app.set_theme(ThemeMode::Dark);
        stores.app.add_workspace("/ws");
        stores.chat.insert_session(ChatSession::new("s-1", "Kept"));
        stores.persist(storage.as_ref()).expect("persist");

        let restored = Stores::new(&host, no_hook());
        restored.hydrate(storage.as_ref());
        assert_eq!(restored.app.theme(), ThemeMode::Dark);
        assert_eq!(restored.app.workspaces(), vec!["/ws".to_string()]);
        assert_eq!(restored.chat.current_session_id().as_deref(), Some("s-1"));
        assert_eq!(restored.chat.sessions().len(), 1);
    }

    #[tokio::test]
    async fn applied_api_config_reaches_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let host = Host::mock(storage.clone());
        let stores = Stores::new(&host, no_hook());
        let config = ApiConfig {
            provider: Provider::DeepSeek,
            api_key: "sk-first".to_string(),
            api_endpoint: None,
        };

        stores.apply_api_config(config.clone(), storage.clone()).await.expect("save");
        let saved: ConfigSnapshot = storage::load_json(storage.as_ref(), storage::CONFIG_STORAGE)
            .expect("load")
            .expect("snapshot");
        assert_eq!(saved.api_config.map(|c| c.api_key).as_deref(), Some("sk-first"));

        let rotated = ApiConfig { api_key: "sk-second".to_string(), ..config };
        stores.apply_api_config(rotated, storage.clone()).await.expect("update key");
        let saved: ConfigSnapshot = storage::load_json(storage.as_ref(), storage::CONFIG_STORAGE)
            .expect("load")
            .expect("snapshot");
        assert_eq!(saved.api_config.map(|c| c.api_key).as_deref(), Some("sk-second"));
        assert!(saved.is_configured);
    }
}
