//! Open editor tabs.

use futures::future::join_all;
use std::sync::Arc;
use uuid::Uuid;

use super::{ChangeHook, StoreCell};
use crate::error::{HostError, Result};
use crate::host::FileAccess;
use crate::model::{file_name, language_for_path, EditorFile};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    pub open_files: Vec<EditorFile>,
    pub active_file_id: Option<String>,
}

impl EditorState {
    fn file(&self, id: &str) -> Option<&EditorFile> {
        self.open_files.iter().find(|file| file.id == id)
    }

    fn file_mut(&mut self, id: &str) -> Option<&mut EditorFile> {
        self.open_files.iter_mut().find(|file| file.id == id)
    }

    pub fn active_file(&self) -> Option<&EditorFile> {
        self.file(self.active_file_id.as_deref()?)
    }
}

#[derive(Clone)]
pub struct EditorStore {
    cell: StoreCell<EditorState>,
    host: Arc<dyn FileAccess>,
}

impl EditorStore {
    pub fn new(host: Arc<dyn FileAccess>, hook: ChangeHook) -> Self {
        Self {
            cell: StoreCell::new(EditorState::default(), hook),
            host,
        }
    }

    pub fn state(&self) -> EditorState {
        self.cell.snapshot()
    }

    pub fn open_files(&self) -> Vec<EditorFile> {
        self.cell.read(|state| state.open_files.clone())
    }

    pub fn active_file(&self) -> Option<EditorFile> {
        self.cell.read(|state| state.active_file().cloned())
    }

    pub fn is_file_dirty(&self, id: &str) -> bool {
        self.cell.read(|state| state.file(id).is_some_and(|file| file.is_dirty))
    }

    fn activate_existing(&self, path: &str) -> Option<String> {
        self.cell.update(|state| {
            let id = state
                .open_files
                .iter()
                .find(|file| file.path == path)
                .map(|file| file.id.clone())?;
            state.active_file_id = Some(id.clone());
            Some(id)
        })
    }

    /// Opens `path` in a new tab, or activates the tab already showing it.
    pub async fn open_file(&self, path: &str) -> Result<String> {
        if let Some(id) = self.activate_existing(path) {
            tracing::info!(path, "file already open, setting as active");
            return Ok(id);
        }

        tracing::info!(path, "opening file");
        let content = self.host.read_file(path).await.inspect_err(|err| {
            tracing::error!(path, error = %err, "failed to open file");
        })?;

        let file = EditorFile {
            id: format!("file-{}", Uuid::new_v4().simple()),
            path: path.to_string(),
            name: file_name(path).to_string(),
            content,
            is_dirty: false,
            language: language_for_path(path).to_string(),
        };

        // Another open of the same path may have finished while reading.
        let id = self.cell.update(|state| {
            if let Some(existing) = state.open_files.iter().find(|open| open.path == file.path) {
                let id = existing.id.clone();
                state.active_file_id = Some(id.clone());
                return id;
            }
            let id = file.id.clone();
            state.open_files.push(file);
            state.active_file_id = Some(id.clone());
            id
        });
        tracing::info!(path, file_id = %id, "file opened");
        Ok(id)
    }

    /// Closing the active tab activates the most recently opened remaining one.
    pub fn close_file(&self, id: &str) {
        self.cell.update(|state| {
            if let Some(file) = state.file(id) {
                if file.is_dirty {
                    tracing::warn!(file_id = id, path = %file.path, "closing dirty file");
                }
            }
            state.open_files.retain(|file| file.id != id);
            if state.active_file_id.as_deref() == Some(id) {
                state.active_file_id = state.open_files.last().map(|file| file.id.clone());
            }
        });
        tracing::info!(file_id = id, "file closed");
    }

    pub fn close_all_files(&self) {
        tracing::info!("closing all files");
        self.cell.update(|state| {
            state.open_files.clear();
            state.active_file_id = None;
        });
    }

    pub fn set_active_file(&self, id: &str) {
        self.cell.update(|state| {
            if state.file(id).is_some() {
                state.active_file_id = Some(id.to_string());
            } else {
                tracing::warn!(file_id = id, "attempted to activate a file that is not open");
            }
        });
    }

    pub fn update_file_content(&self, id: &str, content: impl Into<String>) {
        let content = content.into();
        self.cell.update(|state| {
            if let Some(file) = state.file_mut(id) {
                file.content = content;
                file.is_dirty = true;
            }
        });
    }

    /// Clears the dirty flag once the write lands, unless the tab was edited meanwhile.
    fn mark_saved(&self, id: &str, written: &str) {
        self.cell.update(|state| {
            if let Some(file) = state.file_mut(id) {
                if file.content == written {
                    file.is_dirty = false;
                }
            }
        });
    }

    pub async fn save_file(&self, id: &str) -> Result<()> {
        let Some((path, content)) = self
            .cell
            .read(|state| state.file(id).map(|file| (file.path.clone(), file.content.clone())))
        else {
            tracing::error!(file_id = id, "file not found for saving");
            return Err(HostError::not_found("open file", id));
        };

        tracing::info!(file_id = id, path = %path, "saving file");
        self.host.write_file(&path, &content).await.inspect_err(|err| {
            tracing::error!(file_id = id, path = %path, error = %err, "failed to save file");
        })?;
        self.mark_saved(id, &content);
        tracing::info!(file_id = id, path = %path, "file saved");
        Ok(())
    }

    /// Writes every dirty tab concurrently; the first failure is returned
    /// after the successful ones are marked clean.
    pub async fn save_all_files(&self) -> Result<()> {
        let dirty: Vec<(String, String, String)> = self.cell.read(|state| {
            state
                .open_files
                .iter()
                .filter(|file| file.is_dirty)
                .map(|file| (file.id.clone(), file.path.clone(), file.content.clone()))
                .collect()
        });
        if dirty.is_empty() {
            tracing::info!("no dirty files to save");
            return Ok(());
        }

        tracing::info!(count = dirty.len(), "saving all dirty files");
        let writes = dirty.iter().map(|(_, path, content)| self.host.write_file(path, content));
        let results = join_all(writes).await;

        let mut first_error = None;
        for ((id, path, content), result) in dirty.iter().zip(results) {
            match result {
                Ok(()) => self.mark_saved(id, content),
                Err(err) => {
                    tracing::error!(path = %path, error = %err, "failed to save file in batch");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                tracing::info!("all files saved");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileTreeNode;
    use crate::store::no_hook;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory files; writes to paths listed in `read_only` fail.
    #[derive(Default)]
    struct MemoryFiles {
        files: Mutex<BTreeMap<String, String>>,
        read_only: Vec<&'static str>,
    }

    impl MemoryFiles {
        fn with(files: &[(&str, &str)], read_only: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                files: Mutex::new(
                    files
                        .iter()
                        .map(|(path, content)| (path.to_string(), content.to_string()))
                        .collect(),
                ),
                read_only,
            })
        }

        fn content(&self, path: &str) -> Option<String> {
            self.files.lock().unwrap().get(path).cloned()
        }
    }

    #[async_trait]
    impl FileAccess for MemoryFiles {
        async fn read_file(&self, path: &str) -> Result<String> {
            self.content(path).ok_or_else(|| HostError::not_found("file", path))
        }

        async fn write_file(&self, path: &str, content: &str) -> Result<()> {
            if self.read_only.iter().any(|locked| *locked == path) {
                return Err(HostError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.files.lock().unwrap().insert(path.to_string(), content.to_string());
            Ok(())
        }

        async fn delete_file(&self, path: &str) -> Result<()> {
            self.files.lock().unwrap().remove(path);
            Ok(())
        }

        async fn list_directory(&self, _path: &str) -> Result<Vec<FileTreeNode>> {
            Ok(Vec::new())
        }

        async fn create_directory(&self, _path: &str) -> Result<()> {
            Ok(())
        }

        async fn rename_file(&self, _old_path: &str, _new_path: &str) -> Result<()> {
            Ok(())
        }

        async fn select_directory(&self) -> Result<Option<String>> {
            Ok(None)
        }

        async fn file_exists(&self, path: &str) -> Result<bool> {
            Ok(self.content(path).is_some())
        }
    }

    fn store(read_only: Vec<&'static str>) -> (Arc<MemoryFiles>, EditorStore) {
        let files = MemoryFiles::with(
            &[("/ws/a.rs", "fn a() {}"), ("/ws/b.ts", "b"), ("/ws/c.md", "# c")],
            read_only,
        );
        let store = EditorStore::new(files.clone(), no_hook());
        (files, store)
    }

    #[tokio::test]
    async fn opening_same_path_twice_keeps_one_tab() {
        let (_files, store) = store(Vec::new());
        let first = store.open_file("/ws/a.rs").await.expect("open");
        let other = store.open_file("/ws/b.ts").await.expect("open other");
        assert_eq!(store.active_file().expect("active").id, other);

        let again = store.open_file("/ws/a.rs").await.expect("reopen");
        assert_eq!(first, again);
        assert_eq!(store.open_files().len(), 2);
        let active = store.active_file().expect("active");
        assert_eq!(active.id, first);
        assert_eq!(active.name, "a.rs");
        assert_eq!(active.language, "rust");
    }

    #[tokio::test]
    async fn closing_active_tab_activates_last_remaining() {
        let (_files, store) = store(Vec::new());
        let a = store.open_file("/ws/a.rs").await.expect("a");
        let b = store.open_file("/ws/b.ts").await.expect("b");
        let c = store.open_file("/ws/c.md").await.expect("c");

        store.set_active_file(&a);
        store.close_file(&a);
        assert_eq!(store.active_file().expect("active").id, c);

        store.close_file(&b);
        assert_eq!(store.active_file().expect("active").id, c);
        store.close_file(&c);
        assert_eq!(store.active_file(), None);
    }

    #[tokio::test]
    async fn save_clears_dirty_only_on_success() {
        let (files, store) = store(vec!["/ws/b.ts"]);
        let a = store.open_file("/ws/a.rs").await.expect("a");
        let b = store.open_file("/ws/b.ts").await.expect("b");

        store.update_file_content(&a, "fn a() { 1 }");
        store.update_file_content(&b, "changed");
        assert!(store.is_file_dirty(&a));

        store.save_file(&a).await.expect("save a");
        assert!(!store.is_file_dirty(&a));
        assert_eq!(files.content("/ws/a.rs").as_deref(), Some("fn a() { 1 }"));

        assert!(store.save_file(&b).await.is_err());
        assert!(store.is_file_dirty(&b));
        assert!(store.save_file("missing").await.expect_err("unknown").is_not_found());
    }

    #[tokio::test]
    async fn save_all_cleans_successes_and_reports_failure() {
        let (files, store) = store(vec!["/ws/c.md"]);
        let a = store.open_file("/ws/a.rs").await.expect("a");
        let b = store.open_file("/ws/b.ts").await.expect("b");
        let c = store.open_file("/ws/c.md").await.expect("c");
        for id in [&a, &b, &c] {
            store.update_file_content(id, "edited");
        }

        assert!(store.save_all_files().await.is_err());
        assert!(!store.is_file_dirty(&a));
        assert!(!store.is_file_dirty(&b));
        assert!(store.is_file_dirty(&c));
        assert_eq!(files.content("/ws/b.ts").as_deref(), Some("edited"));

        store.close_file(&c);
        store.save_all_files().await.expect("nothing dirty");
    }

    #[tokio::test]
    async fn unknown_active_id_is_ignored() {
        let (_files, store) = store(Vec::new());
        let a = store.open_file("/ws/a.rs").await.expect("a");
        store.set_active_file("nope");
        assert_eq!(store.active_file().expect("active").id, a);
        store.close_all_files();
        assert!(store.open_files().is_empty());
    }
}
