use std::sync::Arc;

use super::{ChangeHook, StoreCell};
use crate::error::Result;
use crate::host::{paths, FileAccess};
use crate::model::FileTreeNode;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSystemState {
    pub file_tree: Vec<FileTreeNode>,
    pub root_path: Option<String>,
    pub expanded_keys: Vec<String>,
    pub selected_key: Option<String>,
    pub is_loading: bool,
}

#[derive(Clone)]
pub struct FileSystemStore {
    cell: StoreCell<FileSystemState>,
    host: Arc<dyn FileAccess>,
}

fn child_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// `old_path` with its last segment replaced by `new_name`.
fn renamed_path(old_path: &str, new_name: &str) -> String {
    match old_path.rsplit_once('/') {
        Some((parent, _)) => format!("{parent}/{new_name}"),
        None => new_name.to_string(),
    }
}

impl FileSystemStore {
    pub fn new(host: Arc<dyn FileAccess>, hook: ChangeHook) -> Self {
        Self {
            cell: StoreCell::new(FileSystemState::default(), hook),
            host,
        }
    }

    pub fn state(&self) -> FileSystemState {
        self.cell.snapshot()
    }

    pub fn root_path(&self) -> Option<String> {
        self.cell.read(|state| state.root_path.clone())
    }

    pub fn selected_key(&self) -> Option<String> {
        self.cell.read(|state| state.selected_key.clone())
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.cell.read(|state| state.expanded_keys.iter().any(|expanded| expanded == key))
    }

    /// Replaces the tree with a fresh listing of `path` and remembers it as the root.
    pub async fn load_file_tree(&self, path: &str) -> Result<()> {
        tracing::info!(path, "loading file tree");
        self.cell.update(|state| state.is_loading = true);
        match self.host.list_directory(path).await {
            Ok(nodes) => {
                let count = nodes.len();
                self.cell.update(|state| {
                    state.file_tree = nodes;
                    state.root_path = Some(path.to_string());
                    state.is_loading = false;
                });
                tracing::info!(path, count, "file tree loaded");
                Ok(())
            }
            Err(err) => {
                tracing::error!(path, error = %err, "failed to load file tree");
                self.cell.update(|state| state.is_loading = false);
                Err(err)
            }
        }
    }

    pub fn set_expanded_keys(&self, keys: Vec<String>) {
        self.cell.update(|state| state.expanded_keys = keys);
    }

    pub fn set_selected_key(&self, key: Option<String>) {
        tracing::debug!(key = ?key, "setting selected key");
        self.cell.update(|state| state.selected_key = key);
    }

    pub fn toggle_expanded(&self, key: &str) {
        self.cell.update(|state| {
            let before = state.expanded_keys.len();
            state.expanded_keys.retain(|expanded| expanded != key);
            let expanded = state.expanded_keys.len() == before;
            if expanded {
                state.expanded_keys.push(key.to_string());
            }
            tracing::debug!(key, expanded, "toggled folder");
        });
    }

    /// `Ok(None)` when the user cancelled.
    pub async fn select_directory(&self) -> Result<Option<String>> {
        let selected = self.host.select_directory().await.inspect_err(|err| {
            tracing::error!(error = %err, "failed to select directory");
        })?;
        tracing::info!(selected = ?selected, "directory selection finished");
        Ok(selected)
    }

    /// Host failures count as a missing path.
    pub async fn file_exists(&self, path: &str) -> bool {
        match self.host.file_exists(path).await {
            Ok(exists) => exists,
            Err(err) => {
                tracing::warn!(path, error = %err, "failed to check path");
                false
            }
        }
    }

    /// Reloads the remembered root; a no-op before the first load.
    pub async fn refresh_tree(&self) -> Result<()> {
        match self.root_path() {
            Some(root) => self.load_file_tree(&root).await,
            None => {
                tracing::debug!("no file tree to refresh");
                Ok(())
            }
        }
    }

    pub async fn create_file(&self, parent_path: &str, file_name: &str) -> Result<String> {
        let path = child_path(parent_path, paths::validate_name(file_name)?);
        tracing::info!(path = %path, "creating file");
        self.host.write_file(&path, "").await.inspect_err(|err| {
            tracing::error!(path = %path, error = %err, "failed to create file");
        })?;
        self.refresh_tree().await?;
        tracing::info!(path = %path, "file created");
        Ok(path)
    }

    pub async fn create_folder(&self, parent_path: &str, folder_name: &str) -> Result<String> {
        let path = child_path(parent_path, paths::validate_name(folder_name)?);
        tracing::info!(path = %path, "creating folder");
        self.host.create_directory(&path).await.inspect_err(|err| {
            tracing::error!(path = %path, error = %err, "failed to create folder");
        })?;
        self.refresh_tree().await?;
        tracing::info!(path = %path, "folder created");
        Ok(path)
    }

    pub async fn delete_file(&self, path: &str) -> Result<()> {
        tracing::info!(path, "deleting file");
        self.host.delete_file(path).await.inspect_err(|err| {
            tracing::error!(path, error = %err, "failed to delete file");
        })?;
        self.refresh_tree().await?;
        self.cell.update(|state| {
            if state.selected_key.as_deref() == Some(path) {
                state.selected_key = None;
            }
        });
        tracing::info!(path, "file deleted");
        Ok(())
    }

    /// Renames the last segment of `old_path`; the selection follows the file.
    pub async fn rename_file(&self, old_path: &str, new_name: &str) -> Result<String> {
        let new_path = renamed_path(old_path, paths::validate_name(new_name)?);
        tracing::info!(old_path, new_path = %new_path, "renaming file");
        self.host.rename_file(old_path, &new_path).await.inspect_err(|err| {
            tracing::error!(old_path, new_name, error = %err, "failed to rename file");
        })?;
        self.refresh_tree().await?;
        self.cell.update(|state| {
            if state.selected_key.as_deref() == Some(old_path) {
                state.selected_key = Some(new_path.clone());
            }
        });
        tracing::info!(old_path, new_path = %new_path, "file renamed");
        Ok(new_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::host::local::tests::local_host;
    use crate::store::no_hook;

    #[test]
    fn rename_replaces_last_segment() {
        assert_eq!(renamed_path("/ws/src/a.rs", "b.rs"), "/ws/src/b.rs");
        assert_eq!(renamed_path("a.rs", "b.rs"), "b.rs");
        assert_eq!(child_path("/ws/", "new.rs"), "/ws/new.rs");
    }

    #[test]
    fn toggle_adds_then_removes_key() {
        let (_data, _workspace, host) = local_host("echo");
        let store = FileSystemStore::new(Arc::new(host), no_hook());
        store.toggle_expanded("/ws/src");
        assert!(store.is_expanded("/ws/src"));
        store.toggle_expanded("/ws/src");
        assert!(!store.is_expanded("/ws/src"));
    }

    #[tokio::test]
    async fn edits_refresh_the_remembered_root() {
        let (_data, workspace, host) = local_host("echo");
        let root = paths::display(workspace.path());
        let store = FileSystemStore::new(Arc::new(host), no_hook());

        store.refresh_tree().await.expect("refresh before load is a no-op");
        store.load_file_tree(&root).await.expect("load");
        assert!(store.state().file_tree.is_empty());
        assert_eq!(store.root_path().as_deref(), Some(root.as_str()));

        let folder = store.create_folder(&root, "src").await.expect("folder");
        let file = store.create_file(&folder, "main.rs").await.expect("file");
        let tree = store.state().file_tree;
        assert_eq!(tree.len(), 1);
        assert!(tree[0].is_folder());
        assert_eq!(tree[0].children.as_ref().map(Vec::len), Some(1));

        store.set_selected_key(Some(file.clone()));
        let renamed = store.rename_file(&file, "lib.rs").await.expect("rename");
        assert_eq!(store.selected_key(), Some(renamed.clone()));
        assert!(workspace.path().join("src/lib.rs").exists());

        store.delete_file(&renamed).await.expect("delete");
        assert_eq!(store.selected_key(), None);
        assert_eq!(store.state().file_tree[0].children.as_ref().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn names_with_separators_are_rejected() {
        let (_data, workspace, host) = local_host("echo");
        let root = paths::display(workspace.path());
        let store = FileSystemStore::new(Arc::new(host), no_hook());
        store.load_file_tree(&root).await.expect("load");

        let error = store.create_file(&root, "sub/dir/x.rs").await.expect_err("nested file");
        assert!(matches!(error, HostError::InvalidArgument(_)));
        assert!(store.create_folder(&root, "..").await.is_err());
        assert!(!workspace.path().join("sub").exists());

        let file = store.create_file(&root, "a.rs").await.expect("plain name");
        assert!(store.rename_file(&file, "sub/moved.rs").await.is_err());
        assert!(store.rename_file(&file, "b\\c.rs").await.is_err());
        assert!(workspace.path().join("a.rs").exists());
    }

    #[tokio::test]
    async fn existence_checks_never_fail() {
        let (_data, workspace, host) = local_host("echo");
        let root = paths::display(workspace.path());
        let store = FileSystemStore::new(Arc::new(host), no_hook());
        assert!(store.file_exists(&root).await);
        assert!(!store.file_exists(&format!("{root}/nope.txt")).await);
        assert!(!store.file_exists("../escape").await);
        assert_eq!(store.select_directory().await.expect("select"), Some(root));
    }

    #[tokio::test]
    async fn failed_load_clears_loading_and_keeps_root() {
        let (_data, workspace, host) = local_host("echo");
        let root = paths::display(workspace.path());
        let store = FileSystemStore::new(Arc::new(host), no_hook());
        store.load_file_tree(&root).await.expect("load");

        let missing = format!("{root}/missing");
        assert!(store.load_file_tree(&missing).await.is_err());
        let state = store.state();
        assert!(!state.is_loading);
        assert_eq!(state.root_path, Some(root));
    }
}
