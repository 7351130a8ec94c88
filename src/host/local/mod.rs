//! Host backed by the local machine.
//!
//! Files are the user's real files. Configuration, chat sessions and the
//! skills catalog live as JSON under the data directory. Chat replies come
//! from an external assistant process (see `sessions.rs`).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::paths;
use super::stream::StreamHub;
use super::{ConfigAccess, FileAccess};
use crate::config::AssistantCommand;
use crate::error::{HostError, Result};
use crate::model::{ApiConfig, FileTreeNode};
use crate::storage::write_atomic;

mod sessions;
mod skills;

const MAX_TREE_DEPTH: usize = 6;

pub struct LocalHost {
    data_dir: PathBuf,
    workspace: PathBuf,
    assistant: AssistantCommand,
    hub: StreamHub,
}

impl LocalHost {
    pub fn new(data_dir: PathBuf, workspace: PathBuf, assistant: AssistantCommand) -> Result<Self> {
        for dir in [
            data_dir.clone(),
            data_dir.join("sessions"),
            data_dir.join("skills"),
            data_dir.join("skill-packs"),
        ] {
            fs::create_dir_all(&dir)?;
        }

        tracing::info!(
            data_dir = %data_dir.display(),
            workspace = %workspace.display(),
            assistant = %assistant.program,
            "local host ready"
        );

        Ok(Self {
            data_dir,
            workspace,
            assistant,
            hub: StreamHub::new(),
        })
    }

    fn resolve(&self, raw: &str) -> Result<PathBuf> {
        paths::resolve(&self.workspace, raw)
    }

    fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    fn read_config(&self) -> Result<Option<ApiConfig>> {
        read_json_file(&self.config_path())
    }

    fn write_config(&self, config: &ApiConfig) -> Result<()> {
        write_json_file(&self.config_path(), config)
    }
}

fn should_skip_dir(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|name| name.to_str()),
        Some(".git") | Some("target") | Some("node_modules")
    )
}

fn build_tree(dir: &Path, depth: usize) -> io::Result<Vec<FileTreeNode>> {
    let mut folders = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            let children = if depth + 1 < MAX_TREE_DEPTH {
                build_tree(&path, depth + 1).unwrap_or_else(|err| {
                    tracing::warn!(dir = %path.display(), error = %err, "failed to list folder");
                    Vec::new()
                })
            } else {
                Vec::new()
            };
            folders.push(FileTreeNode::folder(paths::display(&path), children));
        } else {
            files.push(FileTreeNode::file(paths::display(&path)));
        }
    }

    folders.sort_by(|a, b| a.title.cmp(&b.title));
    files.sort_by(|a, b| a.title.cmp(&b.title));
    folders.extend(files);
    Ok(folders)
}

/// Runs blocking filesystem work off the async worker threads.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| HostError::Io(io::Error::other(err.to_string())))?
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&data)?))
}

fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)?;
    Ok(())
}

/// Ids become file names, so they are limited to a safe alphabet.
fn ensure_safe_id<'a>(kind: &'static str, id: &'a str) -> Result<&'a str> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
        && !id.starts_with('.');
    if valid {
        Ok(id)
    } else {
        Err(HostError::InvalidArgument(format!("invalid {kind} id '{id}'")))
    }
}

#[async_trait]
impl FileAccess for LocalHost {
    async fn read_file(&self, path: &str) -> Result<String> {
        tracing::debug!(path, "reading file");
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Err(HostError::not_found("file", path));
        }
        if resolved.is_dir() {
            return Err(HostError::InvalidArgument(format!(
                "'{path}' is a directory, not a file"
            )));
        }

        let content = tokio::fs::read_to_string(&resolved).await?;
        tracing::info!(path, bytes = content.len(), "file read");
        Ok(content)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        tracing::debug!(path, "writing file");
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&resolved, content).await?;
        tracing::info!(path, bytes = content.len(), "file written");
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        tracing::debug!(path, "deleting file");
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Err(HostError::not_found("file", path));
        }
        if resolved.is_dir() {
            return Err(HostError::InvalidArgument(format!(
                "'{path}' is a directory; only files can be deleted"
            )));
        }
        tokio::fs::remove_file(&resolved).await?;
        tracing::info!(path, "file deleted");
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<FileTreeNode>> {
        tracing::debug!(path, "listing directory");
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Err(HostError::not_found("directory", path));
        }
        if !resolved.is_dir() {
            return Err(HostError::InvalidArgument(format!("'{path}' is not a directory")));
        }

        let nodes = blocking(move || Ok(build_tree(&resolved, 0)?)).await?;
        tracing::info!(path, count = nodes.len(), "directory listed");
        Ok(nodes)
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        tracing::debug!(path, "creating directory");
        let resolved = self.resolve(path)?;
        tokio::fs::create_dir_all(&resolved).await?;
        tracing::info!(path, "directory created");
        Ok(())
    }

    async fn rename_file(&self, old_path: &str, new_path: &str) -> Result<()> {
        tracing::debug!(old_path, new_path, "renaming file");
        let from = self.resolve(old_path)?;
        let to = self.resolve(new_path)?;
        if !from.exists() {
            return Err(HostError::not_found("file", old_path));
        }
        if to.exists() {
            return Err(HostError::InvalidArgument(format!("'{new_path}' already exists")));
        }
        tokio::fs::rename(&from, &to).await?;
        tracing::info!(old_path, new_path, "file renamed");
        Ok(())
    }

    async fn select_directory(&self) -> Result<Option<String>> {
        let selected = paths::display(&self.workspace);
        tracing::info!(path = %selected, "directory selected");
        Ok(Some(selected))
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        let resolved = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&resolved).await?)
    }
}

#[async_trait]
impl ConfigAccess for LocalHost {
    async fn load_config(&self) -> Result<Option<ApiConfig>> {
        tracing::debug!("loading config");
        let config = self.read_config()?;
        tracing::info!(has_config = config.is_some(), "config loaded");
        Ok(config)
    }

    async fn save_config(&self, config: &ApiConfig) -> Result<()> {
        tracing::debug!(provider = ?config.provider, "saving config");
        self.write_config(config)?;
        tracing::info!(provider = ?config.provider, "config saved");
        Ok(())
    }

    async fn validate_config(&self, config: &ApiConfig) -> Result<bool> {
        let valid = config.is_valid();
        tracing::info!(provider = ?config.provider, valid, "config validated");
        Ok(valid)
    }

    async fn update_api_key(&self, api_key: &str) -> Result<()> {
        tracing::debug!("updating API key");
        match self.read_config()? {
            Some(mut config) => {
                config.api_key = api_key.to_string();
                self.write_config(&config)?;
                tracing::info!("API key updated");
            }
            None => tracing::warn!("no saved config; API key not updated"),
        }
        Ok(())
    }
}
