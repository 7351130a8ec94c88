use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{blocking, ensure_safe_id, paths, read_json_file, write_json_file, LocalHost};
use crate::error::{HostError, Result};
use crate::host::SkillsAccess;
use crate::model::skills::PACK_ID_KEY;
use crate::model::{now_millis, NewSkill, Skill, SkillCategory, SkillPack, SkillUpdate};

const MANIFEST: &str = "pack.json";

const OFFICIAL_SKILLS: [(&str, &str, &str, &str); 3] = [
    (
        "official-code-review",
        "Code Review",
        "Review a change for bugs, risky patterns and missing tests",
        "Review the selected code. List concrete bugs first, then risky patterns, then missing tests.",
    ),
    (
        "official-explain-code",
        "Explain Code",
        "Walk through what a file or function does",
        "Explain the selected code step by step for a reader new to this codebase.",
    ),
    (
        "official-write-tests",
        "Write Tests",
        "Draft unit tests for the selected code",
        "Write focused unit tests for the selected code using the project's existing test style.",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackManifest {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    installed_at: Option<i64>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn official_skills() -> Vec<Skill> {
    OFFICIAL_SKILLS
        .iter()
        .map(|(id, name, description, content)| Skill {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            category: SkillCategory::Official,
            path: format!("builtin://{id}"),
            content: content.to_string(),
            metadata: BTreeMap::new(),
        })
        .collect()
}

fn slug(name: &str) -> String {
    let mut out = String::new();
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        format!("pack-{}", Uuid::new_v4().simple())
    } else {
        trimmed.to_string()
    }
}

fn copy_dir(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn read_user_skills(dir: &Path) -> Vec<Skill> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut skills = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension() != Some(OsStr::new("json")) {
            continue;
        }
        match read_json_file::<Skill>(&path) {
            Ok(Some(skill)) => skills.push(skill),
            Ok(None) => {}
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "skipping skill file"),
        }
    }
    skills.sort_by(|a, b| a.name.cmp(&b.name));
    skills
}

/// Every `*.md` under a pack's `skills/` folder becomes a from-pack skill.
fn read_pack_skills(pack_id: &str, pack_dir: &Path) -> Vec<Skill> {
    let Ok(entries) = fs::read_dir(pack_dir.join("skills")) else {
        return Vec::new();
    };

    let mut skills = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension() != Some(OsStr::new("md")) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
            continue;
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping pack skill");
                continue;
            }
        };
        let description = content
            .lines()
            .map(|line| line.trim().trim_start_matches('#').trim())
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();

        let mut metadata = BTreeMap::new();
        metadata.insert(PACK_ID_KEY.to_string(), json!(pack_id));
        skills.push(Skill {
            id: format!("{pack_id}.{stem}"),
            name: stem.to_string(),
            description,
            category: SkillCategory::FromPack,
            path: paths::display(&path),
            content,
            metadata,
        });
    }
    skills.sort_by(|a, b| a.name.cmp(&b.name));
    skills
}

fn read_packs(dir: &Path) -> Vec<(SkillPack, PathBuf)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut packs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(id) = path.file_name().and_then(OsStr::to_str).map(str::to_string) else {
            continue;
        };
        match read_json_file::<PackManifest>(&path.join(MANIFEST)) {
            Ok(Some(manifest)) => packs.push((
                SkillPack {
                    id,
                    name: manifest.name,
                    version: manifest.version,
                    description: manifest.description,
                    installed_at: manifest.installed_at.unwrap_or_default(),
                    path: paths::display(&path),
                },
                path,
            )),
            Ok(None) => tracing::warn!(path = %path.display(), "skill pack has no manifest"),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "skipping skill pack"),
        }
    }
    packs.sort_by(|a, b| a.0.name.cmp(&b.0.name));
    packs
}

impl LocalHost {
    fn skills_dir(&self) -> PathBuf {
        self.data_dir.join("skills")
    }

    fn packs_dir(&self) -> PathBuf {
        self.data_dir.join("skill-packs")
    }

    fn user_skill_path(&self, skill_id: &str) -> Result<PathBuf> {
        let id = ensure_safe_id("skill", skill_id)?;
        Ok(self.skills_dir().join(format!("{id}.json")))
    }
}

#[async_trait]
impl SkillsAccess for LocalHost {
    async fn load_skills(&self) -> Result<Vec<Skill>> {
        tracing::debug!("loading skills");
        let skills_dir = self.skills_dir();
        let packs_dir = self.packs_dir();
        let skills = blocking(move || {
            let mut skills = official_skills();
            skills.extend(read_user_skills(&skills_dir));
            for (pack, dir) in read_packs(&packs_dir) {
                skills.extend(read_pack_skills(&pack.id, &dir));
            }
            Ok(skills)
        })
        .await?;
        tracing::info!(count = skills.len(), "skills loaded");
        Ok(skills)
    }

    async fn load_skill_packs(&self) -> Result<Vec<SkillPack>> {
        tracing::debug!("loading skill packs");
        let packs_dir = self.packs_dir();
        let packs = blocking(move || {
            Ok(read_packs(&packs_dir)
                .into_iter()
                .map(|(pack, _)| pack)
                .collect::<Vec<_>>())
        })
        .await?;
        tracing::info!(count = packs.len(), "skill packs loaded");
        Ok(packs)
    }

    async fn create_skill(&self, skill: &NewSkill) -> Result<String> {
        tracing::debug!(name = %skill.name, "creating skill");
        if skill.name.trim().is_empty() {
            return Err(HostError::InvalidArgument("skill name cannot be empty".to_string()));
        }
        let id = format!("skill-{}", Uuid::new_v4().simple());
        let record = Skill::from_new(id.clone(), skill.clone());
        write_json_file(&self.user_skill_path(&id)?, &record)?;
        tracing::info!(skill_id = %id, name = %skill.name, "skill created");
        Ok(id)
    }

    async fn update_skill(&self, skill_id: &str, update: &SkillUpdate) -> Result<()> {
        tracing::debug!(skill_id, "updating skill");
        let path = self.user_skill_path(skill_id)?;
        let mut skill: Skill =
            read_json_file(&path)?.ok_or_else(|| HostError::not_found("skill", skill_id))?;
        update.apply(&mut skill);
        skill.id = skill_id.to_string();
        write_json_file(&path, &skill)?;
        tracing::info!(skill_id, "skill updated");
        Ok(())
    }

    async fn delete_skill(&self, skill_id: &str) -> Result<()> {
        tracing::debug!(skill_id, "deleting skill");
        let path = self.user_skill_path(skill_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(skill_id, "skill deleted");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(HostError::not_found("skill", skill_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn install_skill_pack(&self, pack_path: &str) -> Result<String> {
        tracing::debug!(pack_path, "installing skill pack");
        let source = self.resolve(pack_path)?;
        let mut manifest: PackManifest = read_json_file(&source.join(MANIFEST))?
            .ok_or_else(|| HostError::not_found("skill pack manifest", pack_path))?;

        let id = match manifest.id.as_deref() {
            Some(id) => ensure_safe_id("skill pack", id)?.to_string(),
            None => slug(&manifest.name),
        };
        let target = self.packs_dir().join(&id);
        if target.exists() {
            return Err(HostError::InvalidArgument(format!(
                "skill pack '{id}' is already installed"
            )));
        }

        manifest.id = Some(id.clone());
        manifest.installed_at = Some(now_millis());
        let copy_target = target.clone();
        blocking(move || {
            copy_dir(&source, &copy_target)?;
            write_json_file(&copy_target.join(MANIFEST), &manifest)
        })
        .await?;

        tracing::info!(pack_id = %id, pack_path, "skill pack installed");
        Ok(id)
    }

    async fn uninstall_skill_pack(&self, pack_id: &str) -> Result<()> {
        tracing::debug!(pack_id, "uninstalling skill pack");
        let target = self.packs_dir().join(ensure_safe_id("skill pack", pack_id)?);
        if !target.is_dir() {
            return Err(HostError::not_found("skill pack", pack_id));
        }
        tokio::fs::remove_dir_all(&target).await?;
        tracing::info!(pack_id, "skill pack uninstalled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::local_host;
    use super::*;

    fn write_pack(root: &Path, name: &str) -> PathBuf {
        let dir = root.join("incoming");
        fs::create_dir_all(dir.join("skills")).expect("mkdir pack");
        fs::write(
            dir.join(MANIFEST),
            format!(r#"{{"name":"{name}","version":"1.2.0","description":"Linters"}}"#),
        )
        .expect("write manifest");
        fs::write(dir.join("skills/clippy.md"), "# Run clippy\nFix every warning.").expect("write skill");
        dir
    }

    fn new_skill(name: &str) -> NewSkill {
        NewSkill {
            name: name.to_string(),
            description: "mine".to_string(),
            category: SkillCategory::UserCreated,
            path: String::new(),
            content: "do things".to_string(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slug("Rust Lint Pack!"), "rust-lint-pack");
        assert!(slug("!!!").starts_with("pack-"));
    }

    #[tokio::test]
    async fn installed_pack_contributes_tagged_skills() {
        let (_data, workspace, host) = local_host("echo");
        let source = write_pack(workspace.path(), "Rust Lint");

        let pack_id = host
            .install_skill_pack(&paths::display(&source))
            .await
            .expect("install");
        assert_eq!(pack_id, "rust-lint");

        let packs = host.load_skill_packs().await.expect("packs");
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0].version, "1.2.0");
        assert!(packs[0].installed_at > 0);

        let skills = host.load_skills().await.expect("skills");
        let packed: Vec<&Skill> = skills
            .iter()
            .filter(|skill| skill.belongs_to_pack(&pack_id))
            .collect();
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].description, "Run clippy");

        let error = host
            .install_skill_pack(&paths::display(&source))
            .await
            .expect_err("second install");
        assert!(matches!(error, HostError::InvalidArgument(_)));

        host.uninstall_skill_pack(&pack_id).await.expect("uninstall");
        assert!(host.load_skill_packs().await.expect("packs").is_empty());
        let error = host.uninstall_skill_pack(&pack_id).await.expect_err("gone");
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn user_skills_support_create_update_delete() {
        let (_data, _workspace, host) = local_host("echo");
        let id = host.create_skill(&new_skill("Deploy")).await.expect("create");

        host.update_skill(
            &id,
            &SkillUpdate {
                description: Some("ship it".to_string()),
                ..SkillUpdate::default()
            },
        )
        .await
        .expect("update");

        let skills = host.load_skills().await.expect("load");
        let mine = skills.iter().find(|skill| skill.id == id).expect("created skill listed");
        assert_eq!(mine.description, "ship it");
        assert_eq!(
            skills.iter().filter(|s| s.category == SkillCategory::Official).count(),
            OFFICIAL_SKILLS.len()
        );

        host.delete_skill(&id).await.expect("delete");
        assert!(host.delete_skill(&id).await.expect_err("deleted twice").is_not_found());
    }

    #[tokio::test]
    async fn blank_skill_names_are_rejected() {
        let (_data, _workspace, host) = local_host("echo");
        assert!(host.create_skill(&new_skill("  ")).await.is_err());
    }
}
