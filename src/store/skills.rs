use futures::future::try_join;
use std::sync::Arc;

use super::{ChangeHook, StoreCell};
use crate::error::Result;
use crate::host::SkillsAccess;
use crate::model::{NewSkill, Skill, SkillCategory, SkillPack, SkillUpdate};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillsState {
    pub skills: Vec<Skill>,
    pub skill_packs: Vec<SkillPack>,
    pub filter_keyword: String,
    pub is_loading: bool,
}

impl SkillsState {
    pub fn filtered_skills(&self) -> Vec<&Skill> {
        self.skills
            .iter()
            .filter(|skill| skill.matches_keyword(&self.filter_keyword))
            .collect()
    }
}

#[derive(Clone)]
pub struct SkillsStore {
    cell: StoreCell<SkillsState>,
    host: Arc<dyn SkillsAccess>,
}

impl SkillsStore {
    pub fn new(host: Arc<dyn SkillsAccess>, hook: ChangeHook) -> Self {
        Self {
            cell: StoreCell::new(SkillsState::default(), hook),
            host,
        }
    }

    pub fn state(&self) -> SkillsState {
        self.cell.snapshot()
    }

    pub fn skills(&self) -> Vec<Skill> {
        self.cell.read(|state| state.skills.clone())
    }

    pub fn skill_packs(&self) -> Vec<SkillPack> {
        self.cell.read(|state| state.skill_packs.clone())
    }

    fn set_loading(&self, loading: bool) {
        self.cell.update(|state| state.is_loading = loading);
    }

    pub async fn load_skills(&self) -> Result<()> {
        tracing::info!("loading skills");
        self.set_loading(true);
        match self.host.load_skills().await {
            Ok(skills) => {
                let count = skills.len();
                self.cell.update(|state| {
                    state.skills = skills;
                    state.is_loading = false;
                });
                tracing::info!(count, "skills loaded");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load skills");
                self.set_loading(false);
                Err(err)
            }
        }
    }

    pub async fn load_skill_packs(&self) -> Result<()> {
        tracing::info!("loading skill packs");
        self.set_loading(true);
        match self.host.load_skill_packs().await {
            Ok(packs) => {
                let count = packs.len();
                self.cell.update(|state| {
                    state.skill_packs = packs;
                    state.is_loading = false;
                });
                tracing::info!(count, "skill packs loaded");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load skill packs");
                self.set_loading(false);
                Err(err)
            }
        }
    }

    pub fn search_skills(&self, keyword: impl Into<String>) {
        let keyword = keyword.into();
        tracing::debug!(keyword = %keyword, "filtering skills");
        self.cell.update(|state| state.filter_keyword = keyword);
    }

    pub fn filtered_skills(&self) -> Vec<Skill> {
        self.cell
            .read(|state| state.filtered_skills().into_iter().cloned().collect())
    }

    pub fn skills_by_category(&self, category: SkillCategory) -> Vec<Skill> {
        self.cell.read(|state| {
            state
                .skills
                .iter()
                .filter(|skill| skill.category == category)
                .cloned()
                .collect()
        })
    }

    pub async fn delete_user_skill(&self, skill_id: &str) -> Result<()> {
        tracing::info!(skill_id, "deleting skill");
        self.set_loading(true);
        if let Err(err) = self.host.delete_skill(skill_id).await {
            tracing::error!(skill_id, error = %err, "failed to delete skill");
            self.set_loading(false);
            return Err(err);
        }
        self.cell.update(|state| {
            state.skills.retain(|skill| skill.id != skill_id);
            state.is_loading = false;
        });
        tracing::info!(skill_id, "skill deleted");
        Ok(())
    }

    /// Drops the pack and every skill it contributed.
    pub async fn uninstall_skill_pack(&self, pack_id: &str) -> Result<()> {
        tracing::info!(pack_id, "uninstalling skill pack");
        self.set_loading(true);
        if let Err(err) = self.host.uninstall_skill_pack(pack_id).await {
            tracing::error!(pack_id, error = %err, "failed to uninstall skill pack");
            self.set_loading(false);
            return Err(err);
        }
        self.cell.update(|state| {
            state.skill_packs.retain(|pack| pack.id != pack_id);
            state.skills.retain(|skill| !skill.belongs_to_pack(pack_id));
            state.is_loading = false;
        });
        tracing::info!(pack_id, "skill pack uninstalled");
        Ok(())
    }

    pub async fn create_skill(&self, skill: NewSkill) -> Result<String> {
        tracing::info!(name = %skill.name, "creating skill");
        self.set_loading(true);
        match self.host.create_skill(&skill).await {
            Ok(skill_id) => {
                let name = skill.name.clone();
                let created = Skill::from_new(skill_id.clone(), skill);
                self.cell.update(|state| {
                    state.skills.push(created);
                    state.is_loading = false;
                });
                tracing::info!(skill_id = %skill_id, name = %name, "skill created");
                Ok(skill_id)
            }
            Err(err) => {
                tracing::error!(name = %skill.name, error = %err, "failed to create skill");
                self.set_loading(false);
                Err(err)
            }
        }
    }

    pub async fn update_skill(&self, skill_id: &str, update: SkillUpdate) -> Result<()> {
        tracing::info!(skill_id, "updating skill");
        self.set_loading(true);
        if let Err(err) = self.host.update_skill(skill_id, &update).await {
            tracing::error!(skill_id, error = %err, "failed to update skill");
            self.set_loading(false);
            return Err(err);
        }
        self.cell.update(|state| {
            if let Some(skill) = state.skills.iter_mut().find(|skill| skill.id == skill_id) {
                update.apply(skill);
            }
            state.is_loading = false;
        });
        tracing::info!(skill_id, "skill updated");
        Ok(())
    }

    /// Installs the pack at `pack_path`, then reloads packs and skills.
    pub async fn install_skill_pack(&self, pack_path: &str) -> Result<String> {
        tracing::info!(pack_path, "installing skill pack");
        self.set_loading(true);
        let pack_id = match self.host.install_skill_pack(pack_path).await {
            Ok(pack_id) => pack_id,
            Err(err) => {
                tracing::error!(pack_path, error = %err, "failed to install skill pack");
                self.set_loading(false);
                return Err(err);
            }
        };
        self.load_skill_packs().await?;
        self.load_skills().await?;
        tracing::info!(pack_id = %pack_id, pack_path, "skill pack installed");
        Ok(pack_id)
    }

    pub async fn refresh_skills(&self) -> Result<()> {
        tracing::info!("refreshing skills");
        try_join(self.load_skills(), self.load_skill_packs()).await?;
        Ok(())
    }
}
