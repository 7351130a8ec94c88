use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const PACK_ID_KEY: &str = "packId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkillCategory {
    Official,
    UserCreated,
    FromPack,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 3] = [
        SkillCategory::Official,
        SkillCategory::UserCreated,
        SkillCategory::FromPack,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Official => "Official",
            Self::UserCreated => "My skills",
            Self::FromPack => "From packs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: SkillCategory,
    pub path: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Skill {
    pub fn from_new(id: impl Into<String>, skill: NewSkill) -> Self {
        Self {
            id: id.into(),
            name: skill.name,
            description: skill.description,
            category: skill.category,
            path: skill.path,
            content: skill.content,
            metadata: skill.metadata,
        }
    }

    pub fn pack_id(&self) -> Option<&str> {
        self.metadata.get(PACK_ID_KEY).and_then(Value::as_str)
    }

    /// True when this skill was installed by the pack `pack_id`.
    pub fn belongs_to_pack(&self, pack_id: &str) -> bool {
        self.category == SkillCategory::FromPack && self.pack_id() == Some(pack_id)
    }

    /// Case-insensitive match on name or description; a blank keyword matches everything.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        keyword.is_empty()
            || self.name.to_lowercase().contains(&keyword)
            || self.description.to_lowercase().contains(&keyword)
    }
}

/// A skill before the host has assigned its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSkill {
    pub name: String,
    pub description: String,
    pub category: SkillCategory,
    pub path: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<SkillCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
}

impl SkillUpdate {
    pub fn apply(&self, skill: &mut Skill) {
        if let Some(name) = &self.name {
            skill.name = name.clone();
        }
        if let Some(description) = &self.description {
            skill.description = description.clone();
        }
        if let Some(category) = self.category {
            skill.category = category;
        }
        if let Some(path) = &self.path {
            skill.path = path.clone();
        }
        if let Some(content) = &self.content {
            skill.content = content.clone();
        }
        if let Some(metadata) = &self.metadata {
            skill.metadata = metadata.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillPack {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub installed_at: i64,
    pub path: String,
}
