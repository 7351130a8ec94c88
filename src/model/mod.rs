pub mod chat;
pub mod file;
pub mod settings;
pub mod skills;

pub use chat::{ChatMessage, ChatSession, Role};
pub use file::{file_name, language_for_path, EditorFile, FileTreeNode, NodeKind};
pub use settings::{ApiConfig, Language, Provider, Settings, ThemeMode};
pub use skills::{NewSkill, Skill, SkillCategory, SkillPack, SkillUpdate};

/// Milliseconds since the Unix epoch, the timestamp unit used by every record.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
