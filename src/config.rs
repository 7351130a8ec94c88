use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_LOG_FILTER: &str = "cowork=info";
const DEFAULT_ASSISTANT: &str = "claude -p";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown COWORK_HOST value '{0}' (expected 'local' or 'mock')")]
    UnknownHost(String),
    #[error("COWORK_ASSISTANT must name a program")]
    EmptyAssistant,
    #[error("cannot determine working directory: {0}")]
    Workspace(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    Local,
    Mock,
}

impl HostMode {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "local" | "native" => Ok(Self::Local),
            "mock" => Ok(Self::Mock),
            other => Err(ConfigError::UnknownHost(other.to_string())),
        }
    }
}

/// External program that produces assistant replies on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl AssistantCommand {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut parts = raw.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ConfigError::EmptyAssistant)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CoworkConfig {
    pub host: HostMode,
    pub data_dir: PathBuf,
    pub workspace: PathBuf,
    pub assistant: AssistantCommand,
}

impl CoworkConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = match lookup("COWORK_HOST") {
            Some(raw) => HostMode::parse(&raw)?,
            None => HostMode::Local,
        };

        let data_dir = lookup("COWORK_DATA_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let workspace = match lookup("COWORK_WORKSPACE").filter(|value| !value.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => std::env::current_dir()
                .map_err(|err| ConfigError::Workspace(err.to_string()))?,
        };

        let assistant = AssistantCommand::parse(
            lookup("COWORK_ASSISTANT")
                .as_deref()
                .unwrap_or(DEFAULT_ASSISTANT),
        )?;

        Ok(Self {
            host,
            data_dir,
            workspace,
            assistant,
        })
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("local-storage.json")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cowork")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_local_host_and_claude_assistant() {
        let config = CoworkConfig::from_lookup(lookup_from(&[("COWORK_WORKSPACE", "/tmp/ws")]))
            .expect("defaults should parse");
        assert_eq!(config.host, HostMode::Local);
        assert_eq!(config.workspace, PathBuf::from("/tmp/ws"));
        assert_eq!(config.assistant.program, "claude");
        assert_eq!(config.assistant.args, vec!["-p".to_string()]);
        assert!(config.data_dir.ends_with(".cowork"));
    }

    #[test]
    fn reads_mock_host_and_custom_paths() {
        let config = CoworkConfig::from_lookup(lookup_from(&[
            ("COWORK_HOST", "Mock"),
            ("COWORK_DATA_DIR", "/var/lib/cowork"),
            ("COWORK_WORKSPACE", "/srv/project"),
            ("COWORK_ASSISTANT", "my-agent --quiet"),
        ]))
        .expect("explicit values should parse");
        assert_eq!(config.host, HostMode::Mock);
        assert_eq!(
            config.storage_path(),
            PathBuf::from("/var/lib/cowork/local-storage.json")
        );
        assert_eq!(config.assistant.program, "my-agent");
        assert_eq!(config.assistant.args, vec!["--quiet".to_string()]);
    }

    #[test]
    fn rejects_unknown_host_mode() {
        let error = CoworkConfig::from_lookup(lookup_from(&[("COWORK_HOST", "remote")]))
            .expect_err("unknown host should fail");
        assert_eq!(error, ConfigError::UnknownHost("remote".to_string()));
    }

    #[test]
    fn rejects_blank_assistant_command() {
        let error = CoworkConfig::from_lookup(lookup_from(&[
            ("COWORK_WORKSPACE", "/tmp"),
            ("COWORK_ASSISTANT", "   "),
        ]))
        .expect_err("blank assistant should fail");
        assert_eq!(error, ConfigError::EmptyAssistant);
    }
}
