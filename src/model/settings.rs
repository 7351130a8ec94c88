use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "chatglm")]
    ChatGlm,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openai")]
    #[default]
    OpenAi,
    Anthropic,
    Azure,
    Custom,
}

impl Provider {
    pub const ALL: [Provider; 6] = [
        Provider::ChatGlm,
        Provider::DeepSeek,
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Azure,
        Provider::Custom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ChatGlm => "ChatGLM",
            Self::DeepSeek => "DeepSeek",
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Azure => "Azure OpenAI",
            Self::Custom => "Custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub provider: Provider,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

impl ApiConfig {
    /// A key is always required; a custom provider also needs an http(s) endpoint.
    pub fn is_valid(&self) -> bool {
        if self.api_key.trim().is_empty() {
            return false;
        }

        match self.api_endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => {
                endpoint.starts_with("http://") || endpoint.starts_with("https://")
            }
            _ => self.provider != Provider::Custom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    #[serde(rename = "zh-CN")]
    #[default]
    ZhCn,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::ZhCn, Language::EnUs];

    pub fn code(self) -> &'static str {
        match self {
            Self::ZhCn => "zh-CN",
            Self::EnUs => "en-US",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ZhCn => "简体中文",
            Self::EnUs => "English",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|language| language.code() == raw.trim())
    }
}

pub const FONT_FAMILIES: [&str; 4] = ["Monaco", "Fira Code", "Consolas", "Courier New"];
pub const FONT_SIZE_RANGE: std::ops::RangeInclusive<u32> = 10..=24;

/// Everything the settings form edits, persisted wholesale on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub api_provider: Provider,
    pub api_key: String,
    pub endpoint: String,
    pub workspace: String,
    pub font_size: u32,
    pub font_family: String,
    pub theme: ThemeMode,
    pub language: Language,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_provider: Provider::OpenAi,
            api_key: String::new(),
            endpoint: "https://api.openai.com/v1".to_string(),
            workspace: String::new(),
            font_size: 14,
            font_family: FONT_FAMILIES[0].to_string(),
            theme: ThemeMode::Light,
            language: Language::ZhCn,
        }
    }
}

impl Settings {
    /// Returns one message per invalid field.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        if self.api_key.trim().is_empty() {
            problems.push("Please enter your API key".to_string());
        }
        if self.endpoint.trim().is_empty() {
            problems.push("Please enter the endpoint".to_string());
        }
        if self.workspace.trim().is_empty() {
            problems.push("Please enter the workspace path".to_string());
        }
        if !FONT_SIZE_RANGE.contains(&self.font_size) {
            problems.push(format!(
                "Font size must be between {} and {}",
                FONT_SIZE_RANGE.start(),
                FONT_SIZE_RANGE.end()
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        let endpoint = self.endpoint.trim();
        ApiConfig {
            provider: self.api_provider,
            api_key: self.api_key.trim().to_string(),
            api_endpoint: (!endpoint.is_empty()).then(|| endpoint.to_string()),
        }
    }
}
