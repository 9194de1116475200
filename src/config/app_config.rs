use crate::adapters::llm::OpenAiConfig;
use crate::core::nl2query::DEFAULT_QUERY_LIMIT;
use crate::core::ConfigProvider;
use crate::domain::model::{SourceConfig, SourceFormat};
use crate::utils::error::{MetricsError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_source_uri, validate_url,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_STORE_URI: &str = "./data/metrics_store";

/// `nl2metrics.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: OpenAiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store root, a path or `file://` URI. Empty falls back to `MAIN_STORE_URI`.
    pub uri: String,
    pub query_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            query_limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

fn env_var_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var regex"))
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| MetricsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Loads `path` when it exists, otherwise starts from defaults, then fills
    /// unset values from the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            tracing::debug!("Loading config from {}", path.as_ref().display());
            Self::from_file(path)?
        } else {
            tracing::debug!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Self::default()
        };
        config.apply_env_fallbacks();
        Ok(config)
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    fn apply_env_fallbacks(&mut self) {
        let from_env = OpenAiConfig::from_env();
        let defaults = OpenAiConfig::default();

        // 未替換的 ${VAR} 視同未設定，避免被當成 bearer token 送出
        let unresolved = |key: &str| key.is_empty() || env_var_pattern().is_match(key);
        if self.llm.api_key.as_deref().is_none_or(unresolved) {
            self.llm.api_key = from_env.api_key;
        }
        if self.llm.base_url == defaults.base_url {
            self.llm.base_url = from_env.base_url;
        }
        if self.llm.model == defaults.model {
            self.llm.model = from_env.model;
        }
        if self.store.uri.is_empty() {
            self.store.uri =
                std::env::var("MAIN_STORE_URI").unwrap_or_else(|_| DEFAULT_STORE_URI.to_string());
        }
    }

    /// Command-line values win over file and environment.
    pub fn with_overrides(mut self, store_uri: Option<String>, model: Option<String>) -> Self {
        if let Some(uri) = store_uri {
            self.store.uri = uri;
        }
        if let Some(model) = model {
            self.llm.model = model;
        }
        self
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("llm.base_url", &self.llm.base_url)?;
        validate_non_empty_string("llm.model", &self.llm.model)?;
        validate_range("llm.timeout_seconds", self.llm.timeout_seconds, 1, 600)?;
        validate_range("llm.max_retries", self.llm.max_retries, 0, 10)?;

        let store_path = self.store.uri.strip_prefix("file://").unwrap_or(&self.store.uri);
        validate_path("store.uri", store_path)?;
        validate_range("store.query_limit", self.store.query_limit, 1, 1000)?;

        for (index, source) in self.sources.iter().enumerate() {
            let field = |name: &str| format!("sources[{}].{}", index, name);

            validate_non_empty_string(&field("name"), &source.name)?;
            validate_source_uri(&field("uri"), &source.uri)?;
            if source.format == SourceFormat::Raw && source.entity_field.is_none() {
                return Err(MetricsError::MissingConfigError {
                    field: field("entity_field"),
                });
            }
            if self.sources[..index].iter().any(|s| s.name == source.name) {
                return Err(MetricsError::InvalidConfigValueError {
                    field: field("name"),
                    value: source.name.clone(),
                    reason: "Source names must be unique".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn store_uri(&self) -> &str {
        &self.store.uri
    }

    fn model(&self) -> &str {
        &self.llm.model
    }

    fn query_limit(&self) -> usize {
        self.store.query_limit
    }

    fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
