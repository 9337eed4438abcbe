use crate::domain::ports::{ConfigProvider, OutputMode};
use crate::utils::error::{DdxError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_secret, validate_socket_addr,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8501";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// 啟動時建立一次，之後以唯讀方式傳給各元件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub name: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_true")]
    pub relevance_gate: bool,
    #[serde(default)]
    pub output_mode: OutputMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            name: default_model(),
            timeout_seconds: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relevance_gate: true,
            output_mode: OutputMode::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
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

        toml::from_str(&processed_content).map_err(|e| DdxError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 沒有設定檔時使用預設值，金鑰取自 OPENAI_API_KEY
    pub fn from_env() -> Self {
        Self {
            model: ModelConfig {
                api_key: std::env::var(API_KEY_ENV).unwrap_or_default(),
                ..ModelConfig::default()
            },
            pipeline: PipelineConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Loads `path` when it exists, otherwise falls back to [`AppConfig::from_env`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            Self::from_file(path)
        } else {
            tracing::info!(
                "No config file at {}, using defaults and {}",
                path.display(),
                API_KEY_ENV
            );
            Ok(Self::from_env())
        }
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})；未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }
}

impl ConfigProvider for AppConfig {
    fn api_endpoint(&self) -> &str {
        &self.model.endpoint
    }

    fn api_key(&self) -> &str {
        &self.model.api_key
    }

    fn model_name(&self) -> &str {
        &self.model.name
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.model.timeout_seconds.map(Duration::from_secs)
    }

    fn relevance_gate(&self) -> bool {
        self.pipeline.relevance_gate
    }

    fn output_mode(&self) -> OutputMode {
        self.pipeline.output_mode
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("model.endpoint", &self.model.endpoint)?;
        validate_secret("model.api_key", &self.model.api_key)?;
        validate_non_empty_string("model.name", &self.model.name)?;
        if let Some(timeout) = self.model.timeout_seconds {
            validate_range("model.timeout_seconds", timeout, 1, 3600)?;
        }
        validate_socket_addr("server.listen_addr", &self.server.listen_addr)?;
        Ok(())
    }
}
