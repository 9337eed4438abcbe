use thiserror::Error;

/// 所有分析錯誤對使用者都顯示同一句話
pub const ANALYSIS_FAILED_MESSAGE: &str = "Something went wrong during analysis.";

#[derive(Error, Debug)]
pub enum DdxError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Model endpoint returned HTTP {status}: {body}")]
    UpstreamStatusError { status: u16, body: String },

    #[error("Malformed model response: {message}")]
    MalformedResponseError { message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl DdxError {
    pub fn malformed(message: impl Into<String>) -> Self {
        DdxError::MalformedResponseError {
            message: message.into(),
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DdxError::ConfigError { .. }
                | DdxError::InvalidConfigValueError { .. }
                | DdxError::MissingConfigError { .. }
        )
    }

    /// 給畫面顯示的訊息；分析期間的錯誤不做區分
    pub fn user_friendly_message(&self) -> String {
        if self.is_config_error() {
            format!("Invalid configuration: {}", self)
        } else {
            ANALYSIS_FAILED_MESSAGE.to_string()
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DdxError::ConfigError { .. }
            | DdxError::InvalidConfigValueError { .. }
            | DdxError::MissingConfigError { .. } => {
                "Check the config file and make sure OPENAI_API_KEY is set"
            }
            DdxError::ValidationError { .. } => "Choose a JPEG or PNG image and try again",
            DdxError::IoError(_) => "Check that the image file exists and is readable",
            _ => "Press the button again to retry the analysis",
        }
    }
}

pub type Result<T> = std::result::Result<T, DdxError>;
