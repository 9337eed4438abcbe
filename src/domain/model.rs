use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 單次分析的輸入，只存在於一次呼叫之內
#[derive(Debug, Clone)]
pub struct DiagnosisRequest {
    pub image: Vec<u8>,
}

impl DiagnosisRequest {
    pub fn new(image: Vec<u8>) -> Self {
        Self { image }
    }

    /// Sniffs PNG/JPEG magic bytes; anything else is sent as PNG.
    pub fn mime_type(&self) -> &'static str {
        if self.image.starts_with(&[0xFF, 0xD8, 0xFF]) {
            "image/jpeg"
        } else {
            "image/png"
        }
    }

    pub fn encode(&self) -> EncodedImage {
        EncodedImage {
            mime_type: self.mime_type().to_string(),
            base64: base64::engine::general_purpose::STANDARD.encode(&self.image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    pub is_relevant: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisItem {
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<u8>,
}

impl DiagnosisItem {
    pub fn label(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            probability: None,
        }
    }

    pub fn with_probability(condition: impl Into<String>, probability: u8) -> Self {
        Self {
            condition: condition.into(),
            probability: Some(probability),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferentialDiagnosis {
    pub diagnoses: Vec<DiagnosisItem>,
    pub explanation: String,
}

/// 管線的結果：被關卡擋下，或完成診斷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiagnosisOutcome {
    Rejected(RelevanceVerdict),
    Diagnosed(DifferentialDiagnosis),
}

impl DiagnosisOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            DiagnosisOutcome::Rejected(_) => "rejected",
            DiagnosisOutcome::Diagnosed(_) => "diagnosed",
        }
    }

    /// Rejection reason or diagnosis explanation, whichever applies.
    pub fn explanation(&self) -> &str {
        match self {
            DiagnosisOutcome::Rejected(verdict) => &verdict.reason,
            DiagnosisOutcome::Diagnosed(result) => &result.explanation,
        }
    }
}

/// JSON API 與 CLI `--json` 的輸出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub model: String,
    pub analyzed_at: DateTime<Utc>,
    pub outcome: DiagnosisOutcome,
}

impl AnalysisReport {
    pub fn new(model: impl Into<String>, outcome: DiagnosisOutcome) -> Self {
        Self {
            model: model.into(),
            analyzed_at: Utc::now(),
            outcome,
        }
    }
}
