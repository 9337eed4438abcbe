pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod shell;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::OpenAiVisionClient;
pub use config::AppConfig;
pub use core::requester::{DiagnosisRequester, PipelineSettings};
pub use domain::model::{
    AnalysisReport, DiagnosisItem, DiagnosisOutcome, DiagnosisRequest, DifferentialDiagnosis,
    RelevanceVerdict,
};
pub use domain::ports::{ConfigProvider, ModelRequest, OutputMode, VisionModel};
pub use utils::error::{DdxError, Result};
