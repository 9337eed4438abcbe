pub mod parse;
pub mod prompts;
pub mod requester;

pub use crate::domain::model::{DiagnosisOutcome, DiagnosisRequest, DifferentialDiagnosis};
pub use crate::domain::ports::{ConfigProvider, OutputMode, VisionModel};
pub use crate::utils::error::Result;
