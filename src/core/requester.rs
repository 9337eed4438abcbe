use crate::core::parse::{freeform_diagnosis, parse_diagnosis, parse_verdict};
use crate::core::prompts::{
    diagnosis_schema, relevance_schema, DIAGNOSIS_FREEFORM_INSTRUCTIONS, DIAGNOSIS_PROMPT,
    DIAGNOSIS_SCHEMA_INSTRUCTIONS, RELEVANCE_PROMPT, STRUCTURING_PROMPT,
};
use crate::domain::model::{
    DiagnosisOutcome, DiagnosisRequest, DifferentialDiagnosis, EncodedImage, RelevanceVerdict,
};
use crate::domain::ports::{ConfigProvider, ModelRequest, OutputMode, VisionModel};
use crate::utils::error::{DdxError, Result};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub relevance_gate: bool,
    pub output_mode: OutputMode,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            relevance_gate: true,
            output_mode: OutputMode::Schema,
        }
    }
}

impl PipelineSettings {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self {
            relevance_gate: config.relevance_gate(),
            output_mode: config.output_mode(),
        }
    }
}

/// 兩段式管線：可選的相關性關卡，接著診斷（以及可選的結構化）
pub struct DiagnosisRequester<M: VisionModel> {
    model: M,
    settings: PipelineSettings,
}

impl<M: VisionModel> DiagnosisRequester<M> {
    pub fn new(model: M, settings: PipelineSettings) -> Self {
        Self { model, settings }
    }

    pub fn from_config<C: ConfigProvider>(model: M, config: &C) -> Self {
        Self::new(model, PipelineSettings::from_config(config))
    }

    /// Runs the whole pipeline for one image. Every call goes to the model; nothing is cached.
    pub async fn run(&self, request: &DiagnosisRequest) -> Result<DiagnosisOutcome> {
        if request.image.is_empty() {
            return Err(DdxError::ValidationError {
                message: "image is empty".to_string(),
            });
        }

        let started = Instant::now();
        let image = request.encode();
        tracing::info!(
            bytes = request.image.len(),
            mime_type = %image.mime_type,
            relevance_gate = self.settings.relevance_gate,
            output_mode = ?self.settings.output_mode,
            "🩻 Starting analysis"
        );

        if self.settings.relevance_gate {
            let verdict = self.check_relevance(&image).await?;
            if !verdict.is_relevant {
                tracing::info!(reason = %verdict.reason, "🚫 Image rejected by relevance gate");
                return Ok(DiagnosisOutcome::Rejected(verdict));
            }
        }

        let result = match self.settings.output_mode {
            OutputMode::Schema => self.diagnose_structured(&image).await?,
            OutputMode::TwoPass => {
                let text = self.diagnose_freeform(&image).await?;
                self.structure(&text).await?
            }
            OutputMode::Freeform => freeform_diagnosis(&self.diagnose_freeform(&image).await?),
        };

        tracing::info!(
            conditions = result.diagnoses.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "✅ Analysis completed"
        );
        Ok(DiagnosisOutcome::Diagnosed(result))
    }

    pub async fn check_relevance(&self, image: &EncodedImage) -> Result<RelevanceVerdict> {
        tracing::debug!("Running relevance gate");
        let reply = self
            .model
            .complete(&ModelRequest {
                system_prompt: RELEVANCE_PROMPT.to_string(),
                user_text: "Is this image suitable for a differential diagnosis?".to_string(),
                image: Some(image.clone()),
                schema: Some(relevance_schema()),
            })
            .await?;
        let verdict = parse_verdict(&reply)?;
        tracing::debug!(is_relevant = verdict.is_relevant, "Relevance verdict received");
        Ok(verdict)
    }

    async fn diagnose_structured(&self, image: &EncodedImage) -> Result<DifferentialDiagnosis> {
        tracing::debug!("Requesting schema-guided diagnosis");
        let reply = self
            .model
            .complete(&ModelRequest {
                system_prompt: DIAGNOSIS_PROMPT.to_string(),
                user_text: DIAGNOSIS_SCHEMA_INSTRUCTIONS.to_string(),
                image: Some(image.clone()),
                schema: Some(diagnosis_schema()),
            })
            .await?;
        parse_diagnosis(&reply)
    }

    async fn diagnose_freeform(&self, image: &EncodedImage) -> Result<String> {
        tracing::debug!("Requesting free-text diagnosis");
        self.model
            .complete(&ModelRequest {
                system_prompt: DIAGNOSIS_PROMPT.to_string(),
                user_text: DIAGNOSIS_FREEFORM_INSTRUCTIONS.to_string(),
                image: Some(image.clone()),
                schema: None,
            })
            .await
    }

    /// Second pass: re-expresses free text as the diagnosis schema.
    pub async fn structure(&self, text: &str) -> Result<DifferentialDiagnosis> {
        tracing::debug!(chars = text.len(), "Structuring free-text diagnosis");
        let reply = self
            .model
            .complete(&ModelRequest {
                system_prompt: STRUCTURING_PROMPT.to_string(),
                user_text: text.to_string(),
                image: None,
                schema: Some(diagnosis_schema()),
            })
            .await?;
        parse_diagnosis(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompts::{DIAGNOSIS_SCHEMA_NAME, RELEVANCE_SCHEMA_NAME};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// 依序回傳預先準備的回覆，並記錄每次請求
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String>>>,
        seen: Mutex<Vec<ModelRequest>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ModelRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VisionModel for ScriptedModel {
        async fn complete(&self, request: &ModelRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DdxError::malformed("no scripted reply left")))
        }
    }

    fn settings(relevance_gate: bool, output_mode: OutputMode) -> PipelineSettings {
        PipelineSettings {
            relevance_gate,
            output_mode,
        }
    }

    fn image() -> DiagnosisRequest {
        DiagnosisRequest::new(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A])
    }

    #[test]
    fn rejected_image_skips_diagnosis() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            r#"{"is_relevant": false, "reason": "The image is blank."}"#.to_string(),
        )]));
        let requester = DiagnosisRequester::new(Arc::clone(&model), settings(true, OutputMode::Schema));

        let outcome = tokio_test::block_on(requester.run(&image())).unwrap();

        assert_eq!(
            outcome,
            DiagnosisOutcome::Rejected(RelevanceVerdict {
                is_relevant: false,
                reason: "The image is blank.".to_string(),
            })
        );
        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].schema.as_ref().unwrap().name, RELEVANCE_SCHEMA_NAME);
    }

    #[tokio::test]
    async fn relevant_image_is_diagnosed_with_schema() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(r#"{"is_relevant": true, "reason": "Chest radiograph"}"#.to_string()),
            Ok(r#"{"diagnoses":[{"condition":"Pneumonia","probability":55}],"explanation":"Patchy opacity."}"#.to_string()),
        ]));
        let requester = DiagnosisRequester::new(Arc::clone(&model), settings(true, OutputMode::Schema));

        let outcome = requester.run(&image()).await.unwrap();

        match outcome {
            DiagnosisOutcome::Diagnosed(result) => {
                assert_eq!(result.diagnoses.len(), 1);
                assert_eq!(result.explanation, "Patchy opacity.");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].schema.as_ref().unwrap().name, DIAGNOSIS_SCHEMA_NAME);
        assert!(requests[1].image.is_some());
    }

    #[tokio::test]
    async fn two_pass_structures_the_free_text_without_the_image() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("Findings suggest cardiomegaly, possibly effusion.".to_string()),
            Ok(r#"{"diagnoses":["Cardiomegaly","Pleural effusion"],"explanation":"Enlarged heart silhouette."}"#.to_string()),
        ]));
        let requester = DiagnosisRequester::new(Arc::clone(&model), settings(false, OutputMode::TwoPass));

        let outcome = requester.run(&image()).await.unwrap();

        assert_eq!(outcome.kind(), "diagnosed");
        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].schema.is_none());
        assert!(requests[1].image.is_none());
        assert_eq!(
            requests[1].user_text,
            "Findings suggest cardiomegaly, possibly effusion."
        );
    }

    #[tokio::test]
    async fn freeform_mode_returns_text_as_explanation() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("Likely a benign nevus.".to_string())]));
        let requester = DiagnosisRequester::new(Arc::clone(&model), settings(false, OutputMode::Freeform));

        let outcome = requester.run(&image()).await.unwrap();

        assert_eq!(outcome.explanation(), "Likely a benign nevus.");
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Err(DdxError::UpstreamStatusError {
            status: 503,
            body: "overloaded".to_string(),
        })]));
        let requester = DiagnosisRequester::new(Arc::clone(&model), PipelineSettings::default());

        let err = requester.run(&image()).await.unwrap_err();
        assert!(matches!(err, DdxError::UpstreamStatusError { status: 503, .. }));
    }

    #[tokio::test]
    async fn empty_image_is_refused_before_any_call() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let requester = DiagnosisRequester::new(Arc::clone(&model), PipelineSettings::default());

        let err = requester.run(&DiagnosisRequest::new(Vec::new())).await.unwrap_err();

        assert!(matches!(err, DdxError::ValidationError { .. }));
        assert!(model.requests().is_empty());
    }
}
