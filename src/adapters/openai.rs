use crate::domain::ports::{ConfigProvider, ModelRequest, VisionModel};
use crate::utils::error::{DdxError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// OpenAI 相容的 chat completions 客戶端
pub struct OpenAiVisionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Option<Duration>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAiVisionClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: None,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self::new(config.api_endpoint(), config.api_key(), config.model_name())
            .with_timeout(config.request_timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    fn build_body<'a>(&'a self, request: &ModelRequest) -> ChatCompletionRequest<'a> {
        let user_content = match &request.image {
            Some(image) => json!([
                { "type": "text", "text": request.user_text },
                { "type": "image_url", "image_url": { "url": image.data_url() } }
            ]),
            None => Value::String(request.user_text.clone()),
        };

        let response_format = request.schema.as_ref().map(|schema| {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "strict": true,
                    "schema": schema.schema
                }
            })
        });

        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                json!({ "role": "system", "content": request.system_prompt }),
                json!({ "role": "user", "content": user_content }),
            ],
            response_format,
        }
    }
}

#[async_trait]
impl VisionModel for OpenAiVisionClient {
    async fn complete(&self, request: &ModelRequest) -> Result<String> {
        let url = self.completions_url();
        let body = self.build_body(request);

        tracing::debug!(
            url = %url,
            model = %self.model,
            with_image = request.image.is_some(),
            schema = request.schema.as_ref().map(|s| s.name).unwrap_or("none"),
            "Calling vision model"
        );

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body);

        // 沒設定就不限時
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!("Model response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "⚠️ Model endpoint returned an error");
            return Err(DdxError::UpstreamStatusError {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| DdxError::malformed("model reply contained no choices"))?;

        match (message.content, message.refusal) {
            (Some(content), _) if !content.trim().is_empty() => Ok(content),
            (_, Some(refusal)) => Err(DdxError::malformed(format!("model refused: {}", refusal))),
            _ => Err(DdxError::malformed("model reply had no content")),
        }
    }
}
