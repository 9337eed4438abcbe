use crate::domain::model::EncodedImage;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A JSON schema the model is asked to follow.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

/// One chat-completion call against the hosted model.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub user_text: String,
    pub image: Option<EncodedImage>,
    pub schema: Option<ResponseSchema>,
}

#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Returns the raw reply text of the model.
    async fn complete(&self, request: &ModelRequest) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// 單次呼叫，要求模型直接依 schema 回覆
    #[default]
    Schema,
    /// 先自由文字，再用第二次呼叫整理成 schema
    TwoPass,
    /// 只有自由文字
    Freeform,
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn api_key(&self) -> &str;
    fn model_name(&self) -> &str;
    fn request_timeout(&self) -> Option<Duration>;
    fn relevance_gate(&self) -> bool;
    fn output_mode(&self) -> OutputMode;
}

#[async_trait]
impl<T: VisionModel + ?Sized> VisionModel for std::sync::Arc<T> {
    async fn complete(&self, request: &ModelRequest) -> Result<String> {
        (**self).complete(request).await
    }
}
