//! Upload form and JSON endpoint in front of the [`DiagnosisRequester`].

pub mod render;

use crate::core::requester::DiagnosisRequester;
use crate::domain::model::{AnalysisReport, DiagnosisRequest};
use crate::domain::ports::VisionModel;
use crate::utils::error::{DdxError, Result, ANALYSIS_FAILED_MESSAGE};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use render::{render_page, PageView};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const IMAGE_FIELD: &str = "image";

pub struct AppState<M: VisionModel> {
    requester: Arc<DiagnosisRequester<M>>,
    model_name: Arc<str>,
}

impl<M: VisionModel> AppState<M> {
    pub fn new(requester: DiagnosisRequester<M>, model_name: impl Into<String>) -> Self {
        Self {
            requester: Arc::new(requester),
            model_name: Arc::from(model_name.into()),
        }
    }
}

impl<M: VisionModel> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            requester: Arc::clone(&self.requester),
            model_name: Arc::clone(&self.model_name),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

pub fn router<M: VisionModel + 'static>(state: AppState<M>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/analyze", post(analyze_form::<M>))
        .route("/api/analyze", post(analyze_api::<M>))
        .with_state(state)
        // 上傳大小不設限
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(log_http_request))
}

pub async fn serve(app: Router, listen_addr: &str) -> Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "🌐 Upload form listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;
    tracing::info!("Server shutting down");
    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn index() -> Html<String> {
    Html(render_page(&PageView::Idle))
}

async fn health() -> &'static str {
    "ok"
}

async fn log_http_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;
    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        "http request"
    );
    response
}

/// 取出 `image` 欄位；沒有上傳或內容為空時回傳 None
async fn read_image(mut multipart: Multipart) -> Option<Vec<u8>> {
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(IMAGE_FIELD) => {
                return match field.bytes().await {
                    Ok(bytes) if !bytes.is_empty() => Some(bytes.to_vec()),
                    Ok(_) => None,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to read uploaded image");
                        None
                    }
                };
            }
            Ok(Some(_)) => continue,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "malformed multipart upload");
                return None;
            }
        }
    }
}

async fn analyze_form<M: VisionModel + 'static>(
    State(state): State<AppState<M>>,
    multipart: Multipart,
) -> (StatusCode, Html<String>) {
    let Some(image) = read_image(multipart).await else {
        return (
            StatusCode::BAD_REQUEST,
            Html(render_page(&PageView::MissingImage)),
        );
    };

    let request = DiagnosisRequest::new(image);
    let preview = request.encode().data_url();

    match state.requester.run(&request).await {
        Ok(outcome) => {
            tracing::info!(outcome = outcome.kind(), "analysis rendered");
            let view = PageView::Result {
                preview: Some(&preview),
                outcome: &outcome,
            };
            (StatusCode::OK, Html(render_page(&view)))
        }
        Err(error) => {
            log_failure(&error);
            let view = PageView::Failed {
                preview: Some(&preview),
                error: &error,
            };
            (StatusCode::BAD_GATEWAY, Html(render_page(&view)))
        }
    }
}

async fn analyze_api<M: VisionModel + 'static>(
    State(state): State<AppState<M>>,
    multipart: Multipart,
) -> Response {
    let Some(image) = read_image(multipart).await else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "missing image",
                detail: format!("multipart field '{}' is required", IMAGE_FIELD),
            }),
        )
            .into_response();
    };

    match state.requester.run(&DiagnosisRequest::new(image)).await {
        Ok(outcome) => Json(AnalysisReport::new(state.model_name.as_ref(), outcome)).into_response(),
        Err(error) => {
            log_failure(&error);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: "analysis failed",
                    detail: error.to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn log_failure(error: &DdxError) {
    tracing::error!("❌ {}: {}", ANALYSIS_FAILED_MESSAGE, error);
    tracing::debug!("💡 Recovery suggestion: {}", error.recovery_suggestion());
}
