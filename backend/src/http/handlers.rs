//! HTTP handlers.
//!
//! Both submission endpoints answer 200 with the pipeline's report whatever
//! the outcome; only adapter failures become [`AppError`]s.

use std::sync::Arc;

use axum::{
    extract::State,
    response::Html,
    Form, Json,
};

use super::dto::{AnalyzeRequest, HealthResponse, SubmitForm};
use super::error::AppError;
use super::page::render_page;
use super::state::AppState;
use crate::models::TransitReport;
use crate::services::Submission;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /
pub async fn index() -> Html<String> {
    Html(render_page("", "", None))
}

/// POST /
///
/// Form submission from the index page.
pub async fn submit(
    State(state): State<AppState>,
    Form(form): Form<SubmitForm>,
) -> Result<Html<String>, AppError> {
    let star_id = form.star_id.clone();
    let threshold = form.threshold.clone().unwrap_or_default();

    let report = run_pipeline(&state, form.into()).await?;
    Ok(Html(render_page(&star_id, &threshold, Some(&report))))
}

/// POST /v1/transits
///
/// JSON variant of the form submission.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> HandlerResult<TransitReport> {
    let report = run_pipeline(&state, request.into()).await?;
    Ok(Json(report))
}

/// Build a pipeline and run it on the blocking pool.
async fn run_pipeline(state: &AppState, submission: Submission) -> Result<TransitReport, AppError> {
    let factory = Arc::clone(&state.pipelines);
    let report = tokio::task::spawn_blocking(move || {
        let pipeline = factory.build()?;
        Ok::<_, crate::error::PipelineError>(pipeline.run(&submission))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    Ok(report)
}
