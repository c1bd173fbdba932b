//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the AI-backed REST endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Every route here sits behind `require_credential`, which resolves the
//! active provider, model and key into a `GatewayConfig` extension.

use crate::error::ApiError;
use crate::web::{generation_task, state::AppState};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_assistant_core::domain::{ExplanationLevel, GatewayConfig};
use tracing::info;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_quiz_handler,
        generate_flashcards_handler,
        generate_plan_handler,
        summarize_document_handler,
        explain_handler,
    ),
    components(
        schemas(
            GenerateQuizRequest,
            GenerateFlashcardsRequest,
            GeneratePlanRequest,
            ExplainRequest,
            ExplainResponse,
            ErrorBody
        )
    ),
    tags(
        (name = "Study Assistant API", description = "AI-backed endpoints for quizzes, flashcards, study plans and document analysis.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Request payload for quiz generation. `count` falls back to the configured default.
#[derive(Deserialize, ToSchema)]
pub struct GenerateQuizRequest {
    topic: String,
    #[serde(default)]
    count: Option<usize>,
}

/// Request payload for flashcard generation. `count` falls back to the configured default.
#[derive(Deserialize, ToSchema)]
pub struct GenerateFlashcardsRequest {
    topic: String,
    #[serde(default)]
    count: Option<usize>,
}

/// Request payload for study plan generation.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    subjects: Vec<String>,
    duration_days: u32,
    hours_per_day: f32,
}

/// Request payload for a concept explanation.
#[derive(Deserialize, ToSchema)]
pub struct ExplainRequest {
    topic: String,
    /// One of `beginner`, `intermediate` (default) or `advanced`.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    level: Option<ExplanationLevel>,
}

#[derive(Serialize, ToSchema)]
pub struct ExplainResponse {
    explanation: String,
}

/// The body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    error: String,
}

fn required_text(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

fn positive_count(count: Option<usize>, default: usize) -> Result<usize, ApiError> {
    match count.unwrap_or(default) {
        0 => Err(ApiError::BadRequest("count must be at least 1".to_string())),
        n => Ok(n),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate a multiple choice quiz about a topic and store it.
#[utoipa::path(
    post,
    path = "/quizzes/generate",
    request_body = GenerateQuizRequest,
    responses(
        (status = 201, description = "Quiz generated and stored"),
        (status = 400, description = "Bad request (e.g., empty topic)", body = ErrorBody),
        (status = 412, description = "No API key for the active provider", body = ErrorBody),
        (status = 502, description = "The AI provider failed or returned an invalid shape", body = ErrorBody)
    )
)]
pub async fn generate_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(config): Extension<GatewayConfig>,
    Json(req): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let topic = required_text(&req.topic, "topic")?;
    let count = positive_count(req.count, app_state.config.quiz_question_count)?;
    let gateway = app_state.gateways.connect(&config)?;

    let quiz = generation_task::generate_quiz(&app_state, gateway.as_ref(), &topic, count).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Generate flashcards about a topic into a new deck.
#[utoipa::path(
    post,
    path = "/flashcards/generate",
    request_body = GenerateFlashcardsRequest,
    responses(
        (status = 201, description = "Deck created with generated flashcards"),
        (status = 400, description = "Bad request (e.g., empty topic)", body = ErrorBody),
        (status = 412, description = "No API key for the active provider", body = ErrorBody),
        (status = 502, description = "The AI provider failed or returned an invalid shape", body = ErrorBody)
    )
)]
pub async fn generate_flashcards_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(config): Extension<GatewayConfig>,
    Json(req): Json<GenerateFlashcardsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let topic = required_text(&req.topic, "topic")?;
    let count = positive_count(req.count, app_state.config.flashcard_count)?;
    let gateway = app_state.gateways.connect(&config)?;

    let (deck, flashcards) =
        generation_task::generate_flashcards(&app_state, gateway.as_ref(), &topic, count).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "deck": deck, "flashcards": flashcards })),
    ))
}

/// Generate a study plan and make it the active plan.
#[utoipa::path(
    post,
    path = "/plans/generate",
    request_body = GeneratePlanRequest,
    responses(
        (status = 201, description = "Study plan generated, stored and activated"),
        (status = 400, description = "Bad request (e.g., no subjects)", body = ErrorBody),
        (status = 412, description = "No API key for the active provider", body = ErrorBody),
        (status = 502, description = "The AI provider failed or returned an invalid shape", body = ErrorBody)
    )
)]
pub async fn generate_plan_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(config): Extension<GatewayConfig>,
    Json(req): Json<GeneratePlanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.subjects.iter().all(|s| s.trim().is_empty()) {
        return Err(ApiError::BadRequest("At least one subject is required".to_string()));
    }
    if req.duration_days == 0 {
        return Err(ApiError::BadRequest("durationDays must be at least 1".to_string()));
    }
    if !(req.hours_per_day > 0.0 && req.hours_per_day <= 24.0) {
        return Err(ApiError::BadRequest(
            "hoursPerDay must be between 0 and 24".to_string(),
        ));
    }
    let gateway = app_state.gateways.connect(&config)?;

    let plan = generation_task::generate_study_plan(
        &app_state,
        gateway.as_ref(),
        &req.subjects,
        req.duration_days,
        req.hours_per_day,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// Summarize an uploaded plain text document.
///
/// Accepts a multipart/form-data request with a single file part. The document
/// is analyzed but not stored.
#[utoipa::path(
    post,
    path = "/documents/summarize",
    request_body(content_type = "multipart/form-data", description = "The UTF-8 text document to analyze."),
    responses(
        (status = 200, description = "Summary, key points, topics and study questions"),
        (status = 400, description = "Bad request (e.g., missing or non UTF-8 file)", body = ErrorBody),
        (status = 412, description = "No API key for the active provider", body = ErrorBody),
        (status = 502, description = "The AI provider failed or returned an invalid shape", body = ErrorBody)
    )
)]
pub async fn summarize_document_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(config): Extension<GatewayConfig>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
        .ok_or_else(|| ApiError::BadRequest("Multipart form must include a file".to_string()))?;

    let file_name = field.file_name().unwrap_or("untitled.txt").to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
    let text = String::from_utf8(data.to_vec()).map_err(|e| {
        ApiError::BadRequest(format!("Uploaded file is not valid UTF-8 text: {}", e))
    })?;
    let text = required_text(&text, "document")?;
    info!(file_name = %file_name, bytes = text.len(), "Document received for summarization");

    let gateway = app_state.gateways.connect(&config)?;
    let summary = generation_task::summarize_document(gateway.as_ref(), &text).await?;
    Ok(Json(summary))
}

/// Explain a concept at the requested depth.
#[utoipa::path(
    post,
    path = "/explain",
    request_body = ExplainRequest,
    responses(
        (status = 200, description = "Markdown explanation", body = ExplainResponse),
        (status = 400, description = "Bad request (e.g., empty topic)", body = ErrorBody),
        (status = 412, description = "No API key for the active provider", body = ErrorBody),
        (status = 502, description = "The AI provider failed", body = ErrorBody)
    )
)]
pub async fn explain_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(config): Extension<GatewayConfig>,
    Json(req): Json<ExplainRequest>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let topic = required_text(&req.topic, "topic")?;
    let gateway = app_state.gateways.connect(&config)?;

    let explanation = generation_task::explain_concept(
        gateway.as_ref(),
        &topic,
        req.level.unwrap_or_default(),
    )
    .await?;
    Ok(Json(ExplainResponse { explanation }))
}
