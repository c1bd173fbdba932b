//! services/api/src/web/store_handlers.rs
//!
//! Axum handlers exposing the store operations: settings, conversations,
//! decks and flashcards, quizzes and study plans. None of them contact a provider.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_assistant_core::{
    catalog::{Provider, ProviderInfo},
    domain::{CardContent, Flashcard, FlashcardEdit, Theme},
    ports::PortError,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

type HandlerResult<T> = Result<T, ApiError>;

fn not_found(what: &str, id: Uuid) -> ApiError {
    ApiError::Port(PortError::NotFound(format!("{} {}", what, id)))
}

//=========================================================================================
// Settings
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    provider: Provider,
    model: String,
    theme: Theme,
    configured_providers: Vec<Provider>,
}

#[derive(Deserialize)]
pub struct SetProviderRequest {
    provider: String,
}

#[derive(Deserialize)]
pub struct SetModelRequest {
    model: String,
}

#[derive(Deserialize)]
pub struct SetThemeRequest {
    theme: Theme,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetApiKeyRequest {
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    provider: Provider,
    configured: bool,
    /// Whether the key starts with the provider's usual prefix. Advisory only.
    matches_prefix: bool,
}

async fn settings_view(app_state: &AppState) -> SettingsView {
    let settings = app_state.settings.lock().await;
    SettingsView {
        provider: settings.provider(),
        model: settings.model().to_string(),
        theme: settings.theme(),
        configured_providers: settings.configured_providers(),
    }
}

pub async fn get_settings_handler(State(app_state): State<Arc<AppState>>) -> Json<SettingsView> {
    Json(settings_view(&app_state).await)
}

/// Switches provider and selects that provider's default model.
pub async fn set_provider_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SetProviderRequest>,
) -> HandlerResult<Json<SettingsView>> {
    let provider: Provider = req.provider.trim().parse()?;
    {
        let mut settings = app_state.settings.lock().await;
        settings.set_provider(provider)?;
        settings.set_model(provider.default_model())?;
    }
    info!(%provider, "Provider changed");
    Ok(Json(settings_view(&app_state).await))
}

pub async fn set_model_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SetModelRequest>,
) -> HandlerResult<Json<SettingsView>> {
    let model = req.model.trim();
    if model.is_empty() {
        return Err(ApiError::BadRequest("Model must not be empty".to_string()));
    }
    {
        let mut settings = app_state.settings.lock().await;
        if !settings.provider().info().has_model(model) {
            warn!(provider = %settings.provider(), model, "Model is not in the provider catalog");
        }
        settings.set_model(model)?;
    }
    Ok(Json(settings_view(&app_state).await))
}

pub async fn set_theme_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SetThemeRequest>,
) -> HandlerResult<Json<SettingsView>> {
    app_state.settings.lock().await.set_theme(req.theme)?;
    Ok(Json(settings_view(&app_state).await))
}

/// Stores a key in memory for the given provider. An empty key clears it.
pub async fn set_api_key_handler(
    State(app_state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Json(req): Json<SetApiKeyRequest>,
) -> HandlerResult<Json<ApiKeyStatus>> {
    let provider: Provider = provider.parse()?;
    let key = req.api_key.trim().to_string();
    let matches_prefix = provider.key_matches_hint(&key);
    let configured = !key.is_empty();

    app_state.settings.lock().await.set_api_key(provider, key);
    if configured && !matches_prefix {
        warn!(%provider, "API key does not match the usual prefix");
    }

    Ok(Json(ApiKeyStatus {
        provider,
        configured,
        matches_prefix,
    }))
}

pub async fn list_providers_handler() -> Json<Vec<&'static ProviderInfo>> {
    Json(Provider::ALL.into_iter().map(|p| p.info()).collect())
}

//=========================================================================================
// Conversations
//=========================================================================================

#[derive(Deserialize)]
pub struct SetActiveRequest {
    #[serde(default)]
    id: Option<Uuid>,
}

pub async fn list_conversations_handler(
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(app_state.conversations.lock().await.state().clone())
}

pub async fn create_conversation_handler(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<impl IntoResponse> {
    let mut conversations = app_state.conversations.lock().await;
    let id = conversations.create_conversation()?;
    let conversation = conversations
        .conversation(id)
        .cloned()
        .ok_or_else(|| not_found("Conversation", id))?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn clear_conversations_handler(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<StatusCode> {
    app_state.conversations.lock().await.clear_conversations()?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_conversation_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<impl IntoResponse> {
    let conversations = app_state.conversations.lock().await;
    let conversation = conversations
        .conversation(id)
        .cloned()
        .ok_or_else(|| not_found("Conversation", id))?;
    Ok(Json(conversation))
}

pub async fn delete_conversation_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<StatusCode> {
    app_state.conversations.lock().await.delete_conversation(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_active_conversation_handler(
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(
        app_state
            .conversations
            .lock()
            .await
            .get_active_conversation()
            .cloned(),
    )
}

pub async fn set_active_conversation_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SetActiveRequest>,
) -> HandlerResult<StatusCode> {
    let mut conversations = app_state.conversations.lock().await;
    if let Some(id) = req.id {
        if conversations.conversation(id).is_none() {
            return Err(not_found("Conversation", id));
        }
    }
    conversations.set_active_conversation(req.id)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Decks and Flashcards
//=========================================================================================

#[derive(Deserialize)]
pub struct CreateDeckRequest {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
pub struct AddFlashcardsRequest {
    cards: Vec<CardContent>,
}

pub async fn list_decks_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.study_cards.lock().await.decks().to_vec())
}

pub async fn create_deck_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<CreateDeckRequest>,
) -> HandlerResult<impl IntoResponse> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Deck name must not be empty".to_string()));
    }
    let mut cards = app_state.study_cards.lock().await;
    let id = cards.create_deck(name, req.description)?;
    let deck = cards.deck(id).cloned().ok_or_else(|| not_found("Deck", id))?;
    Ok((StatusCode::CREATED, Json(deck)))
}

pub async fn delete_deck_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<StatusCode> {
    app_state.study_cards.lock().await.delete_deck(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_deck_flashcards_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<Json<Vec<Flashcard>>> {
    let cards = app_state.study_cards.lock().await;
    if cards.deck(id).is_none() {
        return Err(not_found("Deck", id));
    }
    Ok(Json(cards.deck_flashcards(id).into_iter().cloned().collect()))
}

pub async fn add_flashcards_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddFlashcardsRequest>,
) -> HandlerResult<impl IntoResponse> {
    let mut cards = app_state.study_cards.lock().await;
    let ids = cards.add_flashcards(id, req.cards)?;
    let added: Vec<Flashcard> = cards
        .flashcards()
        .iter()
        .filter(|f| ids.contains(&f.id))
        .cloned()
        .collect();
    Ok((StatusCode::CREATED, Json(added)))
}

pub async fn update_flashcard_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(edit): Json<FlashcardEdit>,
) -> HandlerResult<Json<Flashcard>> {
    let mut cards = app_state.study_cards.lock().await;
    cards.update_flashcard(id, edit)?;
    let card = cards
        .flashcards()
        .iter()
        .find(|f| f.id == id)
        .cloned()
        .ok_or_else(|| not_found("Flashcard", id))?;
    Ok(Json(card))
}

pub async fn delete_flashcard_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<StatusCode> {
    app_state.study_cards.lock().await.delete_flashcard(id)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Quizzes
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    answer_index: usize,
}

#[derive(Deserialize, Default)]
pub struct CompleteQuizRequest {
    /// Omitted scores are computed from the recorded answers.
    #[serde(default)]
    score: Option<u32>,
}

pub async fn list_quizzes_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.study_cards.lock().await.quizzes().to_vec())
}

pub async fn get_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<impl IntoResponse> {
    let cards = app_state.study_cards.lock().await;
    let quiz = cards.quiz(id).cloned().ok_or_else(|| not_found("Quiz", id))?;
    Ok(Json(quiz))
}

pub async fn delete_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<StatusCode> {
    app_state.study_cards.lock().await.delete_quiz(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn answer_question_handler(
    State(app_state): State<Arc<AppState>>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<AnswerRequest>,
) -> HandlerResult<impl IntoResponse> {
    let mut cards = app_state.study_cards.lock().await;
    cards.update_quiz_answer(id, question_id, req.answer_index)?;
    let quiz = cards.quiz(id).cloned().ok_or_else(|| not_found("Quiz", id))?;
    Ok(Json(quiz))
}

pub async fn complete_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteQuizRequest>>,
) -> HandlerResult<impl IntoResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let mut cards = app_state.study_cards.lock().await;
    let score = match req.score {
        Some(score) => score,
        None => cards
            .quiz(id)
            .map(|q| q.score_percentage())
            .ok_or_else(|| not_found("Quiz", id))?,
    };
    cards.complete_quiz(id, score)?;
    let quiz = cards.quiz(id).cloned().ok_or_else(|| not_found("Quiz", id))?;
    Ok(Json(quiz))
}

//=========================================================================================
// Study Plans
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    scheduled_at: DateTime<Utc>,
}

pub async fn list_plans_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.planner.lock().await.state().clone())
}

pub async fn delete_plan_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<StatusCode> {
    app_state.planner.lock().await.delete_plan(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_active_plan_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.planner.lock().await.get_active_plan().cloned())
}

pub async fn set_active_plan_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SetActiveRequest>,
) -> HandlerResult<StatusCode> {
    let mut planner = app_state.planner.lock().await;
    if let Some(id) = req.id {
        if !planner.plans().iter().any(|p| p.id == id) {
            return Err(not_found("Study plan", id));
        }
    }
    planner.set_active_plan(req.id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_progress_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.planner.lock().await.get_progress())
}

pub async fn get_today_sessions_handler(
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let planner = app_state.planner.lock().await;
    let sessions: Vec<_> = planner.get_today_sessions().into_iter().cloned().collect();
    Json(sessions)
}

pub async fn complete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> HandlerResult<StatusCode> {
    app_state.planner.lock().await.complete_session(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reschedule_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<RescheduleRequest>,
) -> HandlerResult<StatusCode> {
    app_state
        .planner
        .lock()
        .await
        .reschedule_session(id, req.scheduled_at)?;
    Ok(StatusCode::NO_CONTENT)
}
