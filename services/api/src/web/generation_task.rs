//! services/api/src/web/generation_task.rs
//!
//! One-shot generation workflows. Each asks the gateway for structured
//! content and, where the result is kept, writes it into the matching store.

use crate::web::state::AppState;
use study_assistant_core::{
    domain::{now, Deck, DocumentSummary, ExplanationLevel, Flashcard, Quiz, StudyPlan},
    ports::{AiGateway, ChatCompletionService, PortError, PortResult, StructuredGenerationService},
};
use tracing::info;

/// Documents longer than this many characters are cut before summarization.
pub const MAX_DOCUMENT_CHARS: usize = 50_000;

/// Generates a quiz about `topic` and stores it.
pub async fn generate_quiz(
    app_state: &AppState,
    gateway: &dyn AiGateway,
    topic: &str,
    count: usize,
) -> PortResult<Quiz> {
    let topic = topic.trim();
    let questions = gateway.generate_quiz(topic, count).await?;
    let questions = questions
        .into_iter()
        .map(|q| q.validate().map(|_| q.into_question()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(PortError::ProviderInvocation)?;
    info!(topic, questions = questions.len(), "Quiz generated");

    let mut cards = app_state.study_cards.lock().await;
    let quiz_id = cards.create_quiz(topic, questions)?;
    cards
        .quiz(quiz_id)
        .cloned()
        .ok_or_else(|| PortError::NotFound(format!("Quiz {}", quiz_id)))
}

/// Generates flashcards about `topic` into a new deck named after the topic.
pub async fn generate_flashcards(
    app_state: &AppState,
    gateway: &dyn AiGateway,
    topic: &str,
    count: usize,
) -> PortResult<(Deck, Vec<Flashcard>)> {
    let topic = topic.trim();
    let generated = gateway.generate_flashcards(topic, count).await?;
    info!(topic, cards = generated.len(), "Flashcards generated");

    let mut cards = app_state.study_cards.lock().await;
    let deck_id = cards.create_deck(topic, None)?;
    cards.add_flashcards(deck_id, generated)?;

    let deck = cards
        .deck(deck_id)
        .cloned()
        .ok_or_else(|| PortError::NotFound(format!("Deck {}", deck_id)))?;
    let flashcards = cards.deck_flashcards(deck_id).into_iter().cloned().collect();
    Ok((deck, flashcards))
}

/// Summarizes a document. The result is returned, never stored.
pub async fn summarize_document(
    gateway: &dyn AiGateway,
    content: &str,
) -> PortResult<DocumentSummary> {
    let document = truncate_document(content);
    if document.len() < content.len() {
        info!(
            original_bytes = content.len(),
            kept_bytes = document.len(),
            "Document truncated before summarization"
        );
    }
    gateway.summarize_document(document).await
}

/// Generates a study plan, converts day offsets into times and stores it as the active plan.
pub async fn generate_study_plan(
    app_state: &AppState,
    gateway: &dyn AiGateway,
    subjects: &[String],
    duration_days: u32,
    hours_per_day: f32,
) -> PortResult<StudyPlan> {
    let subjects: Vec<String> = subjects
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let schedule = gateway
        .create_study_plan(&subjects, duration_days, hours_per_day)
        .await?;

    let created = now();
    let sessions = schedule
        .into_iter()
        .map(|entry| entry.into_session(created))
        .collect::<Result<Vec<_>, _>>()
        .map_err(PortError::ProviderInvocation)?;
    let name = format!("Study Plan - {}", subjects.join(", "));

    let mut planner = app_state.planner.lock().await;
    let plan_id = planner.create_plan(name, sessions)?;
    info!(%plan_id, "Study plan generated");
    planner
        .plans()
        .iter()
        .find(|p| p.id == plan_id)
        .cloned()
        .ok_or_else(|| PortError::NotFound(format!("Study plan {}", plan_id)))
}

pub async fn explain_concept(
    gateway: &dyn AiGateway,
    topic: &str,
    level: ExplanationLevel,
) -> PortResult<String> {
    gateway.explain_concept(topic.trim(), level).await
}

/// The first `MAX_DOCUMENT_CHARS` characters of `content`.
pub fn truncate_document(content: &str) -> &str {
    match content.char_indices().nth(MAX_DOCUMENT_CHARS) {
        Some((end, _)) => &content[..end],
        None => content,
    }
}
