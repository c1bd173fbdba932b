//! crates/study_assistant_core/src/domain.rs
//!
//! Defines the core data structures for the study assistant.
//! Field names serialize in camelCase and timestamps as epoch milliseconds,
//! which is the layout of the persisted store snapshots.

use chrono::{serde::ts_milliseconds, serde::ts_milliseconds_option, DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::Provider;

/// Placeholder ease factor given to every new flashcard.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Maximum number of characters of the first user message used as a title.
pub const TITLE_MAX_CHARS: usize = 50;

/// Title given to a conversation before its first user message.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";

/// The current time at the millisecond precision snapshots are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

//=========================================================================================
// Conversations
//=========================================================================================

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single chat message. The `id` never changes; `content` may be rewritten while streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// The caller-supplied part of a message; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Derives a conversation title from the first user message: the first 50
/// characters, followed by `...` when the message was longer.
pub fn derive_title(content: &str) -> String {
    let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
    if content.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

//=========================================================================================
// Decks, Flashcards and Quizzes
//=========================================================================================

/// A named collection of flashcards. `card_count` mirrors the number of cards
/// that reference this deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub card_count: usize,
}

/// A flashcard. The review fields are initialized on creation and carried
/// forward unchanged; no scheduler advances them yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: Uuid,
    pub front: String,
    pub back: String,
    pub deck_id: Uuid,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub next_review: DateTime<Utc>,
    pub interval: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
}

/// The two faces of a card, used both for new cards and for generated ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardContent {
    pub front: String,
    pub back: String,
}

/// A partial edit of a flashcard's faces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardEdit {
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
}

/// A multiple choice question inside a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<usize>,
}

impl QuizQuestion {
    pub fn is_answered_correctly(&self) -> bool {
        self.user_answer == Some(self.correct_index)
    }
}

/// A generated quiz with answer tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: Uuid,
    pub topic: String,
    pub questions: Vec<QuizQuestion>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(
        default,
        with = "ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Quiz {
    /// Percentage of questions answered correctly, rounded to the nearest integer.
    /// The store never calls this: callers compute the score and hand it to `complete_quiz`.
    pub fn score_percentage(&self) -> u32 {
        if self.questions.is_empty() {
            return 0;
        }
        let correct = self
            .questions
            .iter()
            .filter(|q| q.is_answered_correctly())
            .count();
        ((correct as f64 / self.questions.len() as f64) * 100.0).round() as u32
    }
}

//=========================================================================================
// Study Plans
//=========================================================================================

/// One scheduled study block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: Uuid,
    pub subject: String,
    pub topic: String,
    #[serde(with = "ts_milliseconds")]
    pub scheduled_at: DateTime<Utc>,
    /// Minutes.
    pub duration: u32,
    pub tasks: Vec<String>,
    pub completed: bool,
    #[serde(
        default,
        with = "ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
}

/// The caller-supplied part of a session; the store assigns the id and completion state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudySession {
    pub subject: String,
    pub topic: String,
    #[serde(with = "ts_milliseconds")]
    pub scheduled_at: DateTime<Utc>,
    pub duration: u32,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    pub id: Uuid,
    pub name: String,
    pub sessions: Vec<StudySession>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Completion counts over the active plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

//=========================================================================================
// Settings
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Everything needed to open a gateway to the active provider.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

//=========================================================================================
// Structured generation shapes
//=========================================================================================

/// A quiz question as returned by the model, before the caller assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
}

impl GeneratedQuestion {
    /// Checks the shape the quiz schema promises: four options and an index in range.
    pub fn validate(&self) -> Result<(), String> {
        if self.options.len() != 4 {
            return Err(format!(
                "question '{}' has {} options, expected 4",
                self.question,
                self.options.len()
            ));
        }
        if self.correct_index > 3 {
            return Err(format!(
                "question '{}' has correctIndex {}, expected 0..=3",
                self.question, self.correct_index
            ));
        }
        Ok(())
    }

    /// Assigns a fresh id, producing the stored form of the question.
    pub fn into_question(self) -> QuizQuestion {
        QuizQuestion {
            id: Uuid::new_v4(),
            question: self.question,
            options: self.options,
            correct_index: self.correct_index,
            explanation: self.explanation,
            user_answer: None,
        }
    }
}

/// Result of the document analysis call. Shown to the user, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub summary: String,
    pub key_points: Vec<String>,
    pub topics: Vec<String>,
    pub study_questions: Vec<String>,
}

/// A study plan entry as returned by the model. `day` is an offset from today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub day: i64,
    pub subject: String,
    pub topic: String,
    pub duration: u32,
    pub tasks: Vec<String>,
}

impl ScheduleEntry {
    /// Converts the relative day offset into an absolute session anchored at `now`.
    /// Offsets that leave the representable time range are rejected.
    pub fn into_session(self, now: DateTime<Utc>) -> Result<NewStudySession, String> {
        let scheduled_at = self
            .day
            .checked_mul(MILLIS_PER_DAY)
            .and_then(|millis| now.checked_add_signed(chrono::Duration::milliseconds(millis)))
            .ok_or_else(|| format!("schedule day {} is out of range", self.day))?;
        Ok(NewStudySession {
            subject: self.subject,
            topic: self.topic,
            scheduled_at,
            duration: self.duration,
            tasks: self.tasks,
        })
    }
}

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Depth of a concept explanation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl ExplanationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplanationLevel::Beginner => "beginner",
            ExplanationLevel::Intermediate => "intermediate",
            ExplanationLevel::Advanced => "advanced",
        }
    }
}
