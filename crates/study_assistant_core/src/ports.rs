//! crates/study_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the snapshot
//! storage or the hosted LLM vendors.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

use crate::catalog::Provider;
use crate::domain::{
    CardContent, DocumentSummary, ExplanationLevel, GatewayConfig, GeneratedQuestion,
    ScheduleEntry,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and store operations.
/// This abstracts away the specific errors from external services (e.g., filesystem, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("No API key configured for provider {0}")]
    MissingCredential(Provider),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("AI provider request failed: {0}")]
    ProviderInvocation(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PortError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Port
//=========================================================================================

/// Durable key-value storage for whole-store snapshots. Each store owns one
/// named record and rewrites it after every mutation.
pub trait SnapshotStorage: Send + Sync {
    /// Returns the last saved payload for `record`, or `None` if it was never written.
    fn load(&self, record: &str) -> PortResult<Option<String>>;

    /// Replaces the payload for `record`.
    fn save(&self, record: &str, payload: &str) -> PortResult<()>;
}

//=========================================================================================
// AI Gateway Ports (Traits)
//=========================================================================================

/// A finite, lazily produced sequence of text fragments from a streaming completion.
pub type FragmentStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    /// Single-shot free-form completion.
    async fn chat(&self, prompt: &str, system: Option<&str>) -> PortResult<String>;

    /// Streaming free-form completion. The stream ends when the provider signals completion.
    async fn chat_stream(&self, prompt: &str, system: Option<&str>) -> PortResult<FragmentStream>;

    /// Explains `topic` at the requested depth.
    async fn explain_concept(&self, topic: &str, level: ExplanationLevel) -> PortResult<String>;
}

#[async_trait]
pub trait StructuredGenerationService: Send + Sync {
    /// Generates `count` multiple choice questions about `topic`.
    async fn generate_quiz(&self, topic: &str, count: usize) -> PortResult<Vec<GeneratedQuestion>>;

    /// Generates `count` flashcards about `topic`.
    async fn generate_flashcards(&self, topic: &str, count: usize) -> PortResult<Vec<CardContent>>;

    /// Summarizes a document into key points, topics and review questions.
    async fn summarize_document(&self, content: &str) -> PortResult<DocumentSummary>;

    /// Builds a day-by-day schedule covering `subjects`.
    async fn create_study_plan(
        &self,
        subjects: &[String],
        duration_days: u32,
        hours_per_day: f32,
    ) -> PortResult<Vec<ScheduleEntry>>;
}

/// A configured client for one provider/model/credential, offering every request shape.
pub trait AiGateway: ChatCompletionService + StructuredGenerationService {}

impl<T: ChatCompletionService + StructuredGenerationService> AiGateway for T {}

/// Opens gateways for the active settings.
pub trait AiGatewayFactory: Send + Sync {
    fn connect(&self, config: &GatewayConfig) -> PortResult<Arc<dyn AiGateway>>;
}
