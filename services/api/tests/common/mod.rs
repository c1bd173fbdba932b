//! Shared helpers for the integration tests: a scripted gateway standing in
//! for the language model, and an `AppState` backed by in-memory storage.

#![allow(dead_code)]

use api_lib::{config::Config, web::state::AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
};
use serde_json::Value;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use study_assistant_core::{
    catalog::Provider,
    domain::{
        CardContent, DocumentSummary, ExplanationLevel, GatewayConfig, GeneratedQuestion,
        ScheduleEntry,
    },
    ports::{
        AiGateway, AiGatewayFactory, ChatCompletionService, FragmentStream, PortError, PortResult,
        StructuredGenerationService,
    },
    stores::MemoryStorage,
};
use tokio::sync::Notify;

pub const TEST_KEY: &str = "sk-test-key";

/// A gateway whose every answer is fixed up front.
#[derive(Default)]
pub struct ScriptedGateway {
    /// Streamed in order. `Err` items become `ProviderInvocation` failures.
    pub fragments: Vec<Result<&'static str, &'static str>>,
    /// When set, the stream waits on `gate` after this many fragments.
    pub pause_after: Option<usize>,
    pub gate: Arc<Notify>,
    pub questions: Vec<GeneratedQuestion>,
    pub cards: Vec<CardContent>,
    pub schedule: Vec<ScheduleEntry>,
    pub summary: Option<DocumentSummary>,
    pub explanation: String,
    /// Set by `summarize_document` to the text it received.
    pub last_document: Mutex<Option<String>>,
    /// Set by `explain_concept` to the level it received.
    pub last_level: Mutex<Option<ExplanationLevel>>,
}

impl ScriptedGateway {
    pub fn streaming(fragments: &[&'static str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| Ok(*f)).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ChatCompletionService for ScriptedGateway {
    async fn chat(&self, _prompt: &str, _system: Option<&str>) -> PortResult<String> {
        Ok(self
            .fragments
            .iter()
            .filter_map(|f| f.ok())
            .collect::<String>())
    }

    async fn chat_stream(
        &self,
        _prompt: &str,
        _system: Option<&str>,
    ) -> PortResult<FragmentStream> {
        let items: Vec<PortResult<String>> = self
            .fragments
            .iter()
            .map(|f| {
                f.map(str::to_string)
                    .map_err(|e| PortError::ProviderInvocation(e.to_string()))
            })
            .collect();
        let total = items.len();
        let pause_after = self.pause_after;
        let gate = self.gate.clone();

        let stream = async_stream::stream! {
            for (index, item) in items.into_iter().enumerate() {
                if pause_after == Some(index) {
                    gate.notified().await;
                }
                yield item;
            }
            // Pausing after the last fragment keeps the stream open.
            if pause_after.is_some_and(|n| n >= total) {
                gate.notified().await;
            }
        };
        Ok(Box::pin(stream))
    }

    async fn explain_concept(&self, _topic: &str, level: ExplanationLevel) -> PortResult<String> {
        *self.last_level.lock().unwrap() = Some(level);
        Ok(self.explanation.clone())
    }
}

#[async_trait]
impl StructuredGenerationService for ScriptedGateway {
    async fn generate_quiz(
        &self,
        _topic: &str,
        count: usize,
    ) -> PortResult<Vec<GeneratedQuestion>> {
        Ok(self.questions.iter().take(count).cloned().collect())
    }

    async fn generate_flashcards(
        &self,
        _topic: &str,
        count: usize,
    ) -> PortResult<Vec<CardContent>> {
        Ok(self.cards.iter().take(count).cloned().collect())
    }

    async fn summarize_document(&self, content: &str) -> PortResult<DocumentSummary> {
        *self.last_document.lock().unwrap() = Some(content.to_string());
        self.summary
            .clone()
            .ok_or_else(|| PortError::ProviderInvocation("no summary scripted".to_string()))
    }

    async fn create_study_plan(
        &self,
        _subjects: &[String],
        _duration_days: u32,
        _hours_per_day: f32,
    ) -> PortResult<Vec<ScheduleEntry>> {
        Ok(self.schedule.clone())
    }
}

/// Hands out the same scripted gateway for every connection and counts calls.
pub struct ScriptedFactory {
    pub gateway: Arc<ScriptedGateway>,
    pub connects: AtomicUsize,
    pub last_config: Mutex<Option<GatewayConfig>>,
}

impl ScriptedFactory {
    pub fn new(gateway: ScriptedGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            connects: AtomicUsize::new(0),
            last_config: Mutex::new(None),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl AiGatewayFactory for ScriptedFactory {
    fn connect(&self, config: &GatewayConfig) -> PortResult<Arc<dyn AiGateway>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config.clone());
        Ok(self.gateway.clone())
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub storage: Arc<MemoryStorage>,
    pub factory: Arc<ScriptedFactory>,
}

/// Builds an `AppState` over in-memory storage. With `with_key`, the default
/// provider (OpenAI) has a key configured.
pub fn test_app(gateway: ScriptedGateway, with_key: bool) -> TestApp {
    let mut config = Config::default();
    if with_key {
        config.api_keys.insert(Provider::OpenAi, TEST_KEY.to_string());
    }
    let storage = Arc::new(MemoryStorage::new());
    let factory = Arc::new(ScriptedFactory::new(gateway));
    let state = AppState::open(Arc::new(config), storage.clone(), factory.clone())
        .expect("state opens over empty storage");
    TestApp {
        state: Arc::new(state),
        storage,
        factory,
    }
}

pub fn question(text: &str, correct_index: usize) -> GeneratedQuestion {
    GeneratedQuestion {
        question: text.to_string(),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct_index,
        explanation: format!("Because of {}", text),
    }
}

pub fn card(front: &str, back: &str) -> CardContent {
    CardContent {
        front: front.to_string(),
        back: back.to_string(),
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
