//! services/api/src/adapters/ai_gateway.rs
//!
//! This module contains the adapter for the language model gateway.
//! It implements the `ChatCompletionService` and `StructuredGenerationService`
//! ports from the `core` crate against any OpenAI-compatible endpoint.
//!
//! Requests and responses use `byot` ("bring your own types") so the same code
//! works for vendors whose compatibility layers omit or add fields.

use async_openai::{config::OpenAIConfig, error::OpenAIError, Client};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::sync::Arc;
use study_assistant_core::{
    domain::{
        CardContent, DocumentSummary, ExplanationLevel, GatewayConfig, GeneratedQuestion,
        ScheduleEntry,
    },
    ports::{
        AiGateway, AiGatewayFactory, ChatCompletionService, FragmentStream, PortError, PortResult,
        StructuredGenerationService,
    },
};
use tracing::{debug, info};

use super::prompts;

//=========================================================================================
// Wire Shapes
//=========================================================================================

#[derive(Debug, Deserialize)]
struct ByotChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ByotChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ByotChatChoice {
    message: ByotChatMessage,
}

#[derive(Debug, Deserialize)]
struct ByotChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ByotChatCompletionStreamResponse {
    #[serde(default)]
    choices: Vec<ByotChatChoiceStream>,
}

#[derive(Debug, Deserialize)]
struct ByotChatChoiceStream {
    #[serde(default)]
    delta: ByotChatStreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ByotChatStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct QuizPayload {
    questions: Vec<GeneratedQuestion>,
}

#[derive(Deserialize)]
struct FlashcardsPayload {
    cards: Vec<CardContent>,
}

#[derive(Deserialize)]
struct StudyPlanPayload {
    schedule: Vec<ScheduleEntry>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A gateway bound to one provider endpoint, credential and model.
#[derive(Clone)]
pub struct OpenAiCompatibleGateway {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompatibleGateway {
    /// Creates a new `OpenAiCompatibleGateway`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    fn chat_request(&self, prompt: &str, system: Option<&str>, stream: bool) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));
        json!({
            "model": self.model,
            "messages": messages,
            "stream": stream
        })
    }

    /// Sends one non-streaming request and returns the text of the first choice.
    async fn complete(&self, request: Value) -> PortResult<String> {
        let response = self
            .client
            .chat()
            .create_byot::<_, ByotChatCompletionResponse>(&request)
            .await
            .map_err(provider_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::ProviderInvocation(
                    "Language model response contained no text content.".to_string(),
                )
            })
    }

    /// Requests a JSON object matching `schema` and deserializes it into `T`.
    async fn generate_structured<T: DeserializeOwned>(
        &self,
        name: &str,
        schema: Value,
        prompt: &str,
    ) -> PortResult<T> {
        let request = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompts::STRUCTURED_SYSTEM_PROMPT },
                { "role": "user", "content": prompts::with_schema(prompt, &schema) }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": name, "schema": schema }
            },
            "stream": false
        });

        let content = self.complete(request).await?;
        debug!(schema = name, bytes = content.len(), "Structured response received");
        parse_json_payload(&content)
    }
}

fn provider_error(e: OpenAIError) -> PortError {
    PortError::ProviderInvocation(e.to_string())
}

/// Parses a model reply as JSON, tolerating a surrounding markdown code fence.
fn parse_json_payload<T: DeserializeOwned>(content: &str) -> PortResult<T> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| {
        PortError::ProviderInvocation(format!("Language model returned malformed JSON: {}", e))
    })
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for OpenAiCompatibleGateway {
    async fn chat(&self, prompt: &str, system: Option<&str>) -> PortResult<String> {
        self.complete(self.chat_request(prompt, system, false)).await
    }

    async fn chat_stream(&self, prompt: &str, system: Option<&str>) -> PortResult<FragmentStream> {
        let request = self.chat_request(prompt, system, true);
        let mut upstream = self
            .client
            .chat()
            .create_stream_byot::<_, ByotChatCompletionStreamResponse>(&request)
            .await
            .map_err(provider_error)?;

        let fragments = async_stream::stream! {
            while let Some(chunk) = upstream.next().await {
                match chunk {
                    Ok(chunk) => {
                        for choice in chunk.choices {
                            if let Some(content) = choice.delta.content {
                                if !content.is_empty() {
                                    yield Ok(content);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(provider_error(e));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(fragments))
    }

    async fn explain_concept(&self, topic: &str, level: ExplanationLevel) -> PortResult<String> {
        let prompt = prompts::explain_prompt(topic, level);
        self.complete(self.chat_request(&prompt, None, false)).await
    }
}

//=========================================================================================
// `StructuredGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StructuredGenerationService for OpenAiCompatibleGateway {
    async fn generate_quiz(&self, topic: &str, count: usize) -> PortResult<Vec<GeneratedQuestion>> {
        let payload: QuizPayload = self
            .generate_structured(
                "quiz",
                prompts::quiz_schema(),
                &prompts::quiz_prompt(topic, count),
            )
            .await?;

        for question in &payload.questions {
            question.validate().map_err(PortError::ProviderInvocation)?;
        }
        Ok(payload.questions)
    }

    async fn generate_flashcards(&self, topic: &str, count: usize) -> PortResult<Vec<CardContent>> {
        let payload: FlashcardsPayload = self
            .generate_structured(
                "flashcards",
                prompts::flashcards_schema(),
                &prompts::flashcards_prompt(topic, count),
            )
            .await?;
        Ok(payload.cards)
    }

    async fn summarize_document(&self, content: &str) -> PortResult<DocumentSummary> {
        self.generate_structured(
            "document_summary",
            prompts::summary_schema(),
            &prompts::summary_prompt(content),
        )
        .await
    }

    async fn create_study_plan(
        &self,
        subjects: &[String],
        duration_days: u32,
        hours_per_day: f32,
    ) -> PortResult<Vec<ScheduleEntry>> {
        let payload: StudyPlanPayload = self
            .generate_structured(
                "study_plan",
                prompts::study_plan_schema(),
                &prompts::study_plan_prompt(subjects, duration_days, hours_per_day),
            )
            .await?;
        Ok(payload.schedule)
    }
}

//=========================================================================================
// `AiGatewayFactory` Implementation
//=========================================================================================

/// Builds an `OpenAiCompatibleGateway` pointed at the selected provider's base URL.
#[derive(Clone, Debug, Default)]
pub struct OpenAiGatewayFactory;

impl AiGatewayFactory for OpenAiGatewayFactory {
    fn connect(&self, config: &GatewayConfig) -> PortResult<Arc<dyn AiGateway>> {
        if config.model.trim().is_empty() {
            return Err(PortError::InvalidConfiguration(
                "No model selected".to_string(),
            ));
        }

        let base_url = config.provider.info().base_url;
        info!(
            provider = %config.provider,
            model = %config.model,
            "Connecting language model gateway"
        );

        let openai_config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(config.api_key.clone());
        let client = Client::with_config(openai_config);

        Ok(Arc::new(OpenAiCompatibleGateway::new(
            client,
            config.model.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, routing::post, Json, Router};
    use std::sync::Mutex;
    use study_assistant_core::catalog::Provider;

    /// A local OpenAI-compatible endpoint that answers every completion
    /// request with the same body and records what it was sent.
    struct StubProvider {
        gateway: OpenAiCompatibleGateway,
        requests: Arc<Mutex<Vec<Value>>>,
    }

    async fn stub_provider(content_type: &'static str, body: String) -> StubProvider {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move |Json(request): Json<Value>| {
                let seen = seen.clone();
                let body = body.clone();
                async move {
                    seen.lock().unwrap().push(request);
                    ([(header::CONTENT_TYPE, content_type)], body)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let config = OpenAIConfig::new()
            .with_api_base(format!("http://{}", addr))
            .with_api_key("sk-test");
        StubProvider {
            gateway: OpenAiCompatibleGateway::new(Client::with_config(config), "gpt-4o".into()),
            requests,
        }
    }

    fn sse(events: &[&str]) -> String {
        events.iter().map(|e| format!("data: {}\n\n", e)).collect()
    }

    fn delta(content: &str) -> String {
        json!({ "choices": [{ "index": 0, "delta": { "content": content } }] }).to_string()
    }

    #[tokio::test]
    async fn streamed_deltas_become_fragments() {
        let role_only = json!({ "choices": [{ "index": 0, "delta": { "role": "assistant" } }] });
        let body = sse(&[
            &role_only.to_string(),
            &delta("Hel"),
            &delta(""),
            r#"{"choices":[]}"#,
            &delta("lo"),
            "[DONE]",
        ]);
        let stub = stub_provider("text/event-stream", body).await;

        let stream = stub.gateway.chat_stream("Say hello", Some("Be brief")).await.unwrap();
        let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;

        assert_eq!(fragments, vec!["Hel".to_string(), "lo".to_string()]);
        let requests = stub.requests.lock().unwrap();
        assert_eq!(requests[0]["stream"], json!(true));
        assert_eq!(requests[0]["model"], json!("gpt-4o"));
        assert_eq!(requests[0]["messages"][0]["content"], json!("Be brief"));
    }

    #[tokio::test]
    async fn stream_error_is_yielded_once_then_the_stream_ends() {
        let body = sse(&[&delta("Hel"), "not json at all", &delta("lo"), "[DONE]"]);
        let stub = stub_provider("text/event-stream", body).await;

        let stream = stub.gateway.chat_stream("Say hello", None).await.unwrap();
        let items: Vec<PortResult<String>> = stream.collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "Hel");
        assert!(matches!(items[1], Err(PortError::ProviderInvocation(_))));
    }

    #[tokio::test]
    async fn structured_quiz_round_trips_through_the_endpoint() {
        let quiz = json!({
            "questions": [{
                "question": "What is 2+2?",
                "options": ["3", "4", "5", "6"],
                "correctIndex": 1,
                "explanation": "Basic addition."
            }]
        });
        let body = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": format!("```json\n{}\n```", quiz) },
                "finish_reason": "stop"
            }]
        });
        let stub = stub_provider("application/json", body.to_string()).await;

        let questions = stub.gateway.generate_quiz("Arithmetic", 1).await.unwrap();

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_index, 1);
        assert_eq!(questions[0].options[1], "4");
        let requests = stub.requests.lock().unwrap();
        assert_eq!(requests[0]["stream"], json!(false));
        assert_eq!(requests[0]["response_format"]["type"], json!("json_schema"));
        assert_eq!(requests[0]["response_format"]["json_schema"]["name"], json!("quiz"));
    }

    #[tokio::test]
    async fn response_without_text_is_a_provider_error() {
        let body = json!({ "choices": [{ "index": 0, "message": { "role": "assistant" } }] });
        let stub = stub_provider("application/json", body.to_string()).await;

        let result = stub.gateway.chat("hello", None).await;

        assert!(matches!(result, Err(PortError::ProviderInvocation(_))));
    }

    #[test]
    fn plain_json_payload_is_parsed() {
        let payload: FlashcardsPayload =
            parse_json_payload(r#"{"cards":[{"front":"Term","back":"Definition"}]}"#).unwrap();
        assert_eq!(payload.cards.len(), 1);
        assert_eq!(payload.cards[0].front, "Term");
    }

    #[test]
    fn fenced_json_payload_is_parsed() {
        let content = "```json\n{\"summary\":\"s\",\"keyPoints\":[\"k\"],\"topics\":[],\"studyQuestions\":[\"q?\"]}\n```";
        let summary: DocumentSummary = parse_json_payload(content).unwrap();
        assert_eq!(summary.summary, "s");
        assert_eq!(summary.key_points, vec!["k".to_string()]);
        assert_eq!(summary.study_questions, vec!["q?".to_string()]);
    }

    #[test]
    fn malformed_payload_is_a_provider_error() {
        let result: PortResult<QuizPayload> = parse_json_payload("Sure! Here are your questions:");
        assert!(matches!(result, Err(PortError::ProviderInvocation(_))));
    }

    #[test]
    fn schedule_entries_keep_relative_days() {
        let payload: StudyPlanPayload = parse_json_payload(
            r#"{"schedule":[{"day":2,"subject":"Math","topic":"Limits","duration":60,"tasks":["Read 2.1"]}]}"#,
        )
        .unwrap();
        assert_eq!(payload.schedule[0].day, 2);
        assert_eq!(payload.schedule[0].duration, 60);
    }

    #[test]
    fn factory_rejects_blank_model() {
        let config = GatewayConfig {
            provider: Provider::DeepSeek,
            model: "  ".to_string(),
            api_key: "sk-test".to_string(),
        };
        let result = OpenAiGatewayFactory.connect(&config);
        assert!(matches!(result, Err(PortError::InvalidConfiguration(_))));
    }

    #[test]
    fn factory_connects_every_provider() {
        for provider in Provider::ALL {
            let config = GatewayConfig {
                provider,
                model: provider.default_model().to_string(),
                api_key: "test-key".to_string(),
            };
            assert!(OpenAiGatewayFactory.connect(&config).is_ok());
        }
    }

    #[test]
    fn chat_request_includes_optional_system_prompt() {
        let gateway = OpenAiCompatibleGateway::new(
            Client::with_config(OpenAIConfig::new()),
            "gpt-4o".to_string(),
        );
        let with_system = gateway.chat_request("hi", Some("be kind"), true);
        assert_eq!(with_system["messages"].as_array().unwrap().len(), 2);
        assert_eq!(with_system["stream"], json!(true));

        let without = gateway.chat_request("hi", None, false);
        assert_eq!(without["messages"][0]["role"], json!("user"));
    }
}
