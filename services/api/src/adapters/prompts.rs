//! services/api/src/adapters/prompts.rs
//!
//! Prompt templates and JSON schemas sent to the language model.

use serde_json::{json, Value};
use study_assistant_core::domain::ExplanationLevel;

/// System prompt for every chat turn.
pub const CHAT_SYSTEM_PROMPT: &str = r#"You are Synapse, a friendly and knowledgeable AI study assistant. Your role is to:
- Help students understand complex concepts through clear explanations
- Provide examples, analogies, and real-world applications
- Encourage critical thinking with thought-provoking questions
- Adapt explanations to the student's level of understanding
- Suggest study strategies and learning techniques
- Be patient, supportive, and encouraging

Always aim to foster deep understanding rather than just providing answers."#;

/// System prompt for structured generation calls.
pub const STRUCTURED_SYSTEM_PROMPT: &str = "You are an educational content generator. \
Reply with a single JSON object that matches the requested schema. \
Do not wrap it in markdown and do not add any commentary.";

pub fn quiz_prompt(topic: &str, count: usize) -> String {
    format!(
        "Generate {count} multiple choice quiz questions about: {topic}.\n\
         Make them educational and test understanding, not just memorization.\n\
         Vary difficulty levels."
    )
}

pub fn flashcards_prompt(topic: &str, count: usize) -> String {
    format!(
        "Generate {count} flashcards about: {topic}.\n\
         Front should be a question or term.\n\
         Back should be a concise answer or definition.\n\
         Focus on key concepts and definitions."
    )
}

pub fn summary_prompt(content: &str) -> String {
    format!(
        "Analyze the following document and provide:\n\
         1. A comprehensive summary\n\
         2. Key points (main takeaways)\n\
         3. Topics covered\n\
         4. Study questions for review\n\n\
         Document content:\n{content}"
    )
}

pub fn study_plan_prompt(subjects: &[String], duration_days: u32, hours_per_day: f32) -> String {
    format!(
        "Create a study plan for the next {duration_days} days.\n\
         Subjects to cover: {}\n\
         Available study time: {hours_per_day} hours per day\n\n\
         Create a balanced schedule that:\n\
         - Distributes subjects evenly\n\
         - Includes review sessions\n\
         - Breaks topics into manageable chunks\n\n\
         `day` is the offset from today (0 is today) and `duration` is in minutes.",
        subjects.join(", ")
    )
}

pub fn explain_prompt(topic: &str, level: ExplanationLevel) -> String {
    format!(
        "Explain the following concept at a {} level.\n\
         Use clear language, examples, and analogies where helpful.\n\
         Structure the explanation with headings.\n\n\
         Topic: {topic}",
        level.as_str()
    )
}

/// Appends the schema to a prompt so providers that ignore `response_format`
/// still see the expected shape.
pub fn with_schema(prompt: &str, schema: &Value) -> String {
    format!(
        "{prompt}\n\nRespond with a single JSON object matching this JSON schema:\n{}",
        schema
    )
}

//=========================================================================================
// Response Schemas
//=========================================================================================

fn string_array() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

pub fn quiz_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "question": { "type": "string" },
                        "options": {
                            "type": "array",
                            "items": { "type": "string" },
                            "minItems": 4,
                            "maxItems": 4
                        },
                        "correctIndex": { "type": "integer", "minimum": 0, "maximum": 3 },
                        "explanation": { "type": "string" }
                    },
                    "required": ["question", "options", "correctIndex", "explanation"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["questions"],
        "additionalProperties": false
    })
}

pub fn flashcards_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "cards": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "front": { "type": "string" },
                        "back": { "type": "string" }
                    },
                    "required": ["front", "back"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["cards"],
        "additionalProperties": false
    })
}

pub fn summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" },
            "keyPoints": string_array(),
            "topics": string_array(),
            "studyQuestions": string_array()
        },
        "required": ["summary", "keyPoints", "topics", "studyQuestions"],
        "additionalProperties": false
    })
}

pub fn study_plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "schedule": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "day": { "type": "integer" },
                        "subject": { "type": "string" },
                        "topic": { "type": "string" },
                        "duration": { "type": "integer" },
                        "tasks": string_array()
                    },
                    "required": ["day", "subject", "topic", "duration", "tasks"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["schedule"],
        "additionalProperties": false
    })
}
