//! crates/study_assistant_core/src/catalog.rs
//!
//! The closed set of supported AI providers and the models offered for each.
//! Every provider is reached through an OpenAI-compatible endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ports::PortError;

/// A hosted LLM vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    DeepSeek,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Google,
        Provider::DeepSeek,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::DeepSeek => "deepseek",
        }
    }

    /// Static description of this provider.
    pub fn info(&self) -> &'static ProviderInfo {
        match self {
            Provider::OpenAi => &OPENAI,
            Provider::Anthropic => &ANTHROPIC,
            Provider::Google => &GOOGLE,
            Provider::DeepSeek => &DEEPSEEK,
        }
    }

    /// The model selected when the user switches to this provider.
    pub fn default_model(&self) -> &'static str {
        self.info().models[0].id
    }

    /// UI hint only: whether `key` starts with the prefix this vendor issues.
    /// Providers without a known prefix accept anything non-empty.
    pub fn key_matches_hint(&self, key: &str) -> bool {
        match self.info().api_key_prefix {
            Some(prefix) => key.starts_with(prefix),
            None => !key.is_empty(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Provider {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| PortError::InvalidConfiguration(format!("Unknown provider: {}", s)))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub max_tokens: u32,
    pub supports_vision: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub base_url: &'static str,
    pub models: &'static [ModelInfo],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_prefix: Option<&'static str>,
    pub docs_url: &'static str,
}

impl ProviderInfo {
    pub fn has_model(&self, model_id: &str) -> bool {
        self.models.iter().any(|m| m.id == model_id)
    }
}

const fn model(
    id: &'static str,
    name: &'static str,
    max_tokens: u32,
    supports_vision: bool,
) -> ModelInfo {
    ModelInfo {
        id,
        name,
        max_tokens,
        supports_vision,
    }
}

static OPENAI: ProviderInfo = ProviderInfo {
    id: "openai",
    name: "OpenAI",
    base_url: "https://api.openai.com/v1",
    models: &[
        model("gpt-4o", "GPT-4o", 128_000, true),
        model("gpt-4o-mini", "GPT-4o Mini", 128_000, false),
        model("gpt-4-turbo", "GPT-4 Turbo", 128_000, true),
        model("o1", "o1", 200_000, false),
        model("o1-mini", "o1 Mini", 128_000, false),
    ],
    api_key_prefix: Some("sk-"),
    docs_url: "https://platform.openai.com/api-keys",
};

static ANTHROPIC: ProviderInfo = ProviderInfo {
    id: "anthropic",
    name: "Anthropic",
    base_url: "https://api.anthropic.com/v1",
    models: &[
        model("claude-sonnet-4-20250514", "Claude Sonnet 4", 200_000, true),
        model("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet", 200_000, true),
        model("claude-3-5-haiku-20241022", "Claude 3.5 Haiku", 200_000, false),
        model("claude-3-opus-20240229", "Claude 3 Opus", 200_000, true),
    ],
    api_key_prefix: Some("sk-ant-"),
    docs_url: "https://console.anthropic.com/settings/keys",
};

static GOOGLE: ProviderInfo = ProviderInfo {
    id: "google",
    name: "Google AI",
    base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
    models: &[
        model("gemini-2.0-flash", "Gemini 2.0 Flash", 1_000_000, true),
        model("gemini-1.5-pro", "Gemini 1.5 Pro", 2_000_000, true),
        model("gemini-1.5-flash", "Gemini 1.5 Flash", 1_000_000, true),
    ],
    api_key_prefix: None,
    docs_url: "https://aistudio.google.com/app/apikey",
};

static DEEPSEEK: ProviderInfo = ProviderInfo {
    id: "deepseek",
    name: "DeepSeek",
    base_url: "https://api.deepseek.com/v1",
    models: &[
        model("deepseek-chat", "DeepSeek Chat", 64_000, false),
        model("deepseek-reasoner", "DeepSeek Reasoner", 64_000, false),
    ],
    api_key_prefix: Some("sk-"),
    docs_url: "https://platform.deepseek.com/api_keys",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_round_trip_through_from_str() {
        for provider in Provider::ALL {
            assert_eq!(provider.id().parse::<Provider>().unwrap(), provider);
        }
    }

    #[test]
    fn unknown_provider_is_invalid_configuration() {
        let err = "mistral".parse::<Provider>().unwrap_err();
        assert!(matches!(err, PortError::InvalidConfiguration(_)));
    }

    #[test]
    fn serde_names_match_ids() {
        for provider in Provider::ALL {
            let json = serde_json::to_string(&provider).unwrap();
            assert_eq!(json, format!("\"{}\"", provider.id()));
        }
    }

    #[test]
    fn default_models_belong_to_their_provider() {
        assert_eq!(Provider::OpenAi.default_model(), "gpt-4o");
        assert_eq!(Provider::DeepSeek.default_model(), "deepseek-chat");
        for provider in Provider::ALL {
            assert!(provider.info().has_model(provider.default_model()));
        }
    }

    #[test]
    fn key_prefix_is_only_a_hint() {
        assert!(Provider::Anthropic.key_matches_hint("sk-ant-abc"));
        assert!(!Provider::Anthropic.key_matches_hint("sk-abc"));
        assert!(Provider::Google.key_matches_hint("AIza123"));
        assert!(!Provider::Google.key_matches_hint(""));
    }
}
