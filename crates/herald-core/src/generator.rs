//! ============================================================================
//! Content Generator - Structured Drafts from One Completion Call
//! ============================================================================
//! Each request is a single prompt to a chat-completion provider. The model is
//! told to answer with bare JSON; the answer is trimmed and parsed strictly.
//! Anything that does not parse is returned as `GenerationParseError` with
//! the raw text attached. There is no repair or retry loop.
//! ============================================================================

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::{HeraldError, Result};
use crate::types::{EmailDraft, LinkedInDraft, PromptKind, StructuredContent, TweetDraft};

/// Answer the model gives when no catalog entry fits the query
pub const NO_PRICE_MATCH: &str = "No relevant price id found";

const JSON_ONLY: &str = "Return a valid directly parsable json, dont return it within a code snippet or add any kind of explanation!!";

/// Turns a prompt into the model's raw text answer
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

// ============================================================================
// OpenAI-compatible chat completions
// ============================================================================

pub struct ChatCompletionClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ChatCompletionClient {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| HeraldError::Config("OPENAI_API_KEY is not set".to_string()))?;

        debug!("Calling {} with {} chars", self.config.model, prompt.len());

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| HeraldError::GenerationFailed {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!("Completion API error {}: {}", status, body);
            return Err(HeraldError::GenerationFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let chat_response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| HeraldError::GenerationFailed {
                status: Some(status.as_u16()),
                body: format!("Failed to parse API response: {}", e),
            })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(HeraldError::GenerationFailed {
                status: Some(status.as_u16()),
                body: "No choices in completion response".to_string(),
            })
    }
}

// ============================================================================
// Anthropic messages
// ============================================================================

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client, picked when the configured model is an Anthropic one
pub struct AnthropicClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl AnthropicClient {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

/// Messages API model id from a `GPT_MODEL` value, e.g.
/// `anthropic.claude-3-haiku-20240307-v1:0` -> `claude-3-haiku-20240307`
pub fn anthropic_model_id(model: &str) -> &str {
    let model = model
        .strip_prefix("anthropic.")
        .or_else(|| model.strip_prefix("anthropic/"))
        .unwrap_or(model);
    match model.rsplit_once("-v") {
        Some((name, version))
            if version.contains(':') && version.chars().all(|c| c.is_ascii_digit() || c == ':') =>
        {
            name
        }
        _ => model,
    }
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .config
            .anthropic_api_key
            .as_deref()
            .ok_or_else(|| HeraldError::Config("ANTHROPIC_API_KEY is not set".to_string()))?;

        let model = anthropic_model_id(&self.config.model);
        debug!("Calling {} with {} chars", model, prompt.len());

        let request = MessagesRequest {
            model: model.to_string(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
        };

        let url = format!("{}/messages", self.config.anthropic_base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| HeraldError::GenerationFailed {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!("Messages API error {}: {}", status, body);
            return Err(HeraldError::GenerationFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let messages_response: MessagesResponse =
            serde_json::from_str(&body).map_err(|e| HeraldError::GenerationFailed {
                status: Some(status.as_u16()),
                body: format!("Failed to parse API response: {}", e),
            })?;

        let text: String = messages_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(HeraldError::GenerationFailed {
                status: Some(status.as_u16()),
                body: "No text in messages response".to_string(),
            });
        }
        Ok(text)
    }
}

/// Provider for the configured model: Anthropic models go to the Messages API,
/// everything else to the OpenAI-compatible endpoint
pub fn completion_provider(client: reqwest::Client, config: LlmConfig) -> Arc<dyn CompletionProvider> {
    if config.uses_anthropic() {
        info!("Using Anthropic Messages API for model {}", config.model);
        Arc::new(AnthropicClient::new(client, config))
    } else {
        Arc::new(ChatCompletionClient::new(client, config))
    }
}

// ============================================================================
// Price catalog
// ============================================================================

/// Product name to Stripe price id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceCatalog {
    products: BTreeMap<String, String>,
}

impl PriceCatalog {
    pub fn new(products: BTreeMap<String, String>) -> Self {
        Self { products }
    }

    /// Load a `{"product": "price_id"}` JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HeraldError::Config(format!("Cannot read price mapping {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            HeraldError::Config(format!("Invalid price mapping {}: {}", path.display(), e))
        })
    }

    pub fn contains_price(&self, price_id: &str) -> bool {
        self.products.values().any(|p| p == price_id)
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

// ============================================================================
// Generator
// ============================================================================

#[derive(Deserialize)]
struct PriceIdAnswer {
    price_id: String,
}

pub struct ContentGenerator {
    provider: Arc<dyn CompletionProvider>,
}

impl ContentGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// One completion call, parsed into the draft type for `kind`
    pub async fn generate(&self, kind: PromptKind, query: &str) -> Result<StructuredContent> {
        let query = non_blank(query)?;
        info!("Generating {:?} content", kind);

        let raw = self.provider.complete(&build_prompt(kind, query)).await?;
        debug!("Model returned {} chars", raw.len());

        let content = match kind {
            PromptKind::Tweet => StructuredContent::Tweet(parse_output::<TweetDraft>(&raw)?),
            PromptKind::Email => StructuredContent::Email(parse_output::<EmailDraft>(&raw)?),
            PromptKind::LinkedInPost => {
                StructuredContent::LinkedInPost(parse_output::<LinkedInDraft>(&raw)?)
            }
        };
        Ok(content)
    }

    /// Pick the catalog price id that fits `query`, or `NO_PRICE_MATCH`
    pub async fn select_price_id(&self, query: &str, catalog: &PriceCatalog) -> Result<String> {
        let query = non_blank(query)?;
        if catalog.is_empty() {
            return Err(HeraldError::Config("Price mapping is empty".to_string()));
        }

        let mapping = serde_json::to_string(catalog)
            .map_err(|e| HeraldError::Config(format!("Cannot serialize price mapping: {}", e)))?;
        let prompt = format!(
            "Given the following query:\n{}\n\
            and the following product price id mapping:\n{}\n\
            return the price id that is most relevant to the query.\n\
            If no relevant price id is found, return '{}'.\n\
            Answer with a JSON object of the form {{\"price_id\": \"...\"}}.\n{}",
            query, mapping, NO_PRICE_MATCH, JSON_ONLY
        );

        let raw = self.provider.complete(&prompt).await?;
        let answer: PriceIdAnswer = parse_output(&raw)?;

        if answer.price_id == NO_PRICE_MATCH || catalog.contains_price(&answer.price_id) {
            Ok(answer.price_id)
        } else {
            Err(HeraldError::GenerationParseError {
                raw,
                reason: format!("price id '{}' is not in the catalog", answer.price_id),
            })
        }
    }
}

fn non_blank(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(HeraldError::Validation("Query cannot be empty".to_string()));
    }
    Ok(query)
}

fn build_prompt(kind: PromptKind, query: &str) -> String {
    match kind {
        PromptKind::Tweet => format!(
            "Given the query: \"{}\", generate a twitter post.\n\
            Return a JSON object with the keys 'content' (the post text) and 'hashtags' (a list of hashtags).\n\
            For example:\n\
            {{\"content\": \"We are excited to announce the launch of our new product!\", \"hashtags\": [\"#NewProductLaunch\", \"#ProductLaunch\"]}}\n\
            Every hashtag starts with the # symbol. Keep content and hashtags together under 280 characters.\n{}",
            query, JSON_ONLY
        ),
        PromptKind::Email => format!(
            "Given the query: \"{}\", extract what is needed to send an email: \
            the recipient's email address, the subject and the body.\n\
            Return a JSON object with the keys 'recipient', 'subject' and 'body'. For example:\n\
            {{\"recipient\": \"example@example.com\", \"subject\": \"Upcoming Event Notification\", \"body\": \"Dear [Name], ...\"}}\n{}",
            query, JSON_ONLY
        ),
        PromptKind::LinkedInPost => format!(
            "Given the query: \"{}\", write a professional, engaging LinkedIn post in natural paragraphs, without hashtags.\n\
            Return a JSON object with the single key 'body' holding the post text.\n{}",
            query, JSON_ONLY
        ),
    }
}

/// Strict parse after trimming surrounding whitespace
fn parse_output<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw.trim()).map_err(|e| {
        warn!("Model output did not parse: {}", e);
        HeraldError::GenerationParseError {
            raw: raw.to_string(),
            reason: e.to_string(),
        }
    })
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// Only text blocks carry `text`; other block types are skipped
#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replies with a fixed answer and records the prompts it saw
    struct Canned {
        answer: String,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for Canned {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.clone())
        }
    }

    fn catalog() -> PriceCatalog {
        let mut products = BTreeMap::new();
        products.insert("Premium Mattress".to_string(), "price_premium".to_string());
        products.insert("Basic Mattress".to_string(), "price_basic".to_string());
        PriceCatalog::new(products)
    }

    #[tokio::test]
    async fn test_tweet_generation() {
        let provider = Canned::new(
            "\n {\"content\": \"We shipped!\", \"hashtags\": [\"#Launch\", \"#Rust\"]} \n",
        );
        let generator = ContentGenerator::new(provider.clone());

        let content = generator.generate(PromptKind::Tweet, "announce the launch").await.unwrap();
        assert_eq!(content.preview(), "We shipped! #Launch #Rust");

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("announce the launch"));
        assert!(prompts[0].contains("Return a valid directly parsable json"));
    }

    #[tokio::test]
    async fn test_email_and_linkedin_generation() {
        let email = ContentGenerator::new(Canned::new(
            r#"{"recipient": "a@example.com", "subject": "Hi", "body": "Hello there"}"#,
        ));
        match email.generate(PromptKind::Email, "say hi to a@example.com").await.unwrap() {
            StructuredContent::Email(draft) => {
                assert_eq!(draft.recipient, "a@example.com");
                assert_eq!(draft.subject, "Hi");
            }
            other => panic!("unexpected content: {:?}", other),
        }

        let linkedin = ContentGenerator::new(Canned::new(r#"{"body": "Big news."}"#));
        assert_eq!(
            linkedin.generate(PromptKind::LinkedInPost, "news").await.unwrap(),
            StructuredContent::LinkedInPost(LinkedInDraft {
                body: "Big news.".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_blank_query_never_calls_provider() {
        let provider = Canned::new("{}");
        let generator = ContentGenerator::new(provider.clone());

        assert!(matches!(
            generator.generate(PromptKind::Tweet, "   ").await,
            Err(HeraldError::Validation(_))
        ));
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_output_keeps_raw_text() {
        let generator = ContentGenerator::new(Canned::new("```json\n{\"content\": \"x\"}\n```"));

        match generator.generate(PromptKind::Tweet, "anything").await {
            Err(HeraldError::GenerationParseError { raw, .. }) => {
                assert!(raw.starts_with("```json"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_field_is_parse_error() {
        let generator = ContentGenerator::new(Canned::new(r#"{"recipient": "a@example.com"}"#));
        assert!(matches!(
            generator.generate(PromptKind::Email, "mail").await,
            Err(HeraldError::GenerationParseError { .. })
        ));
    }

    #[tokio::test]
    async fn test_select_price_id() {
        let matched = ContentGenerator::new(Canned::new(r#"{"price_id": "price_premium"}"#));
        assert_eq!(
            matched.select_price_id("best mattress", &catalog()).await.unwrap(),
            "price_premium"
        );

        let none = ContentGenerator::new(Canned::new(r#"{"price_id": "No relevant price id found"}"#));
        assert_eq!(
            none.select_price_id("a car", &catalog()).await.unwrap(),
            NO_PRICE_MATCH
        );

        let invented = ContentGenerator::new(Canned::new(r#"{"price_id": "price_made_up"}"#));
        assert!(matches!(
            invented.select_price_id("mattress", &catalog()).await,
            Err(HeraldError::GenerationParseError { .. })
        ));
    }

    #[test]
    fn test_price_catalog_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.json");
        std::fs::write(&path, r#"{"Premium Mattress": "price_premium"}"#).unwrap();

        let catalog = PriceCatalog::load(&path).unwrap();
        assert!(catalog.contains_price("price_premium"));
        assert!(!catalog.contains_price("Premium Mattress"));

        assert!(matches!(
            PriceCatalog::load(&dir.path().join("missing.json")),
            Err(HeraldError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_chat_completion_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-test" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"body\": \"ok\"}" } }]
            })))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(
            reqwest::Client::new(),
            LlmConfig {
                api_key: Some("sk-test".to_string()),
                base_url: format!("{}/v1", server.uri()),
                model: "gpt-test".to_string(),
                ..LlmConfig::default()
            },
        );
        assert_eq!(client.complete("hi").await.unwrap(), "{\"body\": \"ok\"}");
    }

    #[tokio::test]
    async fn test_chat_completion_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(
            reqwest::Client::new(),
            LlmConfig {
                api_key: Some("sk-test".to_string()),
                base_url: format!("{}/v1", server.uri()),
                ..LlmConfig::default()
            },
        );

        match client.complete("hi").await {
            Err(HeraldError::GenerationFailed { status, body }) => {
                assert_eq!(status, Some(429));
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            client.complete("hi").await,
            Err(HeraldError::GenerationFailed { .. })
        ));
    }

    #[test]
    fn test_anthropic_model_routing() {
        let mut config = LlmConfig::default();
        assert!(!config.uses_anthropic());

        config.model = "anthropic.claude-3-haiku-20240307-v1:0".to_string();
        assert!(config.uses_anthropic());
        assert_eq!(anthropic_model_id(&config.model), "claude-3-haiku-20240307");

        assert_eq!(anthropic_model_id("claude-3-5-sonnet-latest"), "claude-3-5-sonnet-latest");
        assert_eq!(anthropic_model_id("anthropic/claude-3-opus-20240229"), "claude-3-opus-20240229");
    }

    #[tokio::test]
    async fn test_anthropic_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(serde_json::json!({ "model": "claude-3-haiku-20240307" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{ "type": "text", "text": "{\"body\": \"ok\"}" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = completion_provider(
            reqwest::Client::new(),
            LlmConfig {
                anthropic_api_key: Some("sk-ant".to_string()),
                anthropic_base_url: format!("{}/v1", server.uri()),
                model: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
                ..LlmConfig::default()
            },
        );
        assert_eq!(provider.complete("hi").await.unwrap(), "{\"body\": \"ok\"}");
    }

    #[tokio::test]
    async fn test_anthropic_failure_and_missing_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let config = LlmConfig {
            anthropic_api_key: Some("sk-ant".to_string()),
            anthropic_base_url: format!("{}/v1", server.uri()),
            model: "claude-3-haiku-20240307".to_string(),
            ..LlmConfig::default()
        };
        match AnthropicClient::new(reqwest::Client::new(), config.clone()).complete("hi").await {
            Err(HeraldError::GenerationFailed { status, body }) => {
                assert_eq!(status, Some(529));
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let keyless = LlmConfig {
            anthropic_api_key: None,
            ..config
        };
        assert!(matches!(
            AnthropicClient::new(reqwest::Client::new(), keyless).complete("hi").await,
            Err(HeraldError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = ChatCompletionClient::new(reqwest::Client::new(), LlmConfig::default());
        assert!(matches!(client.complete("hi").await, Err(HeraldError::Config(_))));
    }
}
