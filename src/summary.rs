use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};

/// File name of the endpoint configuration, looked up next to the executable.
pub const CONFIG_FILE_NAME: &str = "api.key";

const DEFAULT_URL: &str = "https://api.deepseek.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "deepseek-chat";

const SYSTEM_PROMPT: &str = "You are a data analyst who describes datasets in plain language.";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 400;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Chat-completion endpoint settings, read from a small JSON file:
///
/// ```json
/// { "url": "...", "api_key": "sk-...", "model": "deepseek-chat" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl SummaryConfig {
    /// `api.key` beside the running executable (or in the working directory
    /// when the executable path is unknown).
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default()
            .join(CONFIG_FILE_NAME)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ChartError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
            .map_err(|e| ChartError::Config(format!("{}: {e}", path.display())))
    }

    fn from_json(text: &str) -> std::result::Result<Self, String> {
        let config: SummaryConfig = serde_json::from_str(text).map_err(|e| e.to_string())?;
        if config.api_key.trim().is_empty() {
            return Err("api_key is empty".to_string());
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Summarizer seam
// ---------------------------------------------------------------------------

/// Produces a short natural-language summary of serialized chart data.
pub trait Summarizer {
    fn summarize(&self, serialized: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

fn user_prompt(serialized: &str) -> String {
    format!(
        "Describe the characteristics and overall trend of the following data in \
         plain language, in no more than 200 characters:\n{serialized}"
    )
}

fn build_request(model: &str, prompt: &str) -> Result<String> {
    let request = ChatRequest {
        model,
        messages: [
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    };
    serde_json::to_string(&request)
        .map_err(|e| ChartError::Transport(format!("cannot encode request: {e}")))
}

fn parse_response(body: &str) -> Result<String> {
    let malformed = || ChartError::Transport("malformed response".to_string());
    let response: ChatResponse = serde_json::from_str(body).map_err(|_| malformed())?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(malformed)
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Blocking client for an OpenAI-style `/chat/completions` endpoint.
/// No retries.
pub struct ChatCompletionClient {
    config: SummaryConfig,
    agent: ureq::Agent,
}

impl ChatCompletionClient {
    /// The agent keeps ureq's default timeouts.
    pub fn new(config: SummaryConfig) -> Self {
        Self {
            config,
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Summarizer for ChatCompletionClient {
    fn summarize(&self, serialized: &str) -> Result<String> {
        let body = build_request(&self.config.model, &user_prompt(serialized))?;
        log::debug!("POST {} ({} bytes)", self.config.url, body.len());

        let response = self
            .agent
            .post(&self.config.url)
            .set("Authorization", &format!("Bearer {}", self.config.api_key))
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(|err| match err {
                ureq::Error::Status(code, response) => ChartError::Transport(format!(
                    "endpoint answered {code} {}",
                    response.status_text()
                )),
                ureq::Error::Transport(t) => ChartError::Transport(t.to_string()),
            })?;

        let text = response
            .into_string()
            .map_err(|e| ChartError::Transport(format!("cannot read response: {e}")))?;
        let summary = parse_response(&text)?;
        log::info!("received summary ({} chars)", summary.chars().count());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_fills_defaults() {
        let config = SummaryConfig::from_json(r#"{"api_key":"sk-test"}"#).unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_key, "sk-test");
    }

    #[test]
    fn config_requires_a_key() {
        assert!(SummaryConfig::from_json(r#"{"api_key":"  "}"#).is_err());
        assert!(SummaryConfig::from_json(r#"{"url":"http://x"}"#).is_err());
        assert!(SummaryConfig::from_json("not json").is_err());
    }

    #[test]
    fn load_reports_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(CONFIG_FILE_NAME);
        assert!(matches!(SummaryConfig::load(&missing), Err(ChartError::Config(_))));

        std::fs::write(&missing, r#"{"api_key":"sk-1","model":"m"}"#).unwrap();
        let config = SummaryConfig::load(&missing).unwrap();
        assert_eq!(config.model, "m");
    }

    #[test]
    fn request_body_carries_prompt_and_limits() {
        let body = build_request("deepseek-chat", &user_prompt(r#"{"labels":["A"]}"#)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["model"], "deepseek-chat");
        assert_eq!(value["max_tokens"], 400);
        assert!((value["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        let prompt = value["messages"][1]["content"].as_str().unwrap();
        assert!(prompt.contains("200 characters"));
        assert!(prompt.contains(r#"{"labels":["A"]}"#));
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        let client = ChatCompletionClient::new(SummaryConfig {
            url: "http://127.0.0.1:1/v1/chat/completions".to_string(),
            api_key: "sk-test".to_string(),
            model: DEFAULT_MODEL.to_string(),
        });
        let err = client.summarize("{}").unwrap_err();
        assert!(matches!(err, ChartError::Transport(_)));
    }

    #[test]
    fn response_content_is_extracted() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Rising."}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "Rising.");
    }

    #[test]
    fn malformed_responses_are_transport_errors() {
        for body in ["{}", r#"{"choices":[]}"#, r#"{"choices":[{}]}"#, "<html>"] {
            let err = parse_response(body).unwrap_err();
            assert!(matches!(err, ChartError::Transport(ref m) if m == "malformed response"));
        }
    }
}
