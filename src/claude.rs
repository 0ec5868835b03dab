use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Something that turns a single user prompt into a text answer.
pub trait Completion: Send + Sync + 'static {
    fn complete(&self, prompt: &str, max_tokens: u32) -> impl Future<Output = Result<String, Error>> + Send;
}

pub struct Client {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ApiMessage<'a>; 1],
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl Client {
    pub fn new(api_key: String, model: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self { api_key, model, http }
    }

    pub async fn message(&self, prompt: &str, max_tokens: u32) -> Result<String, Error> {
        let request = ApiRequest {
            model: &self.model,
            max_tokens,
            messages: [ApiMessage { role: "user", content: prompt }],
        };

        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let body = response.text().await.map_err(|e| Error::Http(e.to_string()))?;
        parse_response(&body)
    }
}

impl Completion for Client {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, Error> {
        self.message(prompt, max_tokens).await
    }
}

/// Concatenate every text block of a Messages API response.
fn parse_response(body: &str) -> Result<String, Error> {
    let api_response: ApiResponse = serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;

    let text: String = api_response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.trim().is_empty() {
        return Err(Error::Empty);
    }
    Ok(text)
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ApiRequest {
            model: "claude-3-5-haiku-20241022",
            max_tokens: 200,
            messages: [ApiMessage { role: "user", content: "Wie voll ist die Batterie?" }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "claude-3-5-haiku-20241022");
        assert_eq!(json["max_tokens"], 200);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Wie voll ist die Batterie?");
    }

    #[test]
    fn test_joins_text_blocks() {
        let body = r#"{
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Deine Batterie ist "},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "zu 51% voll ⚡"}
            ],
            "stop_reason": "end_turn"
        }"#;
        assert_eq!(parse_response(body).unwrap(), "Deine Batterie ist zu 51% voll ⚡");
    }

    #[test]
    fn test_empty_content() {
        let body = r#"{"content": []}"#;
        assert!(matches!(parse_response(body), Err(Error::Empty)));

        let body = r#"{"content": [{"type": "text", "text": "  "}]}"#;
        assert!(matches!(parse_response(body), Err(Error::Empty)));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(parse_response("<html>"), Err(Error::Parse(_))));
    }
}
