//! OpenAI-compatible chat completions client with SSE streaming.
//!
//! Works against OpenAI itself and against OpenRouter, which is the default
//! base URL.

use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use jh_protocol::{ChatRequest, StreamEvent};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::sse::{parse_sse_stream, SseEvent};
use crate::{BackendError, ChatBackend, EventStream};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible API client.
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Build an HTTP client with appropriate timeouts and connection limits.
fn build_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
}

impl OpenAiClient {
    /// Create a client for the default base URL.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client for a custom OpenAI-compatible endpoint.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: build_http_client(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Send a request and return a stream of events.
    pub fn stream(&self, request: &ChatRequest) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let api_key = self.api_key.clone();
        let url = self.completions_url();
        let http = self.http.clone();
        let body = build_body(request);

        stream! {
            debug!(url = %url, model = %body.model, "sending chat completion");
            match send_request(&http, &url, &api_key, &body).await {
                Ok(response) => {
                    let mut sse_stream = parse_sse_stream(response.bytes_stream());
                    let mut processor = ChunkProcessor::default();

                    while let Some(result) = sse_stream.next().await {
                        match result {
                            Ok(sse_event) => {
                                if sse_event.is_done() {
                                    break;
                                }
                                for event in processor.process(&sse_event) {
                                    let terminal = event.is_terminal();
                                    yield event;
                                    if terminal {
                                        return;
                                    }
                                }
                            }
                            Err(e) => {
                                yield StreamEvent::Error(format!("Stream error: {e}"));
                                return;
                            }
                        }
                    }

                    yield StreamEvent::Done;
                }
                Err(BackendError::Api(message)) => {
                    yield StreamEvent::Error(message);
                }
                Err(e) => {
                    yield StreamEvent::Error(e.to_string());
                }
            }
        }
    }
}

impl ChatBackend for OpenAiClient {
    fn send(&self, request: &ChatRequest) -> EventStream {
        Box::pin(self.stream(request))
    }
}

async fn send_request(
    http: &Client,
    url: &str,
    api_key: &str,
    body: &ApiRequest,
) -> Result<reqwest::Response, BackendError> {
    let response = http
        .post(url)
        .bearer_auth(api_key)
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Api(format!("{status}: {body}")));
    }

    Ok(response)
}

fn build_body(request: &ChatRequest) -> ApiRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if !request.system_prompt.is_empty() {
        messages.push(ApiMessage {
            role: "system",
            content: request.system_prompt.clone(),
        });
    }
    messages.extend(request.messages.iter().map(|m| ApiMessage {
        role: m.role.as_str(),
        content: m.content.clone(),
    }));

    ApiRequest {
        model: request.model.clone(),
        messages,
        temperature: request.temperature,
        stream: true,
        stream_options: StreamOptions {
            include_usage: true,
        },
        response_format: request.response_format.as_ref().map(|f| ApiResponseFormat {
            format_type: "json_schema",
            json_schema: ApiJsonSchema {
                name: f.name.clone(),
                schema: f.schema.clone(),
                strict: f.strict,
            },
        }),
    }
}

/// Maps `chat.completion.chunk` payloads to stream events.
#[derive(Default)]
struct ChunkProcessor;

impl ChunkProcessor {
    fn process(&mut self, event: &SseEvent) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        let data: Value = match serde_json::from_str(&event.data) {
            Ok(v) => v,
            Err(_) => return events,
        };

        if let Some(error) = data.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error")
                .to_string();
            events.push(StreamEvent::Error(message));
            return events;
        }

        if let Some(content) = data
            .pointer("/choices/0/delta/content")
            .and_then(|c| c.as_str())
        {
            if !content.is_empty() {
                events.push(StreamEvent::TextDelta(content.to_string()));
            }
        }

        if let Some(usage) = data.get("usage").filter(|u| !u.is_null()) {
            let tokens = |key: &str| usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            events.push(StreamEvent::Usage {
                input_tokens: tokens("prompt_tokens"),
                output_tokens: tokens("completion_tokens"),
            });
        }

        events
    }
}

// API request types

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    stream: bool,
    stream_options: StreamOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ApiResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct ApiResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: ApiJsonSchema,
}

#[derive(Debug, Serialize)]
struct ApiJsonSchema {
    name: String,
    schema: Value,
    strict: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jh_protocol::{ChatMessage, ResponseFormat};

    fn chunk(data: &str) -> SseEvent {
        SseEvent {
            event_type: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn body_puts_system_prompt_first() {
        let request = ChatRequest::new("gpt-4o-mini")
            .with_system_prompt("You are an assistant.")
            .with_messages(vec![
                ChatMessage::user("{\"query\":\"hi\"}"),
                ChatMessage::assistant("{}"),
            ]);

        let json = serde_json::to_value(build_body(&request)).unwrap();
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "You are an assistant.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(json["stream"], true);
        assert_eq!(json["stream_options"]["include_usage"], true);
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn body_skips_empty_system_prompt() {
        let request = ChatRequest::new("m").with_messages(vec![ChatMessage::user("x")]);
        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn body_carries_json_schema() {
        let schema = serde_json::json!({"type": "object", "properties": {}});
        let request = ChatRequest::new("m")
            .with_temperature(0.0)
            .with_response_format(ResponseFormat::json_schema("ChainToolOutputSchema", schema.clone()));

        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(
            json["response_format"]["json_schema"]["name"],
            "ChainToolOutputSchema"
        );
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
        assert_eq!(json["response_format"]["json_schema"]["schema"], schema);
        assert_eq!(json["temperature"], 0.0);
    }

    #[test]
    fn process_content_delta() {
        let mut processor = ChunkProcessor::default();
        let events = processor.process(&chunk(
            r#"{"object":"chat.completion.chunk","choices":[{"index":0,"delta":{"content":"Hel"}}]}"#,
        ));
        assert_eq!(events, vec![StreamEvent::TextDelta("Hel".to_string())]);
    }

    #[test]
    fn process_role_only_delta_is_silent() {
        let mut processor = ChunkProcessor::default();
        let events = processor.process(&chunk(
            r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn process_usage_chunk() {
        let mut processor = ChunkProcessor::default();
        let events = processor.process(&chunk(
            r#"{"choices":[],"usage":{"prompt_tokens":120,"completion_tokens":33,"total_tokens":153}}"#,
        ));
        assert_eq!(
            events,
            vec![StreamEvent::Usage {
                input_tokens: 120,
                output_tokens: 33
            }]
        );
    }

    #[test]
    fn process_null_usage_is_ignored() {
        let mut processor = ChunkProcessor::default();
        let events = processor.process(&chunk(
            r#"{"choices":[{"delta":{"content":"x"}}],"usage":null}"#,
        ));
        assert_eq!(events, vec![StreamEvent::TextDelta("x".to_string())]);
    }

    #[test]
    fn process_error_payload() {
        let mut processor = ChunkProcessor::default();
        let events = processor.process(&chunk(
            r#"{"error":{"message":"Rate limit exceeded","code":429}}"#,
        ));
        assert_eq!(
            events,
            vec![StreamEvent::Error("Rate limit exceeded".to_string())]
        );
    }

    #[test]
    fn process_garbage_is_ignored() {
        let mut processor = ChunkProcessor::default();
        assert!(processor.process(&chunk("not json")).is_empty());
    }

    #[test]
    fn base_url_is_normalized() {
        let client = OpenAiClient::with_base_url("k", "https://api.openai.com/v1/");
        assert_eq!(client.base_url(), "https://api.openai.com/v1");
        assert_eq!(
            client.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(OpenAiClient::new("k").base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn debug_hides_api_key() {
        let client = OpenAiClient::new("sk-secret");
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}
