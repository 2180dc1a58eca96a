//! Google Gemini provider.
//!
//! Speaks the `generateContent` REST API. Gemini has no tool-call ids,
//! so synthesized ids carry the function name (`name:uuid`) — the name
//! is recovered when a tool result is sent back as a `functionResponse`
//! part.
//!
//! Streaming uses the default [`Provider::stream`] fallback: one
//! complete response delivered as a single chunk.

use async_trait::async_trait;
use bixso_core::{
    Message, MessageToolCall, Provider, ProviderError, ProviderRequest, ProviderResponse, Role,
    ToolDefinition, Usage,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug)]
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );

        let body = to_api_body(&request);

        debug!(provider = "gemini", model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Gemini API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: GenerateContentResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let candidate = api_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No candidates in response".into(),
            })?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.parts {
            if let Some(text) = part.text {
                content.push_str(&text);
            }
            if let Some(fc) = part.function_call {
                tool_calls.push(MessageToolCall {
                    id: format!("{}:{}", fc.name, uuid::Uuid::new_v4()),
                    name: fc.name,
                    arguments: fc.args.to_string(),
                });
            }
        }

        let mut message = Message::assistant(content);
        message.tool_calls = tool_calls;

        let usage = api_response.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        Ok(ProviderResponse {
            message,
            usage,
            model: request.model,
        })
    }
}

fn to_api_body(request: &ProviderRequest) -> Value {
    let mut system_parts: Vec<Value> = Vec::new();
    let mut contents: Vec<Value> = Vec::new();

    for message in &request.messages {
        match message.role {
            Role::System => {
                system_parts.push(json!({ "text": message.content }));
            }
            Role::User => {
                contents.push(json!({
                    "role": "user",
                    "parts": [{ "text": message.content }]
                }));
            }
            Role::Assistant => {
                let mut parts: Vec<Value> = Vec::new();
                if !message.content.is_empty() {
                    parts.push(json!({ "text": message.content }));
                }
                for tc in &message.tool_calls {
                    let args: Value =
                        serde_json::from_str(&tc.arguments).unwrap_or(Value::Null);
                    parts.push(json!({
                        "functionCall": { "name": tc.name, "args": args }
                    }));
                }
                if !parts.is_empty() {
                    contents.push(json!({ "role": "model", "parts": parts }));
                }
            }
            Role::Tool => {
                let name = function_name_from_call_id(message.tool_call_id.as_deref());
                let response: Value = serde_json::from_str(&message.content)
                    .unwrap_or_else(|_| Value::String(message.content.clone()));
                contents.push(json!({
                    "role": "user",
                    "parts": [{
                        "functionResponse": {
                            "name": name,
                            "response": { "result": response }
                        }
                    }]
                }));
            }
        }
    }

    let mut body = json!({
        "contents": contents,
        "generationConfig": {
            "temperature": request.temperature,
        }
    });

    if let Some(max_tokens) = request.max_tokens {
        body["generationConfig"]["maxOutputTokens"] = json!(max_tokens);
    }
    if !system_parts.is_empty() {
        body["systemInstruction"] = json!({ "parts": system_parts });
    }
    if !request.tools.is_empty() {
        body["tools"] = json!([{
            "functionDeclarations": to_function_declarations(&request.tools)
        }]);
    }

    body
}

fn to_function_declarations(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "parameters": t.parameters,
            })
        })
        .collect()
}

/// Synthesized Gemini call ids look like `name:uuid`.
fn function_name_from_call_id(call_id: Option<&str>) -> String {
    call_id
        .and_then(|id| id.split(':').next())
        .unwrap_or_default()
        .to_string()
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: "gemini-1.5-flash".into(),
            messages,
            temperature: 0.0,
            max_tokens: None,
            tools: vec![],
            stream: false,
        }
    }

    #[test]
    fn system_message_becomes_system_instruction() {
        let body = to_api_body(&request_with(vec![
            Message::system("You are the Bixso Orchestrator."),
            Message::user("hi"),
        ]));
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are the Bixso Orchestrator."
        );
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["role"], "user");
    }

    #[test]
    fn assistant_tool_call_becomes_function_call_part() {
        let mut msg = Message::assistant("");
        msg.tool_calls = vec![MessageToolCall {
            id: "get_user_profile:abc".into(),
            name: "get_user_profile".into(),
            arguments: r#"{"user_id":"u1"}"#.into(),
        }];
        let body = to_api_body(&request_with(vec![msg]));
        let part = &body["contents"][0]["parts"][0];
        assert_eq!(body["contents"][0]["role"], "model");
        assert_eq!(part["functionCall"]["name"], "get_user_profile");
        assert_eq!(part["functionCall"]["args"]["user_id"], "u1");
    }

    #[test]
    fn tool_result_becomes_function_response() {
        let msg = Message::tool_result("suggest_articles:xyz", r#"[{"id":"a1"}]"#);
        let body = to_api_body(&request_with(vec![msg]));
        let part = &body["contents"][0]["parts"][0];
        assert_eq!(part["functionResponse"]["name"], "suggest_articles");
        assert_eq!(part["functionResponse"]["response"]["result"][0]["id"], "a1");
    }

    #[test]
    fn tools_become_function_declarations() {
        let mut request = request_with(vec![Message::user("hi")]);
        request.tools = vec![ToolDefinition {
            name: "list_recent_articles".into(),
            description: "List the most recent articles".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let body = to_api_body(&request);
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "list_recent_articles"
        );
    }

    #[test]
    fn parse_text_candidate() {
        let data = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Hello!"}]}}],
            "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 2, "totalTokenCount": 10}
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(data).unwrap();
        assert_eq!(
            parsed.candidates[0].content.parts[0].text.as_deref(),
            Some("Hello!")
        );
        assert_eq!(parsed.usage_metadata.unwrap().total_token_count, 10);
    }

    #[test]
    fn parse_function_call_candidate() {
        let data = r#"{
            "candidates": [{"content": {"role": "model", "parts": [
                {"functionCall": {"name": "suggest_articles", "args": {"interests": ["rust"]}}}
            ]}}]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(data).unwrap();
        let fc = parsed.candidates[0].content.parts[0]
            .function_call
            .as_ref()
            .unwrap();
        assert_eq!(fc.name, "suggest_articles");
        assert_eq!(fc.args["interests"][0], "rust");
    }

    #[test]
    fn call_id_round_trips_function_name() {
        assert_eq!(
            function_name_from_call_id(Some("get_user_profile:1234-abcd")),
            "get_user_profile"
        );
        assert_eq!(function_name_from_call_id(None), "");
    }
}
