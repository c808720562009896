use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use skillcell_core::types::CompletionRequest;
use skillcell_core::{Error, Result};
use std::time::Duration;
use tracing::debug;

use crate::CompletionProvider;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicProvider {
    pub fn new(
        api_key: &str,
        api_base: Option<&str>,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: api_key.to_string(),
            api_base: api_base
                .unwrap_or(ANTHROPIC_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
        }
    }

    /// 请求级 model 覆盖（去掉 "anthropic/" 前缀），否则用构造时的默认模型
    fn resolve_model(&self, request: &CompletionRequest) -> String {
        match request.model.as_deref() {
            Some(m) => m.strip_prefix("anthropic/").unwrap_or(m).to_string(),
            None => self.model.clone(),
        }
    }

    /// Anthropic takes system as a top-level parameter and requires
    /// alternating user/assistant messages ending on a user turn.
    fn build_messages(request: &CompletionRequest) -> Vec<Value> {
        let mut messages: Vec<Value> = Vec::new();
        for msg in &request.history {
            let role = match msg.role.as_str() {
                "assistant" => "assistant",
                _ => "user",
            };
            messages.push(serde_json::json!({
                "role": role,
                "content": msg.content,
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": request.prompt,
        }));
        messages
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/messages", self.api_base);
        let model = self.resolve_model(request);

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "temperature": request.temperature.unwrap_or(self.temperature),
            "messages": Self::build_messages(request),
        });
        if let Some(system) = &request.system {
            body["system"] = Value::String(system.clone());
        }

        debug!(model = %model, prompt_len = request.prompt.len(), "Anthropic completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Anthropic response decode failed: {}", e)))?;

        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown error");
            return Err(Error::Provider(format!(
                "Anthropic API error ({}): {}",
                status, message
            )));
        }

        // Concatenate all text content blocks.
        let text = payload["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"].as_str() == Some("text"))
                    .filter_map(|b| b["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Provider(
                "Anthropic response contained no text content".to_string(),
            ));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_override() {
        let provider = AnthropicProvider::new("key", None, "claude-sonnet-4-20250514", 8192, 0.7);

        let default_req = CompletionRequest::new("hi");
        assert_eq!(provider.resolve_model(&default_req), "claude-sonnet-4-20250514");

        let mut override_req = CompletionRequest::new("hi");
        override_req.model = Some("anthropic/claude-haiku-4-20250514".to_string());
        assert_eq!(provider.resolve_model(&override_req), "claude-haiku-4-20250514");
    }

    #[test]
    fn test_build_messages_ends_with_prompt() {
        let mut req = CompletionRequest::new("latest question");
        req.history = vec![
            skillcell_core::ChatMessage::user("earlier question"),
            skillcell_core::ChatMessage::assistant("earlier answer"),
        ];
        let messages = AnthropicProvider::build_messages(&req);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"], "latest question");
    }
}
