use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use skillcell_core::types::CompletionRequest;
use skillcell_core::{Error, Result};
use std::time::Duration;
use tracing::debug;

use crate::CompletionProvider;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI 兼容的 chat/completions provider（也适用于各类中转 API）
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiProvider {
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
                .unwrap_or(OPENAI_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
        }
    }

    fn resolve_model(&self, request: &CompletionRequest) -> String {
        match request.model.as_deref() {
            Some(m) => m.strip_prefix("openai/").unwrap_or(m).to_string(),
            None => self.model.clone(),
        }
    }

    fn build_messages(request: &CompletionRequest) -> Vec<Value> {
        let mut messages: Vec<Value> = Vec::new();
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        for msg in &request.history {
            messages.push(serde_json::json!({"role": msg.role, "content": msg.content}));
        }
        messages.push(serde_json::json!({"role": "user", "content": request.prompt}));
        messages
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let model = self.resolve_model(request);

        let body = serde_json::json!({
            "model": model,
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "temperature": request.temperature.unwrap_or(self.temperature),
            "messages": Self::build_messages(request),
        });

        debug!(model = %model, prompt_len = request.prompt.len(), "OpenAI completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("OpenAI response decode failed: {}", e)))?;

        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown error");
            return Err(Error::Provider(format!(
                "OpenAI API error ({}): {}",
                status, message
            )));
        }

        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if text.is_empty() {
            return Err(Error::Provider(
                "OpenAI response contained no message content".to_string(),
            ));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_with_system() {
        let req = CompletionRequest::new("do the thing").with_system("you are terse");
        let messages = OpenAiProvider::build_messages(&req);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
    }
}
