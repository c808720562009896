use skillcell_core::Config;
use std::sync::Arc;

use crate::{AnthropicProvider, CompletionProvider, OpenAiProvider};

/// 从 model 字符串前缀推断 provider 名字。
/// 返回 None 表示无法从前缀推断（需要 fallback）。
pub fn infer_provider_from_model(model: &str) -> Option<&'static str> {
    if model.starts_with("anthropic/") || model.starts_with("claude-") {
        Some("anthropic")
    } else if model.starts_with("openai/") || model.starts_with("gpt-") || model.starts_with("o1") {
        Some("openai")
    } else {
        None
    }
}

/// 统一的 provider 创建入口。
///
/// 解析优先级：
/// 1. `explicit_provider`（来自 config.evolution.provider）
/// 2. model 字符串前缀推断（如 "anthropic/claude-..." → anthropic）
/// 3. config 中第一个配置了 api_key 的 provider（fallback）
pub fn create_provider(
    config: &Config,
    model: &str,
    explicit_provider: Option<&str>,
) -> anyhow::Result<Arc<dyn CompletionProvider>> {
    let max_tokens = config.evolution.max_tokens;
    let temperature = config.evolution.temperature;

    let name = match explicit_provider {
        Some(name) => name.to_string(),
        None => match infer_provider_from_model(model) {
            Some(name) => name.to_string(),
            None => config
                .first_configured_provider()
                .map(|(name, _)| name.to_string())
                .ok_or_else(|| anyhow::anyhow!("no provider configured with an api key"))?,
        },
    };

    let provider_config = config
        .get_provider(&name)
        .ok_or_else(|| anyhow::anyhow!("provider `{}` not present in config", name))?;

    if provider_config.api_key.is_empty() {
        anyhow::bail!("provider `{}` has no api key configured", name);
    }

    let stripped = model
        .strip_prefix(&format!("{}/", name))
        .unwrap_or(model);

    let provider: Arc<dyn CompletionProvider> = match name.as_str() {
        "anthropic" => Arc::new(AnthropicProvider::new(
            &provider_config.api_key,
            provider_config.api_base.as_deref(),
            stripped,
            max_tokens,
            temperature,
        )),
        "openai" => Arc::new(OpenAiProvider::new(
            &provider_config.api_key,
            provider_config.api_base.as_deref(),
            stripped,
            max_tokens,
            temperature,
        )),
        other => anyhow::bail!("unknown provider `{}`", other),
    };

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_provider() {
        assert_eq!(infer_provider_from_model("anthropic/claude-sonnet-4-20250514"), Some("anthropic"));
        assert_eq!(infer_provider_from_model("claude-haiku-4-20250514"), Some("anthropic"));
        assert_eq!(infer_provider_from_model("openai/gpt-4o"), Some("openai"));
        assert_eq!(infer_provider_from_model("gpt-4o-mini"), Some("openai"));
        assert_eq!(infer_provider_from_model("mystery-model"), None);
    }

    #[test]
    fn test_create_provider_requires_key() {
        let config = Config::default();
        // Default config has empty api keys everywhere.
        assert!(create_provider(&config, "claude-sonnet-4-20250514", None).is_err());
    }

    #[test]
    fn test_create_provider_with_key() {
        let mut config = Config::default();
        config.providers.get_mut("anthropic").unwrap().api_key = "sk-test".to_string();
        let provider = create_provider(&config, "anthropic/claude-sonnet-4-20250514", None);
        assert!(provider.is_ok());
    }
}
