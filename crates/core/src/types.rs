use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 对话历史中的一条消息（角色 + 文本内容）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
        }
    }
}

/// 文本补全请求。
///
/// This is the request half of the external text-completion contract: the
/// pipeline builds one of these per stage call and hands it to a
/// `CompletionProvider`. Everything beyond `prompt` is optional — providers
/// fall back to their configured defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompletionRequest {
    /// The user-turn prompt text.
    pub prompt: String,
    /// Optional system instruction, sent separately from the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Optional role-tagged history inserted before the prompt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ChatMessage>,
    /// Target model identifier (e.g. "anthropic/claude-sonnet-4-20250514").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: &str) -> Self {
        self.system = Some(system.to_string());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// 权限集合，用于安全审查中的越权检查
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    pub permissions: HashSet<String>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_iter<I: IntoIterator<Item = S>, S: Into<String>>(iter: I) -> Self {
        Self {
            permissions: iter.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_permission(mut self, perm: &str) -> Self {
        self.permissions.insert(perm.to_string());
        self
    }

    pub fn has(&self, perm: &str) -> bool {
        self.permissions.contains(perm)
    }

    pub fn is_subset_of(&self, other: &PermissionSet) -> bool {
        self.permissions.is_subset(&other.permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let req = CompletionRequest::new("hello")
            .with_system("be brief")
            .with_temperature(0.2)
            .with_max_tokens(512);
        assert_eq!(req.prompt, "hello");
        assert_eq!(req.system.as_deref(), Some("be brief"));
        assert_eq!(req.temperature, Some(0.2));
        assert_eq!(req.max_tokens, Some(512));
        assert!(req.history.is_empty());
    }

    #[test]
    fn test_permission_subset() {
        let allowed = PermissionSet::from_iter(["network", "storage", "notify"]);
        let declared = PermissionSet::from_iter(["network"]);
        assert!(declared.is_subset_of(&allowed));

        let overreach = PermissionSet::from_iter(["network", "shell"]);
        assert!(!overreach.is_subset_of(&allowed));
        assert!(overreach.has("shell"));
    }
}
