use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

/// 自进化管线配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionConfig {
    /// 是否启用自动进化（报告能力缺口后自动触发 pipeline）
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 验证通过后是否直接部署（false 时停留在 validated 等待人工批准）
    #[serde(default = "default_true")]
    pub auto_approve: bool,
    /// high 级别安全风险是否要求人工审查（true 时 high 风险导致安全门失败）
    #[serde(default)]
    pub require_human_review: bool,
    /// 代码生成循环的最大迭代次数
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// 模拟测试门的最低通过率
    #[serde(default = "default_min_test_coverage")]
    pub min_test_coverage: f64,
    /// 技能可声明的权限白名单（未列出的权限视为 high 风险）
    #[serde(default = "default_allowed_permissions")]
    pub allowed_permissions: Vec<String>,
    /// 内存事件日志的容量上限（超出后丢弃最旧事件）
    #[serde(default = "default_event_log_cap")]
    pub event_log_cap: usize,
    /// 每个技能保留的历史版本数
    #[serde(default = "default_keep_versions")]
    pub keep_versions: usize,
    /// 进化专用模型（None 时由 provider 使用自身默认模型）
    /// 建议使用更便宜/更快的模型，避免与对话抢占并发
    #[serde(default)]
    pub model: Option<String>,
    /// 显式指定 LLM provider（可选，否则从 model 前缀推断）
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_true() -> bool {
    true
}

fn default_max_iterations() -> u32 {
    3
}

fn default_min_test_coverage() -> f64 {
    0.8
}

fn default_allowed_permissions() -> Vec<String> {
    vec![
        "network".to_string(),
        "storage".to_string(),
        "schedule".to_string(),
        "notify".to_string(),
    ]
}

fn default_event_log_cap() -> usize {
    1000
}

fn default_keep_versions() -> usize {
    10
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_approve: true,
            require_human_review: false,
            max_iterations: default_max_iterations(),
            min_test_coverage: default_min_test_coverage(),
            allowed_permissions: default_allowed_permissions(),
            event_log_cap: default_event_log_cap(),
            keep_versions: default_keep_versions(),
            model: None,
            provider: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub evolution: EvolutionConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert("anthropic".to_string(), ProviderConfig::default());
        providers.insert("openai".to_string(), ProviderConfig::default());

        Self {
            providers,
            evolution: EvolutionConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        if !(0.0..=1.0).contains(&config.evolution.min_test_coverage) {
            return Err(Error::Config(format!(
                "evolution.minTestCoverage must be within [0, 1], got {}",
                config.evolution.min_test_coverage
            )));
        }
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// 按优先级返回第一个配置了 api_key 的 provider
    pub fn first_configured_provider(&self) -> Option<(&str, &ProviderConfig)> {
        let priority = ["anthropic", "openai"];
        for name in priority {
            if let Some(provider) = self.providers.get(name) {
                if !provider.api_key.is_empty() {
                    return Some((name, provider));
                }
            }
        }
        None
    }
}
