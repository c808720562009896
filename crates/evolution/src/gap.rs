use crate::extract::extract_fenced_json;
use serde::{Deserialize, Serialize};
use skillcell_core::types::CompletionRequest;
use skillcell_core::{Error, Result};
use skillcell_providers::CompletionProvider;
use std::collections::HashMap;
use tracing::{debug, info};

/// 能力缺口状态。
///
/// Transitions are monotonic forward; the one exception is the repair path,
/// which may move `validating → generating` exactly once. Terminal gaps are
/// immutable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GapStatus {
    Identified,
    Generating,
    Validating,
    Resolved,
    Failed,
}

impl GapStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GapStatus::Resolved | GapStatus::Failed)
    }
}

/// 缺口能力的分类
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GapCategory {
    FileProcessing,
    DataAnalysis,
    WebService,
    Communication,
    Automation,
    #[default]
    Utility,
}

impl GapCategory {
    /// Loose parse of whatever string the completion used for the category.
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "file-processing" | "file" | "files" => GapCategory::FileProcessing,
            "data-analysis" | "data" | "analysis" => GapCategory::DataAnalysis,
            "web-service" | "web" | "api" => GapCategory::WebService,
            "communication" | "messaging" => GapCategory::Communication,
            "automation" | "workflow" => GapCategory::Automation,
            _ => GapCategory::Utility,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "low" | "simple" => Complexity::Low,
            "high" | "complex" => Complexity::High,
            _ => Complexity::Medium,
        }
    }
}

/// 缺口产生时的上下文：用户请求、已尝试的动作、失败原因
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapContext {
    pub user_request: String,
    #[serde(default)]
    pub attempted_actions: Vec<String>,
    pub failure_reason: String,
}

/// 所需能力的描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredCapability {
    pub description: String,
    #[serde(default)]
    pub category: GapCategory,
    #[serde(default)]
    pub suggested_tools: Vec<String>,
    #[serde(default)]
    pub complexity: Complexity,
}

/// 一条被记录的能力缺口
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityGap {
    pub id: String,
    pub created_at: i64,
    pub context: GapContext,
    pub capability: RequiredCapability,
    pub status: GapStatus,
    /// 修复回路已经使用的次数（最多 1 次）
    #[serde(default)]
    pub repair_cycles: u32,
}

impl CapabilityGap {
    fn new(context: GapContext, capability: RequiredCapability) -> Self {
        Self {
            id: format!("gap_{}", uuid::Uuid::new_v4().simple()),
            created_at: chrono::Utc::now().timestamp(),
            context,
            capability,
            status: GapStatus::Identified,
            repair_cycles: 0,
        }
    }

    /// Gap created directly from a user-authored capability description,
    /// bypassing failure-triggered analysis.
    pub fn manual(description: &str) -> Self {
        Self::new(
            GapContext {
                user_request: description.to_string(),
                attempted_actions: Vec::new(),
                failure_reason: "user-requested capability".to_string(),
            },
            RequiredCapability {
                description: description.to_string(),
                category: GapCategory::Utility,
                suggested_tools: Vec::new(),
                complexity: Complexity::Medium,
            },
        )
    }
}

/// 能力缺口追踪器。
///
/// `report` asks the completion service whether a genuinely new capability is
/// required; ambiguous or unparsable judgments record nothing (deliberate
/// false-negative tolerance — a spurious gap costs a full pipeline run, a
/// missed one costs a retry).
pub struct CapabilityGapTracker {
    gaps: HashMap<String, CapabilityGap>,
}

impl CapabilityGapTracker {
    pub fn new() -> Self {
        Self {
            gaps: HashMap::new(),
        }
    }

    /// 上报一次失败，判断是否需要新能力。
    /// 返回 Ok(None) 表示判定为不需要（或判定不可解析），不会记录任何缺口。
    pub async fn report(
        &mut self,
        user_request: &str,
        attempted_actions: &[String],
        failure_reason: &str,
        existing_capabilities: &[String],
        provider: &dyn CompletionProvider,
    ) -> Result<Option<CapabilityGap>> {
        let prompt = build_analysis_prompt(
            user_request,
            attempted_actions,
            failure_reason,
            existing_capabilities,
        );
        let request = CompletionRequest::new(&prompt)
            .with_system("You analyze agent failures and decide whether a new skill is required.");

        let response = provider.complete(&request).await?;

        let verdict = match extract_fenced_json(&response) {
            Some(v) => v,
            None => {
                debug!("🧩 [缺口] 分析结果不可解析，跳过记录");
                return Ok(None);
            }
        };

        if !verdict["required"].as_bool().unwrap_or(false) {
            debug!(
                reason = verdict["reason"].as_str().unwrap_or(""),
                "🧩 [缺口] 判定为不需要新能力"
            );
            return Ok(None);
        }

        let capability = RequiredCapability {
            description: verdict["description"]
                .as_str()
                .unwrap_or(user_request)
                .to_string(),
            category: GapCategory::parse(verdict["category"].as_str().unwrap_or("")),
            suggested_tools: verdict["suggested_tools"]
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(|s| s.to_string()))
                        .collect()
                })
                .unwrap_or_default(),
            complexity: Complexity::parse(verdict["complexity"].as_str().unwrap_or("")),
        };

        let gap = CapabilityGap::new(
            GapContext {
                user_request: user_request.to_string(),
                attempted_actions: attempted_actions.to_vec(),
                failure_reason: failure_reason.to_string(),
            },
            capability,
        );

        info!(
            gap_id = %gap.id,
            category = ?gap.capability.category,
            complexity = ?gap.capability.complexity,
            "🧩 [缺口] 记录新能力缺口: {}",
            gap.capability.description
        );

        self.gaps.insert(gap.id.clone(), gap.clone());
        Ok(Some(gap))
    }

    /// 直接登记一条缺口（用户显式请求新能力时使用）
    pub fn insert(&mut self, gap: CapabilityGap) -> CapabilityGap {
        self.gaps.insert(gap.id.clone(), gap.clone());
        gap
    }

    pub fn get(&self, id: &str) -> Option<&CapabilityGap> {
        self.gaps.get(id)
    }

    /// 列出所有尚未进入 pipeline 的缺口
    pub fn list_pending(&self) -> Vec<&CapabilityGap> {
        let mut pending: Vec<&CapabilityGap> = self
            .gaps
            .values()
            .filter(|g| g.status == GapStatus::Identified)
            .collect();
        pending.sort_by_key(|g| g.created_at);
        pending
    }

    /// 状态迁移，强制单向推进；validating → generating 仅允许一次（修复回路）。
    pub fn transition(&mut self, id: &str, next: GapStatus) -> Result<()> {
        let gap = self
            .gaps
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("gap {} not found", id)))?;

        if gap.status.is_terminal() {
            return Err(Error::Other(format!(
                "gap {} is {:?} and immutable",
                id, gap.status
            )));
        }

        let allowed = match (gap.status, next) {
            (GapStatus::Identified, GapStatus::Generating) => true,
            (GapStatus::Generating, GapStatus::Validating) => true,
            (GapStatus::Validating, GapStatus::Resolved) => true,
            // 修复回路：只允许回跳一次
            (GapStatus::Validating, GapStatus::Generating) => {
                if gap.repair_cycles == 0 {
                    gap.repair_cycles += 1;
                    true
                } else {
                    false
                }
            }
            (_, GapStatus::Failed) => true,
            _ => false,
        };

        if !allowed {
            return Err(Error::Other(format!(
                "invalid gap transition {:?} -> {:?} for {}",
                gap.status, next, id
            )));
        }

        debug!(gap_id = %id, from = ?gap.status, to = ?next, "🧩 [缺口] 状态迁移");
        gap.status = next;
        Ok(())
    }
}

impl Default for CapabilityGapTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn build_analysis_prompt(
    user_request: &str,
    attempted_actions: &[String],
    failure_reason: &str,
    existing_capabilities: &[String],
) -> String {
    let mut prompt = String::new();

    prompt.push_str("An autonomous agent failed to satisfy a request with its current skill set.\n");
    prompt.push_str("Decide whether a NEW skill is required, or whether an existing capability already covers it.\n\n");

    prompt.push_str(&format!("## User Request\n{}\n\n", user_request));
    prompt.push_str(&format!("## Failure Reason\n{}\n\n", failure_reason));

    if !attempted_actions.is_empty() {
        prompt.push_str("## Attempted Actions\n");
        for action in attempted_actions {
            prompt.push_str(&format!("- {}\n", action));
        }
        prompt.push('\n');
    }

    if !existing_capabilities.is_empty() {
        prompt.push_str("## Existing Capabilities\n");
        for cap in existing_capabilities {
            prompt.push_str(&format!("- {}\n", cap));
        }
        prompt.push('\n');
    }

    prompt.push_str("Respond with ONLY a JSON object (no markdown fences, no extra text):\n");
    prompt.push_str("{\"required\": true|false, \"reason\": \"...\", \"description\": \"what the new skill must do\", ");
    prompt.push_str("\"category\": \"file-processing|data-analysis|web-service|communication|automation|utility\", ");
    prompt.push_str("\"complexity\": \"low|medium|high\", \"suggested_tools\": [\"...\"]}\n");

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedProvider {
        responses: Mutex<Vec<String>>,
    }

    impl CannedProvider {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for CannedProvider {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| "{}".to_string()))
        }
    }

    #[tokio::test]
    async fn test_report_positive_judgment_records_gap() {
        let provider = CannedProvider::new(vec![
            r#"{"required": true, "description": "convert CSV text to records", "category": "file-processing", "complexity": "low", "suggested_tools": ["csv"]}"#,
        ]);
        let mut tracker = CapabilityGapTracker::new();
        let gap = tracker
            .report("parse this csv", &[], "no csv skill", &[], &provider)
            .await
            .unwrap()
            .expect("gap should be recorded");

        assert_eq!(gap.status, GapStatus::Identified);
        assert_eq!(gap.capability.category, GapCategory::FileProcessing);
        assert_eq!(gap.capability.complexity, Complexity::Low);
        assert_eq!(tracker.list_pending().len(), 1);
    }

    #[tokio::test]
    async fn test_report_negative_judgment_records_nothing() {
        let provider = CannedProvider::new(vec![
            r#"{"required": false, "reason": "web_fetch already covers this"}"#,
        ]);
        let mut tracker = CapabilityGapTracker::new();
        let gap = tracker
            .report("fetch a page", &[], "timeout", &[], &provider)
            .await
            .unwrap();
        assert!(gap.is_none());
        assert!(tracker.list_pending().is_empty());
    }

    #[tokio::test]
    async fn test_report_unparsable_judgment_records_nothing() {
        let provider = CannedProvider::new(vec!["I think you probably need something new?"]);
        let mut tracker = CapabilityGapTracker::new();
        let gap = tracker
            .report("do a thing", &[], "failed", &[], &provider)
            .await
            .unwrap();
        assert!(gap.is_none());
    }

    #[test]
    fn test_transition_happy_path() {
        let mut tracker = CapabilityGapTracker::new();
        let gap = tracker.insert(CapabilityGap::manual("test"));

        tracker.transition(&gap.id, GapStatus::Generating).unwrap();
        tracker.transition(&gap.id, GapStatus::Validating).unwrap();
        tracker.transition(&gap.id, GapStatus::Resolved).unwrap();
        assert_eq!(tracker.get(&gap.id).unwrap().status, GapStatus::Resolved);
    }

    #[test]
    fn test_transition_repair_loop_allowed_once() {
        let mut tracker = CapabilityGapTracker::new();
        let gap = tracker.insert(CapabilityGap::manual("test"));

        tracker.transition(&gap.id, GapStatus::Generating).unwrap();
        tracker.transition(&gap.id, GapStatus::Validating).unwrap();
        // First loop-back: repair path.
        tracker.transition(&gap.id, GapStatus::Generating).unwrap();
        tracker.transition(&gap.id, GapStatus::Validating).unwrap();
        // Second loop-back must be rejected.
        assert!(tracker.transition(&gap.id, GapStatus::Generating).is_err());
        assert_eq!(tracker.get(&gap.id).unwrap().repair_cycles, 1);
    }

    #[test]
    fn test_terminal_gap_is_immutable() {
        let mut tracker = CapabilityGapTracker::new();
        let gap = tracker.insert(CapabilityGap::manual("test"));
        tracker.transition(&gap.id, GapStatus::Failed).unwrap();
        assert!(tracker.transition(&gap.id, GapStatus::Generating).is_err());
    }

    #[test]
    fn test_backward_transition_rejected() {
        let mut tracker = CapabilityGapTracker::new();
        let gap = tracker.insert(CapabilityGap::manual("test"));
        tracker.transition(&gap.id, GapStatus::Generating).unwrap();
        assert!(tracker.transition(&gap.id, GapStatus::Identified).is_err());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(GapCategory::parse("file_processing"), GapCategory::FileProcessing);
        assert_eq!(GapCategory::parse("Data-Analysis"), GapCategory::DataAnalysis);
        assert_eq!(GapCategory::parse("whatever"), GapCategory::Utility);
    }
}
