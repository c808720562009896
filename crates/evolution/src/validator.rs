use crate::codegen::{missing_shapes, skill_contract};
use crate::extract::extract_fenced_json;
use crate::specdoc::{SkillSpecification, TestCase};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use skillcell_core::types::{CompletionRequest, PermissionSet};
use skillcell_core::{EvolutionConfig, Result};
use skillcell_providers::CompletionProvider;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 安全风险等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRisk {
    pub severity: Severity,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    pub mitigation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityReviewResult {
    pub passed: bool,
    pub risks: Vec<SecurityRisk>,
    pub recommendations: Vec<String>,
}

/// 单条模拟测试结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub input: String,
    pub passed: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pending,
    Passed,
    Failed,
}

/// 四道门的聚合验证记录。
///
/// `security` stays `None` and `test_results` stays empty when an earlier
/// gate short-circuits — a gate that never ran produced no results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub status: ValidationStatus,
    pub syntax_valid: bool,
    #[serde(default)]
    pub syntax_errors: Vec<String>,
    pub type_check_passed: bool,
    #[serde(default)]
    pub type_errors: Vec<String>,
    #[serde(default)]
    pub security: Option<SecurityReviewResult>,
    #[serde(default)]
    pub test_results: Vec<TestResult>,
}

impl ValidationRecord {
    pub fn pending() -> Self {
        Self {
            status: ValidationStatus::Pending,
            syntax_valid: false,
            syntax_errors: Vec::new(),
            type_check_passed: false,
            type_errors: Vec::new(),
            security: None,
            test_results: Vec::new(),
        }
    }

    /// 验证未通过时转成携带逐门报告的错误
    pub fn ensure_passed(&self) -> Result<()> {
        if self.status == ValidationStatus::Passed {
            Ok(())
        } else {
            Err(skillcell_core::Error::Validation(self.error_report()))
        }
    }

    /// 逐门的失败报告，供修复 prompt 使用
    pub fn error_report(&self) -> String {
        let mut report = String::new();

        if !self.syntax_valid {
            report.push_str("## Syntax Gate FAILED\n");
            for error in &self.syntax_errors {
                report.push_str(&format!("- {}\n", error));
            }
            return report;
        }

        if !self.type_check_passed {
            report.push_str("## Type Plausibility Gate FAILED\n");
            for error in &self.type_errors {
                report.push_str(&format!("- {}\n", error));
            }
        }

        if let Some(security) = &self.security {
            if !security.passed {
                report.push_str("## Security Gate FAILED\n");
                for risk in &security.risks {
                    report.push_str(&format!(
                        "- [{:?}][{}] {}{} — {}\n",
                        risk.severity,
                        risk.category,
                        risk.description,
                        risk.location
                            .as_ref()
                            .map(|l| format!(" ({})", l))
                            .unwrap_or_default(),
                        risk.mitigation
                    ));
                }
            }
        }

        let failed_tests: Vec<&TestResult> =
            self.test_results.iter().filter(|t| !t.passed).collect();
        if !failed_tests.is_empty() {
            report.push_str("## Simulated Test Gate FAILED\n");
            for test in failed_tests {
                report.push_str(&format!(
                    "- input `{}`: {}\n",
                    test.input,
                    test.error.as_deref().unwrap_or("expected behavior not met")
                ));
            }
        }

        if report.is_empty() {
            report.push_str("## No gate failures recorded\n");
        }
        report
    }
}

/// 似然性裁决结果：布尔 + 诊断列表
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub valid: bool,
    pub diagnostics: Vec<String>,
}

/// 类型检查与模拟测试的"尽力而为"裁决接口。
///
/// Both judgments come from a generative model today; the seam exists so a
/// real type-checker / sandboxed runner can replace them without touching
/// the state machine.
#[async_trait]
pub trait PlausibilityOracle: Send + Sync {
    async fn judge_types(&self, source: &str, spec: &SkillSpecification) -> Result<OracleVerdict>;
    async fn judge_test(&self, source: &str, case: &TestCase) -> Result<OracleVerdict>;
}

/// 以文本补全服务实现的裁决器
pub struct CompletionOracle {
    provider: Arc<dyn CompletionProvider>,
}

impl CompletionOracle {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl PlausibilityOracle for CompletionOracle {
    async fn judge_types(&self, source: &str, spec: &SkillSpecification) -> Result<OracleVerdict> {
        let mut prompt = String::new();
        prompt.push_str("Judge the type plausibility of this generated skill source.\n");
        prompt.push_str("Check that the code would satisfy the interface contract below: method signatures, ");
        prompt.push_str("return shapes, and manifest fields consistent with the specification.\n\n");
        prompt.push_str("## Interface Contract\n```\n");
        prompt.push_str(skill_contract());
        prompt.push_str("\n```\n\n");
        prompt.push_str(&format!(
            "## Specification\n{} v{} — {}\n\n",
            spec.name, spec.version, spec.description
        ));
        prompt.push_str("## Source\n```javascript\n");
        prompt.push_str(source);
        prompt.push_str("\n```\n\n");
        prompt.push_str("Respond with ONLY a JSON object:\n");
        prompt.push_str("{\"valid\": true|false, \"errors\": [\"...\"]}\n");

        let request = CompletionRequest::new(&prompt)
            .with_system("You are a strict reviewer of JavaScript interface conformance.");
        let response = self.provider.complete(&request).await?;

        match extract_fenced_json(&response) {
            Some(verdict) => Ok(OracleVerdict {
                valid: verdict["valid"].as_bool().unwrap_or(false),
                diagnostics: verdict["errors"]
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|v| v.as_str().map(|s| s.to_string()))
                            .collect()
                    })
                    .unwrap_or_default(),
            }),
            None => Ok(OracleVerdict {
                valid: false,
                diagnostics: vec!["type oracle response unparsable".to_string()],
            }),
        }
    }

    async fn judge_test(&self, source: &str, case: &TestCase) -> Result<OracleVerdict> {
        let mut prompt = String::new();
        prompt.push_str("Run a simulated test: given the source and the input below, ");
        prompt.push_str("would `execute` plausibly produce the expected behavior?\n\n");
        prompt.push_str("## Source\n```javascript\n");
        prompt.push_str(source);
        prompt.push_str("\n```\n\n");
        prompt.push_str(&format!("## Test Input\n{}\n\n", case.input));
        prompt.push_str(&format!("## Expected Behavior\n{}\n\n", case.expected));
        prompt.push_str("Respond with ONLY a JSON object:\n");
        prompt.push_str("{\"passed\": true|false, \"output\": \"predicted output\", \"reason\": \"...\"}\n");

        let request = CompletionRequest::new(&prompt)
            .with_system("You simulate JavaScript execution and judge test outcomes.");
        let response = self.provider.complete(&request).await?;

        match extract_fenced_json(&response) {
            Some(verdict) => {
                let passed = verdict["passed"].as_bool().unwrap_or(false);
                let detail = verdict[if passed { "output" } else { "reason" }]
                    .as_str()
                    .unwrap_or("")
                    .to_string();
                Ok(OracleVerdict {
                    valid: passed,
                    diagnostics: if detail.is_empty() { Vec::new() } else { vec![detail] },
                })
            }
            None => Ok(OracleVerdict {
                valid: false,
                diagnostics: vec!["test oracle response unparsable".to_string()],
            }),
        }
    }
}

struct SecurityRule {
    pattern: Regex,
    severity: Severity,
    category: &'static str,
    description: &'static str,
    mitigation: &'static str,
}

/// 危险构造的固定扫描表。确定性：相同源码永远得到相同风险列表。
static SECURITY_RULES: Lazy<Vec<SecurityRule>> = Lazy::new(|| {
    vec![
        SecurityRule {
            pattern: Regex::new(r"\beval\s*\(").unwrap(),
            severity: Severity::Critical,
            category: "code-injection",
            description: "Dynamic code evaluation via eval()",
            mitigation: "Remove eval; express the logic declaratively or use host capabilities",
        },
        SecurityRule {
            pattern: Regex::new(r"new\s+Function\s*\(").unwrap(),
            severity: Severity::Critical,
            category: "code-injection",
            description: "Dynamic function construction via new Function()",
            mitigation: "Remove dynamic function construction",
        },
        SecurityRule {
            pattern: Regex::new(r#"child_process|\bspawn(Sync)?\s*\(|\bexecFile(Sync)?\s*\("#)
                .unwrap(),
            severity: Severity::High,
            category: "process-execution",
            description: "External process spawning",
            mitigation: "Skills must not spawn processes; request a host capability instead",
        },
        SecurityRule {
            pattern: Regex::new(
                r#"require\(\s*['"]fs['"]\s*\)|\bfs\.(readFile|writeFile|appendFile|unlink|rmdir|rm)"#,
            )
            .unwrap(),
            severity: Severity::Medium,
            category: "filesystem",
            description: "Raw filesystem access",
            mitigation: "Use the storage capability from context instead of direct fs access",
        },
        SecurityRule {
            pattern: Regex::new(r"process\.env").unwrap(),
            severity: Severity::Low,
            category: "environment",
            description: "Environment variable access",
            mitigation: "Configuration must come from the manifest, not the process environment",
        },
        SecurityRule {
            pattern: Regex::new(r"(fetch|https?\.get|https?\.request|axios\.(get|post))\s*\([^)]*\+")
                .unwrap(),
            severity: Severity::Medium,
            category: "network-injection",
            description: "Network request URL built by string concatenation",
            mitigation: "Build URLs with a URL builder and validate inputs before interpolation",
        },
        SecurityRule {
            pattern: Regex::new(r"\.innerHTML\s*=|\.outerHTML\s*=|document\.write\s*\(").unwrap(),
            severity: Severity::High,
            category: "content-injection",
            description: "Unsafe DOM-style content injection",
            mitigation: "Never assign untrusted content to innerHTML/outerHTML",
        },
        SecurityRule {
            pattern: Regex::new(r"/[^/\n]*\([^)]*[+*]\)[+*][^/\n]*/").unwrap(),
            severity: Severity::Medium,
            category: "redos",
            description: "Regex literal with nested quantifiers (catastrophic backtracking risk)",
            mitigation: "Rewrite the pattern without nested unbounded quantifiers",
        },
    ]
});

/// 找到首个匹配处所在的行号
fn match_location(source: &str, byte_offset: usize) -> String {
    let line = source[..byte_offset].matches('\n').count() + 1;
    format!("line {}", line)
}

pub struct ValidatorConfig {
    pub min_test_coverage: f64,
    pub require_human_review: bool,
    pub allowed_permissions: Vec<String>,
}

impl From<&EvolutionConfig> for ValidatorConfig {
    fn from(config: &EvolutionConfig) -> Self {
        Self {
            min_test_coverage: config.min_test_coverage,
            require_human_review: config.require_human_review,
            allowed_permissions: config.allowed_permissions.clone(),
        }
    }
}

/// 验证器：四道有序门，遇错短路。
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub async fn validate(
        &self,
        source: &str,
        spec: &SkillSpecification,
        oracle: &dyn PlausibilityOracle,
    ) -> Result<ValidationRecord> {
        let mut record = ValidationRecord::pending();

        // ─── Gate 1: 结构语法 ───
        let (syntax_ok, syntax_errors) = check_syntax(source);
        record.syntax_valid = syntax_ok;
        record.syntax_errors = syntax_errors;
        if !syntax_ok {
            warn!(
                skill = %spec.name,
                errors = record.syntax_errors.len(),
                "🔍 [验证] 语法门未通过: {}",
                record.syntax_errors.join("; ")
            );
            record.status = ValidationStatus::Failed;
            return Ok(record);
        }
        debug!(skill = %spec.name, "🔍 [验证] 语法门通过");

        // ─── Gate 2: 类型似然性（oracle 裁决，advisory）───
        let verdict = oracle.judge_types(source, spec).await?;
        record.type_check_passed = verdict.valid;
        record.type_errors = verdict.diagnostics;
        if !verdict.valid {
            warn!(
                skill = %spec.name,
                errors = record.type_errors.len(),
                "🔍 [验证] 类型门未通过"
            );
            record.status = ValidationStatus::Failed;
            return Ok(record);
        }
        debug!(skill = %spec.name, "🔍 [验证] 类型门通过");

        // ─── Gate 3: 安全审查（确定性扫描）───
        let security = self.security_review(source, spec);
        let security_passed = security.passed;
        let risk_count = security.risks.len();
        record.security = Some(security);
        if !security_passed {
            warn!(
                skill = %spec.name,
                risks = risk_count,
                "🛡 [安全] 安全门未通过 ({} 个风险)",
                risk_count
            );
            record.status = ValidationStatus::Failed;
            return Ok(record);
        }
        debug!(skill = %spec.name, risks = risk_count, "🛡 [安全] 安全门通过");

        // ─── Gate 4: 模拟测试 ───
        if spec.test_cases.is_empty() {
            debug!(skill = %spec.name, "🧪 [测试] 无声明用例，测试门视为通过");
        } else {
            for case in &spec.test_cases {
                let started = Instant::now();
                let verdict = oracle.judge_test(source, case).await?;
                let duration_ms = started.elapsed().as_millis() as u64;
                let detail = verdict.diagnostics.join("; ");
                record.test_results.push(TestResult {
                    input: case.input.clone(),
                    passed: verdict.valid,
                    output: if verdict.valid && !detail.is_empty() {
                        Some(detail.clone())
                    } else {
                        None
                    },
                    error: if !verdict.valid {
                        Some(if detail.is_empty() {
                            "expected behavior not met".to_string()
                        } else {
                            detail
                        })
                    } else {
                        None
                    },
                    duration_ms,
                });
            }

            let passed_count = record.test_results.iter().filter(|t| t.passed).count();
            let ratio = passed_count as f64 / record.test_results.len() as f64;
            if ratio < self.config.min_test_coverage {
                warn!(
                    skill = %spec.name,
                    passed = passed_count,
                    total = record.test_results.len(),
                    "🧪 [测试] 通过率 {:.0}% 低于阈值 {:.0}%",
                    ratio * 100.0,
                    self.config.min_test_coverage * 100.0
                );
                record.status = ValidationStatus::Failed;
                return Ok(record);
            }
            info!(
                skill = %spec.name,
                passed = passed_count,
                total = record.test_results.len(),
                "🧪 [测试] 测试门通过 ({}/{})",
                passed_count,
                record.test_results.len()
            );
        }

        record.status = ValidationStatus::Passed;
        Ok(record)
    }

    /// 确定性安全审查：固定模式表 + 声明权限越权检查。
    ///
    /// Passes iff no critical risk AND (no high risk OR human review is not
    /// required by configuration).
    pub fn security_review(&self, source: &str, spec: &SkillSpecification) -> SecurityReviewResult {
        let mut risks = Vec::new();

        for rule in SECURITY_RULES.iter() {
            if let Some(m) = rule.pattern.find(source) {
                risks.push(SecurityRisk {
                    severity: rule.severity,
                    category: rule.category.to_string(),
                    description: rule.description.to_string(),
                    location: Some(match_location(source, m.start())),
                    mitigation: rule.mitigation.to_string(),
                });
            }
        }

        let allowed = PermissionSet::from_iter(self.config.allowed_permissions.clone());
        for permission in &spec.permissions {
            if !allowed.has(permission) {
                risks.push(SecurityRisk {
                    severity: Severity::High,
                    category: "permission".to_string(),
                    description: format!("Permission `{}` is not allow-listed", permission),
                    location: None,
                    mitigation: "Remove the permission or add it to allowedPermissions".to_string(),
                });
            }
        }

        let has_critical = risks.iter().any(|r| r.severity == Severity::Critical);
        let has_high = risks.iter().any(|r| r.severity == Severity::High);
        let passed = !has_critical && (!has_high || !self.config.require_human_review);

        let mut recommendations = Vec::new();
        if !risks.is_empty() {
            if has_critical {
                recommendations.push(
                    "Do NOT deploy: critical risks present. Remove dynamic code execution entirely."
                        .to_string(),
                );
            }
            if has_high && self.config.require_human_review {
                recommendations.push(
                    "High-severity risks require human review before deployment.".to_string(),
                );
            }
            recommendations.push(
                "Review the flagged constructs; prefer host-provided capabilities over direct system access."
                    .to_string(),
            );
        }

        SecurityReviewResult {
            passed,
            risks,
            recommendations,
        }
    }
}

/// 结构形状检查 + 全文配对符号计数
fn check_syntax(source: &str) -> (bool, Vec<String>) {
    let mut errors: Vec<String> = missing_shapes(source)
        .into_iter()
        .map(|shape| format!("missing required shape: {}", shape))
        .collect();

    for (open, close, name) in [('(', ')', "parentheses"), ('{', '}', "braces"), ('[', ']', "brackets")] {
        let opens = source.matches(open).count();
        let closes = source.matches(close).count();
        if opens != closes {
            errors.push(format!(
                "unbalanced {}: {} `{}` vs {} `{}`",
                name, opens, open, closes, close
            ));
        }
    }

    (errors.is_empty(), errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const CLEAN_SOURCE: &str = r#"class CsvParser extends SkillBase {
  constructor() {
    super();
    this.manifest = { name: 'csv-parser', version: '1.0.0' };
  }

  async execute(input, context) {
    const rows = input.text.split('\n').map((line) => line.split(','));
    return { success: true, output: rows };
  }
}

module.exports = CsvParser;
"#;

    struct StubOracle {
        type_valid: bool,
        test_results: Vec<bool>,
        type_calls: Mutex<u32>,
        test_calls: Mutex<u32>,
    }

    impl StubOracle {
        fn new(type_valid: bool, test_results: Vec<bool>) -> Self {
            Self {
                type_valid,
                test_results,
                type_calls: Mutex::new(0),
                test_calls: Mutex::new(0),
            }
        }

        fn passing() -> Self {
            Self::new(true, vec![true; 8])
        }
    }

    #[async_trait]
    impl PlausibilityOracle for StubOracle {
        async fn judge_types(
            &self,
            _source: &str,
            _spec: &SkillSpecification,
        ) -> Result<OracleVerdict> {
            *self.type_calls.lock().unwrap() += 1;
            Ok(OracleVerdict {
                valid: self.type_valid,
                diagnostics: if self.type_valid {
                    Vec::new()
                } else {
                    vec!["execute returns the wrong shape".to_string()]
                },
            })
        }

        async fn judge_test(&self, _source: &str, _case: &TestCase) -> Result<OracleVerdict> {
            let mut calls = self.test_calls.lock().unwrap();
            let index = (*calls) as usize;
            *calls += 1;
            let passed = self.test_results.get(index).copied().unwrap_or(true);
            Ok(OracleVerdict {
                valid: passed,
                diagnostics: vec![],
            })
        }
    }

    fn validator() -> Validator {
        Validator::new(ValidatorConfig {
            min_test_coverage: 0.8,
            require_human_review: true,
            allowed_permissions: vec!["network".to_string(), "storage".to_string()],
        })
    }

    fn spec_with_tests(count: usize) -> SkillSpecification {
        let mut spec = SkillSpecification::parse_document("# Skill: CSV Parser\n").unwrap();
        for i in 0..count {
            spec.test_cases.push(TestCase {
                input: format!("case {}", i),
                expected: "works".to_string(),
            });
        }
        spec
    }

    #[tokio::test]
    async fn test_all_gates_pass() {
        let oracle = StubOracle::passing();
        let record = validator()
            .validate(CLEAN_SOURCE, &spec_with_tests(2), &oracle)
            .await
            .unwrap();
        assert_eq!(record.status, ValidationStatus::Passed);
        assert!(record.syntax_valid);
        assert!(record.type_check_passed);
        assert!(record.security.as_ref().unwrap().passed);
        assert_eq!(record.test_results.len(), 2);
    }

    #[tokio::test]
    async fn test_syntax_failure_short_circuits() {
        let oracle = StubOracle::passing();
        let record = validator()
            .validate("const nothing = 1;", &spec_with_tests(3), &oracle)
            .await
            .unwrap();

        assert_eq!(record.status, ValidationStatus::Failed);
        assert!(!record.syntax_valid);
        // Later gates never ran: no security result, no test results, oracle untouched.
        assert!(record.security.is_none());
        assert!(record.test_results.is_empty());
        assert_eq!(*oracle.type_calls.lock().unwrap(), 0);
        assert_eq!(*oracle.test_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unbalanced_delimiters_fail_syntax() {
        let source = CLEAN_SOURCE.replace("return { success: true, output: rows };", "return { success: true, output: rows ;");
        let oracle = StubOracle::passing();
        let record = validator()
            .validate(&source, &spec_with_tests(0), &oracle)
            .await
            .unwrap();
        assert!(!record.syntax_valid);
        assert!(record
            .syntax_errors
            .iter()
            .any(|e| e.contains("unbalanced braces")));
    }

    #[tokio::test]
    async fn test_type_gate_failure_stops_before_security() {
        let oracle = StubOracle::new(false, vec![]);
        let record = validator()
            .validate(CLEAN_SOURCE, &spec_with_tests(2), &oracle)
            .await
            .unwrap();
        assert_eq!(record.status, ValidationStatus::Failed);
        assert!(!record.type_check_passed);
        assert!(record.security.is_none());
        assert!(record.test_results.is_empty());
    }

    #[test]
    fn test_security_eval_is_always_critical() {
        let source = CLEAN_SOURCE.replace(
            "input.text.split",
            "eval(input.code); input.text.split",
        );
        let v = validator();
        let spec = spec_with_tests(0);

        for _ in 0..2 {
            let review = v.security_review(&source, &spec);
            assert!(!review.passed);
            let critical: Vec<_> = review
                .risks
                .iter()
                .filter(|r| r.severity == Severity::Critical)
                .collect();
            assert_eq!(critical.len(), 1);
            assert_eq!(critical[0].category, "code-injection");
            assert!(review.recommendations[0].contains("Do NOT deploy"));
        }
    }

    #[test]
    fn test_security_concat_fetch_and_spawn() {
        let source = CLEAN_SOURCE.replace(
            "const rows = input.text.split('\\n').map((line) => line.split(','));",
            "await fetch('https://api.example.com/q?s=' + input.symbol); spawn('ls');",
        );
        let review = validator().security_review(&source, &spec_with_tests(0));

        let mut severities: Vec<Severity> = review.risks.iter().map(|r| r.severity).collect();
        severities.sort();
        assert_eq!(severities, vec![Severity::Medium, Severity::High]);
        // Review required -> high risk fails the gate.
        assert!(!review.passed);

        // Same source with review disabled: high is tolerated.
        let lenient = Validator::new(ValidatorConfig {
            min_test_coverage: 0.8,
            require_human_review: false,
            allowed_permissions: vec![],
        });
        assert!(lenient.security_review(&source, &spec_with_tests(0)).passed);
    }

    #[test]
    fn test_security_permission_overreach_is_high() {
        let mut spec = spec_with_tests(0);
        spec.permissions = vec!["network".to_string(), "shell".to_string()];
        let review = validator().security_review(CLEAN_SOURCE, &spec);

        let overreach: Vec<_> = review
            .risks
            .iter()
            .filter(|r| r.category == "permission")
            .collect();
        assert_eq!(overreach.len(), 1);
        assert_eq!(overreach[0].severity, Severity::High);
        assert!(overreach[0].description.contains("shell"));
    }

    #[tokio::test]
    async fn test_coverage_threshold() {
        // 1 of 2 passing = 50% < 80% -> failed.
        let oracle = StubOracle::new(true, vec![true, false]);
        let record = validator()
            .validate(CLEAN_SOURCE, &spec_with_tests(2), &oracle)
            .await
            .unwrap();
        assert_eq!(record.status, ValidationStatus::Failed);
        assert_eq!(record.test_results.len(), 2);
        assert!(record.error_report().contains("Simulated Test Gate"));
    }

    #[tokio::test]
    async fn test_zero_test_cases_trivially_pass() {
        let oracle = StubOracle::passing();
        let record = validator()
            .validate(CLEAN_SOURCE, &spec_with_tests(0), &oracle)
            .await
            .unwrap();
        assert_eq!(record.status, ValidationStatus::Passed);
        assert!(record.test_results.is_empty());
    }

    #[test]
    fn test_error_report_lists_failed_gate() {
        let mut record = ValidationRecord::pending();
        record.syntax_valid = false;
        record.syntax_errors = vec!["missing required shape: export declaration".to_string()];
        record.status = ValidationStatus::Failed;
        let report = record.error_report();
        assert!(report.contains("Syntax Gate FAILED"));
        assert!(report.contains("export declaration"));

        assert!(matches!(
            record.ensure_passed(),
            Err(skillcell_core::Error::Validation(_))
        ));
    }
}
