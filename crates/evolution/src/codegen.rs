use crate::extract::extract_fenced_block;
use crate::specdoc::SkillSpecification;
use crate::validator::ValidationRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use skillcell_core::types::CompletionRequest;
use skillcell_core::{Error, Result};
use skillcell_providers::CompletionProvider;
use tracing::{debug, info, warn};

/// 生成元数据：模型标识、prompt 摘要、迭代次数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMeta {
    pub model: String,
    pub prompt_digest: String,
    pub iterations: u32,
}

/// 生成产物的状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Draft,
    Validated,
    Deployed,
    Deprecated,
}

/// 合成出的技能产物：规格 + 源码 + 生成元数据 + 验证记录。
///
/// Owned exclusively by the pipeline until persisted; after that the
/// repository holds the canonical copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSkillArtifact {
    pub id: String,
    pub specification: SkillSpecification,
    pub source: String,
    pub meta: GenerationMeta,
    pub validation: ValidationRecord,
    pub status: ArtifactStatus,
}

static SHAPE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"class\s+\w+\s+extends\s+SkillBase").unwrap());
static SHAPE_MANIFEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(this\.|static\s+)?manifest\s*=").unwrap());
static SHAPE_EXECUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"async\s+execute\s*\(").unwrap());
static SHAPE_EXPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"module\.exports|export\s+(default\s+|\{)").unwrap());

/// 四个必需的结构形状中缺失的部分。
///
/// This is NOT a parser — it is the fast heuristic gate the generation loop
/// uses to decide whether another iteration is worth the call.
pub fn missing_shapes(source: &str) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !SHAPE_CLASS.is_match(source) {
        missing.push("class extending SkillBase");
    }
    if !SHAPE_MANIFEST.is_match(source) {
        missing.push("manifest assignment");
    }
    if !SHAPE_EXECUTE.is_match(source) {
        missing.push("async execute entry point");
    }
    if !SHAPE_EXPORT.is_match(source) {
        missing.push("export declaration");
    }
    missing
}

pub fn basic_syntax_check(source: &str) -> bool {
    missing_shapes(source).is_empty()
}

/// sha256 前 16 个 hex 字符 — 用于 prompt 摘要与源码指纹
pub fn short_digest(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

/// 代码合成器：规格 → 可执行源码，以及基于错误报告的修复。
pub struct CodeSynthesizer {
    max_iterations: u32,
    model_label: String,
}

impl CodeSynthesizer {
    pub fn new(max_iterations: u32, model_label: &str) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            model_label: model_label.to_string(),
        }
    }

    /// 生成技能源码。
    ///
    /// Bounded loop: each iteration is one completion call; the structural
    /// self-check decides whether to retry. Loop exhaustion hands the last
    /// candidate to the validator — the validator is the authoritative gate.
    pub async fn generate(
        &self,
        spec: &SkillSpecification,
        provider: &dyn CompletionProvider,
    ) -> Result<GeneratedSkillArtifact> {
        let mut last_missing: Vec<&'static str> = Vec::new();
        let mut source = String::new();
        let mut prompt_digest = String::new();
        let mut iterations = 0;

        for iteration in 1..=self.max_iterations {
            iterations = iteration;
            let prompt = build_generation_prompt(spec, &last_missing);
            prompt_digest = short_digest(&prompt);

            debug!(
                skill = %spec.name,
                iteration = iteration,
                prompt_len = prompt.len(),
                "📝 [生成] 第 {}/{} 次生成",
                iteration, self.max_iterations
            );

            let request = CompletionRequest::new(&prompt)
                .with_system("You implement JavaScript skills for an autonomous agent runtime.");
            let response = provider.complete(&request).await?;

            source = extract_fenced_block(&response, &["javascript", "js"]).ok_or_else(|| {
                Error::CodeExtraction("no source block in completion".to_string())
            })?;

            last_missing = missing_shapes(&source);
            if last_missing.is_empty() {
                info!(
                    skill = %spec.name,
                    iteration = iteration,
                    source_len = source.len(),
                    "📝 [生成] 源码通过结构检查 ({} chars)",
                    source.len()
                );
                break;
            }

            warn!(
                skill = %spec.name,
                iteration = iteration,
                missing = ?last_missing,
                "📝 [生成] 结构检查未通过，缺少: {}",
                last_missing.join(", ")
            );
        }

        if !last_missing.is_empty() {
            warn!(
                skill = %spec.name,
                "📝 [生成] 迭代用尽，交由验证器裁决最后一个候选"
            );
        }

        Ok(GeneratedSkillArtifact {
            id: format!("art_{}", uuid::Uuid::new_v4().simple()),
            specification: spec.clone(),
            source,
            meta: GenerationMeta {
                model: self.model_label.clone(),
                prompt_digest,
                iterations,
            },
            validation: ValidationRecord::pending(),
            status: ArtifactStatus::Draft,
        })
    }

    /// 基于验证错误报告重新生成源码（一次补全调用）。
    pub async fn repair(
        &self,
        artifact: &GeneratedSkillArtifact,
        error_report: &str,
        provider: &dyn CompletionProvider,
    ) -> Result<String> {
        let prompt = build_repair_prompt(artifact, error_report);

        info!(
            artifact_id = %artifact.id,
            skill = %artifact.specification.name,
            report_len = error_report.len(),
            "🔧 [修复] 根据验证报告重新生成"
        );

        let request = CompletionRequest::new(&prompt)
            .with_system("You repair JavaScript skills for an autonomous agent runtime.");
        let response = provider.complete(&request).await?;

        extract_fenced_block(&response, &["javascript", "js"])
            .ok_or_else(|| Error::CodeExtraction("no source block in repair completion".to_string()))
    }
}

pub(crate) fn skill_contract() -> &'static str {
    "class <Name> extends SkillBase {\n\
     \x20 constructor() {\n\
     \x20   super();\n\
     \x20   this.manifest = { name, version, description, triggers, permissions };\n\
     \x20 }\n\
     \x20 async execute(input, context) { ... return { success, output }; }\n\
     }\n\
     module.exports = <Name>;"
}

fn build_generation_prompt(spec: &SkillSpecification, prior_missing: &[&'static str]) -> String {
    let mut prompt = String::new();

    prompt.push_str("Implement the following skill for an autonomous agent runtime.\n\n");

    prompt.push_str("## Skill Design Document\n");
    prompt.push_str(&spec.render());
    prompt.push('\n');

    prompt.push_str("## Required Structure\n");
    prompt.push_str("The skill MUST follow this contract exactly:\n```\n");
    prompt.push_str(skill_contract());
    prompt.push_str("\n```\n\n");

    prompt.push_str("## Rules\n");
    prompt.push_str("- Use only the declared permissions; capabilities come from `context`, not imports.\n");
    prompt.push_str("- No eval, no dynamic Function construction, no child_process, no direct fs access.\n");
    prompt.push_str("- `execute` must be async and must not throw for expected failures — return { success: false, error }.\n");
    prompt.push_str("- Implement every logic step from the design document.\n\n");

    if !prior_missing.is_empty() {
        prompt.push_str("## Previous Attempt (REJECTED)\n");
        prompt.push_str("The previous output was missing required structure. Do not repeat this:\n");
        for shape in prior_missing {
            prompt.push_str(&format!("- missing: {}\n", shape));
        }
        prompt.push('\n');
    }

    prompt.push_str("## Output Format\n");
    prompt.push_str("Output ONLY the complete source in a ```javascript code block.\n");

    prompt
}

fn build_repair_prompt(artifact: &GeneratedSkillArtifact, error_report: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("A generated skill failed validation. Fix ALL reported problems and output the corrected source.\n\n");

    prompt.push_str(&format!(
        "## Skill\n{} v{}\n\n",
        artifact.specification.name, artifact.specification.version
    ));

    prompt.push_str("## Current Source (failing)\n```javascript\n");
    prompt.push_str(&artifact.source);
    prompt.push_str("\n```\n\n");

    prompt.push_str("## Validation Report\n");
    prompt.push_str(error_report);
    prompt.push('\n');

    prompt.push_str("## Required Structure\n```\n");
    prompt.push_str(skill_contract());
    prompt.push_str("\n```\n\n");

    prompt.push_str("## Output Format\n");
    prompt.push_str("Fix every reported issue. Do not introduce eval, dynamic Function construction, ");
    prompt.push_str("child_process, or direct fs access. Output ONLY the corrected source in a ```javascript code block.\n");

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const GOOD_SOURCE: &str = r#"class CsvParser extends SkillBase {
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

    struct SequenceProvider {
        responses: Mutex<Vec<String>>,
        calls: Mutex<u32>,
    }

    impl SequenceProvider {
        fn new(responses: Vec<String>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for SequenceProvider {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| Error::Provider("no more canned responses".to_string()))
        }
    }

    fn spec() -> SkillSpecification {
        SkillSpecification::parse_document("# Skill: CSV Parser\n").unwrap()
    }

    #[test]
    fn test_missing_shapes_all_present() {
        assert!(missing_shapes(GOOD_SOURCE).is_empty());
        assert!(basic_syntax_check(GOOD_SOURCE));
    }

    #[test]
    fn test_missing_shapes_reports_each_gap() {
        let missing = missing_shapes("const x = 1;");
        assert_eq!(missing.len(), 4);
        assert!(missing.contains(&"class extending SkillBase"));
        assert!(missing.contains(&"export declaration"));
    }

    #[test]
    fn test_short_digest_is_deterministic() {
        let a = short_digest("same text");
        let b = short_digest("same text");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, short_digest("different text"));
    }

    #[tokio::test]
    async fn test_generate_first_iteration_success() {
        let provider = SequenceProvider::new(vec![format!("```javascript\n{}\n```", GOOD_SOURCE)]);
        let synthesizer = CodeSynthesizer::new(3, "test-model");
        let artifact = synthesizer.generate(&spec(), &provider).await.unwrap();

        assert_eq!(artifact.meta.iterations, 1);
        assert_eq!(artifact.status, ArtifactStatus::Draft);
        assert!(basic_syntax_check(&artifact.source));
        assert_eq!(*provider.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_generate_retries_on_structural_failure() {
        let provider = SequenceProvider::new(vec![
            "```javascript\nconst incomplete = true;\n```".to_string(),
            format!("```javascript\n{}\n```", GOOD_SOURCE),
        ]);
        let synthesizer = CodeSynthesizer::new(3, "test-model");
        let artifact = synthesizer.generate(&spec(), &provider).await.unwrap();

        assert_eq!(artifact.meta.iterations, 2);
        assert!(basic_syntax_check(&artifact.source));
    }

    #[tokio::test]
    async fn test_generate_exhaustion_keeps_last_candidate() {
        let bad = "```javascript\nconst incomplete = true;\n```".to_string();
        let provider = SequenceProvider::new(vec![bad.clone(), bad.clone(), bad]);
        let synthesizer = CodeSynthesizer::new(3, "test-model");
        let artifact = synthesizer.generate(&spec(), &provider).await.unwrap();

        assert_eq!(artifact.meta.iterations, 3);
        assert!(!basic_syntax_check(&artifact.source));
    }

    #[tokio::test]
    async fn test_generate_without_block_is_extraction_failure() {
        let provider = SequenceProvider::new(vec!["Sorry, I can't write that.".to_string()]);
        let synthesizer = CodeSynthesizer::new(3, "test-model");
        let err = synthesizer.generate(&spec(), &provider).await.unwrap_err();
        assert!(matches!(err, Error::CodeExtraction(_)));
    }

    #[tokio::test]
    async fn test_repair_extracts_source() {
        let provider = SequenceProvider::new(vec![format!("```javascript\n{}\n```", GOOD_SOURCE)]);
        let synthesizer = CodeSynthesizer::new(3, "test-model");
        let artifact = GeneratedSkillArtifact {
            id: "art_test".to_string(),
            specification: spec(),
            source: "broken".to_string(),
            meta: GenerationMeta {
                model: "test-model".to_string(),
                prompt_digest: "0".repeat(16),
                iterations: 1,
            },
            validation: ValidationRecord::pending(),
            status: ArtifactStatus::Draft,
        };
        let repaired = synthesizer
            .repair(&artifact, "syntax gate: missing export", &provider)
            .await
            .unwrap();
        assert!(repaired.contains("module.exports"));
    }
}
