use crate::extract::extract_fenced_block;
use crate::gap::CapabilityGap;
use crate::specdoc::SkillSpecification;
use skillcell_core::types::CompletionRequest;
use skillcell_core::{Error, Result};
use skillcell_providers::CompletionProvider;
use tracing::{debug, info};

/// 模板合成器：把能力缺口变成结构化的技能设计文档。
///
/// Single completion round-trip. The parsed document is normalized by
/// `SkillSpecification::parse_document`; a completion from which no document
/// can be extracted is a `Synthesis` failure — retries live in the code
/// generation loop, not here.
pub struct TemplateSynthesizer;

impl TemplateSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub async fn synthesize(
        &self,
        gap: &CapabilityGap,
        provider: &dyn CompletionProvider,
    ) -> Result<SkillSpecification> {
        let prompt = build_design_prompt(gap);

        debug!(gap_id = %gap.id, prompt_len = prompt.len(), "📐 [模板] 设计文档 prompt 已构建");

        let request = CompletionRequest::new(&prompt)
            .with_system("You design declarative skill specifications for an autonomous agent.");
        let response = provider.complete(&request).await?;

        let document = extract_fenced_block(&response, &["markdown", "md"]).ok_or_else(|| {
            Error::Synthesis("no structured document block in completion".to_string())
        })?;

        let spec = SkillSpecification::parse_document(&document)
            .map_err(|e| Error::Synthesis(format!("design document unparsable: {}", e)))?;

        info!(
            gap_id = %gap.id,
            skill = %spec.name,
            steps = spec.steps.len(),
            tests = spec.test_cases.len(),
            "📐 [模板] 技能规格已合成: {} v{}",
            spec.name, spec.version
        );

        Ok(spec)
    }
}

impl Default for TemplateSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

fn build_design_prompt(gap: &CapabilityGap) -> String {
    let mut prompt = String::new();

    prompt.push_str("Design a new skill for an autonomous agent. Produce a skill design document,\n");
    prompt.push_str("NOT implementation code.\n\n");

    prompt.push_str("## Capability Gap\n");
    prompt.push_str(&format!("- description: {}\n", gap.capability.description));
    prompt.push_str(&format!("- category: {:?}\n", gap.capability.category));
    prompt.push_str(&format!("- complexity: {:?}\n", gap.capability.complexity));
    if !gap.capability.suggested_tools.is_empty() {
        prompt.push_str(&format!(
            "- suggested tools: {}\n",
            gap.capability.suggested_tools.join(", ")
        ));
    }
    prompt.push('\n');

    prompt.push_str("## Originating Context\n");
    prompt.push_str(&format!("- user request: {}\n", gap.context.user_request));
    prompt.push_str(&format!("- failure reason: {}\n", gap.context.failure_reason));
    for action in &gap.context.attempted_actions {
        prompt.push_str(&format!("- attempted: {}\n", action));
    }
    prompt.push('\n');

    prompt.push_str("## Document Format\n");
    prompt.push_str("Output ONLY a markdown document in a ```markdown code block, using exactly this structure:\n\n");
    prompt.push_str("```\n");
    prompt.push_str("# Skill: <display name>\n\n");
    prompt.push_str("## Metadata\n");
    prompt.push_str("- version: 1.0.0\n");
    prompt.push_str("- description: <one sentence>\n");
    prompt.push_str("- author: skillcell\n");
    prompt.push_str("- category: <file-processing|data-analysis|web-service|communication|automation|utility>\n\n");
    prompt.push_str("## Triggers\n");
    prompt.push_str("- pattern: <regex the dispatcher matches against user input>\n");
    prompt.push_str("- intent: <intent label>\n");
    prompt.push_str("- command: </slash-command>\n");
    prompt.push_str("- example: <example utterance>\n\n");
    prompt.push_str("## Permissions\n");
    prompt.push_str("- <one of: network, storage, schedule, notify — only what the skill truly needs>\n\n");
    prompt.push_str("## Logic Steps\n");
    prompt.push_str("1. <step description> [action: fetch|parse|transform|store|notify|compute|invoke]\n\n");
    prompt.push_str("## Dependencies\n");
    prompt.push_str("- tool: <tool name>\n\n");
    prompt.push_str("## Test Cases\n");
    prompt.push_str("- input: <test input> | expected: <expected behavior>\n");
    prompt.push_str("```\n\n");
    prompt.push_str("Include 2-4 logic steps and 2-3 test cases. Declare the minimal permission set.\n");

    prompt
}
