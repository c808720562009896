use crate::gap::GapCategory;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 触发定义：正则模式、意图标签、命令前缀、示例语句
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriggerSpec {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub intents: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// 逻辑步骤的动作类型（从描述推断）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Fetch,
    Parse,
    Transform,
    Store,
    Notify,
    Compute,
    #[default]
    Invoke,
}

impl ActionKind {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "fetch" => ActionKind::Fetch,
            "parse" => ActionKind::Parse,
            "transform" => ActionKind::Transform,
            "store" => ActionKind::Store,
            "notify" => ActionKind::Notify,
            "compute" => ActionKind::Compute,
            _ => ActionKind::Invoke,
        }
    }

    /// Keyword heuristic over a step description.
    pub fn infer(description: &str) -> Self {
        let lower = description.to_lowercase();
        let table: &[(&[&str], ActionKind)] = &[
            (&["fetch", "download", "request", "retrieve"], ActionKind::Fetch),
            (&["parse", "extract", "read", "scan"], ActionKind::Parse),
            (&["transform", "convert", "format", "normalize", "map"], ActionKind::Transform),
            (&["store", "save", "persist", "write", "cache"], ActionKind::Store),
            (&["notify", "send", "alert", "report", "reply"], ActionKind::Notify),
            (&["compute", "calculate", "count", "aggregate", "sum"], ActionKind::Compute),
        ];
        for (keywords, kind) in table {
            if keywords.iter().any(|k| lower.contains(k)) {
                return *kind;
            }
        }
        ActionKind::Invoke
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicStep {
    pub id: String,
    pub description: String,
    pub action: ActionKind,
    #[serde(default)]
    pub on_success: Option<String>,
    #[serde(default)]
    pub on_failure: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DependencySpec {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub apis: Vec<String>,
}

/// 声明式测试用例：输入文本 + 期望行为描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected: String,
}

/// 候选技能的声明式设计文档。
///
/// Everything optional is defaulted at parse time so a malformed or partial
/// completion never crashes downstream stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSpecification {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: GapCategory,
    #[serde(default)]
    pub triggers: TriggerSpec,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub steps: Vec<LogicStep>,
    #[serde(default)]
    pub dependencies: DependencySpec,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// 设计文档解析失败的原因
#[derive(Debug, Clone)]
pub struct SpecParseError {
    pub reason: String,
}

impl std::fmt::Display for SpecParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for SpecParseError {}

static SEMVER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap());
static STEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)[.)]\s+(.*)$").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\w+):\s*([^\]]+)\]").unwrap());

impl SkillSpecification {
    /// 由展示名派生文件系统安全的 slug：小写、字符白名单、折叠分隔符。
    pub fn slug(&self) -> String {
        let mut slug = String::new();
        let mut last_sep = true;
        for ch in self.name.to_lowercase().chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch);
                last_sep = false;
            } else if (ch == ' ' || ch == '-' || ch == '_') && !last_sep {
                slug.push('-');
                last_sep = true;
            }
        }
        slug.trim_end_matches('-').to_string()
    }

    /// 解析 heading 分隔的设计文档。
    ///
    /// Only the `# Skill:` name line is mandatory; every other section is
    /// genuinely optional and defaults when absent. This normalization is the
    /// boundary between an unreliable generator and the rest of the pipeline.
    pub fn parse_document(text: &str) -> std::result::Result<Self, SpecParseError> {
        let mut spec = SkillSpecification {
            name: String::new(),
            version: "1.0.0".to_string(),
            description: String::new(),
            author: "skillcell".to_string(),
            category: GapCategory::Utility,
            triggers: TriggerSpec::default(),
            permissions: Vec::new(),
            steps: Vec::new(),
            dependencies: DependencySpec::default(),
            test_cases: Vec::new(),
        };

        #[derive(PartialEq, Clone, Copy)]
        enum Section {
            None,
            Metadata,
            Triggers,
            Permissions,
            Steps,
            Dependencies,
            TestCases,
        }

        let mut section = Section::None;

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("# Skill:") {
                spec.name = rest.trim().to_string();
                continue;
            }
            if let Some(heading) = line.strip_prefix("## ") {
                section = match heading.trim().to_lowercase().as_str() {
                    "metadata" => Section::Metadata,
                    "triggers" => Section::Triggers,
                    "permissions" => Section::Permissions,
                    "logic steps" | "steps" => Section::Steps,
                    "dependencies" => Section::Dependencies,
                    "test cases" | "tests" => Section::TestCases,
                    _ => Section::None,
                };
                continue;
            }

            match section {
                Section::Metadata => {
                    if let Some((key, value)) = split_key_value(line) {
                        match key.as_str() {
                            "version" => {
                                if SEMVER_RE.is_match(&value) {
                                    spec.version = value;
                                }
                            }
                            "description" => spec.description = value,
                            "author" => spec.author = value,
                            "category" => spec.category = GapCategory::parse(&value),
                            _ => {}
                        }
                    }
                }
                Section::Triggers => {
                    if let Some((key, value)) = split_key_value(line) {
                        match key.as_str() {
                            "pattern" => spec.triggers.patterns.push(value),
                            "intent" => spec.triggers.intents.push(value),
                            "command" => spec.triggers.commands.push(value),
                            "example" => spec.triggers.examples.push(value),
                            _ => {}
                        }
                    } else if let Some(item) = list_item(line) {
                        // Unprefixed trigger lines are treated as examples.
                        spec.triggers.examples.push(item);
                    }
                }
                Section::Permissions => {
                    if let Some(item) = list_item(line) {
                        spec.permissions.push(item);
                    }
                }
                Section::Steps => {
                    if let Some(caps) = STEP_RE.captures(line) {
                        let id = caps[1].to_string();
                        let mut description = caps[2].to_string();
                        let mut action = None;
                        let mut on_success = None;
                        let mut on_failure = None;
                        let tags: Vec<(String, String)> = TAG_RE
                            .captures_iter(&description)
                            .map(|t| (t[1].to_string(), t[2].trim().to_string()))
                            .collect();
                        for (key, value) in tags {
                            match key.as_str() {
                                "action" => action = Some(ActionKind::parse(&value)),
                                "on_success" => on_success = Some(value),
                                "on_failure" => on_failure = Some(value),
                                _ => {}
                            }
                        }
                        description = TAG_RE.replace_all(&description, "").trim().to_string();
                        let action = action.unwrap_or_else(|| ActionKind::infer(&description));
                        spec.steps.push(LogicStep {
                            id,
                            description,
                            action,
                            on_success,
                            on_failure,
                        });
                    }
                }
                Section::Dependencies => {
                    if let Some((key, value)) = split_key_value(line) {
                        match key.as_str() {
                            "skill" => spec.dependencies.skills.push(value),
                            "tool" => spec.dependencies.tools.push(value),
                            "api" => spec.dependencies.apis.push(value),
                            _ => {}
                        }
                    } else if let Some(item) = list_item(line) {
                        spec.dependencies.tools.push(item);
                    }
                }
                Section::TestCases => {
                    if let Some(item) = list_item(line) {
                        if let Some(rest) = item.strip_prefix("input:") {
                            if let Some((input, expected)) = rest.split_once("| expected:") {
                                spec.test_cases.push(TestCase {
                                    input: input.trim().to_string(),
                                    expected: expected.trim().to_string(),
                                });
                            }
                        }
                    }
                }
                Section::None => {}
            }
        }

        if spec.name.is_empty() {
            return Err(SpecParseError {
                reason: "document has no `# Skill:` name line".to_string(),
            });
        }
        if spec.description.is_empty() {
            spec.description = spec.name.clone();
        }

        Ok(spec)
    }

    /// 渲染为磁盘上的规格文档（与 parse_document 互逆）
    pub fn render(&self) -> String {
        let mut doc = String::new();
        doc.push_str(&format!("# Skill: {}\n\n", self.name));

        doc.push_str("## Metadata\n");
        doc.push_str(&format!("- version: {}\n", self.version));
        doc.push_str(&format!("- description: {}\n", self.description));
        doc.push_str(&format!("- author: {}\n", self.author));
        let category = serde_json::to_string(&self.category)
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();
        doc.push_str(&format!("- category: {}\n\n", category));

        doc.push_str("## Triggers\n");
        for p in &self.triggers.patterns {
            doc.push_str(&format!("- pattern: {}\n", p));
        }
        for i in &self.triggers.intents {
            doc.push_str(&format!("- intent: {}\n", i));
        }
        for c in &self.triggers.commands {
            doc.push_str(&format!("- command: {}\n", c));
        }
        for e in &self.triggers.examples {
            doc.push_str(&format!("- example: {}\n", e));
        }
        doc.push('\n');

        doc.push_str("## Permissions\n");
        for p in &self.permissions {
            doc.push_str(&format!("- {}\n", p));
        }
        doc.push('\n');

        doc.push_str("## Logic Steps\n");
        for step in &self.steps {
            let action = serde_json::to_string(&step.action)
                .unwrap_or_default()
                .trim_matches('"')
                .to_string();
            doc.push_str(&format!("{}. {} [action: {}]", step.id, step.description, action));
            if let Some(next) = &step.on_success {
                doc.push_str(&format!(" [on_success: {}]", next));
            }
            if let Some(next) = &step.on_failure {
                doc.push_str(&format!(" [on_failure: {}]", next));
            }
            doc.push('\n');
        }
        doc.push('\n');

        doc.push_str("## Dependencies\n");
        for s in &self.dependencies.skills {
            doc.push_str(&format!("- skill: {}\n", s));
        }
        for t in &self.dependencies.tools {
            doc.push_str(&format!("- tool: {}\n", t));
        }
        for a in &self.dependencies.apis {
            doc.push_str(&format!("- api: {}\n", a));
        }
        doc.push('\n');

        doc.push_str("## Test Cases\n");
        for case in &self.test_cases {
            doc.push_str(&format!("- input: {} | expected: {}\n", case.input, case.expected));
        }

        doc
    }
}

/// `- key: value` 形式的列表行
fn split_key_value(line: &str) -> Option<(String, String)> {
    let item = list_item(line)?;
    let (key, value) = item.split_once(':')?;
    let key = key.trim().to_lowercase();
    // Keys are single identifiers; anything else is a plain list item.
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((key, value.trim().to_string()))
}

fn list_item(line: &str) -> Option<String> {
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .map(|s| s.trim().to_string())
}
