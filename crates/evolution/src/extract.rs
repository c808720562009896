//! 从 LLM 补全文本中提取围栏代码块 / JSON 的辅助函数。
//!
//! Completion output is unreliable: fenced blocks may carry a language tag,
//! no tag, or surrounding prose. Extraction scans delimiters instead of
//! trusting the response shape.

/// Extract the first fenced block tagged with any of `tags`, falling back to
/// the first generic ``` block. Returns the trimmed block content.
pub fn extract_fenced_block(response: &str, tags: &[&str]) -> Option<String> {
    for tag in tags {
        let marker = format!("```{}", tag);
        if let Some(start) = response.find(&marker) {
            let after = start + marker.len();
            if let Some(end) = response[after..].find("```") {
                return Some(response[after..after + end].trim().to_string());
            }
        }
    }

    // Generic ``` block — skip the optional language tag on the opening line.
    if let Some(start) = response.find("```") {
        let after = start + 3;
        let content_start = response[after..]
            .find('\n')
            .map(|i| after + i + 1)
            .unwrap_or(after);
        if let Some(end) = response[content_start..].find("```") {
            return Some(response[content_start..content_start + end].trim().to_string());
        }
    }

    None
}

/// Extract a JSON object from a completion: fenced ```json block first, then
/// a generic fence, then the raw text, then the outermost brace span.
pub fn extract_fenced_json(response: &str) -> Option<serde_json::Value> {
    if let Some(block) = extract_fenced_block(response, &["json"]) {
        if let Ok(value) = serde_json::from_str(&block) {
            return Some(value);
        }
    }

    if let Ok(value) = serde_json::from_str(response.trim()) {
        return Some(value);
    }

    // Last resort: take the outermost { ... } span.
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end > start {
        if let Ok(value) = serde_json::from_str(&response[start..=end]) {
            return Some(value);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tagged_block() {
        let response = "Here you go:\n```javascript\nconst x = 1;\n```\nDone.";
        let block = extract_fenced_block(response, &["javascript", "js"]).unwrap();
        assert_eq!(block, "const x = 1;");
    }

    #[test]
    fn test_extract_generic_block_skips_language_tag() {
        let response = "```rust\nfn main() {}\n```";
        let block = extract_fenced_block(response, &["javascript"]).unwrap();
        assert_eq!(block, "fn main() {}");
    }

    #[test]
    fn test_extract_missing_block() {
        assert!(extract_fenced_block("no fences here", &["js"]).is_none());
    }

    #[test]
    fn test_extract_json_from_fence() {
        let response = "Verdict:\n```json\n{\"passed\": true}\n```";
        let value = extract_fenced_json(response).unwrap();
        assert_eq!(value["passed"], true);
    }

    #[test]
    fn test_extract_json_from_prose() {
        let response = "The answer is {\"required\": false, \"reason\": \"covered\"} as discussed.";
        let value = extract_fenced_json(response).unwrap();
        assert_eq!(value["required"], false);
    }

    #[test]
    fn test_extract_json_none_for_garbage() {
        assert!(extract_fenced_json("not json at all").is_none());
    }
}
