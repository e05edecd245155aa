//! Text preparation for speech synthesis.

use crate::models::{NodeView, ResolvedResponse};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[\s\S]*?```").unwrap_or_else(|_| unreachable!()));
static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap_or_else(|_| unreachable!()));
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap_or_else(|_| unreachable!()));
static ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap_or_else(|_| unreachable!()));
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+").unwrap_or_else(|_| unreachable!()));
static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[*+-]\s+").unwrap_or_else(|_| unreachable!()));
static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").unwrap_or_else(|_| unreachable!()));
static NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n+").unwrap_or_else(|_| unreachable!()));

/// Property keys left out of spoken summaries.
const HIDDEN_KEYS: [&str; 3] = ["name", "id", "embedding"];

/// Strips markdown and HTML so the synthesizer reads only prose.
///
/// Line breaks become `。` so the voice pauses between lines.
///
/// # Example
///
/// ```rust
/// use heritage_kg::services::voice::clean_text_for_tts;
///
/// assert_eq!(clean_text_for_tts("## 青铜器\n**防腐蚀**为主"), "青铜器。防腐蚀为主");
/// ```
#[must_use]
pub fn clean_text_for_tts(text: &str) -> String {
    let text = CODE_BLOCK.replace_all(text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    let text = NEWLINES.replace_all(&text, "。");
    text.trim().to_string()
}

/// Renders matched nodes as a bulleted knowledge summary.
///
/// Each line is `- name | key: value; key: value`, skipping identity keys.
#[must_use]
pub fn format_knowledge_context(nodes: &[NodeView]) -> String {
    let mut context = String::from("【相关信息】:\n");
    for node in nodes {
        context.push_str("- ");
        context.push_str(&node.name);

        let props: Vec<String> = node
            .properties
            .iter()
            .filter(|(key, _)| !HIDDEN_KEYS.contains(&key.to_lowercase().as_str()))
            .map(|(key, value)| format!("{key}: {value}"))
            .collect();
        if !props.is_empty() {
            let _ = write!(context, " | {}", props.join("; "));
        }
        context.push('\n');
    }
    context
}

/// Builds a spoken answer from a resolver response.
///
/// Returns `None` when nothing matched.
#[must_use]
pub fn knowledge_answer(response: &ResolvedResponse) -> Option<String> {
    if response.is_empty() {
        return None;
    }
    Some(format!(
        "关于“{}”，知识图谱中找到以下信息。\n{}",
        response.search_info.original_query,
        format_knowledge_context(&response.nodes)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, EntityId, MatchType, PropertyValue};
    use test_case::test_case;

    #[test_case("```rust\nfn main() {}\n```青铜器", "青铜器" ; "code block")]
    #[test_case("使用`B72`加固", "使用B72加固" ; "inline code")]
    #[test_case("**最小干预**和*可逆性*", "最小干预和可逆性" ; "emphasis")]
    #[test_case("# 标题\n正文", "标题。正文" ; "heading")]
    #[test_case("- 控制湿度\n- 避光", "控制湿度。避光" ; "bullets")]
    #[test_case("<p>陶瓷</p>", "陶瓷" ; "html")]
    #[test_case("  第一行\n\n\n第二行\n", "第一行。第二行。" ; "newline runs")]
    fn test_clean_text_for_tts(input: &str, expected: &str) {
        assert_eq!(clean_text_for_tts(input), expected);
    }

    fn node(name: &str, extra: &[(&str, PropertyValue)]) -> NodeView {
        let mut entity = Entity::new(EntityId::from(1), vec!["Artifact".to_string()])
            .with_property("name", name)
            .with_property("ID", "A-1");
        for (key, value) in extra {
            entity = entity.with_property(*key, value.clone());
        }
        NodeView::from_entity(&entity, 1.0, MatchType::Exact)
    }

    #[test]
    fn test_format_knowledge_context_hides_identity_keys() {
        let context = format_knowledge_context(&[
            node("鎏金铜佛像", &[("朝代", PropertyValue::from("唐"))]),
            node("青花瓷瓶", &[]),
        ]);
        assert_eq!(context, "【相关信息】:\n- 鎏金铜佛像 | 朝代: 唐\n- 青花瓷瓶\n");
    }

    #[test]
    fn test_knowledge_answer_empty_response() {
        assert!(knowledge_answer(&ResolvedResponse::empty("无")).is_none());
    }
}
