//! 回答风格目录
//!
//! 每种风格同时派生两套指令：改写阶段的指引，以及直答阶段的前缀。
//! 风格键区分大小写，未知风格一律按 `balanced` 处理。

use std::fmt;

use serde::Serialize;

/// 回答风格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Concise,
    Detailed,
    Casual,
    Professional,
    Educational,
    #[default]
    Balanced,
}

/// 改写模板中的识别标记
pub const REFINEMENT_MARKER: &str = "Rewrite the user's vague or informal input";

const INPUT_OPEN: &str = "User Input:\n\"";
const STYLE_OPEN: &str = "\"\n\nResponse Style Requested: ";
const REWRITE_TAIL: &str = "\n\nRewritten Prompt:\n";

impl Style {
    pub const ALL: [Style; 6] = [
        Style::Concise,
        Style::Detailed,
        Style::Casual,
        Style::Professional,
        Style::Educational,
        Style::Balanced,
    ];

    /// 风格键名
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Concise => "concise",
            Style::Detailed => "detailed",
            Style::Casual => "casual",
            Style::Professional => "professional",
            Style::Educational => "educational",
            Style::Balanced => "balanced",
        }
    }

    /// 精确匹配键名，不做归一化
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == key)
    }

    /// 归一化任意输入：只接受精确的键名，其余（包括大小写不同的写法）回退到 balanced
    pub fn normalize(raw: &str) -> Self {
        Self::from_key(raw).unwrap_or_default()
    }

    /// 简短描述
    pub fn describe(&self) -> &'static str {
        match self {
            Style::Concise => "brief and to-the-point",
            Style::Detailed => "comprehensive and thorough",
            Style::Casual => "friendly and conversational",
            Style::Professional => "formal and business-like",
            Style::Educational => "informative with examples",
            Style::Balanced => "well-rounded",
        }
    }

    /// 改写阶段的风格指引
    pub fn refinement_guidance(&self) -> &'static str {
        match self {
            Style::Concise => "Request brief, direct answers with key points only",
            Style::Detailed => "Request comprehensive, thorough explanations with examples",
            Style::Casual => "Request friendly, conversational tone with relatable language",
            Style::Professional => "Request formal, business-appropriate language and structure",
            Style::Educational => {
                "Request informative responses with examples, analogies, and learning aids"
            }
            Style::Balanced => {
                "Request well-rounded responses that are neither too brief nor too verbose"
            }
        }
    }

    /// 直答阶段的风格前缀
    pub fn direct_guidance(&self) -> &'static str {
        match self {
            Style::Concise => "Provide a brief, direct answer.",
            Style::Detailed => "Provide a comprehensive, detailed answer with examples.",
            Style::Casual => "Answer in a friendly, conversational tone.",
            Style::Professional => "Provide a formal, business-appropriate answer.",
            Style::Educational => "Provide an informative answer with examples and explanations.",
            Style::Balanced => "Provide a well-rounded, balanced answer.",
        }
    }

    /// 改写后 prompt 的开头句式（模拟后端使用）
    pub fn rewrite_instruction(&self) -> &'static str {
        match self {
            Style::Concise => "Provide a brief, direct explanation",
            Style::Detailed => {
                "Provide a comprehensive, detailed explanation with examples and context"
            }
            Style::Casual => {
                "Explain in a friendly, conversational way that's easy to understand"
            }
            Style::Professional => {
                "Provide a formal, structured explanation suitable for business contexts"
            }
            Style::Educational => {
                "Explain with clear examples, analogies, and step-by-step breakdowns for learning"
            }
            Style::Balanced => {
                "Provide a well-rounded explanation that balances detail with clarity"
            }
        }
    }

    /// 按固定顺序扫描关键词，推断 prompt 的风格
    pub fn scan_keywords(prompt: &str) -> Option<Self> {
        const KEYWORDS: [(Style, &[&str]); 5] = [
            (Style::Concise, &["concise"]),
            (Style::Detailed, &["detailed", "comprehensive"]),
            (Style::Casual, &["casual", "friendly"]),
            (Style::Professional, &["professional", "formal"]),
            (Style::Educational, &["educational", "learning"]),
        ];

        let lower = prompt.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(style, _)| *style)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 渲染改写阶段的完整 prompt
pub fn render_refinement_prompt(user_input: &str, style: Style) -> String {
    let guidelines = Style::ALL
        .iter()
        .map(|s| format!("- {}: {}", s.as_str(), s.refinement_guidance()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a technical assistant. {REFINEMENT_MARKER} into a precise, well-structured, \
         and technically appropriate prompt for GPT to process.\n\n\
         Consider the requested response style: {style}\n\n\
         Style Guidelines:\n{guidelines}\n\n\
         {INPUT_OPEN}{user_input}{STYLE_OPEN}{style}{REWRITE_TAIL}"
    )
}

/// 渲染直答阶段的 prompt：风格前缀 + 空行 + 原始输入
pub fn render_direct_prompt(user_input: &str, style: Style) -> String {
    format!("{}\n\n{}", style.direct_guidance(), user_input)
}

/// 把改写模板渲染出的 prompt 还原为 (原始输入, 风格)
///
/// 输入从第一个 `User Input:\n"` 之后开始，到最后一个
/// `"\n\nResponse Style Requested: ` 为止，因此原始输入里出现引号或换行也能完整还原。
pub fn parse_refinement_prompt(prompt: &str) -> Option<(String, Style)> {
    let marker_at = prompt.find(REFINEMENT_MARKER)?;
    let body = &prompt[marker_at..];

    let input_start = body.find(INPUT_OPEN)? + INPUT_OPEN.len();
    let style_open = body.rfind(STYLE_OPEN)?;
    if style_open < input_start {
        return None;
    }

    let user_input = &body[input_start..style_open];
    let style_raw = body[style_open + STYLE_OPEN.len()..]
        .split('\n')
        .next()
        .unwrap_or_default();

    Some((user_input.to_string(), Style::normalize(style_raw)))
}

/// 识别直答前缀，返回 (风格, 前缀之后的用户输入)
pub fn parse_direct_prompt(prompt: &str) -> Option<(Style, String)> {
    let style = Style::ALL
        .into_iter()
        .find(|s| prompt.starts_with(s.direct_guidance()))?;
    let user_input = match prompt.split_once("\n\n") {
        Some((_, rest)) => rest,
        None => prompt,
    };
    Some((style, user_input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_known_and_unknown() {
        assert_eq!(Style::normalize("concise"), Style::Concise);
        assert_eq!(Style::normalize("professional"), Style::Professional);
        assert_eq!(Style::normalize("pirate"), Style::Balanced);
        assert_eq!(Style::normalize(""), Style::Balanced);
    }

    #[test]
    fn test_normalize_is_exact_match() {
        // 大小写或空白不同都视为未知风格
        assert_eq!(Style::normalize("Casual"), Style::Balanced);
        assert_eq!(Style::normalize(" CONCISE "), Style::Balanced);
        assert_eq!(Style::normalize("  detailed"), Style::Balanced);
        assert_eq!(Style::normalize("PROFESSIONAL"), Style::Balanced);
    }

    #[test]
    fn test_unknown_style_uses_balanced_instructions() {
        let unknown = Style::normalize("shakespearean");
        assert_eq!(unknown.direct_guidance(), Style::Balanced.direct_guidance());
        assert_eq!(unknown.refinement_guidance(), Style::Balanced.refinement_guidance());
    }

    #[test]
    fn test_every_style_has_distinct_description() {
        let mut descriptions: Vec<_> = Style::ALL.iter().map(|s| s.describe()).collect();
        descriptions.sort();
        descriptions.dedup();
        assert_eq!(descriptions.len(), Style::ALL.len());
        assert_eq!(Style::normalize("Casual").describe(), "well-rounded");
    }

    #[test]
    fn test_every_style_has_distinct_direct_prefix() {
        let mut prefixes: Vec<_> = Style::ALL.iter().map(|s| s.direct_guidance()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), Style::ALL.len());
    }

    #[test]
    fn test_refinement_prompt_contains_payload() {
        let prompt = render_refinement_prompt("explain rust lifetimes", Style::Educational);
        assert!(prompt.contains(REFINEMENT_MARKER));
        assert!(prompt.contains("User Input:\n\"explain rust lifetimes\""));
        assert!(prompt.contains("Response Style Requested: educational"));
        assert!(prompt.ends_with("Rewritten Prompt:\n"));
        // 指引列出了全部风格
        for style in Style::ALL {
            assert!(prompt.contains(style.refinement_guidance()));
        }
    }

    #[test]
    fn test_refinement_prompt_decomposes_losslessly() {
        let inputs = [
            "hi",
            "explain machine learning",
            "she said \"hello\"\n\nthen left",
            "tricky \"\n\nResponse Style Requested: concise inside input",
            "多字节 输入 🚀",
        ];
        for input in inputs {
            for style in Style::ALL {
                let prompt = render_refinement_prompt(input, style);
                let (parsed_input, parsed_style) =
                    parse_refinement_prompt(&prompt).expect("模板渲染的 prompt 应该能解析");
                assert_eq!(parsed_input, input);
                assert_eq!(parsed_style, style);
            }
        }
    }

    #[test]
    fn test_parse_refinement_rejects_plain_text() {
        assert!(parse_refinement_prompt("just a question").is_none());
        assert!(parse_refinement_prompt(REFINEMENT_MARKER).is_none());
    }

    #[test]
    fn test_direct_prompt_roundtrip() {
        let prompt = render_direct_prompt("hi", Style::Concise);
        assert_eq!(prompt, "Provide a brief, direct answer.\n\nhi");
        let (style, input) = parse_direct_prompt(&prompt).unwrap();
        assert_eq!(style, Style::Concise);
        assert_eq!(input, "hi");

        assert!(parse_direct_prompt("hi").is_none());
    }

    #[test]
    fn test_keyword_scan_order() {
        assert_eq!(Style::scan_keywords("Be CONCISE please"), Some(Style::Concise));
        assert_eq!(
            Style::scan_keywords("a comprehensive and formal report"),
            Some(Style::Detailed)
        );
        assert_eq!(Style::scan_keywords("keep it formal"), Some(Style::Professional));
        assert_eq!(Style::scan_keywords("for learning"), Some(Style::Educational));
        assert_eq!(Style::scan_keywords("nothing here"), None);
    }
}
