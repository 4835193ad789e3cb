//! 公共工具模块

pub mod auth;

/// 按字符数截断（用于回显用户输入，避免中文等多字节文本被截得过短）
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
