//! 语言模型客户端抽象
//!
//! 真实后端与模拟后端实现同一个 trait，管道只依赖 `Arc<dyn LanguageModelClient>`。

use std::sync::Arc;

use thiserror::Error;

use super::live::LiveBackend;
use super::simulated::SimulatedBackend;
use super::style::{self, Style};
use crate::model::config::Config;

/// 后端调用失败（传输错误、上游错误、响应格式错误）
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("无法构建上游 HTTP Client: {0}")]
    Client(String),

    #[error("上游请求失败: {0}")]
    Transport(String),

    #[error("上游请求超时: {0}")]
    Timeout(String),

    #[error("上游返回错误 HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("上游响应格式错误: {0}")]
    Malformed(String),
}

/// 调用所处的管道阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 改写用户输入
    Refine,
    /// 生成最终回答
    Generate,
}

/// 随 prompt 一起传递的结构化上下文
///
/// 模拟后端据此选择模板，不需要从 prompt 文本反推意图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub stage: Stage,
    pub style: Style,
    /// 用户原始输入
    pub user_input: String,
}

impl CallContext {
    pub fn refine(user_input: impl Into<String>, style: Style) -> Self {
        Self {
            stage: Stage::Refine,
            style,
            user_input: user_input.into(),
        }
    }

    pub fn generate(user_input: impl Into<String>, style: Style) -> Self {
        Self {
            stage: Stage::Generate,
            style,
            user_input: user_input.into(),
        }
    }

    /// 没有显式上下文时，从 prompt 文本推断
    ///
    /// 优先级固定：
    /// 1. 含改写标记且能完整解析出输入与风格 → Refine
    /// 2. 以已知直答前缀开头 → Generate（前缀对应的风格，输入为首个空行之后的文本）
    /// 3. 按固定顺序扫描风格关键词 → Generate（整段 prompt 作为输入）
    /// 4. 以上都不满足 → Generate + balanced
    pub fn infer(prompt: &str) -> Self {
        if let Some((user_input, style)) = style::parse_refinement_prompt(prompt) {
            return Self::refine(user_input, style);
        }
        if let Some((style, user_input)) = style::parse_direct_prompt(prompt) {
            return Self::generate(user_input, style);
        }
        let style = Style::scan_keywords(prompt).unwrap_or_default();
        Self::generate(prompt, style)
    }
}

/// 语言模型客户端
#[async_trait::async_trait]
pub trait LanguageModelClient: Send + Sync {
    /// 提交 prompt，返回生成文本
    ///
    /// `context` 为 None 时，实现可以自行推断（见 [`CallContext::infer`]）
    async fn invoke(
        &self,
        prompt: &str,
        model: &str,
        context: Option<&CallContext>,
    ) -> Result<String, BackendError>;

    /// 后端名称（日志用）
    fn name(&self) -> &'static str;
}

/// 按配置构建后端：`mock_mode` 决定真实或模拟
pub fn build_backend(config: &Config) -> Arc<dyn LanguageModelClient> {
    if config.mock_mode {
        tracing::info!("使用模拟后端（不会访问上游服务）");
        Arc::new(SimulatedBackend::new())
    } else {
        tracing::info!(base_url = %config.api_base_url, "使用真实后端");
        Arc::new(LiveBackend::from_config(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::style::{render_direct_prompt, render_refinement_prompt};

    #[test]
    fn test_infer_refinement_prompt() {
        let prompt = render_refinement_prompt("explain \"quotes\"", Style::Casual);
        let ctx = CallContext::infer(&prompt);
        assert_eq!(ctx, CallContext::refine("explain \"quotes\"", Style::Casual));
    }

    #[test]
    fn test_infer_direct_prompt() {
        let prompt = render_direct_prompt("hi", Style::Professional);
        let ctx = CallContext::infer(&prompt);
        assert_eq!(ctx, CallContext::generate("hi", Style::Professional));
    }

    #[test]
    fn test_infer_keyword_fallback() {
        let ctx = CallContext::infer("Give a friendly overview of tides");
        assert_eq!(ctx.stage, Stage::Generate);
        assert_eq!(ctx.style, Style::Casual);
        assert_eq!(ctx.user_input, "Give a friendly overview of tides");
    }

    #[test]
    fn test_infer_defaults_to_balanced() {
        let ctx = CallContext::infer("what is a monad");
        assert_eq!(ctx, CallContext::generate("what is a monad", Style::Balanced));
    }

    #[test]
    fn test_direct_prefix_wins_over_keywords() {
        // 前缀是 concise，但正文含 formal 关键词
        let prompt = render_direct_prompt("write a formal letter", Style::Concise);
        assert_eq!(CallContext::infer(&prompt).style, Style::Concise);
    }

    #[test]
    fn test_build_backend_follows_mock_mode() {
        let mut config = Config::default();
        config.mock_mode = true;
        assert_eq!(build_backend(&config).name(), "simulated");

        config.mock_mode = false;
        config.openai_api_key = Some("sk-test".to_string());
        assert_eq!(build_backend(&config).name(), "live");
    }
}
