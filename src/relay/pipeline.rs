//! Prompt 处理管道
//!
//! 两阶段：改写 → 生成；直答：风格前缀 + 原始输入 → 生成。
//! 两次后端调用严格串行，任一阶段失败整体失败，不返回部分结果。

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use super::client::{BackendError, CallContext, LanguageModelClient};
use super::style::{self, Style};
use crate::model::config::Config;

/// 输入文本最大字符数
pub const MAX_TEXT_CHARS: usize = 5000;

/// 请求参数不合法
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// 一次用户请求（构造后不可变）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    text: String,
    style: Style,
    skip_refinement: bool,
}

impl PromptRequest {
    /// 校验并构造请求
    ///
    /// `text` 必须为 1..=5000 个字符；`style` 缺省或未知时为 balanced
    pub fn new(
        text: impl Into<String>,
        style: Option<&str>,
        skip_refinement: bool,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        let chars = text.chars().count();
        if chars == 0 {
            return Err(ValidationError("text must contain at least 1 character".into()));
        }
        if chars > MAX_TEXT_CHARS {
            return Err(ValidationError(format!(
                "text must contain at most {} characters (got {})",
                MAX_TEXT_CHARS, chars
            )));
        }

        Ok(Self {
            text,
            style: style.map(Style::normalize).unwrap_or_default(),
            skip_refinement,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn skip_refinement(&self) -> bool {
        self.skip_refinement
    }
}

/// 管道处理结果（时间单位：毫秒）
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub refined_prompt: String,
    pub final_answer: String,
    pub model_used: String,
    pub total_time_ms: f64,
    pub refinement_time_ms: f64,
    pub generation_time_ms: f64,
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Prompt 处理管道
pub struct PromptPipeline {
    client: Arc<dyn LanguageModelClient>,
    default_model: String,
    refinement_model: String,
}

impl PromptPipeline {
    pub fn new(
        client: Arc<dyn LanguageModelClient>,
        default_model: impl Into<String>,
        refinement_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            default_model: default_model.into(),
            refinement_model: refinement_model.into(),
        }
    }

    pub fn from_config(client: Arc<dyn LanguageModelClient>, config: &Config) -> Self {
        Self::new(
            client,
            config.default_model.clone(),
            config.refinement_model.clone(),
        )
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// 处理一次请求
    pub async fn process(&self, request: &PromptRequest) -> Result<PipelineResult, BackendError> {
        let total_start = Instant::now();

        let (refined_prompt, final_answer, refinement_time_ms, generation_time_ms) =
            if request.skip_refinement() {
                let (answer, generation_ms) = self.generate_direct(request).await?;
                (request.text().to_string(), answer, 0.0, generation_ms)
            } else {
                let (refined, refinement_ms) = self.refine(request).await?;
                let (answer, generation_ms) = self.generate_final(request, &refined).await?;
                (refined, answer, refinement_ms, generation_ms)
            };

        let total_time_ms = elapsed_ms(total_start);

        tracing::info!(
            backend = self.client.name(),
            style = %request.style(),
            tone = request.style().describe(),
            skip_refinement = request.skip_refinement(),
            total_ms = total_time_ms,
            refinement_ms = refinement_time_ms,
            generation_ms = generation_time_ms,
            "管道处理完成"
        );

        Ok(PipelineResult {
            refined_prompt,
            final_answer,
            model_used: self.default_model.clone(),
            total_time_ms,
            refinement_time_ms,
            generation_time_ms,
        })
    }

    /// 改写阶段
    async fn refine(&self, request: &PromptRequest) -> Result<(String, f64), BackendError> {
        let start = Instant::now();
        let prompt = style::render_refinement_prompt(request.text(), request.style());
        let ctx = CallContext::refine(request.text(), request.style());

        let refined = self
            .client
            .invoke(&prompt, &self.refinement_model, Some(&ctx))
            .await?;
        let ms = elapsed_ms(start);
        tracing::debug!(model = %self.refinement_model, elapsed_ms = ms, "改写阶段完成");
        Ok((refined, ms))
    }

    /// 生成阶段（以改写结果作为 prompt，不附加额外指引）
    async fn generate_final(
        &self,
        request: &PromptRequest,
        refined_prompt: &str,
    ) -> Result<(String, f64), BackendError> {
        let start = Instant::now();
        let ctx = CallContext::generate(request.text(), request.style());

        let answer = self
            .client
            .invoke(refined_prompt, &self.default_model, Some(&ctx))
            .await?;
        let ms = elapsed_ms(start);
        tracing::debug!(model = %self.default_model, elapsed_ms = ms, "生成阶段完成");
        Ok((answer, ms))
    }

    /// 直答（跳过改写）
    async fn generate_direct(&self, request: &PromptRequest) -> Result<(String, f64), BackendError> {
        let start = Instant::now();
        let prompt = style::render_direct_prompt(request.text(), request.style());
        let ctx = CallContext::generate(request.text(), request.style());

        let answer = self
            .client
            .invoke(&prompt, &self.default_model, Some(&ctx))
            .await?;
        let ms = elapsed_ms(start);
        tracing::debug!(model = %self.default_model, elapsed_ms = ms, "直答完成");
        Ok((answer, ms))
    }
}
