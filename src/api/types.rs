//! HTTP 请求/响应类型

use serde::{Deserialize, Serialize};

use crate::interaction::ModelUsage;

// === 错误响应 ===

/// 错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// 错误详情
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                error_type: error_type.into(),
                message: message.into(),
            },
        }
    }
}

// === Prompt 端点 ===

/// POST /prompt 与 /prompt/debug 的请求体
#[derive(Debug, Deserialize)]
pub struct PromptBody {
    pub text: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub skip_refinement: bool,
}

/// POST /prompt 响应
#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub response: String,
    pub processing_time_ms: f64,
    pub model_used: String,
}

/// POST /prompt/debug 响应
#[derive(Debug, Serialize)]
pub struct DebugPromptResponse {
    pub raw_input: String,
    pub refined_prompt: String,
    pub final_response: String,
    pub model_used: String,
    pub processing_time_ms: f64,
    pub refinement_time_ms: f64,
    pub generation_time_ms: f64,
}

// === 状态端点 ===

/// GET /health 响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub uptime_seconds: f64,
}

/// GET /analytics/stats 响应
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_requests: u64,
    pub requests_24h: u64,
    pub unique_users: u64,
    pub model_usage: Vec<ModelUsage>,
    pub mock_mode: bool,
    pub uptime_seconds: f64,
    pub database_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatsResponse {
    /// 数据库不可用（或查询失败）时的精简统计
    pub fn unavailable(default_model: &str, mock_mode: bool, uptime_seconds: f64) -> Self {
        Self {
            total_requests: 0,
            requests_24h: 0,
            unique_users: 0,
            model_usage: vec![ModelUsage {
                model: default_model.to_string(),
                count: 0,
            }],
            mock_mode,
            uptime_seconds,
            database_available: false,
            error: None,
        }
    }
}

/// GET / 中列出的端点
#[derive(Debug, Serialize)]
pub struct EndpointIndex {
    pub health: &'static str,
    pub prompt: &'static str,
    pub debug: &'static str,
    pub analytics: &'static str,
}

/// GET / 响应
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: EndpointIndex,
    pub authentication: &'static str,
    pub model: String,
    pub mock_mode: bool,
    pub uptime_seconds: f64,
}
