//! HTTP 处理器

use axum::{
    Extension,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Json, Response},
};

use super::error::ApiError;
use super::middleware::{AppState, ClientIdentity};
use super::types::{
    DebugPromptResponse, EndpointIndex, HealthResponse, PromptBody, PromptResponse,
    RootResponse, StatsResponse,
};
use crate::gate::GateTier;
use crate::interaction::InteractionRecord;
use crate::relay::{PipelineResult, PromptRequest};

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "API is running",
        uptime_seconds: state.uptime_seconds(),
    })
}

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Prompt Relay API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: EndpointIndex {
            health: "/health",
            prompt: "/prompt",
            debug: "/prompt/debug",
            analytics: "/analytics/stats",
        },
        authentication: "Bearer token required",
        model: state.config.default_model.clone(),
        mock_mode: state.config.mock_mode,
        uptime_seconds: state.uptime_seconds(),
    })
}

/// POST /prompt
pub async fn prompt(
    State(state): State<AppState>,
    Extension(client): Extension<ClientIdentity>,
    payload: Result<Json<PromptBody>, JsonRejection>,
) -> Result<Json<PromptResponse>, ApiError> {
    let result = run_pipeline(&state, &client, GateTier::Standard, payload).await?;
    Ok(Json(PromptResponse {
        response: result.final_answer,
        processing_time_ms: result.total_time_ms,
        model_used: result.model_used,
    }))
}

/// POST /prompt/debug
pub async fn prompt_debug(
    State(state): State<AppState>,
    Extension(client): Extension<ClientIdentity>,
    payload: Result<Json<PromptBody>, JsonRejection>,
) -> Result<Json<DebugPromptResponse>, ApiError> {
    let raw_input = match &payload {
        Ok(Json(body)) => body.text.clone(),
        Err(_) => String::new(),
    };
    let result = run_pipeline(&state, &client, GateTier::Debug, payload).await?;
    Ok(Json(DebugPromptResponse {
        raw_input,
        refined_prompt: result.refined_prompt,
        final_response: result.final_answer,
        model_used: result.model_used,
        processing_time_ms: result.total_time_ms,
        refinement_time_ms: result.refinement_time_ms,
        generation_time_ms: result.generation_time_ms,
    }))
}

/// 校验 → 限流 → 管道 → 记录（成功与失败都记录一次）
///
/// 请求体不合法时不消耗限流配额
async fn run_pipeline(
    state: &AppState,
    client: &ClientIdentity,
    tier: GateTier,
    payload: Result<Json<PromptBody>, JsonRejection>,
) -> Result<PipelineResult, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let request = PromptRequest::new(body.text, body.style.as_deref(), body.skip_refinement)?;
    state.gate.consume(&client.0, tier)?;

    match state.pipeline.process(&request).await {
        Ok(result) => {
            let record = InteractionRecord::new(
                request.text(),
                result.refined_prompt.clone(),
                result.final_answer.clone(),
            )
            .with_client_identity(client.0.clone())
            .with_model(result.model_used.clone());
            state.logger.record(record).await;
            Ok(result)
        }
        Err(e) => {
            tracing::error!(client = %client.0, error = %e, "Prompt 处理失败");
            let record = InteractionRecord::new(request.text(), "", format!("[failed] {}", e))
                .with_client_identity(client.0.clone())
                .with_model(state.pipeline.default_model());
            state.logger.record(record).await;
            Err(ApiError::Processing)
        }
    }
}

/// GET /analytics/stats
pub async fn analytics_stats(State(state): State<AppState>) -> Response {
    let default_model = state.pipeline.default_model();
    let mock_mode = state.config.mock_mode;

    let stats = match state.logger.stats(default_model).await {
        None => StatsResponse::unavailable(default_model, mock_mode, state.uptime_seconds()),
        Some(Ok(stats)) => StatsResponse {
            total_requests: stats.total_requests,
            requests_24h: stats.requests_24h,
            unique_users: stats.unique_users,
            model_usage: stats.model_usage,
            mock_mode,
            uptime_seconds: state.uptime_seconds(),
            database_available: true,
            error: None,
        },
        Some(Err(e)) => {
            tracing::error!("获取交互统计失败: {}", e);
            let mut stats =
                StatsResponse::unavailable(default_model, mock_mode, state.uptime_seconds());
            stats.database_available = true;
            stats.error = Some(format!("Database query failed: {}", e));
            stats
        }
    };

    Json(stats).into_response()
}
