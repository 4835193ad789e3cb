//! 共享状态与认证中间件

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::ApiError;
use crate::common::auth;
use crate::gate::RequestGate;
use crate::interaction::InteractionLogger;
use crate::model::config::Config;
use crate::relay::PromptPipeline;

/// 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gate: Arc<RequestGate>,
    pub pipeline: Arc<PromptPipeline>,
    pub logger: InteractionLogger,
    /// 进程启动时间（用于 uptime）
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        gate: Arc<RequestGate>,
        pipeline: Arc<PromptPipeline>,
        logger: InteractionLogger,
    ) -> Self {
        Self {
            config,
            gate,
            pipeline,
            logger,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// 认证通过后写入请求扩展的客户端标识
#[derive(Debug, Clone)]
pub struct ClientIdentity(pub String);

/// 认证中间件
///
/// 只校验凭据，限流配额由处理器在请求体校验通过后消耗
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let credential = auth::extract_api_key(&request);
    if let Err(rejection) = state.gate.authenticate(credential.as_deref()) {
        return ApiError::from(rejection).into_response();
    }

    let client = auth::extract_client_identity(&request);
    request.extensions_mut().insert(ClientIdentity(client));
    next.run(request).await
}

/// CORS 中间件层（允许所有来源，供浏览器前端直接调用）
pub fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{Any, CorsLayer};

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
