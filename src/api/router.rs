//! HTTP 路由配置

use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::{
    handlers::{analytics_stats, health, prompt, prompt_debug, root},
    middleware::{AppState, auth_middleware, cors_layer},
};

/// 创建 HTTP 路由
///
/// # 端点
/// - `GET /` - 服务信息
/// - `GET /health` - 健康检查（无需认证）
/// - `POST /prompt` - 处理 prompt（标准限流）
/// - `POST /prompt/debug` - 处理 prompt 并返回中间结果（调试限流）
/// - `GET /analytics/stats` - 交互统计（不限流）
///
/// # 认证
/// 除 `/` 与 `/health` 外均需 `Authorization: Bearer <key>`
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(
            "/prompt",
            post(prompt).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .route(
            "/prompt/debug",
            post(prompt_debug).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .route(
            "/analytics/stats",
            get(analytics_stats).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .layer(cors_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::ops::Deref;
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::gate::RequestGate;
    use crate::interaction::{InteractionLogger, InteractionStore};
    use crate::model::config::Config;
    use crate::relay::{PromptPipeline, simulated::SimulatedBackend};

    const KEY: &str = "test-secret";

    fn test_config() -> Config {
        let mut config = Config::default();
        config.api_secret_key = KEY.to_string();
        config.mock_mode = true;
        config
    }

    /// 测试用应用：结束时删除降级日志文件
    struct TestApp {
        router: Router,
        log_path: PathBuf,
    }

    impl Deref for TestApp {
        type Target = Router;

        fn deref(&self) -> &Router {
            &self.router
        }
    }

    impl Drop for TestApp {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.log_path);
        }
    }

    fn app_with(config: Config, store: Option<Arc<InteractionStore>>) -> TestApp {
        let log_path =
            std::env::temp_dir().join(format!("router-logs-{}.txt", uuid::Uuid::new_v4()));
        let pipeline = PromptPipeline::from_config(
            Arc::new(SimulatedBackend::without_latency()),
            &config,
        );
        let state = AppState::new(
            Arc::new(config.clone()),
            Arc::new(RequestGate::from_config(&config)),
            Arc::new(pipeline),
            InteractionLogger::new(store, log_path.clone()),
        );
        TestApp {
            router: create_router(state),
            log_path,
        }
    }

    fn app() -> TestApp {
        app_with(test_config(), None)
    }

    fn post_json(uri: &str, body: Value, key: Option<&str>, client: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", client);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = app().clone().oneshot(get_req("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["uptime_seconds"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let response = app().clone().oneshot(get_req("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["endpoints"]["debug"], "/prompt/debug");
        assert_eq!(body["mock_mode"], true);
        assert_eq!(body["model"], "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_prompt_requires_credential() {
        let app = app();
        let body = serde_json::json!({"text": "hi"});

        let response = app
            .clone()
            .oneshot(post_json("/prompt", body.clone(), None, "1.1.1.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
        let json = json_body(response).await;
        assert_eq!(json["error"]["type"], "authentication_error");

        let response = app
            .clone()
            .oneshot(post_json("/prompt", body, Some("wrong"), "1.1.1.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_prompt_two_stage() {
        let response = app()
            .clone()
            .oneshot(post_json(
                "/prompt",
                serde_json::json!({"text": "explain machine learning", "style": "educational"}),
                Some(KEY),
                "1.1.1.1",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(!body["response"].as_str().unwrap().is_empty());
        assert_eq!(body["model_used"], "gpt-4o-mini");
        assert!(body["processing_time_ms"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_debug_skip_refinement() {
        let response = app()
            .clone()
            .oneshot(post_json(
                "/prompt/debug",
                serde_json::json!({"text": "hi", "style": "concise", "skip_refinement": true}),
                Some(KEY),
                "1.1.1.1",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["raw_input"], "hi");
        assert_eq!(body["refined_prompt"], "hi");
        assert_eq!(body["refinement_time_ms"].as_f64().unwrap(), 0.0);
        assert!(body["generation_time_ms"].as_f64().unwrap() >= 0.0);
        assert!(
            body["processing_time_ms"].as_f64().unwrap()
                >= body["generation_time_ms"].as_f64().unwrap()
        );
    }

    #[tokio::test]
    async fn test_debug_two_stage_exposes_refinement() {
        let response = app()
            .clone()
            .oneshot(post_json(
                "/prompt/debug",
                serde_json::json!({"text": "explain machine learning"}),
                Some(KEY),
                "1.1.1.1",
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_ne!(body["refined_prompt"], "explain machine learning");
        assert!(!body["final_response"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_errors_are_422() {
        let app = app();
        for body in [
            serde_json::json!({"text": ""}),
            serde_json::json!({"text": "a".repeat(5001)}),
            serde_json::json!({"style": "concise"}),
        ] {
            let response = app
                .clone()
                .oneshot(post_json("/prompt", body, Some(KEY), "2.2.2.2"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let json = json_body(response).await;
            assert_eq!(json["error"]["type"], "invalid_request_error");
        }

        let malformed = Request::builder()
            .method("POST")
            .uri("/prompt")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", KEY))
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(malformed).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_eleventh_request_is_rate_limited() {
        let app = app();
        let body = serde_json::json!({"text": "hi", "skip_refinement": true});

        for _ in 0..10 {
            let response = app
                .clone()
                .oneshot(post_json("/prompt", body.clone(), Some(KEY), "3.3.3.3"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(post_json("/prompt", body.clone(), Some(KEY), "3.3.3.3"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));

        // 其他客户端不受影响
        let response = app
            .clone()
            .oneshot(post_json("/prompt", body, Some(KEY), "4.4.4.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_body_does_not_consume_quota() {
        let app = app();

        for _ in 0..15 {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/prompt",
                    serde_json::json!({"text": ""}),
                    Some(KEY),
                    "8.8.8.8",
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }

        let body = serde_json::json!({"text": "hi", "skip_refinement": true});
        for _ in 0..10 {
            let response = app
                .clone()
                .oneshot(post_json("/prompt", body.clone(), Some(KEY), "8.8.8.8"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_fallback_log_removed_with_app() {
        let app = app();
        let log_path = app.log_path.clone();
        let response = app
            .clone()
            .oneshot(post_json(
                "/prompt",
                serde_json::json!({"text": "hi", "skip_refinement": true}),
                Some(KEY),
                "9.9.9.9",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(log_path.exists());

        drop(app);
        assert!(!log_path.exists());
    }

    #[tokio::test]
    async fn test_debug_limit_is_stricter() {
        let app = app();
        let body = serde_json::json!({"text": "hi", "skip_refinement": true});

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(post_json("/prompt/debug", body.clone(), Some(KEY), "5.5.5.5"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app
            .clone()
            .oneshot(post_json("/prompt/debug", body, Some(KEY), "5.5.5.5"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_analytics_without_database() {
        let app = app();

        let response = app.clone().oneshot(get_req("/analytics/stats", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.clone().oneshot(get_req("/analytics/stats", Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["database_available"], false);
        assert_eq!(body["total_requests"], 0);
        assert_eq!(body["model_usage"][0]["model"], "gpt-4o-mini");
        assert_eq!(body["model_usage"][0]["count"], 0);
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_analytics_counts_persisted_interactions() {
        let store = Arc::new(InteractionStore::open_in_memory().unwrap());
        let app = app_with(test_config(), Some(store));
        let body = serde_json::json!({"text": "hi", "skip_refinement": true});

        for client in ["6.6.6.6", "6.6.6.6", "7.7.7.7"] {
            let response = app
                .clone()
                .oneshot(post_json("/prompt", body.clone(), Some(KEY), client))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(get_req("/analytics/stats", Some(KEY))).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["database_available"], true);
        assert_eq!(body["total_requests"], 3);
        assert_eq!(body["requests_24h"], 3);
        assert_eq!(body["unique_users"], 2);
        assert_eq!(body["model_usage"][0]["count"], 3);
    }

    #[tokio::test]
    async fn test_analytics_is_not_rate_limited() {
        let app = app();
        for _ in 0..20 {
            let response = app
                .clone()
                .oneshot(get_req("/analytics/stats", Some(KEY)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
