mod api;
mod common;
mod gate;
mod http_client;
mod interaction;
mod model;
mod relay;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{AppState, create_router};
use gate::RequestGate;
use interaction::InteractionLogger;
use model::arg::Args;
use model::config::{Config, DEFAULT_API_SECRET_KEY};
use relay::{PromptPipeline, build_backend};

/// 限流表清理周期
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在时忽略
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prompt_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    if args.mock {
        config.mock_mode = true;
    }
    config.validate().context("配置校验失败")?;

    if config.api_secret_key == DEFAULT_API_SECRET_KEY {
        tracing::warn!("正在使用默认 API 密钥，请在生产环境中配置 apiSecretKey");
    }

    let config = Arc::new(config);

    let backend = build_backend(&config);
    let pipeline = Arc::new(PromptPipeline::from_config(backend, &config));
    let gate = Arc::new(RequestGate::from_config(&config));
    let logger = InteractionLogger::open(
        config.database_path.as_deref(),
        config.fallback_log_path.clone(),
    );

    // 定期清理过期的限流条目
    {
        let gate = gate.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = gate.cleanup_expired();
                if removed > 0 {
                    tracing::debug!(removed, "已清理过期的限流条目");
                }
            }
        });
    }

    let state = AppState::new(config.clone(), gate, pipeline, logger);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(
        mock_mode = config.mock_mode,
        model = %config.default_model,
        rate_limit = config.rate_limit_per_minute,
        "启动 Prompt Relay: {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP 服务异常退出")?;

    Ok(())
}
