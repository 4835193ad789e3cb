//! 请求准入：凭据校验 + 按客户端限流
//!
//! 凭据在中间件中校验；配额在请求体校验通过后、进入处理管道之前消耗。
//! 任一环节拒绝时管道完全不会运行

pub mod rate_limit;

use crate::common::auth;
use crate::model::config::Config;

pub use rate_limit::{FixedWindowLimiter, RateLimited};

/// 入口等级（决定使用哪一个限流器）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTier {
    /// 普通端点
    Standard,
    /// 调试端点（更严格的限额）
    Debug,
}

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    Unauthorized,
    RateLimited { retry_after_secs: u64 },
}

/// 请求准入控制
pub struct RequestGate {
    api_key: String,
    standard: FixedWindowLimiter,
    debug: FixedWindowLimiter,
}

impl RequestGate {
    pub fn new(
        api_key: impl Into<String>,
        standard: FixedWindowLimiter,
        debug: FixedWindowLimiter,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            standard,
            debug,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_secret_key.clone(),
            FixedWindowLimiter::per_minute(config.rate_limit_per_minute),
            FixedWindowLimiter::per_minute(config.effective_debug_rate_limit()),
        )
    }

    /// 校验凭据
    pub fn authenticate(&self, credential: Option<&str>) -> Result<(), GateRejection> {
        match credential {
            Some(key) if auth::constant_time_eq(key, &self.api_key) => Ok(()),
            _ => Err(GateRejection::Unauthorized),
        }
    }

    /// 消耗一次限流配额（凭据已通过校验、请求体已通过校验之后调用）
    pub fn consume(&self, client_identity: &str, tier: GateTier) -> Result<(), GateRejection> {
        let limiter = match tier {
            GateTier::Standard => &self.standard,
            GateTier::Debug => &self.debug,
        };

        limiter.check(client_identity).map_err(|e| {
            tracing::warn!(
                client = %client_identity,
                tier = ?tier,
                limit = limiter.max_requests(),
                "请求被限流"
            );
            GateRejection::RateLimited {
                retry_after_secs: e.retry_after_secs,
            }
        })
    }

    /// 清理所有限流器中已过期的条目
    pub fn cleanup_expired(&self) -> usize {
        self.standard.cleanup_expired() + self.debug.cleanup_expired()
    }
}
