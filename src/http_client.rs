//! HTTP Client 构建模块
//!
//! 客户端完全由显式配置决定：未配置代理时调用 `no_proxy()`，
//! 不继承环境变量或系统代理设置

use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::model::config::{Config, TlsBackend};

/// 出站代理配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// 代理 URL，支持 http://、https://、socks5://
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// 从应用配置中读取代理（未配置或为空时返回 None）
    pub fn from_config(config: &Config) -> Option<Self> {
        let url = config.proxy_url.as_deref().map(str::trim)?;
        if url.is_empty() {
            return None;
        }
        let proxy = Self::new(url);
        match (&config.proxy_username, &config.proxy_password) {
            (Some(u), Some(p)) => Some(proxy.with_auth(u, p)),
            _ => Some(proxy),
        }
    }
}

/// 构建 HTTP Client
///
/// # Arguments
/// * `proxy` - 可选代理；为 None 时显式禁用所有代理
/// * `timeout_secs` - 单次请求总超时（秒）
/// * `tls_backend` - TLS 实现
pub fn build_client(
    proxy: Option<&ProxyConfig>,
    timeout_secs: u64,
    tls_backend: TlsBackend,
) -> anyhow::Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)));

    builder = match tls_backend {
        TlsBackend::Rustls => builder.use_rustls_tls(),
        #[cfg(feature = "native-tls")]
        TlsBackend::NativeTls => builder.use_native_tls(),
        #[cfg(not(feature = "native-tls"))]
        TlsBackend::NativeTls => {
            anyhow::bail!("tlsBackend=native-tls 需要启用 native-tls feature 编译")
        }
    };

    match proxy {
        Some(cfg) => {
            let mut p = Proxy::all(&cfg.url)?;
            if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
                p = p.basic_auth(username, password);
            }
            builder = builder.proxy(p);
            tracing::debug!("HTTP Client 使用代理: {}", cfg.url);
        }
        None => {
            builder = builder.no_proxy();
        }
    }

    Ok(builder.build()?)
}
