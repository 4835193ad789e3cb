use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TlsBackend {
    Rustls,
    NativeTls,
}

impl Default for TlsBackend {
    fn default() -> Self {
        Self::Rustls
    }
}

/// prompt-relay 应用配置
///
/// 启动时构建一次，之后以 `Arc<Config>` 只读共享给各组件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// 客户端访问密钥（Authorization: Bearer <key>）
    #[serde(default = "default_api_secret_key")]
    pub api_secret_key: String,

    /// 上游生成服务密钥（非模拟模式必填）
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// 上游 OpenAI 兼容接口地址
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// 生成阶段使用的模型
    #[serde(default = "default_model")]
    pub default_model: String,

    /// 改写阶段使用的模型
    #[serde(default = "default_model")]
    pub refinement_model: String,

    /// 是否使用本地模拟后端（不访问网络）
    #[serde(default)]
    pub mock_mode: bool,

    /// 每个客户端每分钟允许的请求数
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// 调试端点每分钟允许的请求数（不会高于 rate_limit_per_minute）
    #[serde(default = "default_debug_rate_limit_per_minute")]
    pub debug_rate_limit_per_minute: u32,

    /// 上游请求超时（秒）
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// SQLite 数据库路径（可选，未配置时只写回退日志文件）
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,

    /// 回退日志文件路径
    #[serde(default = "default_fallback_log_path")]
    pub fallback_log_path: String,

    /// HTTP 代理地址（可选）
    /// 支持格式: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// 代理认证用户名（可选）
    #[serde(default)]
    pub proxy_username: Option<String>,

    /// 代理认证密码（可选）
    #[serde(default)]
    pub proxy_password: Option<String>,

    #[serde(default = "default_tls_backend")]
    pub tls_backend: TlsBackend,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// 默认 API 密钥（仅用于本地开发）
pub const DEFAULT_API_SECRET_KEY: &str = "default-secret-key-change-in-production";

fn default_api_secret_key() -> String {
    DEFAULT_API_SECRET_KEY.to_string()
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_rate_limit_per_minute() -> u32 {
    10
}

fn default_debug_rate_limit_per_minute() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_fallback_log_path() -> String {
    "prompt_logs.txt".to_string()
}

fn default_tls_backend() -> TlsBackend {
    TlsBackend::Rustls
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_secret_key: default_api_secret_key(),
            openai_api_key: None,
            api_base_url: default_api_base_url(),
            default_model: default_model(),
            refinement_model: default_model(),
            mock_mode: false,
            rate_limit_per_minute: default_rate_limit_per_minute(),
            debug_rate_limit_per_minute: default_debug_rate_limit_per_minute(),
            request_timeout_secs: default_request_timeout_secs(),
            database_path: None,
            fallback_log_path: default_fallback_log_path(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            tls_backend: default_tls_backend(),
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 使用环境变量覆盖配置
    ///
    /// `lookup` 通常是 `|k| std::env::var(k).ok()`，测试中可替换
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = lookup("API_SECRET_KEY") {
            self.api_secret_key = v;
        }
        if let Some(v) = lookup("DATABASE_PATH") {
            self.database_path = Some(v);
        }
        if let Some(v) = lookup("DEFAULT_MODEL") {
            self.default_model = v;
        }
        if let Some(v) = lookup("REFINEMENT_MODEL") {
            self.refinement_model = v;
        }
        if let Some(v) = lookup("MOCK_MODE") {
            self.mock_mode = parse_bool(&v)
                .with_context(|| format!("MOCK_MODE 取值无效: {}", v))?;
        }
        if let Some(v) = lookup("RATE_LIMIT_PER_MINUTE") {
            self.rate_limit_per_minute = v
                .trim()
                .parse()
                .with_context(|| format!("RATE_LIMIT_PER_MINUTE 取值无效: {}", v))?;
        }
        Ok(())
    }

    /// 校验配置，启动前调用
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.mock_mode
            && self
                .openai_api_key
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
        {
            anyhow::bail!("非模拟模式下必须配置 openaiApiKey（或环境变量 OPENAI_API_KEY）");
        }
        if self.rate_limit_per_minute == 0 {
            anyhow::bail!("rateLimitPerMinute 必须大于 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("requestTimeoutSecs 必须大于 0");
        }
        Ok(())
    }

    /// 调试端点实际生效的限额：严格低于普通限额，最低为 1
    ///
    /// 普通限额为 1 时两者相同（不能低于 1）
    pub fn effective_debug_rate_limit(&self) -> u32 {
        self.debug_rate_limit_per_minute
            .min(self.rate_limit_per_minute.saturating_sub(1))
            .max(1)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
