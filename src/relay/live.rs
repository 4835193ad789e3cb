//! 真实后端：OpenAI 兼容的 chat/completions 接口

use once_cell::sync::OnceCell;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::client::{BackendError, CallContext, LanguageModelClient};
use crate::http_client::{ProxyConfig, build_client};
use crate::model::config::{Config, TlsBackend};

/// 固定采样温度
const TEMPERATURE: f32 = 0.7;
/// 输出 token 上限
const MAX_TOKENS: u32 = 2000;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// 真实后端
///
/// HTTP Client 在首次调用时构建且只构建一次，并发首调也只会得到同一个实例
pub struct LiveBackend {
    base_url: String,
    api_key: String,
    timeout_secs: u64,
    proxy: Option<ProxyConfig>,
    tls_backend: TlsBackend,
    client: OnceCell<Client>,
}

impl LiveBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs,
            proxy: None,
            tls_backend: TlsBackend::Rustls,
            client: OnceCell::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut backend = Self::new(
            config.api_base_url.clone(),
            config.openai_api_key.clone().unwrap_or_default(),
            config.request_timeout_secs,
        );
        backend.proxy = ProxyConfig::from_config(config);
        backend.tls_backend = config.tls_backend;
        backend
    }

    fn client(&self) -> Result<&Client, BackendError> {
        self.client.get_or_try_init(|| {
            tracing::debug!(timeout_secs = self.timeout_secs, "初始化上游 HTTP Client");
            build_client(self.proxy.as_ref(), self.timeout_secs, self.tls_backend)
                .map_err(|e| BackendError::Client(e.to_string()))
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl LanguageModelClient for LiveBackend {
    async fn invoke(
        &self,
        prompt: &str,
        model: &str,
        _context: Option<&CallContext>,
    ) -> Result<String, BackendError> {
        let client = self.client()?;
        let body = ChatCompletionRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        #[cfg(feature = "sensitive-logs")]
        tracing::debug!(model, prompt, "发送上游请求");

        let response = client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(e.to_string())
                } else {
                    BackendError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(e.to_string())
            } else {
                BackendError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(BackendError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| BackendError::Malformed(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Malformed("响应中没有 choices[0].message.content".into()))?;

        Ok(content.trim().to_string())
    }

    fn name(&self) -> &'static str {
        "live"
    }
}
