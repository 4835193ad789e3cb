//! 交互记录数据模型

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// 一次完整交互（成功或失败）的记录
#[derive(Debug, Clone, Serialize)]
pub struct InteractionRecord {
    pub raw_input: String,
    pub refined_prompt: String,
    pub final_output: String,
    pub client_identity: Option<String>,
    pub model_used: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    pub fn new(
        raw_input: impl Into<String>,
        refined_prompt: impl Into<String>,
        final_output: impl Into<String>,
    ) -> Self {
        Self {
            raw_input: raw_input.into(),
            refined_prompt: refined_prompt.into(),
            final_output: final_output.into(),
            client_identity: None,
            model_used: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_client_identity(mut self, client: impl Into<String>) -> Self {
        self.client_identity = Some(client.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_used = Some(model.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 统一的时间戳格式（毫秒精度，UTC），保证字符串比较与时间顺序一致
    pub fn timestamp_string(&self) -> String {
        format_timestamp(self.timestamp)
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
