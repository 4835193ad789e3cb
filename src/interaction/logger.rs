//! 交互记录器
//!
//! 启动时根据数据库可用性选定主存储；主存储写失败时降级写入纯文本日志文件。
//! 记录失败永远不会影响 HTTP 响应。

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use super::model::InteractionRecord;
use super::store::{InteractionStats, InteractionStore};
use crate::common::truncate_chars;

/// 降级日志中每个字段保留的字符数
const FALLBACK_FIELD_CHARS: usize = 100;

/// 交互记录的写入目标
pub trait InteractionSink: Send + Sync {
    fn write(&self, record: &InteractionRecord) -> Result<()>;

    fn name(&self) -> &'static str;
}

impl InteractionSink for InteractionStore {
    fn write(&self, record: &InteractionRecord) -> Result<()> {
        self.insert(record).map(|_| ())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// 纯文本降级日志（每次写入都重新以追加模式打开）
pub struct FallbackFileSink {
    path: PathBuf,
}

impl FallbackFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `[<UTC 时间>] RAW: <前 100 字符>... | REFINED: ... | OUTPUT: ...`
    pub fn format_line(record: &InteractionRecord) -> String {
        format!(
            "[{}] RAW: {}... | REFINED: {}... | OUTPUT: {}...\n",
            record.timestamp_string(),
            truncate_chars(&record.raw_input, FALLBACK_FIELD_CHARS),
            truncate_chars(&record.refined_prompt, FALLBACK_FIELD_CHARS),
            truncate_chars(&record.final_output, FALLBACK_FIELD_CHARS),
        )
    }
}

impl InteractionSink for FallbackFileSink {
    fn write(&self, record: &InteractionRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(Self::format_line(record).as_bytes())?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fallback-file"
    }
}

/// 单次记录的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// 写入主存储
    Persisted,
    /// 写入降级日志
    FellBack,
    /// 两处都失败，记录丢失
    Degraded,
}

/// 交互记录器
#[derive(Clone)]
pub struct InteractionLogger {
    store: Option<Arc<InteractionStore>>,
    primary: Option<Arc<dyn InteractionSink>>,
    fallback: Arc<dyn InteractionSink>,
}

impl InteractionLogger {
    /// 有数据库时以数据库为主存储，否则只写降级日志
    pub fn new(store: Option<Arc<InteractionStore>>, fallback_path: impl Into<PathBuf>) -> Self {
        let primary = store
            .clone()
            .map(|s| s as Arc<dyn InteractionSink>);
        Self {
            store,
            primary,
            fallback: Arc::new(FallbackFileSink::new(fallback_path)),
        }
    }

    /// 按配置选定存储：路径缺失或打开失败都降级为文件日志
    pub fn open(database_path: Option<&str>, fallback_path: impl Into<PathBuf>) -> Self {
        let store = match database_path {
            Some(path) => match InteractionStore::open(path) {
                Ok(store) => {
                    tracing::info!(path, "交互记录数据库已就绪");
                    Some(Arc::new(store))
                }
                Err(e) => {
                    tracing::warn!(path, error = %e, "交互记录数据库不可用，使用降级日志");
                    None
                }
            },
            None => {
                tracing::info!("未配置数据库，交互记录写入降级日志");
                None
            }
        };
        Self::new(store, fallback_path)
    }

    #[cfg(test)]
    fn with_sinks(primary: Option<Arc<dyn InteractionSink>>, fallback: Arc<dyn InteractionSink>) -> Self {
        Self {
            store: None,
            primary,
            fallback,
        }
    }

    /// 数据库是否可用
    pub fn database_available(&self) -> bool {
        self.store.is_some()
    }

    /// 聚合统计；数据库不可用时返回 None
    pub async fn stats(&self, default_model: &str) -> Option<Result<InteractionStats>> {
        let store = self.store.clone()?;
        let default_model = default_model.to_string();
        let joined = tokio::task::spawn_blocking(move || store.stats(&default_model)).await;
        Some(joined.unwrap_or_else(|e| Err(anyhow::anyhow!("统计任务异常退出: {}", e))))
    }

    /// 写入一条记录（在阻塞线程池中执行），不返回错误
    pub async fn record(&self, record: InteractionRecord) -> RecordOutcome {
        let logger = self.clone();
        match tokio::task::spawn_blocking(move || logger.record_blocking(&record)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "交互记录任务异常退出");
                RecordOutcome::Degraded
            }
        }
    }

    fn record_blocking(&self, record: &InteractionRecord) -> RecordOutcome {
        if let Some(primary) = &self.primary {
            match primary.write(record) {
                Ok(()) => return RecordOutcome::Persisted,
                Err(e) => {
                    tracing::warn!(sink = primary.name(), error = %e, "主存储写入失败，改写降级日志");
                }
            }
        }

        match self.fallback.write(record) {
            Ok(()) => RecordOutcome::FellBack,
            Err(e) => {
                tracing::warn!(sink = self.fallback.name(), error = %e, "交互记录丢失：降级日志写入失败");
                RecordOutcome::Degraded
            }
        }
    }
}
