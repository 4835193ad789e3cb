//! 交互记录 SQLite 存储

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::Serialize;

use super::model::{InteractionRecord, format_timestamp};

/// 单个模型的调用次数
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModelUsage {
    pub model: String,
    pub count: u64,
}

/// 聚合统计
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InteractionStats {
    pub total_requests: u64,
    pub requests_24h: u64,
    pub unique_users: u64,
    pub model_usage: Vec<ModelUsage>,
}

/// 底层 SQLite 存储（同步，调用方负责放到阻塞线程池）
pub struct InteractionStore {
    conn: Mutex<Connection>,
}

impl InteractionStore {
    /// 打开（或创建）数据库文件
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("打开数据库失败: {}", path.display()))?;
        Self::init(conn)
    }

    /// 内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS prompt_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                raw_input TEXT NOT NULL,
                refined_prompt TEXT NOT NULL,
                final_output TEXT NOT NULL,
                client_identity TEXT,
                model_used TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_prompt_logs_timestamp ON prompt_logs(timestamp);
            CREATE INDEX IF NOT EXISTS idx_prompt_logs_model ON prompt_logs(model_used);",
        )
        .context("初始化 prompt_logs 表失败")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 写入一条记录，返回自增 ID
    pub fn insert(&self, record: &InteractionRecord) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO prompt_logs (timestamp, raw_input, refined_prompt, final_output, client_identity, model_used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                record.timestamp_string(),
                record.raw_input,
                record.refined_prompt,
                record.final_output,
                record.client_identity,
                record.model_used,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 聚合统计
    ///
    /// 没有任何按模型分组的数据时，`model_usage` 回退为 `[{default_model, total}]`
    pub fn stats(&self, default_model: &str) -> Result<InteractionStats> {
        let conn = self.conn.lock();

        let total_requests: i64 =
            conn.query_row("SELECT COUNT(*) FROM prompt_logs", [], |row| row.get(0))?;

        let cutoff = format_timestamp(Utc::now() - Duration::hours(24));
        let requests_24h: i64 = conn.query_row(
            "SELECT COUNT(*) FROM prompt_logs WHERE timestamp >= ?1",
            [&cutoff],
            |row| row.get(0),
        )?;

        let unique_users: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT client_identity) FROM prompt_logs",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT model_used, COUNT(model_used) FROM prompt_logs
             WHERE model_used IS NOT NULL
             GROUP BY model_used ORDER BY COUNT(model_used) DESC, model_used ASC",
        )?;
        let mut model_usage = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok(ModelUsage {
                    model: row.get(0)?,
                    count: count as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if model_usage.is_empty() {
            model_usage.push(ModelUsage {
                model: default_model.to_string(),
                count: total_requests as u64,
            });
        }

        Ok(InteractionStats {
            total_requests: total_requests as u64,
            requests_24h: requests_24h as u64,
            unique_users: unique_users as u64,
            model_usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(client: &str, model: &str) -> InteractionRecord {
        InteractionRecord::new("raw", "refined", "output")
            .with_client_identity(client)
            .with_model(model)
    }

    #[test]
    fn test_empty_store_stats() {
        let store = InteractionStore::open_in_memory().unwrap();
        let stats = store.stats("gpt-4o-mini").unwrap();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.requests_24h, 0);
        assert_eq!(stats.unique_users, 0);
        assert_eq!(
            stats.model_usage,
            vec![ModelUsage {
                model: "gpt-4o-mini".to_string(),
                count: 0
            }]
        );
    }

    #[test]
    fn test_stats_aggregation() {
        let store = InteractionStore::open_in_memory().unwrap();
        store.insert(&record("1.1.1.1", "gpt-4o-mini")).unwrap();
        store.insert(&record("1.1.1.1", "gpt-4o-mini")).unwrap();
        store.insert(&record("2.2.2.2", "gpt-4o")).unwrap();
        // 超过 24 小时的旧记录
        store
            .insert(
                &record("3.3.3.3", "gpt-4o-mini")
                    .with_timestamp(Utc::now() - Duration::hours(48)),
            )
            .unwrap();

        let stats = store.stats("unused").unwrap();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.requests_24h, 3);
        assert_eq!(stats.unique_users, 3);
        assert_eq!(
            stats.model_usage,
            vec![
                ModelUsage {
                    model: "gpt-4o-mini".to_string(),
                    count: 3
                },
                ModelUsage {
                    model: "gpt-4o".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_insert_returns_increasing_ids() {
        let store = InteractionStore::open_in_memory().unwrap();
        let a = store.insert(&record("c", "m")).unwrap();
        let b = store.insert(&record("c", "m")).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_open_file_database() {
        let path = std::env::temp_dir().join(format!("relay-{}.db", uuid::Uuid::new_v4()));
        {
            let store = InteractionStore::open(&path).unwrap();
            store.insert(&record("c", "m")).unwrap();
        }
        // 重新打开后数据仍在
        let store = InteractionStore::open(&path).unwrap();
        assert_eq!(store.stats("m").unwrap().total_requests, 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_open_invalid_path_fails() {
        let path = std::env::temp_dir()
            .join(format!("missing-dir-{}", uuid::Uuid::new_v4()))
            .join("relay.db");
        assert!(InteractionStore::open(&path).is_err());
    }
}
