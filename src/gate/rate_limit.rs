//! 固定窗口限流器
//!
//! 每个客户端标识一个计数器；窗口到期后在下一次请求时重置。
//! 读取、递增、比较、重置在同一次加锁内完成，不同客户端互不影响。

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// 默认窗口长度：1 分钟
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// 速率限制条目
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// 当前窗口内已放行的请求数
    count: u32,
    /// 时间窗口开始时间
    window_start: Instant,
}

/// 超出限额
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    /// 距离当前窗口结束的剩余秒数（向上取整）
    pub retry_after_secs: u64,
}

/// 固定窗口限流器
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// 每分钟 `max_requests` 次
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, DEFAULT_WINDOW)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// 检查并计数
    pub fn check(&self, key: &str) -> Result<(), RateLimited> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimited> {
        let mut entries = self.entries.lock();

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        // 窗口已过期，开启新窗口
        if now.saturating_duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_requests {
            let elapsed = now.saturating_duration_since(entry.window_start);
            let remaining = self.window.saturating_sub(elapsed);
            let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(RateLimited {
                retry_after_secs: retry_after_secs.max(1),
            });
        }

        entry.count += 1;
        Ok(())
    }

    /// 清理窗口已过期的条目
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.window_start) < self.window);
        before - entries.len()
    }

    /// 当前跟踪的客户端数
    pub fn tracked_clients(&self) -> usize {
        self.entries.lock().len()
    }
}
