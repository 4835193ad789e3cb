//! 交互记录：SQLite 持久化、降级日志与聚合统计

pub mod logger;
pub mod model;
pub mod store;

pub use logger::{InteractionLogger, RecordOutcome};
pub use model::InteractionRecord;
pub use store::{InteractionStats, InteractionStore, ModelUsage};
