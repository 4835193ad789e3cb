//! HTTP 接口层

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod types;

pub use middleware::AppState;
pub use router::create_router;
