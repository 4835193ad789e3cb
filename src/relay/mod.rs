//! Prompt 中转核心：风格目录、模型后端与处理管道

pub mod client;
pub mod live;
pub mod pipeline;
pub mod simulated;
pub mod style;

pub use client::{BackendError, CallContext, LanguageModelClient, Stage, build_backend};
pub use pipeline::{PipelineResult, PromptPipeline, PromptRequest, ValidationError};
pub use style::Style;
