//! Client-side image recompression core.
//!
//! A two-tier codec strategy (dedicated encoder modules with a guaranteed
//! raster fallback) driven by a pool of isolated execution contexts. One
//! [`CompressionEngine`] per logical session; no process-wide state.

// Public modules
pub mod cache;
pub mod codecs;
pub mod engine;
pub mod errors;
pub mod strategy;
pub mod types;
pub mod worker;

pub use cache::CodecCache;
pub use engine::{BatchMethodInfoFn, BatchProgressFn, CompressionEngine};
pub use errors::{DomainError, DomainResult, ServiceError, ServiceResult};
pub use strategy::{compute_target_dimensions, CompressionStrategy};
pub use types::{
    BatchItem, BatchOutcome, BatchStats, CompressionMethod, CompressionResult,
    CompressionSettings, EngineConfig, ImageFormat, MethodInfoFn, PoolStatus, ProgressFn,
};
