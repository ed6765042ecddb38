//! Type definitions for the recompression core.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult, ValidationError};

/// Output formats with a dedicated codec family.
///
/// A closed set mapped through an exhaustive table; free-form strings are
/// resolved against per-format aliases via [`ImageFormat::from_alias`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Webp,
        ImageFormat::Avif,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Avif => "avif",
        }
    }

    /// Accepted aliases, lowercase. MIME forms included because callers
    /// routinely pass whatever their file picker reported.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ImageFormat::Jpeg => &["jpeg", "jpg", "image/jpeg", "image/jpg"],
            ImageFormat::Png => &["png", "image/png"],
            ImageFormat::Webp => &["webp", "image/webp"],
            ImageFormat::Avif => &["avif", "image/avif"],
        }
    }

    /// Case-insensitive alias lookup across all formats.
    pub fn from_alias(alias: &str) -> Option<Self> {
        let needle = alias.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.aliases().contains(&needle.as_str()))
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Avif => "image/avif",
        }
    }

    /// Lossless formats ignore the quality knob entirely.
    pub fn is_lossless(&self) -> bool {
        matches!(self, ImageFormat::Png)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| DomainError::UnsupportedFormat(s.to_string()))
    }
}

/// Which tier actually produced the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionMethod {
    /// Dedicated encoder module resolved through the codec cache
    Native,

    /// Generic raster writer, always available
    Fallback,
}

impl CompressionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionMethod::Native => "native",
            CompressionMethod::Fallback => "fallback",
        }
    }
}

impl FromStr for CompressionMethod {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(CompressionMethod::Native),
            "fallback" => Ok(CompressionMethod::Fallback),
            _ => Err(DomainError::Validation(ValidationError::custom(&format!(
                "Invalid compression method: {}",
                s
            )))),
        }
    }
}

impl From<CompressionMethod> for String {
    fn from(method: CompressionMethod) -> Self {
        method.as_str().to_string()
    }
}

/// Immutable request parameters, constructed once per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub format: ImageFormat,
    /// 1-100, higher = better quality
    pub quality: u8,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// When true (default), the EXIF orientation tag is baked into the
    /// pixels before metadata is discarded by re-encoding.
    pub strip_metadata: bool,
}

impl CompressionSettings {
    pub fn new(format: ImageFormat, quality: u8) -> Self {
        Self {
            format,
            quality,
            max_width: None,
            max_height: None,
            strip_metadata: true,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quality < 1 || self.quality > 100 {
            return Err(DomainError::Validation(ValidationError::range(
                "quality", 1, 100,
            )));
        }
        if self.max_width == Some(0) {
            return Err(DomainError::Validation(ValidationError::invalid_value(
                "max_width",
                "must be at least 1",
            )));
        }
        if self.max_height == Some(0) {
            return Err(DomainError::Validation(ValidationError::invalid_value(
                "max_height",
                "must be at least 1",
            )));
        }
        Ok(())
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self::new(ImageFormat::Jpeg, 80)
    }
}

/// Output of one job; ownership transfers to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionResult {
    pub data: Vec<u8>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub width: u32,
    pub height: u32,
    pub method: CompressionMethod,
    /// Display name of the encoder module, native path only
    pub codec_name: Option<String>,
    /// Format actually encoded. Differs from the requested format when the
    /// fallback path had to substitute an unsupported target.
    pub output_format: ImageFormat,
    /// Sniffed MIME of the input, when recognized
    pub input_mime: Option<String>,
    /// Output came out larger than the input
    pub size_increased: bool,
    pub duration_ms: i64,
}

impl CompressionResult {
    pub fn space_saved_percentage(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        100.0 - (self.compressed_size as f64 / self.original_size as f64) * 100.0
    }
}

/// Engine-level configuration, all fields defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Prefer the native codec path when the format has one
    pub prefer_native: bool,
    /// Eagerly load the two highest-priority codecs at startup
    pub enable_preload: bool,
    /// Inputs above this size skip the native path
    pub max_native_size_bytes: u64,
    /// Allow downgrading to the generic raster writer
    pub fallback_enabled: bool,
    /// Pool size; `None` = available hardware concurrency (min 1)
    pub pool_size: Option<usize>,
    /// Per-job wall-clock ceiling
    pub job_timeout_secs: u64,
    /// Delay before the pool is rebuilt after a context fault
    pub fault_cooldown_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prefer_native: true,
            enable_preload: true,
            max_native_size_bytes: 50 * 1024 * 1024, // 50 MiB
            fallback_enabled: true,
            pool_size: None,
            job_timeout_secs: 120,
            fault_cooldown_ms: 1000,
        }
    }
}

/// One item of a batch submission.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub id: Uuid,
    pub bytes: Vec<u8>,
}

/// Per-item outcome of a batch; batches always settle fully.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub id: Uuid,
    pub result: Result<CompressionResult, crate::errors::ServiceError>,
}

/// Aggregate statistics over one settled batch.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_original_size: u64,
    pub total_compressed_size: u64,
}

impl BatchStats {
    pub fn space_saved_percentage(&self) -> f64 {
        if self.total_original_size == 0 {
            return 0.0;
        }
        100.0 - (self.total_compressed_size as f64 / self.total_original_size as f64) * 100.0
    }
}

/// Snapshot of pool health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStatus {
    pub contexts: usize,
    pub busy_contexts: usize,
    pub queued_jobs: usize,
    pub pending_jobs: usize,
}

/// Progress sink: monotonically non-decreasing percentages, ending at 100
/// on success.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Method-info sink: invoked when a path is attempted, with the encoder
/// display name on the native path. A native attempt that fails after its
/// codec resolved fires again on fallback; the last invocation is the path
/// that produced the result.
pub type MethodInfoFn = Arc<dyn Fn(CompressionMethod, Option<&str>) + Send + Sync>;
