//! Codec cache: format resolution, load deduplication, bounded retry
//!
//! Concurrent callers requesting the same codec before its load finishes
//! share one in-flight load; the shared-future map is the synchronization
//! point. A codec whose load keeps failing is retried at most
//! [`MAX_LOAD_ATTEMPTS`] times total, after which lookups return `None`
//! without touching the loader again.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;
use tokio::sync::Mutex;

use crate::codecs::{CodecLoader, CodecModule, EncodeParams};
use crate::errors::DomainError;
use crate::types::ImageFormat;

/// Total load attempts permitted per codec, across all callers.
pub const MAX_LOAD_ATTEMPTS: u32 = 2;

/// Static configuration for one encoder family.
pub struct CodecEntry {
    pub format: ImageFormat,
    pub display_name: &'static str,
    pub default_params: EncodeParams,
    /// Preload rank; lower loads first
    pub priority: u8,
}

static CODEC_TABLE: Lazy<Vec<CodecEntry>> = Lazy::new(|| {
    vec![
        CodecEntry {
            format: ImageFormat::Jpeg,
            display_name: "jpeg-native",
            default_params: EncodeParams {
                quality: 80,
                cq_level: None,
                lossless: false,
                speed: 6,
            },
            priority: 1,
        },
        CodecEntry {
            format: ImageFormat::Webp,
            display_name: "webp-native",
            default_params: EncodeParams {
                quality: 75,
                cq_level: None,
                lossless: false,
                speed: 4,
            },
            priority: 2,
        },
        CodecEntry {
            format: ImageFormat::Png,
            display_name: "png-native",
            default_params: EncodeParams {
                quality: 100,
                cq_level: None,
                lossless: true,
                speed: 6,
            },
            priority: 3,
        },
        CodecEntry {
            format: ImageFormat::Avif,
            display_name: "avif-native",
            default_params: EncodeParams {
                quality: 70,
                cq_level: Some(19),
                lossless: false,
                speed: 6,
            },
            priority: 4,
        },
    ]
});

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<dyn CodecModule>, DomainError>>>;

#[derive(Default)]
struct CacheState {
    loaded: HashMap<ImageFormat, Arc<dyn CodecModule>>,
    in_flight: HashMap<ImageFormat, SharedLoad>,
    attempts: HashMap<ImageFormat, u32>,
}

pub struct CodecCache {
    loader: Arc<dyn CodecLoader>,
    state: Mutex<CacheState>,
}

impl CodecCache {
    pub fn new(loader: Arc<dyn CodecLoader>) -> Self {
        Self {
            loader,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Case-insensitive alias lookup: format string -> codec display name.
    pub fn resolve_format_to_codec_name(&self, format: &str) -> Option<&'static str> {
        let format = ImageFormat::from_alias(format)?;
        Self::entry(format).map(|e| e.display_name)
    }

    /// Pure lookup, no suspension.
    pub fn is_format_supported(&self, format: ImageFormat) -> bool {
        Self::entry(format).is_some()
    }

    /// Pure lookup, no suspension.
    pub fn default_options(&self, format: ImageFormat) -> Option<EncodeParams> {
        Self::entry(format).map(|e| e.default_params.clone())
    }

    pub fn codec_display_name(&self, format: ImageFormat) -> Option<&'static str> {
        Self::entry(format).map(|e| e.display_name)
    }

    fn entry(format: ImageFormat) -> Option<&'static CodecEntry> {
        CODEC_TABLE.iter().find(|e| e.format == format)
    }

    /// Return a loaded encoder, loading it on first use.
    ///
    /// Failure is a value at this layer: an unloadable codec yields `None`,
    /// never an error. A cached module is returned without suspension; an
    /// in-flight load is awaited, never duplicated.
    pub async fn get_codec(&self, format: ImageFormat) -> Option<Arc<dyn CodecModule>> {
        let load = {
            let mut state = self.state.lock().await;

            if let Some(module) = state.loaded.get(&format) {
                return Some(module.clone());
            }

            if let Some(load) = state.in_flight.get(&format) {
                load.clone()
            } else {
                let attempts = state.attempts.entry(format).or_insert(0);
                if *attempts >= MAX_LOAD_ATTEMPTS {
                    log::debug!(
                        "[CODEC_CACHE] {} exhausted its {} load attempts, not retrying",
                        format,
                        MAX_LOAD_ATTEMPTS
                    );
                    return None;
                }
                *attempts += 1;
                log::info!(
                    "[CODEC_CACHE] Loading codec for {} (attempt {}/{})",
                    format,
                    *attempts,
                    MAX_LOAD_ATTEMPTS
                );

                let loader = self.loader.clone();
                let load = async move { loader.load(format).await }.boxed().shared();
                state.in_flight.insert(format, load.clone());
                load
            }
        };

        let outcome = load.await;

        let mut state = self.state.lock().await;
        state.in_flight.remove(&format);
        match outcome {
            Ok(module) => {
                // Loaded never regresses; later failures cannot evict this
                state.loaded.insert(format, module.clone());
                log::info!("[CODEC_CACHE] ✅ Codec for {} ready", format);
                Some(module)
            }
            Err(e) => {
                log::warn!("[CODEC_CACHE] ❌ Codec load for {} failed: {}", format, e);
                None
            }
        }
    }

    /// Eagerly load the two highest-priority codecs.
    ///
    /// Individual failures are tolerated independently; partial success is
    /// success.
    pub async fn preload_common(&self) {
        let mut ranked: Vec<&CodecEntry> = CODEC_TABLE.iter().collect();
        ranked.sort_by_key(|e| e.priority);

        let targets: Vec<ImageFormat> = ranked.iter().take(2).map(|e| e.format).collect();
        log::info!("[CODEC_CACHE] Preloading common codecs: {:?}", targets);

        let loads = targets.iter().map(|&format| self.get_codec(format));
        let results = futures::future::join_all(loads).await;

        for (format, result) in targets.iter().zip(results) {
            if result.is_none() {
                log::warn!("[CODEC_CACHE] Preload of {} failed, continuing", format);
            }
        }
    }

    /// Clear cached modules, in-flight loads, and attempt counters.
    /// Subsequent lookups behave as if freshly constructed.
    pub async fn dispose(&self) {
        let mut state = self.state.lock().await;
        state.loaded.clear();
        state.in_flight.clear();
        state.attempts.clear();
        log::info!("[CODEC_CACHE] Disposed");
    }
}
