//! Compression engine: the caller-facing facade
//!
//! Owns one codec cache and one execution-context pool per logical session.
//! Single submissions and batches go through the pool; batches always settle
//! fully, reporting each item's outcome independently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cache::CodecCache;
use crate::codecs::{CodecLoader, NativeCodecLoader};
use crate::errors::{DomainResult, ServiceError, ServiceResult};
use crate::strategy::CompressionStrategy;
use crate::types::{
    BatchItem, BatchOutcome, BatchStats, CompressionMethod, CompressionResult,
    CompressionSettings, EngineConfig, MethodInfoFn, PoolStatus, ProgressFn,
};
use crate::worker::{JobRunner, PoolCoordinator, PoolMessage};

/// Per-item batch callbacks, keyed by item id.
pub type BatchProgressFn = Arc<dyn Fn(Uuid, u8) + Send + Sync>;
pub type BatchMethodInfoFn = Arc<dyn Fn(Uuid, CompressionMethod, Option<&str>) + Send + Sync>;

/// Production runner: one strategy invocation per job.
struct StrategyRunner {
    strategy: CompressionStrategy,
}

#[async_trait]
impl JobRunner for StrategyRunner {
    async fn run(
        &self,
        bytes: Vec<u8>,
        settings: CompressionSettings,
        on_progress: Option<ProgressFn>,
        on_method_info: Option<MethodInfoFn>,
    ) -> DomainResult<CompressionResult> {
        self.strategy
            .compress(bytes, settings, on_progress, on_method_info)
            .await
    }
}

pub struct CompressionEngine {
    config: EngineConfig,
    cache: Arc<CodecCache>,
    sender: mpsc::Sender<PoolMessage>,
    coordinator: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl CompressionEngine {
    /// Build an engine backed by the compiled-in codecs.
    ///
    /// Must be called from within a tokio runtime; the pool coordinator and
    /// optional codec preload are spawned here.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_loader(config, Arc::new(NativeCodecLoader))
    }

    pub fn with_loader(config: EngineConfig, loader: Arc<dyn CodecLoader>) -> Self {
        let cache = Arc::new(CodecCache::new(loader));
        let strategy = CompressionStrategy::new(cache.clone(), config.clone());
        let runner: Arc<dyn JobRunner> = Arc::new(StrategyRunner { strategy });
        let (handle, sender) = PoolCoordinator::start(runner, config.clone());

        if config.enable_preload {
            let preload_cache = cache.clone();
            tokio::spawn(async move {
                preload_cache.preload_common().await;
            });
        }

        Self {
            config,
            cache,
            sender,
            coordinator: Mutex::new(Some(handle)),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CodecCache> {
        &self.cache
    }

    /// Compress one image under a fresh job id.
    pub async fn compress(
        &self,
        bytes: Vec<u8>,
        settings: CompressionSettings,
        on_progress: Option<ProgressFn>,
        on_method_info: Option<MethodInfoFn>,
    ) -> ServiceResult<CompressionResult> {
        self.compress_with_id(Uuid::new_v4(), bytes, settings, on_progress, on_method_info)
            .await
    }

    /// Compress one image under a caller-chosen id (usable with [`cancel`]).
    ///
    /// [`cancel`]: CompressionEngine::cancel
    pub async fn compress_with_id(
        &self,
        job_id: Uuid,
        bytes: Vec<u8>,
        settings: CompressionSettings,
        on_progress: Option<ProgressFn>,
        on_method_info: Option<MethodInfoFn>,
    ) -> ServiceResult<CompressionResult> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PoolMessage::Submit {
                job_id,
                bytes,
                settings,
                on_progress,
                on_method_info,
                response: tx,
            })
            .await
            .map_err(|_| ServiceError::ServiceUnavailable("pool is destroyed".to_string()))?;

        rx.await
            .map_err(|_| ServiceError::ServiceUnavailable("pool is destroyed".to_string()))?
    }

    /// Compress a batch concurrently under shared settings.
    ///
    /// Resolves only once every item completed or failed; one item's failure
    /// neither cancels nor blocks its siblings.
    pub async fn compress_batch(
        &self,
        items: Vec<BatchItem>,
        settings: CompressionSettings,
        on_progress: Option<BatchProgressFn>,
        on_method_info: Option<BatchMethodInfoFn>,
    ) -> (Vec<BatchOutcome>, BatchStats) {
        let jobs = items.into_iter().map(|item| {
            let settings = settings.clone();
            let item_progress: Option<ProgressFn> = on_progress.as_ref().map(|sink| {
                let sink = sink.clone();
                let id = item.id;
                Arc::new(move |pct| sink(id, pct)) as ProgressFn
            });
            let item_method: Option<MethodInfoFn> = on_method_info.as_ref().map(|sink| {
                let sink = sink.clone();
                let id = item.id;
                Arc::new(move |method, name: Option<&str>| sink(id, method, name)) as MethodInfoFn
            });

            async move {
                let result = self
                    .compress_with_id(item.id, item.bytes, settings, item_progress, item_method)
                    .await;
                BatchOutcome {
                    id: item.id,
                    result,
                }
            }
        });

        let outcomes = futures::future::join_all(jobs).await;

        let mut stats = BatchStats {
            total_jobs: outcomes.len(),
            ..Default::default()
        };
        for outcome in &outcomes {
            match &outcome.result {
                Ok(result) => {
                    stats.succeeded += 1;
                    stats.total_original_size += result.original_size;
                    stats.total_compressed_size += result.compressed_size;
                }
                Err(_) => stats.failed += 1,
            }
        }
        log::info!(
            "[ENGINE] Batch settled: {}/{} succeeded, {:.1}% saved",
            stats.succeeded,
            stats.total_jobs,
            stats.space_saved_percentage()
        );

        (outcomes, stats)
    }

    /// Cancel one job by id. Returns false when the job is unknown or
    /// already finished.
    pub async fn cancel(&self, job_id: Uuid) -> ServiceResult<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PoolMessage::Cancel {
                job_id,
                response: tx,
            })
            .await
            .map_err(|_| ServiceError::ServiceUnavailable("pool is destroyed".to_string()))?;
        rx.await
            .map_err(|_| ServiceError::ServiceUnavailable("pool is destroyed".to_string()))
    }

    pub async fn pool_status(&self) -> ServiceResult<PoolStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PoolMessage::GetStatus { response: tx })
            .await
            .map_err(|_| ServiceError::ServiceUnavailable("pool is destroyed".to_string()))?;
        rx.await
            .map_err(|_| ServiceError::ServiceUnavailable("pool is destroyed".to_string()))
    }

    /// Tear everything down: contexts, pending jobs, queue, cached codecs.
    /// Idempotent; nothing still pending receives further callbacks.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(PoolMessage::Shutdown { response: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
        if let Some(handle) = self.coordinator.lock().await.take() {
            let _ = handle.await;
        }
        self.cache.dispose().await;
        log::info!("[ENGINE] Destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageFormat;
    use image::{DynamicImage, RgbaImage};
    use std::io::Cursor;

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8())
            .write_to(&mut out, image::ImageOutputFormat::Jpeg(90))
            .unwrap();
        out.into_inner()
    }

    fn engine(pool_size: usize) -> CompressionEngine {
        CompressionEngine::new(EngineConfig {
            pool_size: Some(pool_size),
            enable_preload: false,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn single_image_round_trip() {
        let engine = engine(2);
        let input = jpeg_bytes(500, 500);

        let result = engine
            .compress(
                input,
                CompressionSettings::new(ImageFormat::Jpeg, 70),
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!((result.width, result.height), (500, 500));
        assert!(result.compressed_size > 0);
        engine.destroy().await;
    }

    #[tokio::test]
    async fn batch_reports_independent_outcomes_and_stats() {
        let engine = engine(2);
        let items = vec![
            BatchItem {
                id: Uuid::new_v4(),
                bytes: jpeg_bytes(64, 64),
            },
            BatchItem {
                id: Uuid::new_v4(),
                bytes: b"not an image".to_vec(),
            },
            BatchItem {
                id: Uuid::new_v4(),
                bytes: jpeg_bytes(48, 32),
            },
        ];

        let (outcomes, stats) = engine
            .compress_batch(
                items,
                CompressionSettings::new(ImageFormat::Jpeg, 80),
                None,
                None,
            )
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(stats.total_jobs, 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        engine.destroy().await;
    }

    #[tokio::test]
    async fn batch_progress_is_keyed_by_item_id() {
        let engine = engine(2);
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();
        let seen: Arc<std::sync::Mutex<Vec<Uuid>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let on_progress: BatchProgressFn = Arc::new(move |id, _pct| {
            sink.lock().unwrap().push(id);
        });

        let items = vec![
            BatchItem { id: id_a, bytes: jpeg_bytes(32, 32) },
            BatchItem { id: id_b, bytes: jpeg_bytes(32, 32) },
        ];
        let (outcomes, _) = engine
            .compress_batch(
                items,
                CompressionSettings::new(ImageFormat::Jpeg, 80),
                Some(on_progress),
                None,
            )
            .await;
        assert!(outcomes.iter().all(|o| o.result.is_ok()));

        let seen = seen.lock().unwrap();
        assert!(seen.contains(&id_a));
        assert!(seen.contains(&id_b));
        engine.destroy().await;
    }

    #[tokio::test]
    async fn destroy_is_idempotent_and_rejects_later_jobs() {
        let engine = engine(1);
        engine.destroy().await;
        engine.destroy().await;

        let err = engine
            .compress(
                jpeg_bytes(16, 16),
                CompressionSettings::default(),
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn status_reflects_lazy_context_creation() {
        let engine = engine(3);

        let before = engine.pool_status().await.unwrap();
        assert_eq!(before.contexts, 0);

        engine
            .compress(
                jpeg_bytes(16, 16),
                CompressionSettings::default(),
                None,
                None,
            )
            .await
            .unwrap();

        let after = engine.pool_status().await.unwrap();
        assert_eq!(after.contexts, 3);
        assert_eq!(after.pending_jobs, 0);
        engine.destroy().await;
    }
}
