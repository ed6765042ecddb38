//! Compression strategy: path selection, both pipelines, dimension math
//!
//! The strategy produces a result for one image, choosing the native codec
//! path when it is allowed and viable, and downgrading to the generic raster
//! writer otherwise. A caller is never left unanswered: exactly one of
//! {native result, fallback result, propagated failure} comes out.

use std::io::Cursor;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use tokio::task;

use crate::cache::CodecCache;
use crate::codecs::EncodeParams;
use crate::errors::{DomainError, DomainResult};
use crate::types::{
    CompressionMethod, CompressionResult, CompressionSettings, EngineConfig, ImageFormat,
    MethodInfoFn, ProgressFn,
};

/// Formats the generic raster writer can always encode.
const FALLBACK_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

/// Nearest broadly-supported lossy format, used when the fallback path is
/// asked for something it cannot write.
const FALLBACK_SUBSTITUTE: ImageFormat = ImageFormat::Jpeg;

/// Progress sink wrapper enforcing monotonically non-decreasing delivery.
#[derive(Clone)]
struct Reporter {
    sink: Option<ProgressFn>,
    last: Arc<AtomicU8>,
}

impl Reporter {
    fn new(sink: Option<ProgressFn>) -> Self {
        Self {
            sink,
            last: Arc::new(AtomicU8::new(0)),
        }
    }

    fn emit(&self, pct: u8) {
        if let Some(sink) = &self.sink {
            let prev = self.last.fetch_max(pct, Ordering::SeqCst);
            if pct >= prev {
                sink(pct);
            }
        }
    }
}

pub struct CompressionStrategy {
    cache: Arc<CodecCache>,
    config: EngineConfig,
}

impl CompressionStrategy {
    pub fn new(cache: Arc<CodecCache>, config: EngineConfig) -> Self {
        Self { cache, config }
    }

    /// Decision policy for the native codec path.
    pub fn should_use_native(&self, input_len: u64, settings: &CompressionSettings) -> bool {
        if !self.config.prefer_native {
            return false;
        }
        if input_len > self.config.max_native_size_bytes {
            log::info!(
                "[STRATEGY] Input of {} bytes exceeds native ceiling of {}, using fallback",
                input_len,
                self.config.max_native_size_bytes
            );
            return false;
        }
        if !self.cache.is_format_supported(settings.format) {
            return false;
        }
        true
    }

    /// Compress one image, reporting coarse progress milestones.
    pub async fn compress(
        &self,
        bytes: Vec<u8>,
        settings: CompressionSettings,
        on_progress: Option<ProgressFn>,
        on_method_info: Option<MethodInfoFn>,
    ) -> DomainResult<CompressionResult> {
        settings.validate()?;
        let start = Instant::now();
        let reporter = Reporter::new(on_progress);

        let input_mime = sniff_input(&bytes)?;
        reporter.emit(10);

        if self.should_use_native(bytes.len() as u64, &settings) {
            match self
                .compress_with_native(&bytes, &settings, &reporter, &on_method_info, &input_mime, start)
                .await
            {
                Ok(result) => {
                    reporter.emit(100);
                    return Ok(result);
                }
                Err(e) if self.config.fallback_enabled => {
                    log::warn!(
                        "[STRATEGY] Native path failed ({}), falling back to raster writer",
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if !self.config.fallback_enabled {
            return Err(DomainError::UnsupportedFormat(format!(
                "{} (native path declined and fallback disabled)",
                settings.format
            )));
        }

        let result = self
            .compress_with_fallback(&bytes, &settings, &reporter, &on_method_info, &input_mime, start)
            .await?;
        reporter.emit(100);
        Ok(result)
    }

    /// Native path: resolve codec, decode, resize, extract raw pixels, encode.
    async fn compress_with_native(
        &self,
        bytes: &[u8],
        settings: &CompressionSettings,
        reporter: &Reporter,
        on_method_info: &Option<MethodInfoFn>,
        input_mime: &Option<String>,
        start: Instant,
    ) -> DomainResult<CompressionResult> {
        let codec = self
            .cache
            .get_codec(settings.format)
            .await
            .ok_or_else(|| DomainError::CodecLoad {
                format: settings.format,
                reason: "codec unavailable after load attempts".to_string(),
            })?;
        reporter.emit(15);

        if let Some(sink) = on_method_info {
            sink(CompressionMethod::Native, Some(codec.display_name()));
        }

        let params = self.derive_params(settings);
        let original_size = bytes.len() as u64;
        let input = bytes.to_vec();
        let job_settings = settings.clone();
        let job_reporter = reporter.clone();
        let job_codec = codec.clone();

        let (data, width, height) = task::spawn_blocking(move || -> DomainResult<(Vec<u8>, u32, u32)> {
            let pixels = prepare_pixels(&input, &job_settings, &job_reporter)?;
            let (width, height) = (pixels.width(), pixels.height());
            job_reporter.emit(60);

            job_reporter.emit(70);
            job_reporter.emit(80);
            let data = job_codec.encode(&pixels, &params)?;
            // pixels drop here, releasing the surface regardless of outcome
            job_reporter.emit(95);
            Ok((data, width, height))
        })
        .await
        .map_err(|e| DomainError::Internal(format!("Encode task join error: {}", e)))??;

        Ok(self.build_result(
            data,
            original_size,
            width,
            height,
            CompressionMethod::Native,
            Some(codec.display_name().to_string()),
            settings.format,
            input_mime.clone(),
            start,
        ))
    }

    /// Fallback path: same decode/resize pipeline, then the generic writer
    /// serializes the surface directly. Unsupported targets are substituted
    /// and the substitution is surfaced via `output_format`.
    async fn compress_with_fallback(
        &self,
        bytes: &[u8],
        settings: &CompressionSettings,
        reporter: &Reporter,
        on_method_info: &Option<MethodInfoFn>,
        input_mime: &Option<String>,
        start: Instant,
    ) -> DomainResult<CompressionResult> {
        let output_format = if FALLBACK_FORMATS.contains(&settings.format) {
            settings.format
        } else {
            log::warn!(
                "[STRATEGY] Fallback cannot write {}, substituting {}",
                settings.format,
                FALLBACK_SUBSTITUTE
            );
            FALLBACK_SUBSTITUTE
        };
        reporter.emit(15);

        if let Some(sink) = on_method_info {
            sink(CompressionMethod::Fallback, None);
        }

        let original_size = bytes.len() as u64;
        let input = bytes.to_vec();
        let job_settings = settings.clone();
        let job_reporter = reporter.clone();
        let quality = settings.quality;

        let (data, width, height) = task::spawn_blocking(move || -> DomainResult<(Vec<u8>, u32, u32)> {
            let pixels = prepare_pixels(&input, &job_settings, &job_reporter)?;
            let (width, height) = (pixels.width(), pixels.height());
            job_reporter.emit(60);
            job_reporter.emit(70);

            let surface = DynamicImage::ImageRgba8(pixels);
            let mut output = Cursor::new(Vec::new());
            job_reporter.emit(80);
            let write_format = match output_format {
                // Lossless target: no quality parameter
                ImageFormat::Png => image::ImageOutputFormat::Png,
                _ => image::ImageOutputFormat::Jpeg(quality.clamp(1, 100)),
            };
            // JPEG output needs the alpha channel composited away first
            let result = match write_format {
                image::ImageOutputFormat::Jpeg(q) => DynamicImage::ImageRgb8(surface.to_rgb8())
                    .write_to(&mut output, image::ImageOutputFormat::Jpeg(q)),
                other => surface.write_to(&mut output, other),
            };
            result.map_err(|e| DomainError::Encode {
                codec: "raster-fallback".to_string(),
                reason: e.to_string(),
            })?;
            job_reporter.emit(95);
            Ok((output.into_inner(), width, height))
        })
        .await
        .map_err(|e| DomainError::Internal(format!("Encode task join error: {}", e)))??;

        Ok(self.build_result(
            data,
            original_size,
            width,
            height,
            CompressionMethod::Fallback,
            None,
            output_format,
            input_mime.clone(),
            start,
        ))
    }

    /// Translate generic settings into codec-specific parameters.
    ///
    /// Quality passes through directly on a 0-100 scale; AVIF's inverted
    /// constant-quality scale derives `round((100 - quality) * 0.63)`;
    /// lossless formats ignore quality entirely.
    fn derive_params(&self, settings: &CompressionSettings) -> EncodeParams {
        let mut params = self
            .cache
            .default_options(settings.format)
            .unwrap_or_default();

        if settings.format.is_lossless() {
            params.lossless = true;
        } else {
            params.quality = settings.quality;
            params.cq_level = match settings.format {
                ImageFormat::Avif => Some(derive_cq_level(settings.quality)),
                _ => None,
            };
        }
        params
    }

    #[allow(clippy::too_many_arguments)]
    fn build_result(
        &self,
        data: Vec<u8>,
        original_size: u64,
        width: u32,
        height: u32,
        method: CompressionMethod,
        codec_name: Option<String>,
        output_format: ImageFormat,
        input_mime: Option<String>,
        start: Instant,
    ) -> CompressionResult {
        let compressed_size = data.len() as u64;
        let size_increased = compressed_size > original_size;
        if size_increased {
            log::warn!(
                "[STRATEGY] Output larger than input: {} -> {} bytes",
                original_size,
                compressed_size
            );
        }

        CompressionResult {
            data,
            original_size,
            compressed_size,
            width,
            height,
            method,
            codec_name,
            output_format,
            input_mime,
            size_increased,
            duration_ms: start.elapsed().as_millis() as i64,
        }
    }
}

/// Inverted constant-quality derivation for next-generation encoders:
/// lower level = higher quality.
pub fn derive_cq_level(quality: u8) -> u8 {
    ((100 - quality.clamp(1, 100)) as f32 * 0.63).round() as u8
}

/// Target dimensions preserving aspect ratio.
///
/// Width is capped first, then height; both are rounded to the nearest
/// integer independently, so the post-rounding aspect ratio may drift by at
/// most one pixel.
pub fn compute_target_dimensions(
    width: u32,
    height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> (u32, u32) {
    let mut w = width as f64;
    let mut h = height as f64;

    if let Some(max_w) = max_width {
        if w > max_w as f64 {
            let ratio = max_w as f64 / w;
            w = max_w as f64;
            h *= ratio;
        }
    }
    if let Some(max_h) = max_height {
        if h > max_h as f64 {
            let ratio = max_h as f64 / h;
            h = max_h as f64;
            w *= ratio;
        }
    }

    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

/// Reject inputs that are recognizably not images before decoding.
fn sniff_input(bytes: &[u8]) -> DomainResult<Option<String>> {
    match infer::get(bytes) {
        Some(kind) if kind.mime_type().starts_with("image/") => {
            log::debug!("[STRATEGY] Input sniffed as {}", kind.mime_type());
            Ok(Some(kind.mime_type().to_string()))
        }
        Some(kind) => Err(DomainError::Decode(format!(
            "input is {}, not an image",
            kind.mime_type()
        ))),
        // Unknown signature: let the decoder make the call
        None => Ok(None),
    }
}

/// Blocking decode -> orient -> resize pipeline shared by both paths.
fn prepare_pixels(
    bytes: &[u8],
    settings: &CompressionSettings,
    reporter: &Reporter,
) -> DomainResult<RgbaImage> {
    let img = image::load_from_memory(bytes).map_err(|e| DomainError::Decode(e.to_string()))?;
    reporter.emit(25);

    let img = if settings.strip_metadata {
        apply_exif_orientation(bytes, img)
    } else {
        img
    };
    reporter.emit(35);

    let (width, height) = (img.width(), img.height());
    let (target_w, target_h) =
        compute_target_dimensions(width, height, settings.max_width, settings.max_height);
    let img = if (target_w, target_h) != (width, height) {
        img.resize_exact(target_w, target_h, FilterType::Lanczos3)
    } else {
        img
    };
    reporter.emit(45);

    Ok(img.to_rgba8())
}

/// Bake the EXIF orientation tag into the pixels so that dropping metadata
/// does not visually rotate the output. Inputs without EXIF pass through.
fn apply_exif_orientation(bytes: &[u8], img: DynamicImage) -> DynamicImage {
    let orientation = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()
        .and_then(|data| {
            data.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .unwrap_or(1);

    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
