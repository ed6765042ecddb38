//! Dedicated encoder modules for the native path

pub mod jpeg_codec;
pub mod png_codec;
#[cfg(feature = "webp")]
pub mod webp_codec;
#[cfg(feature = "avif")]
pub mod avif_codec;

use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::types::ImageFormat;

/// Codec-specific encode parameters, derived from the generic settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeParams {
    /// 1-100 scale, higher = better quality
    pub quality: u8,
    /// Constant-quality level for encoders with an inverted scale
    /// (lower = better); derived as `round((100 - quality) * 0.63)`
    pub cq_level: Option<u8>,
    pub lossless: bool,
    /// Encoder effort, 1 (slowest/best) to 10 (fastest)
    pub speed: u8,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            quality: 80,
            cq_level: None,
            lossless: false,
            speed: 6,
        }
    }
}

/// Common trait for all encoder modules.
///
/// Black-box contract: raw RGBA pixels + options in, encoded bytes out.
pub trait CodecModule: Send + Sync {
    /// Display name reported in results and method-info callbacks
    fn display_name(&self) -> &'static str;

    /// Encode raw RGBA pixel data at its stated dimensions
    fn encode(&self, pixels: &RgbaImage, params: &EncodeParams) -> DomainResult<Vec<u8>>;
}

/// Resolves a format to a ready-to-call encoder module.
///
/// Loading is async and fallible; the cache layer above this deduplicates
/// concurrent loads and caps retries.
#[async_trait]
pub trait CodecLoader: Send + Sync {
    async fn load(&self, format: ImageFormat) -> DomainResult<Arc<dyn CodecModule>>;
}

/// Built-in loader backed by the compiled-in encoder crates.
///
/// A format whose encoder feature is compiled out fails to load, which is a
/// normal `CodecLoad` outcome, not a panic.
pub struct NativeCodecLoader;

#[async_trait]
impl CodecLoader for NativeCodecLoader {
    async fn load(&self, format: ImageFormat) -> DomainResult<Arc<dyn CodecModule>> {
        match format {
            ImageFormat::Jpeg => Ok(Arc::new(jpeg_codec::JpegCodec)),
            ImageFormat::Png => Ok(Arc::new(png_codec::PngCodec)),
            ImageFormat::Webp => {
                #[cfg(feature = "webp")]
                {
                    Ok(Arc::new(webp_codec::WebpCodec))
                }
                #[cfg(not(feature = "webp"))]
                {
                    Err(DomainError::CodecLoad {
                        format,
                        reason: "webp encoder not compiled in".to_string(),
                    })
                }
            }
            ImageFormat::Avif => {
                #[cfg(feature = "avif")]
                {
                    Ok(Arc::new(avif_codec::AvifCodec))
                }
                #[cfg(not(feature = "avif"))]
                {
                    Err(DomainError::CodecLoad {
                        format,
                        reason: "avif encoder not compiled in".to_string(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn test_pixels() -> RgbaImage {
        RgbaImage::from_fn(16, 16, |x, y| {
            image::Rgba([(x * 16) as u8, (y * 16) as u8, 128, 255])
        })
    }

    #[tokio::test]
    async fn loader_provides_jpeg_and_png() {
        let loader = NativeCodecLoader;
        let jpeg = loader.load(ImageFormat::Jpeg).await.unwrap();
        assert_eq!(jpeg.display_name(), "jpeg-native");
        let png = loader.load(ImageFormat::Png).await.unwrap();
        assert_eq!(png.display_name(), "png-native");
    }

    #[tokio::test]
    async fn loaded_codecs_produce_bytes() {
        let loader = NativeCodecLoader;
        let params = EncodeParams::default();
        for format in [ImageFormat::Jpeg, ImageFormat::Png] {
            let codec = loader.load(format).await.unwrap();
            let bytes = codec.encode(&test_pixels(), &params).unwrap();
            assert!(!bytes.is_empty(), "{} produced no output", format);
        }
    }

    #[cfg(feature = "webp")]
    #[tokio::test]
    async fn webp_codec_encodes_lossy_and_lossless() {
        let loader = NativeCodecLoader;
        let codec = loader.load(ImageFormat::Webp).await.unwrap();
        let lossy = codec
            .encode(&test_pixels(), &EncodeParams { quality: 75, ..Default::default() })
            .unwrap();
        let lossless = codec
            .encode(&test_pixels(), &EncodeParams { lossless: true, ..Default::default() })
            .unwrap();
        assert!(!lossy.is_empty());
        assert!(!lossless.is_empty());
    }

    #[cfg(not(feature = "avif"))]
    #[tokio::test]
    async fn missing_avif_feature_is_a_load_failure() {
        let loader = NativeCodecLoader;
        assert!(matches!(
            loader.load(ImageFormat::Avif).await,
            Err(DomainError::CodecLoad { .. })
        ));
    }
}
