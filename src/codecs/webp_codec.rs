//! WebP encoder module (lossy by default, lossless on request)

use image::RgbaImage;

use super::{CodecModule, EncodeParams};
use crate::errors::{DomainError, DomainResult};

pub struct WebpCodec;

impl CodecModule for WebpCodec {
    fn display_name(&self) -> &'static str {
        "webp-native"
    }

    fn encode(&self, pixels: &RgbaImage, params: &EncodeParams) -> DomainResult<Vec<u8>> {
        let encoder = ::webp::Encoder::from_rgba(pixels, pixels.width(), pixels.height());

        let encoded = if params.lossless {
            encoder.encode_lossless()
        } else {
            encoder.encode(params.quality.clamp(1, 100) as f32)
        };

        if encoded.is_empty() {
            return Err(DomainError::Encode {
                codec: self.display_name().to_string(),
                reason: "encoder returned an empty buffer".to_string(),
            });
        }

        Ok(encoded.to_vec())
    }
}
