//! PNG encoder module (lossless; quality knob is ignored)

use image::{ColorType, ImageEncoder, RgbaImage};

use super::{CodecModule, EncodeParams};
use crate::errors::{DomainError, DomainResult};

pub struct PngCodec;

impl CodecModule for PngCodec {
    fn display_name(&self) -> &'static str {
        "png-native"
    }

    fn encode(&self, pixels: &RgbaImage, _params: &EncodeParams) -> DomainResult<Vec<u8>> {
        let mut output = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new_with_quality(
            &mut output,
            image::codecs::png::CompressionType::Best,
            image::codecs::png::FilterType::Adaptive,
        );
        encoder
            .write_image(pixels, pixels.width(), pixels.height(), ColorType::Rgba8)
            .map_err(|e| DomainError::Encode {
                codec: self.display_name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(output)
    }
}
