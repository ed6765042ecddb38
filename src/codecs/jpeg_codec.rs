//! JPEG encoder module

use image::{ColorType, DynamicImage, RgbaImage};

use super::{CodecModule, EncodeParams};
use crate::errors::{DomainError, DomainResult};

pub struct JpegCodec;

impl CodecModule for JpegCodec {
    fn display_name(&self) -> &'static str {
        "jpeg-native"
    }

    fn encode(&self, pixels: &RgbaImage, params: &EncodeParams) -> DomainResult<Vec<u8>> {
        let quality = params.quality.clamp(1, 100);
        // JPEG has no alpha channel; composite down to RGB first
        let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();

        let mut output = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
        encoder
            .encode(&rgb, rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| DomainError::Encode {
                codec: self.display_name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(output)
    }
}
