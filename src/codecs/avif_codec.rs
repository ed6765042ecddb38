//! AVIF encoder module
//!
//! AVIF uses a constant-quality scale where lower is better; the derived
//! `cq_level` (0-63) is translated back to the encoder's 1-100 quality knob.

use image::{ColorType, ImageEncoder, RgbaImage};

use super::{CodecModule, EncodeParams};
use crate::errors::{DomainError, DomainResult};

pub struct AvifCodec;

impl AvifCodec {
    /// Inverse of the cq derivation: cq = round((100 - q) * 0.63)
    fn quality_from_cq(cq_level: u8) -> u8 {
        let q = 100.0 - (cq_level.min(63) as f32 / 0.63);
        q.round().clamp(1.0, 100.0) as u8
    }
}

impl CodecModule for AvifCodec {
    fn display_name(&self) -> &'static str {
        "avif-native"
    }

    fn encode(&self, pixels: &RgbaImage, params: &EncodeParams) -> DomainResult<Vec<u8>> {
        let quality = match params.cq_level {
            Some(cq) => Self::quality_from_cq(cq),
            None => params.quality.clamp(1, 100),
        };
        let speed = params.speed.clamp(1, 10);

        let mut output = Vec::new();
        let encoder =
            image::codecs::avif::AvifEncoder::new_with_speed_quality(&mut output, speed, quality);
        encoder
            .write_image(pixels, pixels.width(), pixels.height(), ColorType::Rgba8)
            .map_err(|e| DomainError::Encode {
                codec: self.display_name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cq_level_inverts_back_to_quality() {
        // cq 0 = best quality, cq 63 = worst
        assert_eq!(AvifCodec::quality_from_cq(0), 100);
        assert!(AvifCodec::quality_from_cq(63) <= 1);
        assert!(AvifCodec::quality_from_cq(13) > AvifCodec::quality_from_cq(40));
    }
}
