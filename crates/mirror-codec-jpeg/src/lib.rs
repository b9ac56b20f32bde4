//! `libjpeg-turbo`-backed codec for both tiles and full frames.
//!
//! Grounded on the teacher's `desktop.rs::encode_jpeg_tile`, which already
//! reaches for `turbojpeg::Compressor` over the RGB bytes it extracts per
//! tile. The only generalization here is using the same codec for full
//! keyframes too, since JPEG compresses a whole frame just as well as a
//! tile and the teacher never needed a second codec.

use mirror_platform::codec::CodecError;
use mirror_platform::{FrameCodec, TileCodec};

/// JPEG quality, 1-100. The teacher defaults `DesktopConfig::quality` to 70.
pub const DEFAULT_QUALITY: u8 = 70;

pub struct JpegCodec {
    quality: i32,
}

impl JpegCodec {
    pub fn new(quality: u8) -> Self {
        Self { quality: quality.clamp(1, 100) as i32 }
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl JpegCodec {
    fn encode_rgb(&self, rgb: &[u8], w: u32, h: u32) -> Result<Vec<u8>, CodecError> {
        let mut compressor =
            turbojpeg::Compressor::new().map_err(|e| CodecError::EncodeFailed(e.to_string()))?;
        compressor
            .set_quality(self.quality)
            .map_err(|e| CodecError::EncodeFailed(e.to_string()))?;

        let image = turbojpeg::Image {
            pixels: rgb,
            width: w as usize,
            pitch: (w * 3) as usize,
            height: h as usize,
            format: turbojpeg::PixelFormat::RGB,
        };

        compressor
            .compress_to_vec(image)
            .map_err(|e| CodecError::EncodeFailed(e.to_string()))
    }

    fn decode_rgb(&self, bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), CodecError> {
        let mut decompressor =
            turbojpeg::Decompressor::new().map_err(|e| CodecError::DecodeFailed(e.to_string()))?;

        let image: turbojpeg::Image<Vec<u8>> = decompressor
            .decompress_to_vec(bytes)
            .map_err(|e| CodecError::DecodeFailed(e.to_string()))?;

        let w = image.width as u32;
        let h = image.height as u32;
        Ok((image.pixels, w, h))
    }
}

impl TileCodec for JpegCodec {
    fn encode(&self, rgb: &[u8], w: u32, h: u32) -> Result<Vec<u8>, CodecError> {
        self.encode_rgb(rgb, w, h)
    }

    fn decode(&self, bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), CodecError> {
        self.decode_rgb(bytes)
    }
}

impl FrameCodec for JpegCodec {
    fn encode(&self, rgb: &[u8], w: u32, h: u32) -> Result<Vec<u8>, CodecError> {
        self.encode_rgb(rgb, w, h)
    }

    fn decode(&self, bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), CodecError> {
        self.decode_rgb(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_is_clamped_into_range() {
        let low = JpegCodec::new(0);
        let high = JpegCodec::new(255);
        assert_eq!(low.quality, 1);
        assert_eq!(high.quality, 100);
    }

    #[test]
    fn default_quality_matches_constant() {
        let codec = JpegCodec::default();
        assert_eq!(codec.quality, DEFAULT_QUALITY as i32);
    }
}
