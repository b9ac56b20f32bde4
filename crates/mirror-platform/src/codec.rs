use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    EncodeFailed(String),
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    #[error("decoded geometry {got:?} does not match expected {want:?}")]
    GeometryMismatch { want: (u32, u32), got: (u32, u32) },
}

/// Compresses/decompresses a single tile (a small RGB rectangle).
///
/// Implementations are expected to use a lossy small-image codec (WebP or
/// JPEG class). `encode` must be deterministic for identical input and
/// quality so the fingerprint-driven diffing in `mirror-core` stays
/// meaningful frame over frame.
pub trait TileCodec: Send + Sync {
    /// Encode a `w * h * 3` RGB rectangle at this codec's configured quality.
    fn encode(&self, rgb: &[u8], w: u32, h: u32) -> Result<Vec<u8>, CodecError>;

    /// Decode a tile payload back to `(rgb, w, h)`.
    fn decode(&self, bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), CodecError>;
}

/// Compresses/decompresses a full frame, used for keyframes.
pub trait FrameCodec: Send + Sync {
    /// Encode a `w * h * 3` RGB frame at this codec's configured quality.
    fn encode(&self, rgb: &[u8], w: u32, h: u32) -> Result<Vec<u8>, CodecError>;

    /// Decode a frame payload back to `(rgb, w, h)`.
    fn decode(&self, bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), CodecError>;
}
