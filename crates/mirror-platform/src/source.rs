use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("display not available: {0}")]
    Unavailable(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

/// Yields raw RGB frames of a fixed geometry for a selected display.
///
/// `next_frame` always returns exactly `width * height * 3` bytes, row-major,
/// top-left origin, 8 bits per channel. Geometry is fixed for the lifetime of
/// a given `FrameSource`; a resolution change means tearing the session down
/// and starting a new one.
#[async_trait]
pub trait FrameSource: Send {
    /// Initialize capture, returning the fixed `(width, height)` for this session.
    async fn init(&mut self) -> Result<(u32, u32), SourceError>;

    /// Capture the next raw RGB frame. May suspend until a frame is ready.
    async fn next_frame(&mut self) -> Result<Vec<u8>, SourceError>;

    /// Current geometry, valid after `init` has returned successfully.
    fn geometry(&self) -> (u32, u32);
}
