//! The display-side pipeline: feed decoded wire frames in, get a
//! [`Canvas`] that always reflects a consistent reconstruction.
//!
//! Ties together [`SequenceMonitor`] (ordering) and [`Canvas`] (pixels).
//! Two independent reasons provoke a `Resync` request back to the sender:
//! a delta arriving before any keyframe has ever landed, and a delta
//! arriving after a detected sequence gap (applied anyway once the resync
//! is queued, per the accept-after-gap behavior below) or one that fails
//! to decode/paste cleanly.

use mirror_platform::TileCodec;

use crate::canvas::Canvas;
use crate::error::CoreError;
use crate::sequence::{SeqOutcome, SequenceMonitor};
use crate::tile::TileGrid;
use crate::wire::Frame;

/// What the receiver driver did with one incoming frame, and whether the
/// caller should now send a [`Frame::Resync`] back to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOutcome {
    pub applied: bool,
    pub request_resync: bool,
}

/// Drives a [`Canvas`] from a stream of decoded [`Frame`]s, using a
/// [`TileCodec`] to decode delta tile payloads and a frame decode closure
/// (injected per call) for keyframes.
pub struct FrameReceiver<TC> {
    grid: TileGrid,
    canvas: Canvas,
    monitor: SequenceMonitor,
    tile_codec: TC,
}

impl<TC> FrameReceiver<TC>
where
    TC: TileCodec,
{
    pub fn new(grid: TileGrid, tile_codec: TC) -> Self {
        let canvas = Canvas::new(grid.width(), grid.height());
        Self { grid, canvas, monitor: SequenceMonitor::new(), tile_codec }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Drop all accumulated state, as if a brand new connection just
    /// started. Called when the underlying transport reconnects.
    pub fn reset(&mut self) {
        self.canvas.reset();
        self.monitor.reset();
    }

    /// Apply one incoming frame, decoding keyframe payloads with
    /// `decode_frame` (injected so callers can supply a real `FrameCodec` or
    /// a fixture without this module depending on the codec's concrete
    /// type).
    pub fn apply(
        &mut self,
        frame: &Frame,
        decode_frame: impl FnOnce(&[u8]) -> Result<(Vec<u8>, u32, u32), CoreError>,
    ) -> Result<ReceiveOutcome, CoreError> {
        if frame.is_delta() && !self.canvas.is_ready() {
            return Ok(ReceiveOutcome { applied: false, request_resync: true });
        }

        let outcome = self.monitor.evaluate(frame.seq());
        let gap = match outcome {
            SeqOutcome::Discard => return Ok(ReceiveOutcome { applied: false, request_resync: false }),
            SeqOutcome::Accept { gap } => gap,
        };

        let mut request_resync = gap && frame.is_delta();

        match frame {
            Frame::Empty { .. } => {}
            Frame::Keyframe { w, h, payload, .. } => {
                let (rgb, dw, dh) = decode_frame(payload)?;
                if dw != *w as u32 || dh != *h as u32 {
                    return Err(CoreError::GeometryMismatch {
                        expected: (*w as u32, *h as u32),
                        got: (dw, dh),
                    });
                }
                self.canvas.apply_keyframe(rgb, dw, dh)?;
            }
            Frame::Delta { tiles, .. } => {
                self.canvas
                    .apply_delta(&self.grid, tiles, &self.tile_codec)?;
            }
            Frame::Resync { .. } | Frame::Input { .. } => {
                // These are receiver-to-sender control frames; a `FrameReceiver`
                // only ever sees sender-to-receiver traffic.
            }
        }

        Ok(ReceiveOutcome { applied: true, request_resync })
    }
}
