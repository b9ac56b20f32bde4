//! The capture-side pipeline: pull a frame, plan it, encode whatever the
//! plan calls for, hand back one wire [`Frame`] ready to transmit.
//!
//! Grounded on the teacher's `desktop.rs::run_desktop_session` capture loop,
//! generalized from "always JPEG-encode the whole tile grid" to "ask the
//! planner what changed first".

use mirror_platform::{FrameCodec, FrameSource, TileCodec};

use crate::error::CoreError;
use crate::planner::{Decision, DeltaPlanner};
use crate::tile::TileGrid;
use crate::wire::{now_millis, Frame, TileRecord};

/// Drives one [`FrameSource`] through the planner and a pair of codecs,
/// producing the wire [`Frame`] for each captured tick.
pub struct FrameSender<S, TC, FC> {
    source: S,
    grid: TileGrid,
    planner: DeltaPlanner,
    tile_codec: TC,
    frame_codec: FC,
    seq: u32,
}

impl<S, TC, FC> FrameSender<S, TC, FC>
where
    S: FrameSource,
    TC: TileCodec,
    FC: FrameCodec,
{
    pub async fn new(
        mut source: S,
        tile_codec: TC,
        frame_codec: FC,
        tile_size: u32,
        fallback_threshold: f64,
    ) -> Result<Self, CoreError> {
        let (w, h) = source
            .init()
            .await
            .map_err(|e| CoreError::Source(e.to_string()))?;
        let grid = TileGrid::new(w, h, tile_size);
        let planner = DeltaPlanner::new(grid, fallback_threshold);
        Ok(Self { source, grid, planner, tile_codec, frame_codec, seq: 0 })
    }

    pub fn geometry(&self) -> (u32, u32) {
        (self.grid.width(), self.grid.height())
    }

    /// Force the next planned frame to be a keyframe. Called after a peer
    /// `Resync` or after this sender's own encode failure invalidated the
    /// fingerprint cache's trustworthiness.
    pub fn force_keyframe(&mut self) {
        self.planner.invalidate();
    }

    /// Capture one frame, plan it, and encode the result into a wire frame.
    /// On an encode failure the fingerprint cache is invalidated (so the
    /// next call retries as a keyframe) and the error is returned instead of
    /// a partially-encoded frame.
    pub async fn next_frame(&mut self) -> Result<Frame, CoreError> {
        let captured = self
            .source
            .next_frame()
            .await
            .map_err(|e| CoreError::Source(e.to_string()))?;

        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        let ts = now_millis();

        let decision = self.planner.plan(&captured);
        match decision {
            Decision::Empty => Ok(Frame::Empty { seq, ts }),
            Decision::Keyframe => match self.frame_codec.encode(
                &captured,
                self.grid.width(),
                self.grid.height(),
            ) {
                Ok(payload) => Ok(Frame::Keyframe {
                    seq,
                    ts,
                    w: self.grid.width() as u16,
                    h: self.grid.height() as u16,
                    tile: self.grid.tile_size() as u16,
                    payload,
                }),
                Err(e) => {
                    self.planner.invalidate();
                    Err(CoreError::Codec(e.to_string()))
                }
            },
            Decision::Delta { tiles } => {
                let mut records = Vec::with_capacity(tiles.len());
                for rect in tiles {
                    let tile_rgb = self.grid.extract(&captured, &rect);
                    match self.tile_codec.encode(&tile_rgb, rect.tw, rect.th) {
                        Ok(data) => records.push(TileRecord {
                            tx: rect.tx as u16,
                            ty: rect.ty as u16,
                            tw: rect.tw as u16,
                            th: rect.th as u16,
                            data,
                        }),
                        Err(e) => {
                            self.planner.invalidate();
                            return Err(CoreError::Codec(e.to_string()));
                        }
                    }
                }
                Ok(Frame::Delta { seq, ts, tiles: records })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_fixtures::{IdentityCodec, ScriptedFrameSource};

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
        let mut buf = Vec::with_capacity((w * h * 3) as usize);
        for _ in 0..(w * h) {
            buf.extend_from_slice(&rgb);
        }
        buf
    }

    #[tokio::test]
    async fn first_frame_is_keyframe_with_whole_payload() {
        let frame0 = solid(4, 2, [1, 1, 1]);
        let source = ScriptedFrameSource::new(4, 2, vec![frame0.clone()]);
        let mut sender = FrameSender::new(source, IdentityCodec, IdentityCodec, 2, 0.7).await.unwrap();
        let frame = sender.next_frame().await.unwrap();
        match frame {
            Frame::Keyframe { seq, payload, .. } => {
                assert_eq!(seq, 0);
                // IdentityCodec prepends a 4-byte (w, h) header.
                assert_eq!(&payload[4..], frame0.as_slice());
            }
            other => panic!("expected Keyframe, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unchanged_second_frame_is_empty() {
        let frame0 = solid(4, 2, [1, 1, 1]);
        let source = ScriptedFrameSource::new(4, 2, vec![frame0.clone(), frame0]);
        let mut sender = FrameSender::new(source, IdentityCodec, IdentityCodec, 2, 0.7).await.unwrap();
        sender.next_frame().await.unwrap();
        let frame = sender.next_frame().await.unwrap();
        assert!(matches!(frame, Frame::Empty { seq: 1, .. }));
    }

    #[tokio::test]
    async fn forced_keyframe_ignores_cache() {
        let frame0 = solid(4, 2, [1, 1, 1]);
        let source = ScriptedFrameSource::new(4, 2, vec![frame0.clone(), frame0]);
        let mut sender = FrameSender::new(source, IdentityCodec, IdentityCodec, 2, 0.7).await.unwrap();
        sender.next_frame().await.unwrap();
        sender.force_keyframe();
        let frame = sender.next_frame().await.unwrap();
        assert!(matches!(frame, Frame::Keyframe { .. }));
    }
}
