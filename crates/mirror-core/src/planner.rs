//! Decides, for one captured frame, whether to emit a keyframe, a delta, or
//! nothing — and keeps the fingerprint cache consistent with that decision.

use crate::fingerprint::{Fingerprint, FingerprintCache};
use crate::tile::{TileGrid, TileRect};

pub const DEFAULT_FALLBACK_THRESHOLD: f64 = 0.7;

/// What the sender pipeline should do with a captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing changed; no frame content needs to go out beyond an `Empty` marker.
    Empty,
    /// Too much changed (or a keyframe was explicitly owed); encode the whole frame.
    Keyframe,
    /// A sparse set of tiles changed, in raster order.
    Delta { tiles: Vec<TileRect> },
}

/// Fingerprint-driven change detector and keyframe/delta/empty decision maker.
pub struct DeltaPlanner {
    grid: TileGrid,
    cache: FingerprintCache,
    fallback_threshold: f64,
    /// Set on session start, explicit `Resync`, or a sender-side encode
    /// failure; consumed (and cleared) the next time a frame is planned.
    force_keyframe: bool,
}

impl DeltaPlanner {
    pub fn new(grid: TileGrid, fallback_threshold: f64) -> Self {
        Self {
            grid,
            cache: FingerprintCache::new(),
            fallback_threshold,
            force_keyframe: true,
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Cache size, exposed for tests asserting invariant 4 (cache consistency).
    pub fn cached_tile_count(&self) -> usize {
        self.cache.len()
    }

    /// Invalidate the fingerprint cache and force a keyframe on the next
    /// planned frame. Triggered by connection start, an explicit client
    /// `Resync`, or a sender-side tile-encode failure.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
        self.force_keyframe = true;
    }

    /// Plan one captured RGB frame. `frame_rgb` must be exactly
    /// `grid.width() * grid.height() * 3` bytes (the grid's geometry).
    pub fn plan(&mut self, frame_rgb: &[u8]) -> Decision {
        let rects: Vec<TileRect> = self.grid.iter().collect();
        let total = rects.len();

        let mut digests: Vec<Fingerprint> = Vec::with_capacity(total);
        let mut changed: Vec<TileRect> = Vec::new();

        for rect in &rects {
            let tile_bytes = self.grid.extract(frame_rgb, rect);
            let fp = Fingerprint::of(&tile_bytes);
            if self.cache.get(rect.tx, rect.ty) != Some(fp) {
                changed.push(*rect);
            }
            digests.push(fp);
        }

        let changed_fraction = if total == 0 {
            0.0
        } else {
            changed.len() as f64 / total as f64
        };
        let is_keyframe = self.force_keyframe || changed_fraction > self.fallback_threshold;

        if is_keyframe {
            self.force_keyframe = false;
            for (rect, fp) in rects.iter().zip(digests.iter()) {
                self.cache.set(rect.tx, rect.ty, *fp);
            }
            return Decision::Keyframe;
        }

        if changed.is_empty() {
            return Decision::Empty;
        }

        for rect in &changed {
            let idx = (rect.ty * self.grid.tiles_x() + rect.tx) as usize;
            self.cache.set(rect.tx, rect.ty, digests[idx]);
        }

        Decision::Delta { tiles: changed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
        let mut buf = Vec::with_capacity((w * h * 3) as usize);
        for _ in 0..(w * h) {
            buf.extend_from_slice(&rgb);
        }
        buf
    }

    /// (S1) first frame is always a keyframe, cache populated for all cells.
    #[test]
    fn first_frame_is_keyframe() {
        let grid = TileGrid::new(128, 64, 64);
        let mut planner = DeltaPlanner::new(grid, DEFAULT_FALLBACK_THRESHOLD);
        let red = solid_frame(128, 64, [255, 0, 0]);
        let decision = planner.plan(&red);
        assert_eq!(decision, Decision::Keyframe);
        assert_eq!(planner.cached_tile_count(), 2);
    }

    /// (S2) identical consecutive frame after the first keyframe -> Empty, no cache mutation.
    #[test]
    fn identical_frame_is_empty() {
        let grid = TileGrid::new(128, 64, 64);
        let mut planner = DeltaPlanner::new(grid, DEFAULT_FALLBACK_THRESHOLD);
        let red = solid_frame(128, 64, [255, 0, 0]);
        planner.plan(&red);
        let before = planner.cached_tile_count();
        let decision = planner.plan(&red);
        assert_eq!(decision, Decision::Empty);
        assert_eq!(planner.cached_tile_count(), before);
    }

    /// (S3) only the left tile changes -> single-tile Delta.
    #[test]
    fn single_tile_change_is_delta() {
        let grid = TileGrid::new(128, 64, 64);
        let mut planner = DeltaPlanner::new(grid, DEFAULT_FALLBACK_THRESHOLD);
        let red = solid_frame(128, 64, [255, 0, 0]);
        planner.plan(&red);

        let mut half_green = red.clone();
        let stride = 128 * 3;
        for y in 0..64usize {
            for x in 0..64usize {
                let off = y * stride + x * 3;
                half_green[off..off + 3].copy_from_slice(&[0, 255, 0]);
            }
        }

        let decision = planner.plan(&half_green);
        match decision {
            Decision::Delta { tiles } => {
                assert_eq!(tiles.len(), 1);
                assert_eq!((tiles[0].tx, tiles[0].ty), (0, 0));
                assert_eq!((tiles[0].tw, tiles[0].th), (64, 64));
            }
            other => panic!("expected Delta, got {:?}", other),
        }
    }

    /// (S4) ragged edge tile keeps its true (tw, th).
    #[test]
    fn ragged_edge_keyframe_dimensions() {
        let grid = TileGrid::new(100, 64, 64);
        let mut planner = DeltaPlanner::new(grid, DEFAULT_FALLBACK_THRESHOLD);
        let frame = solid_frame(100, 64, [10, 20, 30]);
        assert_eq!(planner.plan(&frame), Decision::Keyframe);
        let right = grid.rect_at(1, 0);
        assert_eq!((right.tw, right.th), (36, 64));
    }

    /// (S6) threshold=0.5, 4 tiles, 3 change -> Keyframe instead of Delta, full cache refresh.
    #[test]
    fn above_threshold_falls_back_to_keyframe() {
        let grid = TileGrid::new(128, 128, 64); // 2x2 = 4 tiles
        let mut planner = DeltaPlanner::new(grid, 0.5);
        let base = solid_frame(128, 128, [0, 0, 0]);
        planner.plan(&base);

        let mut changed3 = base.clone();
        let stride = 128 * 3;
        // paint tiles (0,0), (1,0), (0,1) white, leave (1,1) untouched
        for (tx, ty) in [(0u32, 0u32), (1, 0), (0, 1)] {
            for y in 0..64usize {
                for x in 0..64usize {
                    let gx = tx as usize * 64 + x;
                    let gy = ty as usize * 64 + y;
                    let off = gy * stride + gx * 3;
                    changed3[off..off + 3].copy_from_slice(&[255, 255, 255]);
                }
            }
        }

        let decision = planner.plan(&changed3);
        assert_eq!(decision, Decision::Keyframe);
        assert_eq!(planner.cached_tile_count(), 4);
    }

    /// At threshold=1.0, `changed_fraction` (which maxes at 1.0) can never
    /// exceed it, so the threshold itself never fires a keyframe — only
    /// `force_keyframe` (session start, `Resync`, encode failure) still can.
    #[test]
    fn fallback_threshold_one_never_fires_via_threshold_alone() {
        let grid = TileGrid::new(128, 64, 64); // 2 tiles
        let mut planner = DeltaPlanner::new(grid, 1.0);
        let base = solid_frame(128, 64, [0, 0, 0]);
        planner.plan(&base); // keyframe

        let mut one_tile_changed = base.clone();
        let stride = 128 * 3;
        for y in 0..64usize {
            for x in 0..64usize {
                let off = y * stride + x * 3;
                one_tile_changed[off..off + 3].copy_from_slice(&[1, 1, 1]);
            }
        }
        // changed_fraction = 0.5, not > 1.0 -> Delta, even with every tile changed next tick
        assert!(matches!(planner.plan(&one_tile_changed), Decision::Delta { .. }));

        let all_changed = solid_frame(128, 64, [2, 2, 2]);
        assert!(matches!(planner.plan(&all_changed), Decision::Delta { .. }));
    }

    #[test]
    fn invalidate_forces_next_keyframe() {
        let grid = TileGrid::new(128, 64, 64);
        let mut planner = DeltaPlanner::new(grid, DEFAULT_FALLBACK_THRESHOLD);
        let red = solid_frame(128, 64, [255, 0, 0]);
        planner.plan(&red);
        planner.invalidate();
        assert_eq!(planner.cached_tile_count(), 0);
        assert_eq!(planner.plan(&red), Decision::Keyframe);
    }
}
