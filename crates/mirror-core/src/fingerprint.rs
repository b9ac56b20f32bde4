//! Per-tile content fingerprints and the cache that backs change detection.
//!
//! Grounded on the teacher's own use of `sha2::Sha256` for content
//! verification in `auto_update.rs` — applied here to tile bytes instead of
//! downloaded update artifacts.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A tile's content digest: the full 32-byte SHA-256 of its RGB bytes.
/// Collision-resistant enough that natural scene changes never alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(tile_rgb: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tile_rgb);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Fingerprint(bytes)
    }
}

/// A total mapping from every grid cell to either `absent` or a digest.
///
/// Invariant: after a successful keyframe or delta emission for frame `N`,
/// the cache exactly reflects the tile contents transmitted for frame `N`
/// (not necessarily the raw captured contents, if the planner skipped a
/// tile on failure — see `planner::DeltaPlanner`).
#[derive(Debug, Default, Clone)]
pub struct FingerprintCache {
    entries: HashMap<(u32, u32), Fingerprint>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tx: u32, ty: u32) -> Option<Fingerprint> {
        self.entries.get(&(tx, ty)).copied()
    }

    pub fn set(&mut self, tx: u32, ty: u32, fp: Fingerprint) {
        self.entries.insert((tx, ty), fp);
    }

    /// Drop all cached digests, forcing a keyframe on the next planned frame.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_same_fingerprint() {
        let a = Fingerprint::of(&[1, 2, 3, 4]);
        let b = Fingerprint::of(&[1, 2, 3, 4]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_different_fingerprint() {
        let a = Fingerprint::of(&[1, 2, 3, 4]);
        let b = Fingerprint::of(&[1, 2, 3, 5]);
        assert_ne!(a, b);
    }

    #[test]
    fn cache_invalidate_clears_all() {
        let mut cache = FingerprintCache::new();
        cache.set(0, 0, Fingerprint::of(b"x"));
        cache.set(1, 0, Fingerprint::of(b"y"));
        assert_eq!(cache.len(), 2);
        cache.invalidate();
        assert!(cache.is_empty());
        assert!(cache.get(0, 0).is_none());
    }
}
