//! A synthetic [`FrameSource`] for the demo binary: a solid background with
//! a small square that drifts one pixel per frame, so the pipeline actually
//! has something to diff.

use async_trait::async_trait;
use mirror_platform::source::SourceError;
use mirror_platform::FrameSource;

pub struct SyntheticSource {
    width: u32,
    height: u32,
    box_size: u32,
    tick: u32,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, box_size: u32) -> Self {
        Self { width, height, box_size, tick: 0 }
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    async fn init(&mut self) -> Result<(u32, u32), SourceError> {
        Ok((self.width, self.height))
    }

    async fn next_frame(&mut self) -> Result<Vec<u8>, SourceError> {
        let mut buf = vec![20u8; (self.width * self.height * 3) as usize];

        let max_x = self.width.saturating_sub(self.box_size).max(1);
        let bx = self.tick % max_x;
        let by = self.height / 2;
        self.tick = self.tick.wrapping_add(2);

        let stride = (self.width * 3) as usize;
        for row in 0..self.box_size.min(self.height.saturating_sub(by)) {
            let y = by + row;
            let row_start = y as usize * stride + (bx * 3) as usize;
            for col in 0..self.box_size.min(self.width.saturating_sub(bx)) {
                let off = row_start + (col * 3) as usize;
                if off + 3 <= buf.len() {
                    buf[off..off + 3].copy_from_slice(&[220, 60, 60]);
                }
            }
        }

        Ok(buf)
    }

    fn geometry(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
