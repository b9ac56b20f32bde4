use std::collections::VecDeque;

use async_trait::async_trait;
use mirror_platform::source::SourceError;
use mirror_platform::FrameSource;

/// Hands back a scripted sequence of RGB frames, then repeats the last one
/// forever once the script is exhausted (useful for "steady state" tests
/// that don't care how many ticks they run for).
pub struct ScriptedFrameSource {
    width: u32,
    height: u32,
    frames: VecDeque<Vec<u8>>,
    last: Option<Vec<u8>>,
}

impl ScriptedFrameSource {
    pub fn new(width: u32, height: u32, frames: Vec<Vec<u8>>) -> Self {
        Self { width, height, frames: frames.into(), last: None }
    }
}

#[async_trait]
impl FrameSource for ScriptedFrameSource {
    async fn init(&mut self) -> Result<(u32, u32), SourceError> {
        Ok((self.width, self.height))
    }

    async fn next_frame(&mut self) -> Result<Vec<u8>, SourceError> {
        if let Some(frame) = self.frames.pop_front() {
            self.last = Some(frame.clone());
            Ok(frame)
        } else if let Some(frame) = &self.last {
            Ok(frame.clone())
        } else {
            Err(SourceError::Unavailable("no frames scripted".into()))
        }
    }

    fn geometry(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
