use crate::foundation::core::Fps;
use crate::foundation::error::{BrandframeError, BrandframeResult};
use crate::render::backend::FrameRGBA;
use std::path::PathBuf;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Optional media file whose first audio stream is carried into the output.
    pub audio: Option<AudioSource>,
}

/// Audio track routed from an existing media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    /// File holding the audio stream (usually the source video itself).
    pub path: PathBuf,
}

/// Sink contract for consuming composited frames in presentation order.
///
/// `push_frame` is called with strictly increasing indices. `abort` may be called instead of
/// `end` and must release every resource the sink holds.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> BrandframeResult<()>;
    /// Push one frame in strictly increasing order.
    fn push_frame(&mut self, idx: u64, frame: &FrameRGBA) -> BrandframeResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> BrandframeResult<()>;
    /// Tear down without finalizing. Output produced so far is left to the caller.
    fn abort(&mut self) {}
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(u64, FrameRGBA)>,
    finished: bool,
    aborted: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(u64, FrameRGBA)] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> BrandframeResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &FrameRGBA) -> BrandframeResult<()> {
        if self.cfg.is_none() {
            return Err(BrandframeError::evaluation("in-memory sink not started"));
        }
        if let Some((last, _)) = self.frames.last()
            && idx <= *last
        {
            return Err(BrandframeError::evaluation(
                "in-memory sink received out-of-order frame index",
            ));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> BrandframeResult<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}
