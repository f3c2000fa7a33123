use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::assets::decode::PreparedImage;
use crate::assets::media::{FfmpegFrameSource, FrameSource, VideoSourceInfo};
use crate::assets::pending::Pending;
use crate::encode::container::{ContainerProfile, EncoderSet, select_profile};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{AudioSource, FrameSink, SinkConfig};
use crate::export::delivery::{Artifact, artifact_file_name};
use crate::export::snapshot::ExportSnapshot;
use crate::foundation::core::Fps;
use crate::foundation::error::{BrandframeError, BrandframeResult};
use crate::render::compositor::Compositor;

/// Lifecycle of one video export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExportState {
    #[default]
    Idle,
    Preparing,
    Recording,
    Finalizing,
    Done,
    Failed,
}

impl ExportState {
    /// Whether an export is in flight (export controls stay disabled).
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Preparing | Self::Recording | Self::Finalizing)
    }
}

/// Progress report delivered to a [`ProgressCallback`].
#[derive(Clone, Debug, PartialEq)]
pub struct ExportProgress {
    /// `0..=100`, never decreasing within one export.
    pub percent: f64,
    /// Decode clock position in seconds.
    pub current_time_sec: f64,
    pub duration_sec: f64,
    pub frames_encoded: u64,
    pub state: ExportState,
}

pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Shared flag checked once per presented frame.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Encoder parameters for a video export.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoEncodeSettings {
    pub fps: Fps,
    pub video_bitrate_bps: u64,
    pub audio_bitrate_bps: u64,
    /// Straight-alpha RGBA8 used to flatten transparent pixels.
    pub bg_rgba: [u8; 4],
}

impl Default for VideoEncodeSettings {
    fn default() -> Self {
        Self {
            fps: Fps { num: 30, den: 1 },
            video_bitrate_bps: 5_000_000,
            audio_bitrate_bps: 128_000,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Everything the ffmpeg-backed export needs.
#[derive(Debug)]
pub struct VideoExportRequest {
    /// Frozen editing state. Its template is replaced by `template` once that settles.
    pub snapshot: ExportSnapshot,
    /// Template still loading when the export was requested.
    pub template: Option<Pending<PreparedImage>>,
    pub source: VideoSourceInfo,
    pub settings: VideoEncodeSettings,
    pub out_dir: PathBuf,
    pub ts_millis: u64,
}

/// Outcome of a presentation loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordingSummary {
    pub frames: u64,
    /// Decode clock when the loop stopped.
    pub end_time_sec: f64,
}

/// Drives the re-encode state machine: `Idle -> Preparing -> Recording -> Finalizing -> Done`.
///
/// Setup failures return to `Idle` with an [`BrandframeError::ExportSetup`]. Failures after
/// recording started end in `Failed`. A cancelled export returns to `Idle`.
pub struct VideoExporter {
    state: ExportState,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
    last_percent: f64,
    frames_encoded: u64,
}

impl Default for VideoExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoExporter {
    pub fn new() -> Self {
        Self {
            state: ExportState::Idle,
            progress: None,
            cancel: CancelToken::new(),
            last_percent: 0.0,
            frames_encoded: 0,
        }
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Full export through the system ffmpeg: probe encoders, pick a container, open a
    /// dedicated decoder, record, finalize. Partial output is removed on any failure.
    #[tracing::instrument(level = "debug", skip_all, fields(source = %req.source.source_path.display()))]
    pub fn run(
        &mut self,
        compositor: &mut Compositor,
        req: VideoExportRequest,
    ) -> BrandframeResult<Artifact> {
        self.begin_preparing()?;
        let VideoExportRequest {
            mut snapshot,
            template,
            source,
            settings,
            out_dir,
            ts_millis,
        } = req;

        let (profile, mut decoder) =
            match prepare(&mut snapshot, template, &source, settings.fps) {
                Ok(v) => v,
                Err(e) => return Err(self.setup_failed(e)),
            };

        let file_name =
            artifact_file_name(snapshot.department_name(), ts_millis, profile.extension());
        let out_path = out_dir.join(&file_name);
        let mut sink = FfmpegSink::new(FfmpegSinkOpts {
            bg_rgba: settings.bg_rgba,
            video_bitrate_bps: settings.video_bitrate_bps,
            audio_bitrate_bps: settings.audio_bitrate_bps,
            ..FfmpegSinkOpts::new(out_path.clone(), profile)
        });
        let cfg = SinkConfig {
            width: snapshot.canvas.width,
            height: snapshot.canvas.height,
            fps: settings.fps,
            audio: source.has_audio.then(|| AudioSource {
                path: source.source_path.clone(),
            }),
        };

        match self.record_prepared(compositor, &snapshot, &mut decoder, &mut sink, cfg) {
            Ok(summary) => {
                tracing::info!(
                    file = %file_name,
                    frames = summary.frames,
                    seconds = summary.end_time_sec,
                    "video exported"
                );
                Ok(Artifact::from_file(file_name, profile.mime(), out_path))
            }
            Err(e) => {
                drop(sink);
                remove_partial(&out_path);
                Err(e)
            }
        }
    }

    /// Run the presentation loop over an already opened `source` into `sink`.
    ///
    /// The snapshot is composited unchanged for every frame. `sink.begin` failing counts as a
    /// setup failure.
    pub fn record(
        &mut self,
        compositor: &mut Compositor,
        snapshot: &ExportSnapshot,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        cfg: SinkConfig,
    ) -> BrandframeResult<RecordingSummary> {
        if let Err(e) = self.begin_preparing() {
            source.stop();
            return Err(e);
        }
        self.record_prepared(compositor, snapshot, source, sink, cfg)
    }

    fn record_prepared(
        &mut self,
        compositor: &mut Compositor,
        snapshot: &ExportSnapshot,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        cfg: SinkConfig,
    ) -> BrandframeResult<RecordingSummary> {
        let frame_dur = cfg.fps.frame_duration_secs();
        if let Err(e) = sink.begin(cfg) {
            source.stop();
            return Err(self.setup_failed(e));
        }

        self.transition(ExportState::Recording);
        let duration = source.duration_sec();
        let bounded = duration.is_finite() && duration > 0.0;
        let mut clock = 0.0;

        let outcome = loop {
            if self.cancel.is_cancelled() {
                break Err(BrandframeError::Cancelled);
            }
            let frame = match source.next_frame() {
                Ok(Some(f)) => f,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };
            if bounded && frame.time_sec >= duration {
                break Ok(());
            }

            let pushed = compositor
                .compose(&snapshot.frame_inputs(Some(&frame.image)))
                .and_then(|composed| sink.push_frame(frame.index, &composed));
            if let Err(e) = pushed {
                break Err(e);
            }

            self.frames_encoded += 1;
            clock = frame.time_sec + frame_dur;
            if bounded {
                self.report(100.0 * clock / duration, clock, duration);
            }
        };
        source.stop();

        let outcome = outcome.and_then(|()| {
            if self.frames_encoded == 0 {
                Err(BrandframeError::evaluation("source video produced no frames"))
            } else {
                Ok(())
            }
        });
        if let Err(e) = outcome {
            sink.abort();
            if matches!(e, BrandframeError::Cancelled) {
                tracing::info!(frames = self.frames_encoded, "video export cancelled");
                self.transition(ExportState::Idle);
            } else {
                tracing::warn!(error = %e, frames = self.frames_encoded, "video export failed");
                self.transition(ExportState::Failed);
            }
            return Err(e);
        }

        self.transition(ExportState::Finalizing);
        if let Err(e) = sink.end() {
            tracing::warn!(error = %e, "encoder finalization failed");
            self.transition(ExportState::Failed);
            return Err(e);
        }

        self.transition(ExportState::Done);
        let end = if bounded { duration.min(clock) } else { clock };
        self.report(100.0, end, if bounded { duration } else { clock });
        Ok(RecordingSummary {
            frames: self.frames_encoded,
            end_time_sec: clock,
        })
    }

    fn begin_preparing(&mut self) -> BrandframeResult<()> {
        if self.state.is_busy() {
            return Err(BrandframeError::validation("a video export is already running"));
        }
        self.last_percent = 0.0;
        self.frames_encoded = 0;
        self.transition(ExportState::Preparing);
        self.report(0.0, 0.0, 0.0);
        Ok(())
    }

    fn setup_failed(&mut self, e: BrandframeError) -> BrandframeError {
        let e = match e {
            BrandframeError::ExportSetup(_) => e,
            other => BrandframeError::export_setup(other.to_string()),
        };
        tracing::warn!(error = %e, "video export setup failed");
        self.transition(ExportState::Idle);
        e
    }

    fn transition(&mut self, next: ExportState) {
        tracing::debug!(from = ?self.state, to = ?next, "export state");
        self.state = next;
    }

    fn report(&mut self, percent: f64, current_time_sec: f64, duration_sec: f64) {
        let percent = percent.clamp(0.0, 100.0).max(self.last_percent);
        let milestone = (percent / 25.0).floor() > (self.last_percent / 25.0).floor();
        self.last_percent = percent;
        if milestone {
            tracing::info!(percent = percent.round(), "video export progress");
        }
        if let Some(cb) = &self.progress {
            cb(ExportProgress {
                percent,
                current_time_sec,
                duration_sec,
                frames_encoded: self.frames_encoded,
                state: self.state,
            });
        }
    }
}

/// Settle the template, pick a container and open a dedicated decode instance.
fn prepare(
    snapshot: &mut ExportSnapshot,
    template: Option<Pending<PreparedImage>>,
    source: &VideoSourceInfo,
    fps: Fps,
) -> BrandframeResult<(ContainerProfile, FfmpegFrameSource)> {
    if let Some(pending) = template {
        let img = pending
            .wait()
            .map_err(|e| BrandframeError::export_setup(format!("template failed to load: {e}")))?;
        snapshot.template = Some(img);
    }
    let encoders = EncoderSet::probe()?;
    let profile = select_profile(&encoders);
    tracing::info!(%profile, "selected output container");
    let decoder = FfmpegFrameSource::open(source.clone(), fps)?;
    Ok((profile, decoder))
}

fn remove_partial(path: &std::path::Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial export"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove partial export"),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/video.rs"]
mod tests;
