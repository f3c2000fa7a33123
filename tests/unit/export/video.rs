use std::sync::Mutex;

use super::*;
use crate::assets::media::MemoryFrameSource;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{Canvas, Point};
use crate::model::adjustments::Adjustments;
use crate::model::annotation::TextAnnotation;
use crate::render::backend::FrameRGBA;
use crate::text::fonts::FontBook;
use crate::text::layout::TextEngine;

const CANVAS: Canvas = Canvas {
    width: 40,
    height: 50,
};

fn fps2() -> Fps {
    Fps::new(2, 1).unwrap()
}

fn compositor() -> Compositor {
    Compositor::new(TextEngine::new(FontBook::new()))
}

fn snapshot() -> ExportSnapshot {
    let mut template = vec![0u8; CANVAS.rgba_len()];
    // Opaque white band across the top tenth.
    for px in template.chunks_exact_mut(4).take((CANVAS.width * 5) as usize) {
        px.copy_from_slice(&[255, 255, 255, 255]);
    }
    ExportSnapshot {
        canvas: CANVAS,
        department: Some("Events".into()),
        adjustments: Adjustments::IDENTITY,
        annotations: vec![TextAnnotation {
            text: String::new(),
            position: Point::new(20.0, 25.0),
            ..TextAnnotation::default()
        }],
        template: Some(Arc::new(
            PreparedImage::from_premul(CANVAS.width, CANVAS.height, template).unwrap(),
        )),
    }
}

/// Six solid frames, one color per half second (3 s at 2 fps).
fn solid_frames() -> Vec<PreparedImage> {
    (0..6u8)
        .map(|i| PreparedImage::solid(8, 10, [i * 40, 255 - i * 40, 30, 255]))
        .collect()
}

fn sink_cfg() -> SinkConfig {
    SinkConfig {
        width: CANVAS.width,
        height: CANVAS.height,
        fps: fps2(),
        audio: None,
    }
}

fn recorder() -> (VideoExporter, Arc<Mutex<Vec<ExportProgress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let exporter =
        VideoExporter::new().with_progress(Box::new(move |p| sink.lock().unwrap().push(p)));
    (exporter, seen)
}

#[test]
fn records_every_frame_and_reports_monotonic_progress() {
    let (mut exporter, seen) = recorder();
    let mut source = MemoryFrameSource::new(solid_frames(), fps2());
    let mut sink = InMemorySink::new();
    let summary = exporter
        .record(&mut compositor(), &snapshot(), &mut source, &mut sink, sink_cfg())
        .unwrap();

    assert_eq!(summary.frames, 6);
    assert_eq!(exporter.state(), ExportState::Done);
    assert!(sink.is_finished());
    let idx: Vec<u64> = sink.frames().iter().map(|(i, _)| *i).collect();
    assert_eq!(idx, vec![0, 1, 2, 3, 4, 5]);

    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0].percent <= w[1].percent));
    assert!(seen.iter().all(|p| (0.0..=100.0).contains(&p.percent)));
    let last = seen.last().unwrap();
    assert_eq!(last.percent, 100.0);
    assert_eq!(last.state, ExportState::Done);
}

#[test]
fn frame_at_one_and_a_half_seconds_matches_still_composite() {
    let snap = snapshot();
    let frames = solid_frames();
    let mut c = compositor();
    let expected: FrameRGBA = c.compose(&snap.frame_inputs(Some(&frames[3]))).unwrap();

    let mut source = MemoryFrameSource::new(frames, fps2());
    let mut sink = InMemorySink::new();
    VideoExporter::new()
        .record(&mut c, &snap, &mut source, &mut sink, sink_cfg())
        .unwrap();

    let (idx, got) = &sink.frames()[3];
    assert_eq!(fps2().frames_to_secs(*idx), 1.5);
    assert_eq!(got, &expected);
    // Template band stays on top of the background.
    assert_eq!(got.pixel(20, 0).unwrap(), [255, 255, 255, 255]);
}

#[test]
fn stops_when_clock_reaches_duration() {
    let frames: Vec<_> = solid_frames().into_iter().chain(solid_frames()).collect();
    let mut source = MemoryFrameSource::new(frames, fps2()).with_duration(2.0);
    let mut sink = InMemorySink::new();
    let mut exporter = VideoExporter::new();
    let summary = exporter
        .record(&mut compositor(), &snapshot(), &mut source, &mut sink, sink_cfg())
        .unwrap();
    assert_eq!(summary.frames, 4);
    assert_eq!(sink.frames().len(), 4);
}

#[test]
fn stops_at_end_of_stream_before_duration() {
    let (mut exporter, seen) = recorder();
    let frames = solid_frames().into_iter().take(2).collect();
    let mut source = MemoryFrameSource::new(frames, fps2()).with_duration(10.0);
    let mut sink = InMemorySink::new();
    exporter
        .record(&mut compositor(), &snapshot(), &mut source, &mut sink, sink_cfg())
        .unwrap();
    assert_eq!(sink.frames().len(), 2);
    assert_eq!(seen.lock().unwrap().last().unwrap().percent, 100.0);
}

#[test]
fn pre_cancelled_export_returns_to_idle_without_frames() {
    let token = CancelToken::new();
    token.cancel();
    let mut exporter = VideoExporter::new().with_cancel(token);
    let mut source = MemoryFrameSource::new(solid_frames(), fps2());
    let mut sink = InMemorySink::new();
    let err = exporter
        .record(&mut compositor(), &snapshot(), &mut source, &mut sink, sink_cfg())
        .unwrap_err();
    assert!(matches!(err, BrandframeError::Cancelled));
    assert_eq!(exporter.state(), ExportState::Idle);
    assert!(sink.is_aborted());
    assert!(sink.frames().is_empty());
}

#[test]
fn cancel_mid_recording_stops_the_loop() {
    let token = CancelToken::new();
    let trigger = token.clone();
    let mut exporter = VideoExporter::new()
        .with_cancel(token)
        .with_progress(Box::new(move |p| {
            if p.frames_encoded == 2 {
                trigger.cancel();
            }
        }));
    let mut source = MemoryFrameSource::new(solid_frames(), fps2());
    let mut sink = InMemorySink::new();
    let err = exporter
        .record(&mut compositor(), &snapshot(), &mut source, &mut sink, sink_cfg())
        .unwrap_err();
    assert!(matches!(err, BrandframeError::Cancelled));
    assert_eq!(sink.frames().len(), 2);
    assert!(!sink.is_finished());
}

struct RefusingSink;

impl FrameSink for RefusingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> BrandframeResult<()> {
        Err(BrandframeError::evaluation("no encoder"))
    }

    fn push_frame(&mut self, _idx: u64, _frame: &FrameRGBA) -> BrandframeResult<()> {
        unreachable!("never started")
    }

    fn end(&mut self) -> BrandframeResult<()> {
        unreachable!("never started")
    }
}

#[test]
fn encoder_setup_failure_is_export_setup_and_idle() {
    let mut exporter = VideoExporter::new();
    let mut source = MemoryFrameSource::new(solid_frames(), fps2());
    let err = exporter
        .record(&mut compositor(), &snapshot(), &mut source, &mut RefusingSink, sink_cfg())
        .unwrap_err();
    assert!(matches!(err, BrandframeError::ExportSetup(_)));
    assert!(err.is_user_facing());
    assert_eq!(exporter.state(), ExportState::Idle);
}

#[derive(Default)]
struct FlakySink {
    pushed: u64,
    aborted: bool,
}

impl FrameSink for FlakySink {
    fn begin(&mut self, _cfg: SinkConfig) -> BrandframeResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, _idx: u64, _frame: &FrameRGBA) -> BrandframeResult<()> {
        self.pushed += 1;
        if self.pushed == 3 {
            return Err(BrandframeError::evaluation("broken pipe"));
        }
        Ok(())
    }

    fn end(&mut self) -> BrandframeResult<()> {
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[test]
fn mid_recording_failure_ends_failed_and_aborts_sink() {
    let mut exporter = VideoExporter::new();
    let mut source = MemoryFrameSource::new(solid_frames(), fps2());
    let mut sink = FlakySink::default();
    let err = exporter
        .record(&mut compositor(), &snapshot(), &mut source, &mut sink, sink_cfg())
        .unwrap_err();
    assert!(matches!(err, BrandframeError::Evaluation(_)));
    assert_eq!(exporter.state(), ExportState::Failed);
    assert!(sink.aborted);
}

#[test]
fn empty_source_fails() {
    let mut exporter = VideoExporter::new();
    let mut source = MemoryFrameSource::new(Vec::new(), fps2()).with_duration(1.0);
    let mut sink = InMemorySink::new();
    assert!(
        exporter
            .record(&mut compositor(), &snapshot(), &mut source, &mut sink, sink_cfg())
            .is_err()
    );
    assert_eq!(exporter.state(), ExportState::Failed);
}

#[test]
fn exporter_can_run_again_after_done() {
    let mut exporter = VideoExporter::new();
    let mut c = compositor();
    for _ in 0..2 {
        let mut source = MemoryFrameSource::new(solid_frames(), fps2());
        let mut sink = InMemorySink::new();
        let s = exporter
            .record(&mut c, &snapshot(), &mut source, &mut sink, sink_cfg())
            .unwrap();
        assert_eq!(s.frames, 6);
    }
}

#[test]
fn default_encode_settings_match_social_targets() {
    let s = VideoEncodeSettings::default();
    assert_eq!((s.fps.num, s.fps.den), (30, 1));
    assert_eq!(s.video_bitrate_bps, 5_000_000);
    assert_eq!(s.audio_bitrate_bps, 128_000);
}
