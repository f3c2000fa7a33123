use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::assets::decode::PreparedImage;
use crate::foundation::core::Fps;
use crate::foundation::error::{BrandframeError, BrandframeResult};

#[derive(Clone, Debug, PartialEq)]
/// Basic metadata about a source video file.
pub struct VideoSourceInfo {
    /// Path used for probing/decoding.
    pub source_path: PathBuf,
    /// Display width in pixels (after rotation metadata).
    pub width: u32,
    /// Display height in pixels (after rotation metadata).
    pub height: u32,
    /// Container duration in seconds.
    pub duration_sec: f64,
    /// Whether ffprobe detected at least one audio stream.
    pub has_audio: bool,
}

/// Probe source video metadata through `ffprobe`.
pub fn probe_video(source_path: &Path) -> BrandframeResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeSideData {
        rotation: Option<f64>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
        #[serde(default)]
        tags: std::collections::BTreeMap<String, String>,
        #[serde(default)]
        side_data_list: Vec<ProbeSideData>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| BrandframeError::input_decode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(BrandframeError::input_decode(format!(
            "could not read video '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| BrandframeError::input_decode(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| BrandframeError::input_decode("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| BrandframeError::input_decode("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| BrandframeError::input_decode("missing video height from ffprobe"))?;
    if width == 0 || height == 0 {
        return Err(BrandframeError::input_decode("video has zero dimensions"));
    }

    let rotation = video_stream
        .side_data_list
        .iter()
        .find_map(|sd| sd.rotation)
        .or_else(|| {
            video_stream
                .tags
                .get("rotate")
                .and_then(|r| r.parse::<f64>().ok())
        })
        .unwrap_or(0.0);
    let quarter_turn = (rotation.abs().round() as i64 / 90) % 2 == 1;
    let (width, height) = if quarter_turn {
        (height, width)
    } else {
        (width, height)
    };

    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video_stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| BrandframeError::input_decode("video has no usable duration"))?;

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        duration_sec,
        has_audio,
    })
}

/// How far before a failed seek to look again, in seconds. Seeks at or near the end of the stream
/// land past the last frame.
const SEEK_BACKOFF_SEC: [f64; 3] = [0.25, 1.0, 3.0];

/// Decode a single frame from source video at `source_time_sec`.
///
/// Times are clamped to the stream. When no frame exists at the requested time (typically the very
/// end of the clip) the nearest earlier frame is returned instead.
pub fn decode_video_frame(
    source: &VideoSourceInfo,
    source_time_sec: f64,
) -> BrandframeResult<PreparedImage> {
    let t = source_time_sec.clamp(0.0, source.duration_sec.max(0.0));
    let expected_len = frame_len(source)?;
    if let Some(frame) = decode_frame_at(source, t, expected_len)? {
        return Ok(frame);
    }
    for back in SEEK_BACKOFF_SEC {
        let earlier = (t - back).max(0.0);
        tracing::debug!(requested = t, retry_at = earlier, "no frame at seek time; backing off");
        if let Some(frame) = decode_frame_at(source, earlier, expected_len)? {
            return Ok(frame);
        }
        if earlier == 0.0 {
            break;
        }
    }
    Err(BrandframeError::input_decode(format!(
        "ffmpeg returned no frame at {t:.3}s for '{}'",
        source.source_path.display()
    )))
}

/// One ffmpeg seek; `Ok(None)` when the decoder produced no full frame.
fn decode_frame_at(
    source: &VideoSourceInfo,
    t: f64,
    expected_len: usize,
) -> BrandframeResult<Option<PreparedImage>> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{t:.6}")])
        .arg("-i")
        .arg(&source.source_path)
        .args([
            "-frames:v",
            "1",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            BrandframeError::evaluation(format!("failed to run ffmpeg for video decode: {e}"))
        })?;

    if !out.status.success() {
        return Err(BrandframeError::input_decode(format!(
            "ffmpeg video decode failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    if out.stdout.len() < expected_len {
        return Ok(None);
    }
    let mut bytes = out.stdout;
    bytes.truncate(expected_len);
    PreparedImage::from_straight(source.width, source.height, bytes).map(Some)
}

fn frame_len(source: &VideoSourceInfo) -> BrandframeResult<usize> {
    let len = source.width as usize * source.height as usize * 4;
    if len == 0 {
        return Err(BrandframeError::input_decode(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }
    Ok(len)
}

/// One frame presented by a [`FrameSource`].
#[derive(Clone, Debug)]
pub struct DecodedFrame {
    /// Zero-based presentation index.
    pub index: u64,
    /// Presentation time in seconds.
    pub time_sec: f64,
    pub image: PreparedImage,
}

/// A forward-only decode clock over a source video.
///
/// Frames come out in presentation order; `Ok(None)` means end-of-stream.
pub trait FrameSource: Send {
    /// Source duration in seconds.
    fn duration_sec(&self) -> f64;
    /// Next presented frame.
    fn next_frame(&mut self) -> BrandframeResult<Option<DecodedFrame>>;
    /// Release decoder resources. Safe to call more than once.
    fn stop(&mut self);
}

/// Streams a video at a fixed output rate from a dedicated `ffmpeg` process.
pub struct FfmpegFrameSource {
    info: VideoSourceInfo,
    fps: Fps,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    next_index: u64,
    buf: Vec<u8>,
}

impl FfmpegFrameSource {
    /// Open a new decode instance. Each export owns its own instance.
    pub fn open(info: VideoSourceInfo, fps: Fps) -> BrandframeResult<Self> {
        let len = frame_len(&info)?;
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&info.source_path)
            .args([
                "-an",
                "-vf",
                &format!("fps={}/{}", fps.num, fps.den),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BrandframeError::export_setup(format!("failed to start decoder: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrandframeError::export_setup("failed to open decoder stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| BrandframeError::export_setup("failed to open decoder stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        tracing::debug!(
            path = %info.source_path.display(),
            width = info.width,
            height = info.height,
            "opened video decoder"
        );

        Ok(Self {
            info,
            fps,
            child: Some(child),
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
            next_index: 0,
            buf: vec![0u8; len],
        })
    }

    pub fn info(&self) -> &VideoSourceInfo {
        &self.info
    }

    fn finish_stderr(&mut self) -> String {
        match self.stderr_drain.take().map(|h| h.join()) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).trim().to_owned(),
            _ => String::new(),
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn duration_sec(&self) -> f64 {
        self.info.duration_sec
    }

    fn next_frame(&mut self) -> BrandframeResult<Option<DecodedFrame>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };
        match read_full(stdout, &mut self.buf) {
            Ok(true) => {}
            Ok(false) => {
                self.stop();
                return Ok(None);
            }
            Err(e) => {
                self.stop();
                return Err(BrandframeError::evaluation(format!(
                    "failed to read decoded frame: {e}"
                )));
            }
        }

        let index = self.next_index;
        self.next_index += 1;
        let image = PreparedImage::from_straight(self.info.width, self.info.height, self.buf.clone())?;
        Ok(Some(DecodedFrame {
            index,
            time_sec: self.fps.frames_to_secs(index),
            image,
        }))
    }

    fn stop(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            let stderr = self.finish_stderr();
            if !stderr.is_empty() {
                tracing::debug!(stderr = %stderr, "video decoder stderr");
            }
        }
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fill `buf` completely. Returns `Ok(false)` on a clean end-of-stream before any byte.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                // A truncated trailing frame is treated as end-of-stream.
                return Ok(false);
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Frame source over pre-decoded images, for tests and previews.
pub struct MemoryFrameSource {
    frames: std::collections::VecDeque<PreparedImage>,
    fps: Fps,
    duration_sec: f64,
    next_index: u64,
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<PreparedImage>, fps: Fps) -> Self {
        let duration_sec = fps.frames_to_secs(frames.len() as u64);
        Self {
            frames: frames.into(),
            fps,
            duration_sec,
            next_index: 0,
        }
    }

    /// Override the reported duration (e.g. a container shorter than its frame count).
    pub fn with_duration(mut self, duration_sec: f64) -> Self {
        self.duration_sec = duration_sec;
        self
    }
}

impl FrameSource for MemoryFrameSource {
    fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    fn next_frame(&mut self) -> BrandframeResult<Option<DecodedFrame>> {
        let Some(image) = self.frames.pop_front() else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(DecodedFrame {
            index,
            time_sec: self.fps.frames_to_secs(index),
            image,
        }))
    }

    fn stop(&mut self) {
        self.frames.clear();
    }
}

/// Deletes the wrapped path on drop.
#[derive(Debug)]
pub struct TempFileGuard(pub PathBuf);

impl TempFileGuard {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Write uploaded bytes to a uniquely named temp file so ffmpeg can read them.
pub fn spill_to_temp(bytes: &[u8], ext: &str) -> BrandframeResult<TempFileGuard> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let ext = ext.trim_start_matches('.');
    let ext = if ext.is_empty() { "bin" } else { ext };
    let path = std::env::temp_dir().join(format!(
        "brandframe-upload-{}-{n}.{ext}",
        std::process::id()
    ));
    std::fs::write(&path, bytes).map_err(|e| {
        BrandframeError::evaluation(format!("failed to write temp file '{}': {e}", path.display()))
    })?;
    Ok(TempFileGuard(path))
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
