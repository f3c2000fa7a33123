use std::collections::BTreeSet;
use std::process::{Command, Stdio};

use crate::foundation::error::{BrandframeError, BrandframeResult};

/// Output container/codec combination, listed in preference order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerProfile {
    /// MP4 with H.264 video and AAC audio.
    Mp4H264Aac,
    WebmVp9Opus,
    WebmVp8Opus,
    /// WebM with VP9 video and no audio track.
    WebmVp9,
    /// WebM with whatever codecs ffmpeg picks by default.
    WebmBare,
}

impl ContainerProfile {
    /// Fallback chain; the first profile the encoder set supports wins.
    pub const PREFERENCE: [ContainerProfile; 5] = [
        ContainerProfile::Mp4H264Aac,
        ContainerProfile::WebmVp9Opus,
        ContainerProfile::WebmVp8Opus,
        ContainerProfile::WebmVp9,
        ContainerProfile::WebmBare,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4H264Aac => "mp4",
            _ => "webm",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Mp4H264Aac => "video/mp4",
            _ => "video/webm",
        }
    }

    /// ffmpeg muxer name passed with `-f`.
    pub fn muxer(self) -> &'static str {
        match self {
            Self::Mp4H264Aac => "mp4",
            _ => "webm",
        }
    }

    pub fn video_encoder(self) -> Option<&'static str> {
        match self {
            Self::Mp4H264Aac => Some("libx264"),
            Self::WebmVp9Opus | Self::WebmVp9 => Some("libvpx-vp9"),
            Self::WebmVp8Opus => Some("libvpx"),
            Self::WebmBare => None,
        }
    }

    pub fn audio_encoder(self) -> Option<&'static str> {
        match self {
            Self::Mp4H264Aac => Some("aac"),
            Self::WebmVp9Opus | Self::WebmVp8Opus => Some("libopus"),
            Self::WebmVp9 | Self::WebmBare => None,
        }
    }

    /// Whether a source audio stream is carried into this container.
    pub fn carries_audio(self) -> bool {
        !matches!(self, Self::WebmVp9)
    }

    pub fn is_supported_by(self, encoders: &EncoderSet) -> bool {
        self.video_encoder().is_none_or(|e| encoders.contains(e))
            && self.audio_encoder().is_none_or(|e| encoders.contains(e))
    }

    /// Output-side codec arguments (everything between the inputs and the output path).
    pub fn codec_args(self, video_bitrate_bps: u64, audio_bitrate_bps: u64) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(v) = self.video_encoder() {
            args.extend(["-c:v".to_owned(), v.to_owned()]);
        }
        args.extend([
            "-pix_fmt".to_owned(),
            "yuv420p".to_owned(),
            "-b:v".to_owned(),
            video_bitrate_bps.to_string(),
        ]);
        if let Some(a) = self.audio_encoder() {
            args.extend([
                "-c:a".to_owned(),
                a.to_owned(),
                "-b:a".to_owned(),
                audio_bitrate_bps.to_string(),
            ]);
        }
        if self == Self::Mp4H264Aac {
            args.extend(["-movflags".to_owned(), "+faststart".to_owned()]);
        }
        args.extend(["-f".to_owned(), self.muxer().to_owned()]);
        args
    }
}

impl std::fmt::Display for ContainerProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Mp4H264Aac => "mp4 (h264+aac)",
            Self::WebmVp9Opus => "webm (vp9+opus)",
            Self::WebmVp8Opus => "webm (vp8+opus)",
            Self::WebmVp9 => "webm (vp9)",
            Self::WebmBare => "webm",
        };
        f.write_str(s)
    }
}

/// Encoder names a local ffmpeg build reports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncoderSet {
    names: BTreeSet<String>,
}

impl EncoderSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Parse the table printed by `ffmpeg -encoders`.
    ///
    /// Rows follow a `------` separator and look like ` V....D libx264   description`.
    pub fn parse(listing: &str) -> Self {
        let names = listing
            .lines()
            .skip_while(|l| !l.trim_start().starts_with("---"))
            .skip(1)
            .filter_map(|l| {
                let mut cols = l.split_whitespace();
                let flags = cols.next()?;
                let name = cols.next()?;
                (flags.len() == 6).then(|| name.to_owned())
            });
        Self::from_names(names)
    }

    /// Ask the ffmpeg on PATH which encoders it was built with.
    #[tracing::instrument(level = "debug")]
    pub fn probe() -> BrandframeResult<Self> {
        let out = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                BrandframeError::export_setup(format!(
                    "failed to run ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;
        if !out.status.success() {
            return Err(BrandframeError::export_setup(format!(
                "ffmpeg -encoders exited with status {}",
                out.status
            )));
        }
        let set = Self::parse(&String::from_utf8_lossy(&out.stdout));
        tracing::debug!(count = set.names.len(), "probed ffmpeg encoders");
        Ok(set)
    }
}

/// First profile in [`ContainerProfile::PREFERENCE`] the encoder set supports.
pub fn select_profile(encoders: &EncoderSet) -> ContainerProfile {
    ContainerProfile::PREFERENCE
        .into_iter()
        .find(|p| p.is_supported_by(encoders))
        .unwrap_or(ContainerProfile::WebmBare)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/container.rs"]
mod tests;
