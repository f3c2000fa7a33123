use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assets::decode::PreparedImage;
use crate::assets::media::{TempFileGuard, VideoSourceInfo};

/// Declared kind of an uploaded file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

const IMAGE_EXTS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "gif", "bmp", "tif", "tiff", "heic", "heif",
];
const VIDEO_EXTS: &[&str] = &["mp4", "mov", "m4v", "webm", "mkv", "avi", "3gp"];

impl MediaKind {
    /// Classify from a MIME type, falling back to the file extension.
    pub fn from_declared(mime: Option<&str>, file_name: Option<&str>) -> Option<Self> {
        if let Some(m) = mime.map(str::trim).filter(|m| !m.is_empty()) {
            let m = m.to_ascii_lowercase();
            if m.starts_with("image/") {
                return Some(Self::Image);
            }
            if m.starts_with("video/") {
                return Some(Self::Video);
            }
        }
        let ext = file_name?.rsplit_once('.')?.1.to_ascii_lowercase();
        if IMAGE_EXTS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// The single active source of an editing session.
#[derive(Clone, Debug)]
pub enum SourceMedia {
    Image(PreparedImage),
    Video(VideoMedia),
}

/// A probed video plus the frame currently shown in the preview.
#[derive(Clone, Debug)]
pub struct VideoMedia {
    pub info: VideoSourceInfo,
    /// Frame at `preview_time_sec`.
    pub preview_frame: PreparedImage,
    pub preview_time_sec: f64,
    /// Keeps an uploaded temp copy alive for as long as the media is in use.
    pub(crate) backing_file: Option<Arc<TempFileGuard>>,
}

impl SourceMedia {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Image(_) => MediaKind::Image,
            Self::Video(_) => MediaKind::Video,
        }
    }

    /// Natural (un-fitted) size in pixels.
    pub fn natural_size(&self) -> (u32, u32) {
        match self {
            Self::Image(img) => (img.width, img.height),
            Self::Video(v) => (v.info.width, v.info.height),
        }
    }

    /// Pixels to draw for the current preview.
    pub fn current_frame(&self) -> &PreparedImage {
        match self {
            Self::Image(img) => img,
            Self::Video(v) => &v.preview_frame,
        }
    }

    pub fn as_video(&self) -> Option<&VideoMedia> {
        match self {
            Self::Video(v) => Some(v),
            Self::Image(_) => None,
        }
    }
}
