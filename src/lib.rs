//! Brandframe composes branded social-media posts.
//!
//! A post is a user image or video, cover-fitted to a fixed 1080x1350 canvas with filters and
//! rotation/flip applied, overlaid with a department's template and any number of styled text
//! annotations. The same compositor backs the interactive preview, PNG still export, and the
//! ffmpeg-driven video re-encode.
//!
//! - Drive editing through an [`EditorSession`]
//! - Export stills with [`export_still`] or videos with a [`VideoExporter`]
//! - Manage shared departments and fonts through a [`SettingsService`]
#![forbid(unsafe_code)]

pub mod assets;
pub mod config;
pub mod effects;
pub mod encode;
pub mod export;
pub mod foundation;
pub mod logging;
pub mod model;
pub mod render;
pub mod session;
pub mod settings;
pub mod text;

pub use crate::foundation::core::{Affine, Canvas, Fps, Point, Rect, Rgba8Premul, Vec2};
pub use crate::foundation::error::{BrandframeError, BrandframeResult};

pub use crate::assets::color::Color;
pub use crate::assets::decode::{PreparedImage, decode_image};
pub use crate::assets::media::{
    FfmpegFrameSource, FrameSource, MemoryFrameSource, VideoSourceInfo, probe_video,
};
pub use crate::assets::pending::{Pending, Readiness};
pub use crate::config::{EditorConfig, ExportConfig, LoggingConfig};
pub use crate::encode::container::{ContainerProfile, EncoderSet, select_profile};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{AudioSource, FrameSink, InMemorySink, SinkConfig};
pub use crate::export::delivery::{
    Artifact, CommandShareTarget, Delivered, DeliveryMode, ShareError, ShareTarget, deliver,
};
pub use crate::export::snapshot::ExportSnapshot;
pub use crate::export::still::{StillExport, export_still};
pub use crate::export::video::{
    CancelToken, ExportProgress, ExportState, ProgressCallback, VideoEncodeSettings,
    RecordingSummary, VideoExportRequest, VideoExporter,
};
pub use crate::model::adjustments::Adjustments;
pub use crate::model::annotation::{
    AnnotationId, AnnotationList, TextAlign, TextAnnotation, TextPatch,
};
pub use crate::model::media::{MediaKind, SourceMedia};
pub use crate::render::backend::FrameRGBA;
pub use crate::render::compositor::{Compositor, FrameInputs};
pub use crate::session::editor::EditorSession;
pub use crate::settings::auth::{CredentialVerifier, SharedSecretVerifier};
pub use crate::settings::model::{Department, DepartmentPatch, FontCatalogEntry};
pub use crate::settings::service::SettingsService;
pub use crate::settings::store::{
    JsonFileSettingsStore, MemorySettingsStore, SettingsChange, SettingsStore,
};
pub use crate::text::fonts::FontBook;
pub use crate::text::layout::TextEngine;
