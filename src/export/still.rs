use crate::assets::decode::PreparedImage;
use crate::export::delivery::{Artifact, artifact_file_name};
use crate::export::snapshot::ExportSnapshot;
use crate::foundation::error::BrandframeResult;
use crate::render::backend::FrameRGBA;
use crate::render::compositor::Compositor;

pub const STILL_MIME: &str = "image/png";
pub const STILL_EXT: &str = "png";

/// A composed still and its encoded PNG artifact.
#[derive(Clone, Debug)]
pub struct StillExport {
    pub frame: FrameRGBA,
    pub artifact: Artifact,
}

/// Compose `snapshot` over `background` once and encode it as PNG.
///
/// For video sources `background` is the frame at the previewed timestamp.
#[tracing::instrument(level = "debug", skip_all, fields(department = ?snapshot.department))]
pub fn export_still(
    compositor: &mut Compositor,
    snapshot: &ExportSnapshot,
    background: Option<&PreparedImage>,
    ts_millis: u64,
) -> BrandframeResult<StillExport> {
    let frame = compositor.compose(&snapshot.frame_inputs(background))?;
    let png = frame.encode_png()?;
    let file_name = artifact_file_name(snapshot.department_name(), ts_millis, STILL_EXT);
    tracing::info!(file = %file_name, bytes = png.len(), "still exported");
    Ok(StillExport {
        frame,
        artifact: Artifact::from_bytes(file_name, STILL_MIME, png),
    })
}
