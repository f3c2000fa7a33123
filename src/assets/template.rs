use std::path::{Path, PathBuf};

use crate::assets::decode::{PreparedImage, decode_image, looks_like_svg};
use crate::assets::pending::Pending;
use crate::assets::source::AssetSource;
use crate::assets::svg_raster::{parse_svg, rasterize_svg_to_premul_rgba8};
use crate::foundation::core::Canvas;
use crate::foundation::error::{BrandframeError, BrandframeResult};

/// Resolve a department `template_url` to where its bytes live.
///
/// Accepts paths (relative ones are joined onto `base_dir`), `file://`, `http(s)://`, and
/// `data:` URLs.
pub fn resolve_template_source(
    template_url: &str,
    base_dir: &Path,
) -> BrandframeResult<AssetSource> {
    if template_url.trim().is_empty() {
        return Err(BrandframeError::resource_load("department has no template"));
    }
    AssetSource::parse(template_url, base_dir)
        .map_err(|e| BrandframeError::resource_load(format!("template: {e}")))
}

/// Decode template bytes. SVG templates are rasterized at the canvas size.
pub fn decode_template(bytes: &[u8], canvas: Canvas) -> BrandframeResult<PreparedImage> {
    if looks_like_svg(bytes) {
        let tree = parse_svg(bytes)?;
        return rasterize_svg_to_premul_rgba8(&tree, canvas.width, canvas.height);
    }
    decode_image(bytes).map_err(|e| BrandframeError::resource_load(format!("template: {e}")))
}

#[tracing::instrument(level = "debug", skip(base_dir))]
pub fn load_template(
    template_url: &str,
    base_dir: &Path,
    canvas: Canvas,
) -> BrandframeResult<PreparedImage> {
    let source = resolve_template_source(template_url, base_dir)?;
    let origin = source.describe();
    let bytes = source
        .read()
        .map_err(|e| BrandframeError::resource_load(format!("template: {e}")))?;
    let img = decode_template(&bytes, canvas)?;
    tracing::info!(
        source = %origin,
        width = img.width,
        height = img.height,
        "template loaded"
    );
    Ok(img)
}

/// Start loading a template in the background.
pub fn spawn_template_load(
    template_url: String,
    base_dir: PathBuf,
    canvas: Canvas,
) -> Pending<PreparedImage> {
    Pending::spawn("template", move || {
        load_template(&template_url, &base_dir, canvas)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/template.rs"]
mod tests;
