use crate::assets::decode::PreparedImage;
use crate::foundation::error::{BrandframeError, BrandframeResult};

// Avoid pathological allocations from hostile width/height attributes.
const MAX_DIM: u32 = 16_384;

pub fn parse_svg(bytes: &[u8]) -> BrandframeResult<usvg::Tree> {
    let opts = usvg::Options::default();
    usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| BrandframeError::resource_load(format!("failed to parse svg: {e}")))
}

/// Rasterize `tree` stretched to exactly `width`x`height`, premultiplied RGBA8.
pub fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> BrandframeResult<PreparedImage> {
    if width == 0 || height == 0 || width > MAX_DIM || height > MAX_DIM {
        return Err(BrandframeError::validation(format!(
            "svg raster size out of range: {width}x{height} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }
    let size = tree.size();
    if !size.width().is_finite() || size.width() <= 0.0 || size.height() <= 0.0 {
        return Err(BrandframeError::resource_load("svg has invalid width/height"));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| BrandframeError::evaluation("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    PreparedImage::from_premul(width, height, pixmap.data().to_vec())
}
