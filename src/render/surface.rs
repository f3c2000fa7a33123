use std::sync::Arc;

use crate::assets::decode::PreparedImage;
use crate::foundation::core::Affine;
use crate::foundation::error::{BrandframeError, BrandframeResult};

/// Reusable `vello_cpu` context for drawing full-canvas layers.
///
/// `vello_cpu` renders into a fresh buffer, so each layer is drawn into its own pixmap and then
/// composited onto the frame buffer by the caller.
pub struct LayerPainter {
    ctx: Option<vello_cpu::RenderContext>,
}

impl Default for LayerPainter {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerPainter {
    pub fn new() -> Self {
        Self { ctx: None }
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut vello_cpu::RenderContext) -> BrandframeResult<R>,
    ) -> BrandframeResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(&mut ctx);
        self.ctx = Some(ctx);
        out
    }

    /// Draw with `f` into a transparent `width`x`height` layer and return its premultiplied bytes.
    pub fn paint_layer(
        &mut self,
        width: u32,
        height: u32,
        f: impl FnOnce(&mut vello_cpu::RenderContext) -> BrandframeResult<()>,
    ) -> BrandframeResult<Vec<u8>> {
        let (w, h) = dims_u16(width, height)?;
        self.with_ctx_mut(w, h, |ctx| {
            f(ctx)?;
            let mut pixmap = vello_cpu::Pixmap::new(w, h);
            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
            Ok(pixmap.data_as_u8_slice().to_vec())
        })
    }
}

fn dims_u16(width: u32, height: u32) -> BrandframeResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| BrandframeError::evaluation("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| BrandframeError::evaluation("surface height exceeds u16"))?;
    Ok((w, h))
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub(crate) fn rect_to_cpu(r: crate::foundation::core::Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> BrandframeResult<vello_cpu::Pixmap> {
    let (w, h) = dims_u16(width, height)?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(BrandframeError::evaluation("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

/// Image paint sampling `img` in its own pixel space.
pub(crate) fn image_paint(img: &PreparedImage) -> BrandframeResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(&img.rgba8_premul, img.width, img.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}
