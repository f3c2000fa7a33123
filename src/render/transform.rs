//! Resolves [`Adjustments`] into draw parameters for the background media.
//!
//! The canvas transform is composed as
//! `translate(center) * rotate(deg) * scale(sx, sy) * translate(-W/2 + ox, -H/2 + oy)`
//! where `sx`/`sy` carry the flips, and the media is then drawn into its cover-fit rectangle
//! under that transform with the filter chain applied to the drawn layer.

use crate::effects::filter::FilterChain;
use crate::foundation::core::{Affine, Canvas, Rect, Vec2};
use crate::foundation::error::{BrandframeError, BrandframeResult};
use crate::model::adjustments::Adjustments;

/// Cover-fit of a source inside the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverFit {
    /// `max(W / Nw, H / Nh)`.
    pub scale: f64,
    /// Centered destination rectangle in canvas space.
    pub dest: Rect,
}

/// Scale a `natural_w`x`natural_h` source so it fully covers `canvas`, center-cropped.
pub fn cover_fit(natural_w: u32, natural_h: u32, canvas: Canvas) -> BrandframeResult<CoverFit> {
    if natural_w == 0 || natural_h == 0 {
        return Err(BrandframeError::input_decode(format!(
            "source media has zero dimension ({natural_w}x{natural_h})"
        )));
    }
    let (cw, ch) = (canvas.width_f64(), canvas.height_f64());
    let (nw, nh) = (f64::from(natural_w), f64::from(natural_h));
    let scale = (cw / nw).max(ch / nh);
    let (dw, dh) = (nw * scale, nh * scale);
    let x = (cw - dw) / 2.0;
    let y = (ch - dh) / 2.0;
    Ok(CoverFit {
        scale,
        dest: Rect::new(x, y, x + dw, y + dh),
    })
}

/// Everything needed to paint the background layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawParams {
    /// Canvas transform applied before drawing `fit.dest`.
    pub transform: Affine,
    pub fit: CoverFit,
    pub filters: FilterChain,
}

impl DrawParams {
    /// Maps source pixel coordinates straight to canvas coordinates.
    pub fn image_transform(&self) -> Affine {
        self.transform
            * Affine::translate(Vec2::new(self.fit.dest.x0, self.fit.dest.y0))
            * Affine::scale(self.fit.scale)
    }
}

/// Resolve draw parameters for a `natural_w`x`natural_h` source under `adj`.
pub fn resolve(
    natural_w: u32,
    natural_h: u32,
    adj: &Adjustments,
    canvas: Canvas,
) -> BrandframeResult<DrawParams> {
    let fit = cover_fit(natural_w, natural_h, canvas)?;
    let a = adj.clamped();
    let (cw, ch) = (canvas.width_f64(), canvas.height_f64());
    let sx = a.scale * if a.flip_h { -1.0 } else { 1.0 };
    let sy = a.scale * if a.flip_v { -1.0 } else { 1.0 };

    let transform = Affine::translate(Vec2::new(cw / 2.0, ch / 2.0))
        * Affine::rotate(a.rotation_deg.to_radians())
        * Affine::scale_non_uniform(sx, sy)
        * Affine::translate(Vec2::new(-cw / 2.0 + a.offset_x, -ch / 2.0 + a.offset_y));

    Ok(DrawParams {
        transform,
        fit,
        filters: FilterChain::from_adjustments(&a),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/transform.rs"]
mod tests;
