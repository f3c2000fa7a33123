//! Photometric filter chain applied to the background media layer.
//!
//! Each step is a 4x5 color matrix on straight-alpha values, clamped after every step, applied
//! in the fixed order brightness, contrast, saturation, then blur.

use crate::effects::blur::blur_rgba8_premul;
use crate::foundation::error::BrandframeResult;
use crate::model::adjustments::Adjustments;

/// Row-major 4x5 color matrix (`[r g b a offset]` per output channel).
pub type ColorMatrix = [f32; 20];

pub const IDENTITY_MATRIX: ColorMatrix = [
    1.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, 0.0,
];

/// `brightness(b)`: multiply color channels by `b`.
pub fn brightness_matrix(b: f32) -> ColorMatrix {
    [
        b, 0.0, 0.0, 0.0, 0.0, //
        0.0, b, 0.0, 0.0, 0.0, //
        0.0, 0.0, b, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]
}

/// `contrast(c)`: scale color channels about mid-grey.
pub fn contrast_matrix(c: f32) -> ColorMatrix {
    let o = 0.5 - 0.5 * c;
    [
        c, 0.0, 0.0, 0.0, o, //
        0.0, c, 0.0, 0.0, o, //
        0.0, 0.0, c, 0.0, o, //
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]
}

/// `saturate(s)`: interpolate between luminance grey (`s = 0`) and the input (`s = 1`).
pub fn saturate_matrix(s: f32) -> ColorMatrix {
    [
        0.213 + 0.787 * s,
        0.715 - 0.715 * s,
        0.072 - 0.072 * s,
        0.0,
        0.0,
        0.213 - 0.213 * s,
        0.715 + 0.285 * s,
        0.072 - 0.072 * s,
        0.0,
        0.0,
        0.213 - 0.213 * s,
        0.715 - 0.715 * s,
        0.072 + 0.928 * s,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
        0.0,
    ]
}

/// Filter chain resolved from [`Adjustments`]; factors use 1.0 as identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterChain {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    /// Gaussian standard deviation in canvas pixels.
    pub blur_px: f32,
}

impl FilterChain {
    pub const IDENTITY: FilterChain = FilterChain {
        brightness: 1.0,
        contrast: 1.0,
        saturation: 1.0,
        blur_px: 0.0,
    };

    pub fn from_adjustments(adj: &Adjustments) -> Self {
        let a = adj.clamped();
        Self {
            brightness: (a.brightness_pct / 100.0) as f32,
            contrast: (a.contrast_pct / 100.0) as f32,
            saturation: (a.saturation_pct / 100.0) as f32,
            blur_px: a.blur_px as f32,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// The color steps that differ from identity, in application order.
    pub fn color_steps(&self) -> Vec<ColorMatrix> {
        let mut steps = Vec::with_capacity(3);
        if self.brightness != 1.0 {
            steps.push(brightness_matrix(self.brightness));
        }
        if self.contrast != 1.0 {
            steps.push(contrast_matrix(self.contrast));
        }
        if self.saturation != 1.0 {
            steps.push(saturate_matrix(self.saturation));
        }
        steps
    }

    /// Apply the whole chain to a premultiplied RGBA8 layer in place.
    pub fn apply(&self, buf: &mut [u8], width: u32, height: u32) -> BrandframeResult<()> {
        let steps = self.color_steps();
        if !steps.is_empty() {
            color_matrix_chain_rgba8_premul(buf, &steps);
        }
        if self.blur_px > 0.0 {
            blur_rgba8_premul(buf, width, height, self.blur_px)?;
        }
        Ok(())
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Apply `steps` in order, clamping to `[0,1]` between steps.
pub fn color_matrix_chain_rgba8_premul(buf: &mut [u8], steps: &[ColorMatrix]) {
    for px in buf.chunks_exact_mut(4) {
        let pa = px[3] as f32 / 255.0;
        if pa <= 0.0 {
            continue;
        }

        // Convert premul -> straight for matrix application.
        let inv_a = 1.0 / pa;
        let mut c = [
            px[0] as f32 / 255.0 * inv_a,
            px[1] as f32 / 255.0 * inv_a,
            px[2] as f32 / 255.0 * inv_a,
            pa,
        ];
        for m in steps {
            c = apply_matrix(m, c);
        }

        let out_a = c[3];
        px[0] = ((c[0] * out_a) * 255.0).round().clamp(0.0, 255.0) as u8;
        px[1] = ((c[1] * out_a) * 255.0).round().clamp(0.0, 255.0) as u8;
        px[2] = ((c[2] * out_a) * 255.0).round().clamp(0.0, 255.0) as u8;
        px[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

fn apply_matrix(m: &ColorMatrix, [r, g, b, a]: [f32; 4]) -> [f32; 4] {
    [
        (m[0] * r + m[1] * g + m[2] * b + m[3] * a + m[4]).clamp(0.0, 1.0),
        (m[5] * r + m[6] * g + m[7] * b + m[8] * a + m[9]).clamp(0.0, 1.0),
        (m[10] * r + m[11] * g + m[12] * b + m[13] * a + m[14]).clamp(0.0, 1.0),
        (m[15] * r + m[16] * g + m[17] * b + m[18] * a + m[19]).clamp(0.0, 1.0),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/effects/filter.rs"]
mod tests;
