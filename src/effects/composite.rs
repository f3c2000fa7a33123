use crate::foundation::error::{BrandframeError, BrandframeResult};
use crate::foundation::math::mul_div255_u8;

pub type PremulRgba8 = [u8; 4];

/// Source-over for one premultiplied pixel, with `src` scaled by `opacity`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Composite `src` over `dst` (equal-size premultiplied RGBA8 buffers).
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> BrandframeResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(BrandframeError::evaluation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    if opacity >= 1.0 {
        for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            match s[3] {
                0 => {}
                255 => d.copy_from_slice(s),
                _ => {
                    let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], 1.0);
                    d.copy_from_slice(&out);
                }
            }
        }
        return Ok(());
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Fill every pixel with `rgba` (already premultiplied).
pub fn fill(buf: &mut [u8], rgba: PremulRgba8) {
    for px in buf.chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

/// Replace color channels with `rgb` while keeping coverage: turns a rendered glyph mask into
/// a solid-colored silhouette (used for drop shadows).
pub fn tint_by_alpha(buf: &mut [u8], color_premul: PremulRgba8) {
    for px in buf.chunks_exact_mut(4) {
        let cov = u16::from(px[3]);
        px[0] = mul_div255(u16::from(color_premul[0]), cov);
        px[1] = mul_div255(u16::from(color_premul[1]), cov);
        px[2] = mul_div255(u16::from(color_premul[2]), cov);
        px[3] = mul_div255(u16::from(color_premul[3]), cov);
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    mul_div255_u8(x, y)
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
