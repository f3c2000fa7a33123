use crate::foundation::error::{BrandframeError, BrandframeResult};

/// Kernel radius for a gaussian of standard deviation `sigma` (3 sigma covers >99%).
pub fn radius_for_sigma(sigma: f32) -> u32 {
    if !sigma.is_finite() || sigma <= 0.0 {
        return 0;
    }
    (sigma * 3.0).ceil() as u32
}

/// Normalized gaussian weights in Q16 fixed point, summing to exactly `1 << 16`.
pub fn gaussian_kernel_q16(radius: u32, sigma: f32) -> BrandframeResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(BrandframeError::validation(
            "blur sigma must be finite and > 0",
        ));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = i as f64;
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(BrandframeError::evaluation("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let new_mid = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = new_mid as u32;
    }

    Ok(weights)
}

/// Separable gaussian blur of a premultiplied RGBA8 buffer, in place.
///
/// Pixels outside the buffer are treated as transparent, matching how a canvas filter blurs a
/// layer whose surroundings are empty.
pub fn blur_rgba8_premul(
    buf: &mut [u8],
    width: u32,
    height: u32,
    sigma: f32,
) -> BrandframeResult<()> {
    let expected = (width as usize) * (height as usize) * 4;
    if buf.len() != expected {
        return Err(BrandframeError::evaluation(
            "blur buffer does not match width*height*4",
        ));
    }
    let radius = radius_for_sigma(sigma);
    if radius == 0 || width == 0 || height == 0 {
        return Ok(());
    }
    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; buf.len()];
    horizontal_blur_q16(buf, &mut tmp, width, height, &kernel);
    vertical_blur_q16(&tmp, buf, width, height, &kernel);
    Ok(())
}

/// Blur only the pixels inside `[x0, x1) x [y0, y1)` (clamped to the buffer).
///
/// Callers pass a region that already includes the blur margin, so content outside it is
/// assumed transparent.
pub fn blur_region_rgba8_premul(
    buf: &mut [u8],
    width: u32,
    height: u32,
    region: (u32, u32, u32, u32),
    sigma: f32,
) -> BrandframeResult<()> {
    let (x0, y0) = (region.0.min(width), region.1.min(height));
    let (x1, y1) = (region.2.min(width), region.3.min(height));
    if x1 <= x0 || y1 <= y0 || radius_for_sigma(sigma) == 0 {
        return Ok(());
    }
    if x0 == 0 && y0 == 0 && x1 == width && y1 == height {
        return blur_rgba8_premul(buf, width, height, sigma);
    }

    let (rw, rh) = (x1 - x0, y1 - y0);
    let stride = width as usize * 4;
    let row_bytes = rw as usize * 4;
    let mut crop = Vec::with_capacity(row_bytes * rh as usize);
    for y in y0..y1 {
        let start = y as usize * stride + x0 as usize * 4;
        crop.extend_from_slice(&buf[start..start + row_bytes]);
    }
    blur_rgba8_premul(&mut crop, rw, rh, sigma)?;
    for (i, y) in (y0..y1).enumerate() {
        let start = y as usize * stride + x0 as usize * 4;
        buf[start..start + row_bytes].copy_from_slice(&crop[i * row_bytes..(i + 1) * row_bytes]);
    }
    Ok(())
}

fn horizontal_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        let row = (y * w) as usize;
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = x + ki as i32 - radius;
                if sx < 0 || sx >= w {
                    continue;
                }
                let idx = (row + sx as usize) * 4;
                for c in 0..4 {
                    acc[c] += (kw as u64) * (src[idx + c] as u64);
                }
            }
            let out_idx = (row + x as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = y + ki as i32 - radius;
                if sy < 0 || sy >= h {
                    continue;
                }
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += (kw as u64) * (src[idx + c] as u64);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    (v.min(255)) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
