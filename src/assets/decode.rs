use std::sync::Arc;

use crate::foundation::error::{BrandframeError, BrandframeResult};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Decoded raster image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Wrap already-premultiplied pixels, validating the buffer length.
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> BrandframeResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| BrandframeError::validation("image size overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(BrandframeError::validation(format!(
                "image byte len mismatch: got {}, expected {expected}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Wrap straight-alpha RGBA8 pixels (as produced by decoders), premultiplying them.
    pub fn from_straight(width: u32, height: u32, mut rgba8: Vec<u8>) -> BrandframeResult<Self> {
        premultiply_rgba8_in_place(&mut rgba8);
        Self::from_premul(width, height, rgba8)
    }

    /// A single-color image, used for tests and solid templates.
    pub fn solid(width: u32, height: u32, premul: [u8; 4]) -> Self {
        let n = (width as usize) * (height as usize);
        let mut bytes = Vec::with_capacity(n * 4);
        for _ in 0..n {
            bytes.extend_from_slice(&premul);
        }
        Self {
            width,
            height,
            rgba8_premul: Arc::new(bytes),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Decode an uploaded raster image (PNG, JPEG, WebP, GIF, BMP, ...).
///
/// HEIC/HEIF containers are recognised up front and rejected with a hint to convert, since no
/// decoder for them is linked in.
pub fn decode_image(bytes: &[u8]) -> BrandframeResult<PreparedImage> {
    if is_heif(bytes) {
        return Err(BrandframeError::input_decode(
            "HEIC/HEIF images are not supported on this platform; convert the photo to JPEG or PNG and upload again",
        ));
    }
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| BrandframeError::input_decode(format!("could not decode image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(BrandframeError::input_decode("image has zero dimensions"));
    }
    PreparedImage::from_straight(width, height, rgba.into_raw())
}

/// Whether `bytes` look like an ISO-BMFF HEIF/HEIC container.
pub fn is_heif(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    matches!(
        &bytes[8..12],
        b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" | b"hevm" | b"hevs" | b"mif1"
            | b"msf1"
    )
}

/// Whether `bytes` look like an SVG document rather than a raster image.
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let t = text.trim_start_matches('\u{feff}').trim_start();
    t.starts_with("<svg") || (t.starts_with("<?xml") && text.contains("<svg"))
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
