use serde::{Deserialize, Serialize};

/// Geometric and photometric adjustments applied to the source media.
///
/// Percentages use 100 as identity. All values are clamped into their documented ranges by
/// [`Adjustments::clamped`]; rendering always goes through the clamped form.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    /// Uniform zoom, `0.5..=3`.
    pub scale: f64,
    /// Rotation in degrees, normalized into `[0, 360)`.
    pub rotation_deg: f64,
    pub flip_h: bool,
    pub flip_v: bool,
    /// `0..=200`.
    pub brightness_pct: f64,
    /// `0..=200`.
    pub contrast_pct: f64,
    /// `0..=200`.
    pub saturation_pct: f64,
    /// Gaussian blur radius in canvas pixels, `0..=20`.
    pub blur_px: f64,
    /// Horizontal pan in canvas pixels, `-500..=500`.
    pub offset_x: f64,
    /// Vertical pan in canvas pixels, `-500..=500`.
    pub offset_y: f64,
}

impl Adjustments {
    pub const SCALE_RANGE: (f64, f64) = (0.5, 3.0);
    pub const PERCENT_RANGE: (f64, f64) = (0.0, 200.0);
    pub const BLUR_RANGE: (f64, f64) = (0.0, 20.0);
    pub const OFFSET_RANGE: (f64, f64) = (-500.0, 500.0);

    pub const IDENTITY: Adjustments = Adjustments {
        scale: 1.0,
        rotation_deg: 0.0,
        flip_h: false,
        flip_v: false,
        brightness_pct: 100.0,
        contrast_pct: 100.0,
        saturation_pct: 100.0,
        blur_px: 0.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn is_identity(&self) -> bool {
        self.clamped() == Self::IDENTITY
    }

    /// No brightness/contrast/saturation/blur change.
    pub fn is_filter_identity(&self) -> bool {
        let c = self.clamped();
        c.brightness_pct == 100.0
            && c.contrast_pct == 100.0
            && c.saturation_pct == 100.0
            && c.blur_px == 0.0
    }

    /// Copy with every field forced into range. Non-finite values fall back to identity.
    pub fn clamped(&self) -> Self {
        fn clamp(v: f64, (lo, hi): (f64, f64), fallback: f64) -> f64 {
            if v.is_finite() { v.clamp(lo, hi) } else { fallback }
        }
        let rot = if self.rotation_deg.is_finite() {
            self.rotation_deg.rem_euclid(360.0)
        } else {
            0.0
        };
        Self {
            scale: clamp(self.scale, Self::SCALE_RANGE, 1.0),
            rotation_deg: if rot >= 360.0 { 0.0 } else { rot },
            flip_h: self.flip_h,
            flip_v: self.flip_v,
            brightness_pct: clamp(self.brightness_pct, Self::PERCENT_RANGE, 100.0),
            contrast_pct: clamp(self.contrast_pct, Self::PERCENT_RANGE, 100.0),
            saturation_pct: clamp(self.saturation_pct, Self::PERCENT_RANGE, 100.0),
            blur_px: clamp(self.blur_px, Self::BLUR_RANGE, 0.0),
            offset_x: clamp(self.offset_x, Self::OFFSET_RANGE, 0.0),
            offset_y: clamp(self.offset_y, Self::OFFSET_RANGE, 0.0),
        }
    }

    /// Rotate a quarter turn clockwise.
    pub fn rotate_clockwise(&mut self) {
        self.rotation_deg = (self.clamped().rotation_deg + 90.0).rem_euclid(360.0);
    }
}

impl Default for Adjustments {
    fn default() -> Self {
        Self::IDENTITY
    }
}
