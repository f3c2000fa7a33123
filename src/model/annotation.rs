use serde::{Deserialize, Serialize};

use crate::assets::color::Color;
use crate::foundation::core::{Canvas, Point};

/// Stable identity of a text annotation. Never reused after deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "text-{}", self.0)
    }
}

/// Horizontal alignment of each line relative to the anchor x.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// One styled text object on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextAnnotation {
    pub id: AnnotationId,
    /// May contain `\n` line breaks; lines are never wrapped automatically.
    pub text: String,
    /// Anchor in canvas space. The block is vertically centered on it.
    pub position: Point,
    pub font_size_px: f64,
    pub color: Color,
    pub font_family: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub opacity: f64,
    pub rotation_deg: f64,
    pub text_align: TextAlign,
    pub stroke_color: Color,
    pub stroke_width_px: f64,
    pub shadow_color: Color,
    pub shadow_blur_px: f64,
    pub shadow_offset_x: f64,
    pub shadow_offset_y: f64,
    pub letter_spacing_px: f64,
    pub line_height_multiplier: f64,
}

/// Family used when no catalog font is available.
pub const FALLBACK_FAMILY: &str = "Arial";
/// Text given to freshly created annotations.
pub const DEFAULT_TEXT: &str = "New Text";

impl TextAnnotation {
    pub const FONT_SIZE_RANGE: (f64, f64) = (12.0, 200.0);
    pub const ROTATION_RANGE: (f64, f64) = (-180.0, 180.0);
    pub const STROKE_RANGE: (f64, f64) = (0.0, 20.0);
    pub const SHADOW_BLUR_RANGE: (f64, f64) = (0.0, 50.0);
    pub const SHADOW_OFFSET_RANGE: (f64, f64) = (-50.0, 50.0);
    pub const LETTER_SPACING_RANGE: (f64, f64) = (-10.0, 50.0);

    /// A new annotation with the editor's default style, centered on the canvas.
    pub fn with_defaults(id: AnnotationId, font_family: impl Into<String>, canvas: Canvas) -> Self {
        Self {
            id,
            text: DEFAULT_TEXT.to_owned(),
            position: canvas.center(),
            font_size_px: 48.0,
            color: Color::WHITE,
            font_family: font_family.into(),
            bold: false,
            italic: false,
            underline: false,
            opacity: 1.0,
            rotation_deg: 0.0,
            text_align: TextAlign::Center,
            stroke_color: Color::BLACK,
            stroke_width_px: 0.0,
            shadow_color: Color::BLACK,
            shadow_blur_px: 0.0,
            shadow_offset_x: 0.0,
            shadow_offset_y: 0.0,
            letter_spacing_px: 0.0,
            line_height_multiplier: 1.2,
        }
    }

    /// Lines split on explicit breaks (`\n`, `\r\n`).
    pub fn lines(&self) -> Vec<&str> {
        self.text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect()
    }

    pub fn line_height(&self) -> f64 {
        self.font_size_px * self.line_height_multiplier
    }

    /// Copy with numeric style fields forced into range.
    pub fn clamped(&self) -> Self {
        fn clamp(v: f64, (lo, hi): (f64, f64), fallback: f64) -> f64 {
            if v.is_finite() { v.clamp(lo, hi) } else { fallback }
        }
        let mut out = self.clone();
        out.font_size_px = clamp(self.font_size_px, Self::FONT_SIZE_RANGE, 48.0);
        out.opacity = clamp(self.opacity, (0.0, 1.0), 1.0);
        out.rotation_deg = clamp(self.rotation_deg, Self::ROTATION_RANGE, 0.0);
        out.stroke_width_px = clamp(self.stroke_width_px, Self::STROKE_RANGE, 0.0);
        out.shadow_blur_px = clamp(self.shadow_blur_px, Self::SHADOW_BLUR_RANGE, 0.0);
        out.shadow_offset_x = clamp(self.shadow_offset_x, Self::SHADOW_OFFSET_RANGE, 0.0);
        out.shadow_offset_y = clamp(self.shadow_offset_y, Self::SHADOW_OFFSET_RANGE, 0.0);
        out.letter_spacing_px = clamp(self.letter_spacing_px, Self::LETTER_SPACING_RANGE, 0.0);
        out.line_height_multiplier = clamp(self.line_height_multiplier, (0.5, 5.0), 1.2);
        if !self.position.x.is_finite() || !self.position.y.is_finite() {
            out.position = Point::ZERO;
        }
        out
    }

    /// Apply a field-level update in place.
    pub fn apply(&mut self, patch: &TextPatch) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = &patch.$field { self.$field = v.clone(); })*
            };
        }
        set!(
            text,
            position,
            font_size_px,
            color,
            font_family,
            bold,
            italic,
            underline,
            opacity,
            rotation_deg,
            text_align,
            stroke_color,
            stroke_width_px,
            shadow_color,
            shadow_blur_px,
            shadow_offset_x,
            shadow_offset_y,
            letter_spacing_px,
            line_height_multiplier,
        );
    }
}

impl Default for TextAnnotation {
    fn default() -> Self {
        Self::with_defaults(AnnotationId(0), FALLBACK_FAMILY, Canvas::SOCIAL)
    }
}

/// Field-level update for a [`TextAnnotation`]; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextPatch {
    pub text: Option<String>,
    pub position: Option<Point>,
    pub font_size_px: Option<f64>,
    pub color: Option<Color>,
    pub font_family: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub opacity: Option<f64>,
    pub rotation_deg: Option<f64>,
    pub text_align: Option<TextAlign>,
    pub stroke_color: Option<Color>,
    pub stroke_width_px: Option<f64>,
    pub shadow_color: Option<Color>,
    pub shadow_blur_px: Option<f64>,
    pub shadow_offset_x: Option<f64>,
    pub shadow_offset_y: Option<f64>,
    pub letter_spacing_px: Option<f64>,
    pub line_height_multiplier: Option<f64>,
}

/// Ordered annotations: list order is paint order, reverse list order is hit-test priority.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationList {
    items: Vec<TextAnnotation>,
    next_id: u64,
}

impl AnnotationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt existing annotations (e.g. from a project file), keeping their ids.
    pub fn from_vec(items: Vec<TextAnnotation>) -> Self {
        let next_id = items.iter().map(|a| a.id.0 + 1).max().unwrap_or(0);
        Self { items, next_id }
    }

    /// Append an annotation built by `make` around a fresh id.
    pub fn add_with(&mut self, make: impl FnOnce(AnnotationId) -> TextAnnotation) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        let mut ann = make(id);
        ann.id = id;
        self.items.push(ann);
        id
    }

    pub fn get(&self, id: AnnotationId) -> Option<&TextAnnotation> {
        self.items.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut TextAnnotation> {
        self.items.iter_mut().find(|a| a.id == id)
    }

    /// Returns `false` when `id` is unknown.
    pub fn update(&mut self, id: AnnotationId, patch: &TextPatch) -> bool {
        match self.get_mut(id) {
            Some(a) => {
                a.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: AnnotationId) -> Option<TextAnnotation> {
        let idx = self.items.iter().position(|a| a.id == id)?;
        Some(self.items.remove(idx))
    }

    pub fn as_slice(&self) -> &[TextAnnotation] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TextAnnotation> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/annotation.rs"]
mod tests;
