use crate::foundation::core::{Affine, Point, Rect, Vec2};
use crate::model::annotation::{TextAlign, TextAnnotation};
use crate::text::fonts::FontBook;

/// Inset of the selection outline around the measured text block.
pub const SELECTION_PADDING: f64 = 5.0;

/// Measures text the way the renderer will draw it.
pub trait TextMeasure {
    /// Advance width of each line of `ann` (letter spacing included), in canvas pixels.
    fn line_widths(&mut self, ann: &TextAnnotation) -> Vec<f64>;
}

/// Placement of an annotation's lines relative to its anchor, before rotation.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockGeometry {
    pub line_height: f64,
    /// Vertical center of each line relative to the anchor.
    pub line_offsets_y: Vec<f64>,
    /// Left edge of each line relative to the anchor.
    pub line_x: Vec<f64>,
    pub line_widths: Vec<f64>,
    pub max_width: f64,
    /// Block box relative to the anchor; zero-sized for empty text.
    pub bounds: Rect,
}

/// Lay out `ann`'s lines around its anchor given measured widths.
///
/// Lines are stacked `line_height` apart and the stack is centered on the anchor:
/// line `i` of `n` sits at `-(n*h)/2 + h/2 + i*h`.
pub fn block_geometry(ann: &TextAnnotation, line_widths: &[f64]) -> BlockGeometry {
    let h = ann.line_height();
    let n = line_widths.len();
    let total = n as f64 * h;
    let line_offsets_y: Vec<f64> = (0..n)
        .map(|i| -total / 2.0 + h / 2.0 + i as f64 * h)
        .collect();
    let line_x: Vec<f64> = line_widths
        .iter()
        .map(|&w| align_offset(ann.text_align, w))
        .collect();
    let max_width = line_widths.iter().copied().fold(0.0, f64::max);

    let bounds = if ann.text.is_empty() || n == 0 {
        Rect::ZERO
    } else {
        let x0 = align_offset(ann.text_align, max_width);
        Rect::new(x0, -total / 2.0, x0 + max_width, total / 2.0)
    };

    BlockGeometry {
        line_height: h,
        line_offsets_y,
        line_x,
        line_widths: line_widths.to_vec(),
        max_width,
        bounds,
    }
}

fn align_offset(align: TextAlign, width: f64) -> f64 {
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => -width / 2.0,
        TextAlign::Right => -width,
    }
}

impl BlockGeometry {
    /// Outline drawn around the selected annotation (local space).
    pub fn selection_rect(&self) -> Rect {
        self.bounds.inflate(SELECTION_PADDING, SELECTION_PADDING)
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.area() <= 0.0
    }

    /// Whether canvas point `p` falls inside the (rotated) block of `ann`.
    pub fn contains(&self, ann: &TextAnnotation, p: Point) -> bool {
        if self.is_empty() {
            return false;
        }
        let local = local_to_canvas(ann).inverse() * p;
        self.selection_rect().contains(local)
    }
}

/// Transform from annotation-local space (anchor at origin) to canvas space.
pub fn local_to_canvas(ann: &TextAnnotation) -> Affine {
    Affine::translate(Vec2::new(ann.position.x, ann.position.y))
        * Affine::rotate(ann.rotation_deg.to_radians())
}

/// One shaped glyph run, positioned relative to its line's left edge and vertical center.
#[derive(Clone)]
pub struct ShapedRun {
    pub font: vello_cpu::peniko::FontData,
    pub font_size: f32,
    pub glyphs: Vec<vello_cpu::Glyph>,
    /// Faux bold/italic the font collection asked for because no matching face exists.
    pub synthesis: parley::fontique::Synthesis,
}

#[derive(Clone, Default)]
pub struct ShapedLine {
    pub width: f64,
    pub runs: Vec<ShapedRun>,
}

#[derive(Clone)]
pub struct ShapedBlock {
    pub lines: Vec<ShapedLine>,
    pub geometry: BlockGeometry,
}

/// Shapes annotation text with Parley against a [`FontBook`].
pub struct TextEngine {
    fonts: FontBook,
    layout_ctx: parley::LayoutContext<()>,
}

impl TextEngine {
    pub fn new(fonts: FontBook) -> Self {
        Self {
            fonts,
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontBook {
        &mut self.fonts
    }

    /// Shape every line of `ann` and compute its block geometry.
    pub fn shape(&mut self, ann: &TextAnnotation) -> ShapedBlock {
        let family = self.fonts.resolve(&ann.font_family);
        let lines: Vec<ShapedLine> = ann
            .lines()
            .into_iter()
            .map(|line| match family.as_deref() {
                Some(f) => self.shape_line(f, ann, line),
                None => ShapedLine::default(),
            })
            .collect();
        let widths: Vec<f64> = lines.iter().map(|l| l.width).collect();
        let geometry = block_geometry(ann, &widths);
        ShapedBlock { lines, geometry }
    }

    fn shape_line(&mut self, family: &str, ann: &TextAnnotation, line: &str) -> ShapedLine {
        if line.is_empty() {
            return ShapedLine::default();
        }

        let mut builder =
            self.layout_ctx
                .ranged_builder(self.fonts.font_ctx_mut(), line, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family.to_owned())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(
            ann.font_size_px as f32,
        ));
        if ann.bold {
            builder.push_default(parley::style::StyleProperty::FontWeight(
                parley::style::FontWeight::BOLD,
            ));
        }
        if ann.italic {
            builder.push_default(parley::style::StyleProperty::FontStyle(
                parley::style::FontStyle::Italic,
            ));
        }
        let mut layout: parley::Layout<()> = builder.build(line);
        layout.break_all_lines(None);

        let spacing = ann.letter_spacing_px as f32;
        let mut runs = Vec::new();
        let mut glyph_index = 0usize;
        for pline in layout.lines() {
            let m = pline.metrics();
            // Anchor lines on the middle of the em box.
            let baseline_shift = (m.ascent - m.descent) / 2.0 - m.baseline;
            for item in pline.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let font = self.fonts.cpu_font(run.run().font());
                let mut glyphs = Vec::new();
                for g in run.positioned_glyphs() {
                    glyphs.push(vello_cpu::Glyph {
                        id: g.id,
                        x: g.x + spacing * glyph_index as f32,
                        y: g.y + baseline_shift,
                    });
                    glyph_index += 1;
                }
                runs.push(ShapedRun {
                    font,
                    font_size: run.run().font_size(),
                    glyphs,
                    synthesis: run.run().synthesis(),
                });
            }
        }

        let mut width = f64::from(layout.full_width());
        if glyph_index > 1 {
            width += f64::from(spacing) * (glyph_index - 1) as f64;
        }
        ShapedLine {
            width: width.max(0.0),
            runs,
        }
    }
}

impl TextMeasure for TextEngine {
    fn line_widths(&mut self, ann: &TextAnnotation) -> Vec<f64> {
        self.shape(ann).lines.iter().map(|l| l.width).collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/layout.rs"]
mod tests;
