use crate::assets::color::Color;
use crate::effects::blur::{blur_region_rgba8_premul, radius_for_sigma};
use crate::effects::composite::over_in_place;
use crate::foundation::core::{Affine, Canvas, Rect, Vec2};
use crate::foundation::error::BrandframeResult;
use crate::model::annotation::TextAnnotation;
use crate::render::surface::{LayerPainter, affine_to_cpu, rect_to_cpu};
use crate::text::layout::{BlockGeometry, ShapedBlock, ShapedRun, local_to_canvas};

/// Highlight used for the selection outline.
pub const SELECTION_COLOR: Color = Color::rgb(0x3b, 0x82, 0xf6);
/// Stroke width of the selection outline.
pub const SELECTION_STROKE_PX: f64 = 3.0;

/// Paint one shaped annotation over `frame` (premultiplied, `canvas`-sized).
///
/// Per annotation: blurred drop shadow, then for each line stroke, fill and underline. The whole
/// group is rotated about the anchor and blended at the annotation's opacity.
pub fn paint_annotation(
    frame: &mut [u8],
    canvas: Canvas,
    painter: &mut LayerPainter,
    block: &ShapedBlock,
    ann: &TextAnnotation,
) -> BrandframeResult<()> {
    if block.geometry.is_empty() || ann.opacity <= 0.0 {
        return Ok(());
    }
    let local = local_to_canvas(ann);

    let mut group = if ann.shadow_blur_px > 0.0 && ann.shadow_color.a > 0 {
        // Shadow offsets are in device space, unaffected by the annotation's rotation.
        let shifted = Affine::translate(Vec2::new(ann.shadow_offset_x, ann.shadow_offset_y)) * local;
        let mut shadow = painter.paint_layer(canvas.width, canvas.height, |ctx| {
            draw_body(ctx, block, ann, shifted, Some(ann.shadow_color));
            Ok(())
        })?;
        let sigma = (ann.shadow_blur_px / 2.0) as f32;
        let region = device_region(&block.geometry, ann, shifted, sigma, canvas);
        blur_region_rgba8_premul(&mut shadow, canvas.width, canvas.height, region, sigma)?;
        shadow
    } else {
        vec![0u8; canvas.rgba_len()]
    };

    let body = painter.paint_layer(canvas.width, canvas.height, |ctx| {
        draw_body(ctx, block, ann, local, None);
        Ok(())
    })?;
    over_in_place(&mut group, &body, 1.0)?;
    over_in_place(frame, &group, ann.opacity as f32)
}

fn draw_body(
    ctx: &mut vello_cpu::RenderContext,
    block: &ShapedBlock,
    ann: &TextAnnotation,
    transform: Affine,
    tint: Option<Color>,
) {
    let g = &block.geometry;
    let size = ann.font_size_px;
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    for (i, line) in block.lines.iter().enumerate() {
        let dx = g.line_x[i] as f32;
        let dy = g.line_offsets_y[i] as f32;
        let placed = |glyphs: &[vello_cpu::Glyph]| {
            glyphs
                .iter()
                .map(|gl| vello_cpu::Glyph {
                    id: gl.id,
                    x: gl.x + dx,
                    y: gl.y + dy,
                })
                .collect::<Vec<_>>()
        };

        if ann.stroke_width_px > 0.0 {
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(ann.stroke_width_px));
            ctx.set_paint(tint.unwrap_or(ann.stroke_color).to_cpu());
            for run in &line.runs {
                ctx.glyph_run(&run.font)
                    .font_size(run.font_size)
                    .glyph_transform(glyph_transform(run))
                    .stroke_glyphs(placed(&run.glyphs).into_iter());
            }
        }

        ctx.set_paint(tint.unwrap_or(ann.color).to_cpu());
        for run in &line.runs {
            ctx.glyph_run(&run.font)
                .font_size(run.font_size)
                .glyph_transform(glyph_transform(run))
                .fill_glyphs(placed(&run.glyphs).into_iter());
            if run.synthesis.embolden() {
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(embolden_width(run.font_size)));
                ctx.glyph_run(&run.font)
                    .font_size(run.font_size)
                    .glyph_transform(glyph_transform(run))
                    .stroke_glyphs(placed(&run.glyphs).into_iter());
            }
        }

        if ann.underline && line.width > 0.0 {
            let (y0, y1) = underline_span(g.line_offsets_y[i], size);
            let x = g.line_x[i];
            ctx.fill_rect(&rect_to_cpu(Rect::new(x, y0, x + line.width, y1)));
        }
    }
}

/// Per-glyph transform for a run: a horizontal skew when the font collection synthesized italic.
pub(crate) fn glyph_transform(run: &ShapedRun) -> vello_cpu::kurbo::Affine {
    match run.synthesis.skew() {
        Some(deg) => vello_cpu::kurbo::Affine::skew(f64::from(deg.to_radians().tan()), 0.0),
        None => vello_cpu::kurbo::Affine::IDENTITY,
    }
}

/// Outline width that thickens a regular face into a faux bold.
pub(crate) fn embolden_width(font_size: f32) -> f64 {
    (f64::from(font_size) / 24.0).max(0.5)
}

/// Vertical extent of a line's underline, centered on `size / 3` below the line center.
pub(crate) fn underline_span(line_center_y: f64, size: f64) -> (f64, f64) {
    let y = line_center_y + size / 3.0;
    let thickness = (size / 20.0).max(1.0);
    (y - thickness / 2.0, y + thickness / 2.0)
}

/// Device-space pixel region covering the shadow silhouette plus its blur margin.
fn device_region(
    g: &BlockGeometry,
    ann: &TextAnnotation,
    transform: Affine,
    sigma: f32,
    canvas: Canvas,
) -> (u32, u32, u32, u32) {
    // Glyph ink can overshoot the line box; pad by a full em plus the stroke.
    let pad = ann.font_size_px + ann.stroke_width_px;
    let local = g.bounds.inflate(pad, pad);
    let dev = transform.transform_rect_bbox(local);
    let margin = f64::from(radius_for_sigma(sigma)) + 1.0;
    let clamp_x = |v: f64| v.clamp(0.0, canvas.width_f64()) as u32;
    let clamp_y = |v: f64| v.clamp(0.0, canvas.height_f64()) as u32;
    (
        clamp_x((dev.x0 - margin).floor()),
        clamp_y((dev.y0 - margin).floor()),
        clamp_x((dev.x1 + margin).ceil()),
        clamp_y((dev.y1 + margin).ceil()),
    )
}

/// Outline the selected annotation. Display-only; never part of exported output.
pub fn paint_selection(
    frame: &mut [u8],
    canvas: Canvas,
    painter: &mut LayerPainter,
    geometry: &BlockGeometry,
    ann: &TextAnnotation,
) -> BrandframeResult<()> {
    let rect = geometry.selection_rect();
    let outline = painter.paint_layer(canvas.width, canvas.height, |ctx| {
        ctx.set_transform(affine_to_cpu(local_to_canvas(ann)));
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(SELECTION_STROKE_PX));
        ctx.set_paint(SELECTION_COLOR.to_cpu());
        ctx.stroke_rect(&rect_to_cpu(rect));
        Ok(())
    })?;
    over_in_place(frame, &outline, 1.0)
}

#[cfg(test)]
#[path = "../../tests/unit/text/paint.rs"]
mod tests;
