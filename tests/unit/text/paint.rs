use std::path::Path;

use super::*;
use crate::foundation::core::Point;
use crate::model::annotation::{AnnotationId, TextAlign};
use crate::text::fonts::FontBook;
use crate::text::layout::TextEngine;

const CANVAS: Canvas = Canvas {
    width: 200,
    height: 200,
};

fn engine() -> TextEngine {
    let font = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts/DejaVuSans.ttf");
    TextEngine::new(FontBook::with_default_font(Some(&font)))
}

fn ann(text: &str) -> TextAnnotation {
    TextAnnotation {
        id: AnnotationId(0),
        text: text.to_owned(),
        position: Point::new(100.0, 100.0),
        font_size_px: 40.0,
        text_align: TextAlign::Center,
        ..TextAnnotation::default()
    }
}

fn black() -> Vec<u8> {
    [0u8, 0, 0, 255].repeat((CANVAS.width * CANVAS.height) as usize)
}

fn changed_pixels(a: &[u8], b: &[u8]) -> usize {
    a.chunks_exact(4)
        .zip(b.chunks_exact(4))
        .filter(|(x, y)| x != y)
        .count()
}

fn paint(a: &TextAnnotation) -> Vec<u8> {
    let mut e = engine();
    let mut painter = LayerPainter::new();
    let block = e.shape(a);
    let mut frame = black();
    paint_annotation(&mut frame, CANVAS, &mut painter, &block, a).unwrap();
    frame
}

#[test]
fn fill_draws_inside_block_only() {
    let a = ann("HH");
    let frame = paint(&a);
    let changed = changed_pixels(&frame, &black());
    assert!(changed > 50);

    let block = engine().shape(&a);
    let bounds = local_to_canvas(&a).transform_rect_bbox(block.geometry.bounds.inflate(2.0, 8.0));
    for (i, px) in frame.chunks_exact(4).enumerate() {
        if px != [0, 0, 0, 255] {
            let x = (i as u32 % CANVAS.width) as f64;
            let y = (i as u32 / CANVAS.width) as f64;
            assert!(bounds.contains(Point::new(x, y)), "ink outside block at {x},{y}");
        }
    }
}

#[test]
fn zero_opacity_and_empty_text_paint_nothing() {
    let mut a = ann("HH");
    a.opacity = 0.0;
    assert_eq!(changed_pixels(&paint(&a), &black()), 0);
    assert_eq!(changed_pixels(&paint(&ann("")), &black()), 0);
}

#[test]
fn stroke_and_shadow_add_ink() {
    let base = changed_pixels(&paint(&ann("HH")), &black());

    let mut stroked = ann("HH");
    stroked.stroke_width_px = 6.0;
    stroked.stroke_color = Color::rgb(255, 0, 0);
    assert!(changed_pixels(&paint(&stroked), &black()) > base);

    let mut shadowed = ann("HH");
    shadowed.shadow_blur_px = 10.0;
    shadowed.shadow_color = Color::rgb(0, 0, 255);
    shadowed.shadow_offset_x = 8.0;
    shadowed.shadow_offset_y = 8.0;
    let frame = paint(&shadowed);
    assert!(changed_pixels(&frame, &black()) > base);
    assert!(frame.chunks_exact(4).any(|p| p[2] > p[0] && p[2] > 0));
}

#[test]
fn underline_spans_measured_width() {
    let mut a = ann("HH");
    a.underline = true;
    let frame = paint(&a);
    let block = engine().shape(&a);
    // Underline is centered on size / 3 below the line center: rows 112.33..114.33.
    let y = (100.0 + 40.0 / 3.0) as u32;
    let row_lit = (0..CANVAS.width)
        .filter(|&x| {
            let i = ((y * CANVAS.width + x) * 4) as usize;
            frame[i] > 200
        })
        .count() as f64;
    assert!((row_lit - block.lines[0].width).abs() <= 3.0);
}

#[test]
fn underline_is_centered_on_its_offset() {
    let (y0, y1) = underline_span(0.0, 40.0);
    assert!(((y0 + y1) / 2.0 - 40.0 / 3.0).abs() < 1e-9);
    assert!((y1 - y0 - 2.0).abs() < 1e-9);
    // Thickness never drops below one pixel.
    let (y0, y1) = underline_span(10.0, 8.0);
    assert!((y1 - y0 - 1.0).abs() < 1e-9);
    assert!(((y0 + y1) / 2.0 - (10.0 + 8.0 / 3.0)).abs() < 1e-9);
}

#[test]
fn regular_face_gets_faux_bold_and_italic() {
    // Only the regular face is installed, so bold and italic are synthesized.
    let mut a = ann("HH");
    let regular = paint(&a);
    let plain_run = engine().shape(&a).lines[0].runs[0].clone();
    assert!(!plain_run.synthesis.embolden());
    assert_eq!(glyph_transform(&plain_run), vello_cpu::kurbo::Affine::IDENTITY);

    a.bold = true;
    let bold_run = engine().shape(&a).lines[0].runs[0].clone();
    assert!(bold_run.synthesis.embolden());
    assert!(changed_pixels(&paint(&a), &black()) > changed_pixels(&regular, &black()));

    a.bold = false;
    a.italic = true;
    let italic_run = engine().shape(&a).lines[0].runs[0].clone();
    assert!(italic_run.synthesis.skew().is_some());
    assert_ne!(glyph_transform(&italic_run), vello_cpu::kurbo::Affine::IDENTITY);
    assert_ne!(paint(&a), regular);
}

#[test]
fn selection_outline_is_blue_and_padded() {
    let a = ann("HH");
    let block = engine().shape(&a);
    let mut painter = LayerPainter::new();
    let mut frame = black();
    paint_selection(&mut frame, CANVAS, &mut painter, &block.geometry, &a).unwrap();

    let r = block.geometry.selection_rect();
    let x = (100.0 + r.x0).round() as u32;
    let i = ((100 * CANVAS.width + x) * 4) as usize;
    assert!(frame[i + 2] > 150 && frame[i] < 120);
    // Interior untouched.
    let c = ((100 * CANVAS.width + 100) * 4) as usize;
    assert_eq!(&frame[c..c + 4], &[0, 0, 0, 255]);
}
