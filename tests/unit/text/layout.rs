use std::path::Path;

use super::*;
use crate::model::annotation::AnnotationId;

fn engine() -> TextEngine {
    let font = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts/DejaVuSans.ttf");
    TextEngine::new(FontBook::with_default_font(Some(&font)))
}

fn ann(text: &str) -> TextAnnotation {
    TextAnnotation {
        id: AnnotationId(1),
        text: text.to_owned(),
        position: Point::new(100.0, 200.0),
        font_size_px: 40.0,
        ..TextAnnotation::default()
    }
}

#[test]
fn line_offsets_are_symmetric_about_anchor() {
    let a = ann("a\nb\nc");
    let g = block_geometry(&a, &[10.0, 20.0, 30.0]);
    let h = 40.0 * 1.2;
    assert!((g.line_height - h).abs() < 1e-9);
    assert!((g.line_offsets_y[0] - (-(3.0 * h) / 2.0 + h / 2.0)).abs() < 1e-9);
    assert!((g.line_offsets_y[2] - ((3.0 * h) / 2.0 - h / 2.0)).abs() < 1e-9);
    let sum: f64 = g.line_offsets_y.iter().sum();
    assert!(sum.abs() < 1e-9);
}

#[test]
fn alignment_positions_lines_and_bounds() {
    let mut a = ann("x\nyy");
    let widths = [10.0, 30.0];

    a.text_align = TextAlign::Left;
    let g = block_geometry(&a, &widths);
    assert_eq!(g.line_x, vec![0.0, 0.0]);
    assert_eq!((g.bounds.x0, g.bounds.x1), (0.0, 30.0));

    a.text_align = TextAlign::Center;
    let g = block_geometry(&a, &widths);
    assert_eq!(g.line_x, vec![-5.0, -15.0]);
    assert_eq!((g.bounds.x0, g.bounds.x1), (-15.0, 15.0));

    a.text_align = TextAlign::Right;
    let g = block_geometry(&a, &widths);
    assert_eq!(g.line_x, vec![-10.0, -30.0]);
    assert_eq!((g.bounds.x0, g.bounds.x1), (-30.0, 0.0));
}

#[test]
fn selection_rect_is_padded_by_five() {
    let a = ann("x");
    let g = block_geometry(&a, &[100.0]);
    let s = g.selection_rect();
    assert_eq!(s.width(), 110.0);
    assert!((s.height() - (48.0 + 10.0)).abs() < 1e-9);
}

#[test]
fn empty_text_has_zero_bounds_and_never_contains() {
    let a = ann("");
    let g = block_geometry(&a, &[0.0]);
    assert!(g.is_empty());
    assert!(!g.contains(&a, a.position));
}

#[test]
fn contains_respects_rotation() {
    let mut a = ann("wide");
    let g = block_geometry(&a, &[200.0]);
    // Point 80px right of the anchor is inside when unrotated.
    let p = Point::new(a.position.x + 80.0, a.position.y);
    assert!(g.contains(&a, p));

    a.rotation_deg = 90.0;
    assert!(!g.contains(&a, p));
    assert!(g.contains(&a, Point::new(a.position.x, a.position.y + 80.0)));
}

#[test]
fn shaping_measures_real_glyphs() {
    let mut e = engine();
    let widths = e.line_widths(&ann("Hello\nHi"));
    assert_eq!(widths.len(), 2);
    assert!(widths[0] > widths[1]);
    assert!(widths[1] > 0.0);
}

#[test]
fn letter_spacing_widens_by_gaps_between_glyphs() {
    let mut e = engine();
    let mut a = ann("abcd");
    let base = e.line_widths(&a)[0];
    a.letter_spacing_px = 10.0;
    let spaced = e.line_widths(&a)[0];
    assert!((spaced - base - 30.0).abs() < 1e-3);

    let block = e.shape(&a);
    let xs: Vec<f32> = block.lines[0]
        .runs
        .iter()
        .flat_map(|r| r.glyphs.iter().map(|g| g.x))
        .collect();
    assert_eq!(xs.len(), 4);
    assert!(xs.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn no_default_font_yields_zero_widths_without_panicking() {
    let mut e = TextEngine::new(FontBook::new());
    let block = e.shape(&ann("abc"));
    assert_eq!(block.lines[0].width, 0.0);
    assert!(block.lines[0].runs.is_empty());
}

#[test]
fn contains_accepts_points_in_the_selection_padding() {
    let a = ann("wide");
    let g = block_geometry(&a, &[200.0]);
    // Right edge of the text box is 100px from the anchor; the outline sits 5px further out.
    let in_padding = Point::new(a.position.x + 103.0, a.position.y);
    assert!(g.contains(&a, in_padding));
    let past_outline = Point::new(a.position.x + 106.0, a.position.y);
    assert!(!g.contains(&a, past_outline));
    let above = Point::new(a.position.x, a.position.y - 24.0 - 4.0);
    assert!(g.contains(&a, above));
}
