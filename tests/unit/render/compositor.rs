use std::path::Path;

use super::*;
use crate::foundation::core::Point;
use crate::text::fonts::FontBook;

const CANVAS: Canvas = Canvas {
    width: 108,
    height: 135,
};

fn compositor() -> Compositor {
    let font = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts/DejaVuSans.ttf");
    Compositor::new(TextEngine::new(FontBook::with_default_font(Some(&font))))
}

fn inputs<'a>(
    background: Option<&'a PreparedImage>,
    adjustments: &'a Adjustments,
    template: Option<&'a PreparedImage>,
    annotations: &'a [TextAnnotation],
) -> FrameInputs<'a> {
    FrameInputs {
        canvas: CANVAS,
        background,
        adjustments,
        template,
        annotations,
        selected: None,
    }
}

fn px(f: &FrameRGBA, x: u32, y: u32) -> [u8; 4] {
    f.pixel(x, y).unwrap()
}

/// Template that is opaque blue except for a transparent window in the middle.
fn windowed_template(w: u32, h: u32) -> PreparedImage {
    let mut bytes = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            let hole = x > w / 4 && x < 3 * w / 4 && y > h / 4 && y < 3 * h / 4;
            bytes.extend_from_slice(if hole { &[0, 0, 0, 0] } else { &[0, 0, 255, 255] });
        }
    }
    PreparedImage::from_premul(w, h, bytes).unwrap()
}

#[test]
fn no_media_draws_placeholder() {
    let mut c = compositor();
    let f = c
        .compose(&inputs(None, &Adjustments::IDENTITY, None, &[]))
        .unwrap();
    assert_eq!(px(&f, 0, 0), [0x1a, 0x1a, 0x1a, 255]);
    assert_eq!(px(&f, 107, 134), [0x1a, 0x1a, 0x1a, 255]);
    assert!(f.premultiplied);
}

#[test]
fn identity_background_covers_canvas() {
    let mut c = compositor();
    let red = PreparedImage::solid(40, 20, [255, 0, 0, 255]);
    let f = c
        .compose(&inputs(Some(&red), &Adjustments::IDENTITY, None, &[]))
        .unwrap();
    for (x, y) in [(0, 0), (107, 0), (0, 134), (107, 134), (54, 67)] {
        assert_eq!(px(&f, x, y), [255, 0, 0, 255], "pixel {x},{y}");
    }
}

#[test]
fn template_is_stretched_and_drawn_over_background() {
    let mut c = compositor();
    let red = PreparedImage::solid(10, 10, [255, 0, 0, 255]);
    let template = windowed_template(20, 25);
    let f = c
        .compose(&inputs(Some(&red), &Adjustments::IDENTITY, Some(&template), &[]))
        .unwrap();
    assert_eq!(px(&f, 2, 2), [0, 0, 255, 255]);
    assert_eq!(px(&f, 105, 132), [0, 0, 255, 255]);
    assert_eq!(px(&f, 54, 67), [255, 0, 0, 255]);
}

#[test]
fn canvas_sized_template_takes_fast_path() {
    let mut c = compositor();
    let red = PreparedImage::solid(10, 10, [255, 0, 0, 255]);
    let template = windowed_template(CANVAS.width, CANVAS.height);
    let f = c
        .compose(&inputs(Some(&red), &Adjustments::IDENTITY, Some(&template), &[]))
        .unwrap();
    assert_eq!(px(&f, 0, 0), [0, 0, 255, 255]);
    assert_eq!(px(&f, 54, 67), [255, 0, 0, 255]);
}

#[test]
fn text_is_drawn_above_template() {
    let mut c = compositor();
    let template = PreparedImage::solid(CANVAS.width, CANVAS.height, [0, 0, 255, 255]);
    let text = TextAnnotation {
        text: "III".into(),
        position: Point::new(54.0, 67.0),
        font_size_px: 60.0,
        ..TextAnnotation::default()
    };
    let anns = [text];
    let f = c
        .compose(&inputs(None, &Adjustments::IDENTITY, Some(&template), &anns))
        .unwrap();
    let white = f
        .data
        .chunks_exact(4)
        .filter(|p| p[0] > 200 && p[1] > 200 && p[2] > 200)
        .count();
    assert!(white > 20);
}

#[test]
fn selection_outline_only_when_selected() {
    let mut c = compositor();
    let bg = PreparedImage::solid(10, 10, [0, 0, 0, 255]);
    let text = TextAnnotation {
        text: "Hi".into(),
        position: Point::new(54.0, 67.0),
        font_size_px: 24.0,
        ..TextAnnotation::default()
    };
    let anns = [text.clone()];

    let plain = c
        .compose(&inputs(Some(&bg), &Adjustments::IDENTITY, None, &anns))
        .unwrap();
    let mut sel_inputs = inputs(Some(&bg), &Adjustments::IDENTITY, None, &anns);
    sel_inputs.selected = Some(text.id);
    let selected = c.compose(&sel_inputs).unwrap();

    let blue = |f: &FrameRGBA| {
        f.data
            .chunks_exact(4)
            .filter(|p| p[2] > 150 && p[0] < 120 && p[1] < 180)
            .count()
    };
    assert_eq!(blue(&plain), 0);
    assert!(blue(&selected) > 20);
}

#[test]
fn compositing_is_deterministic() {
    let mut c = compositor();
    let mut bytes = Vec::new();
    for i in 0..(30u32 * 17) {
        bytes.extend_from_slice(&[(i % 251) as u8, (i * 7 % 256) as u8, 90, 255]);
    }
    let img = PreparedImage::from_premul(30, 17, bytes).unwrap();
    let adj = Adjustments {
        scale: 1.3,
        rotation_deg: 90.0,
        flip_h: true,
        brightness_pct: 120.0,
        blur_px: 2.0,
        ..Adjustments::IDENTITY
    };
    let anns = [TextAnnotation {
        text: "A\nB".into(),
        shadow_blur_px: 4.0,
        ..TextAnnotation::default()
    }];
    let a = c.compose(&inputs(Some(&img), &adj, None, &anns)).unwrap();
    let b = c.compose(&inputs(Some(&img), &adj, None, &anns)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn brightness_zero_blackens_background() {
    let mut c = compositor();
    let img = PreparedImage::solid(10, 10, [200, 150, 100, 255]);
    let adj = Adjustments {
        brightness_pct: 0.0,
        ..Adjustments::IDENTITY
    };
    let f = c.compose(&inputs(Some(&img), &adj, None, &[])).unwrap();
    assert_eq!(px(&f, 54, 67), [0, 0, 0, 255]);
}
