#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use brandframe::{Canvas, EditorSession, FontBook, TextEngine};

pub const SMALL: Canvas = Canvas {
    width: 108,
    height: 135,
};

pub fn font_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts/DejaVuSans.ttf")
}

pub fn text_engine() -> TextEngine {
    TextEngine::new(FontBook::with_default_font(Some(&font_path())))
}

pub fn session(base_dir: &Path, canvas: Canvas) -> EditorSession {
    EditorSession::with_canvas(text_engine(), base_dir, canvas)
}

pub fn temp_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "brandframe_{name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn png(img: &image::RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn assert_close(actual: [u8; 4], expected: [u8; 4], tol: u8) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            a.abs_diff(e) <= tol,
            "pixel {actual:?} not within {tol} of {expected:?}"
        );
    }
}
