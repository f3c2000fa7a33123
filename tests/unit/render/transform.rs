use super::*;
use crate::foundation::core::Point;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn assert_affine_eq(a: Affine, b: Affine) {
    for (x, y) in a.as_coeffs().iter().zip(b.as_coeffs()) {
        assert!(close(*x, y), "{a:?} != {b:?}");
    }
}

#[test]
fn identity_is_plain_cover_fit() {
    let p = resolve(1920, 1080, &Adjustments::IDENTITY, Canvas::SOCIAL).unwrap();
    assert_affine_eq(p.transform, Affine::IDENTITY);
    assert!(p.filters.is_identity());

    let fit = cover_fit(1920, 1080, Canvas::SOCIAL).unwrap();
    assert_eq!(p.fit, fit);
    assert!(close(fit.scale, 1350.0 / 1080.0));
    assert!(close(fit.dest.height(), 1350.0));
    assert!(close(fit.dest.x0, (1080.0 - 1920.0 * fit.scale) / 2.0));
    assert!(close(fit.dest.y0, 0.0));
}

#[test]
fn cover_fit_invariant_holds_for_many_sizes() {
    let canvas = Canvas::SOCIAL;
    for (w, h) in [(1, 1), (1080, 1350), (4000, 3000), (720, 1280), (333, 7), (7, 333)] {
        let fit = cover_fit(w, h, canvas).unwrap();
        let dw = fit.scale * f64::from(w);
        let dh = fit.scale * f64::from(h);
        assert!(dw >= 1080.0 - 1e-9 && dh >= 1350.0 - 1e-9);
        assert!(close(dw, 1080.0) || close(dh, 1350.0));
        assert!(close(fit.dest.x0, (1080.0 - dw) / 2.0));
        assert!(close(fit.dest.y0, (1350.0 - dh) / 2.0));
    }
}

#[test]
fn zero_dimension_propagates_as_input_error() {
    let err = cover_fit(0, 10, Canvas::SOCIAL).unwrap_err();
    assert!(matches!(err, BrandframeError::InputDecode(_)));
}

#[test]
fn flip_h_mirrors_about_center() {
    let adj = Adjustments {
        flip_h: true,
        ..Adjustments::IDENTITY
    };
    let p = resolve(1080, 1350, &adj, Canvas::SOCIAL).unwrap();
    let q = p.transform * Point::new(100.0, 200.0);
    assert!(close(q.x, 980.0));
    assert!(close(q.y, 200.0));
}

#[test]
fn rotation_is_about_canvas_center() {
    let adj = Adjustments {
        rotation_deg: 90.0,
        ..Adjustments::IDENTITY
    };
    let p = resolve(1080, 1350, &adj, Canvas::SOCIAL).unwrap();
    let c = p.transform * Point::new(540.0, 675.0);
    assert!(close(c.x, 540.0) && close(c.y, 675.0));
    // A point right of center rotates to below center (y grows downward).
    let r = p.transform * Point::new(640.0, 675.0);
    assert!(close(r.x, 540.0) && close(r.y, 775.0));
}

#[test]
fn offset_is_applied_after_scale() {
    let adj = Adjustments {
        scale: 2.0,
        offset_x: 10.0,
        offset_y: -5.0,
        ..Adjustments::IDENTITY
    };
    let p = resolve(1080, 1350, &adj, Canvas::SOCIAL).unwrap();
    let c = p.transform * Point::new(540.0, 675.0);
    assert!(close(c.x, 540.0 + 20.0));
    assert!(close(c.y, 675.0 - 10.0));
}

#[test]
fn image_transform_maps_corners_to_dest() {
    let p = resolve(200, 100, &Adjustments::IDENTITY, Canvas::SOCIAL).unwrap();
    let t = p.image_transform();
    let tl = t * Point::new(0.0, 0.0);
    let br = t * Point::new(200.0, 100.0);
    assert!(close(tl.x, p.fit.dest.x0) && close(tl.y, p.fit.dest.y0));
    assert!(close(br.x, p.fit.dest.x1) && close(br.y, p.fit.dest.y1));
}
