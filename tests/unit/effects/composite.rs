use super::*;

#[test]
fn over_opaque_src_replaces_dst() {
    assert_eq!(over([10, 20, 30, 255], [1, 2, 3, 255], 1.0), [1, 2, 3, 255]);
}

#[test]
fn over_transparent_src_keeps_dst() {
    assert_eq!(over([10, 20, 30, 255], [0, 0, 0, 0], 1.0), [10, 20, 30, 255]);
    assert_eq!(over([10, 20, 30, 255], [255, 255, 255, 255], 0.0), [10, 20, 30, 255]);
}

#[test]
fn over_half_opacity_blends() {
    let out = over([0, 0, 0, 255], [255, 255, 255, 255], 0.5);
    assert_eq!(out, [128, 128, 128, 255]);
}

#[test]
fn over_in_place_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(over_in_place(&mut dst, &[0u8; 4], 1.0).is_err());
}

#[test]
fn over_in_place_fast_path_matches_general_path() {
    let src = vec![0, 0, 0, 0, 100, 50, 0, 128, 9, 9, 9, 255];
    let mut a = vec![200u8, 100, 50, 255].repeat(3);
    let mut b = a.clone();
    over_in_place(&mut a, &src, 1.0).unwrap();
    for (d, s) in b.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], 1.0);
        d.copy_from_slice(&out);
    }
    assert_eq!(a, b);
}

#[test]
fn tint_by_alpha_keeps_coverage() {
    let mut buf = vec![255u8, 255, 255, 255, 128, 128, 128, 128, 0, 0, 0, 0];
    tint_by_alpha(&mut buf, [0, 0, 0, 255]);
    assert_eq!(buf, vec![0, 0, 0, 255, 0, 0, 0, 128, 0, 0, 0, 0]);
}
