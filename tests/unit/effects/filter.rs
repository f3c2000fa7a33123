use super::*;

fn px(chain: &FilterChain, rgba: [u8; 4]) -> [u8; 4] {
    let mut buf = rgba.to_vec();
    chain.apply(&mut buf, 1, 1).unwrap();
    [buf[0], buf[1], buf[2], buf[3]]
}

#[test]
fn identity_adjustments_give_identity_chain() {
    let chain = FilterChain::from_adjustments(&Adjustments::IDENTITY);
    assert!(chain.is_identity());
    assert!(chain.color_steps().is_empty());
    assert_eq!(px(&chain, [12, 34, 56, 255]), [12, 34, 56, 255]);
}

#[test]
fn brightness_zero_is_black_and_double_saturates() {
    let dark = FilterChain {
        brightness: 0.0,
        ..FilterChain::IDENTITY
    };
    assert_eq!(px(&dark, [200, 100, 50, 255]), [0, 0, 0, 255]);

    let bright = FilterChain {
        brightness: 2.0,
        ..FilterChain::IDENTITY
    };
    assert_eq!(px(&bright, [200, 100, 50, 255]), [255, 200, 100, 255]);
}

#[test]
fn contrast_zero_is_mid_grey() {
    let flat = FilterChain {
        contrast: 0.0,
        ..FilterChain::IDENTITY
    };
    assert_eq!(px(&flat, [0, 255, 30, 255]), [128, 128, 128, 255]);
}

#[test]
fn saturation_zero_is_greyscale() {
    let grey = FilterChain {
        saturation: 0.0,
        ..FilterChain::IDENTITY
    };
    let [r, g, b, a] = px(&grey, [255, 0, 0, 255]);
    assert_eq!(r, g);
    assert_eq!(g, b);
    assert_eq!(a, 255);
    assert_eq!(r, (0.213f32 * 255.0).round() as u8);
}

#[test]
fn order_is_brightness_then_contrast() {
    // Clamping between steps makes the order observable.
    let chain = FilterChain {
        brightness: 2.0,
        contrast: 0.5,
        ..FilterChain::IDENTITY
    };
    // 0.8 * 2 = 1.6 -> clamp 1.0 -> (1.0 - 0.5) * 0.5 + 0.5 = 0.75
    let [r, ..] = px(&chain, [204, 0, 0, 255]);
    assert_eq!(r, (0.75f32 * 255.0).round() as u8);
}

#[test]
fn transparent_pixels_stay_transparent() {
    let chain = FilterChain {
        brightness: 2.0,
        contrast: 0.0,
        ..FilterChain::IDENTITY
    };
    assert_eq!(px(&chain, [0, 0, 0, 0]), [0, 0, 0, 0]);
}
