use std::path::Path;

use base64::Engine as _;

use super::*;

#[test]
fn base64_data_url_decodes_to_payload() {
    let url = format!("data:font/ttf;base64,{}", BASE64.encode(b"\x00\x01\x00\x00glyf"));
    assert_eq!(decode_data_url(&url).unwrap(), b"\x00\x01\x00\x00glyf");
}

#[test]
fn plain_data_url_payload_is_taken_verbatim() {
    let svg = "data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg'/>";
    assert_eq!(
        decode_data_url(svg).unwrap(),
        b"<svg xmlns='http://www.w3.org/2000/svg'/>"
    );
}

#[test]
fn malformed_data_urls_are_resource_errors() {
    assert!(matches!(
        decode_data_url("data:image/png;base64"),
        Err(BrandframeError::ResourceLoad(_))
    ));
    assert!(matches!(
        decode_data_url("data:image/png;base64,@@@"),
        Err(BrandframeError::ResourceLoad(_))
    ));
}

#[test]
fn references_are_classified_by_scheme() {
    let base = Path::new("/srv/settings");
    assert_eq!(
        AssetSource::parse("https://cdn.example.com/t.png", base).unwrap(),
        AssetSource::Remote("https://cdn.example.com/t.png".to_owned())
    );
    assert_eq!(
        AssetSource::parse("fonts/brand.ttf", base).unwrap(),
        AssetSource::File("/srv/settings/fonts/brand.ttf".into())
    );
    assert_eq!(
        AssetSource::parse("data:,hi", base).unwrap(),
        AssetSource::Inline(b"hi".to_vec())
    );
    assert!(AssetSource::parse("ftp://host/t.png", base).is_err());
    assert!(AssetSource::parse("   ", base).is_err());
}
