use std::io::Cursor;

use super::*;

fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_records_dimensions_and_source_size() {
    let bytes = png_bytes(8, 4, [0, 0, 255, 255]);
    let pano = PanoramaImage::decode(&bytes).unwrap();
    assert_eq!((pano.width, pano.height), (8, 4));
    assert_eq!(pano.source_len, bytes.len() as u64);
    assert_eq!(&pano.rgba8[0..4], &[0, 0, 255, 255]);
}

#[test]
fn decode_garbage_is_decode_error() {
    let err = PanoramaImage::decode(b"not an image").unwrap_err();
    assert!(matches!(err, CubeError::Decode(_)));
}

#[test]
fn from_rgba8_checks_length() {
    assert!(PanoramaImage::from_rgba8(2, 1, vec![0; 8], 10).is_ok());
    assert!(matches!(
        PanoramaImage::from_rgba8(2, 1, vec![0; 7], 10),
        Err(CubeError::Decode(_))
    ));
}
