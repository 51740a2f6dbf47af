use super::*;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_half_white_on_black() {
    let out = over([0, 0, 0, 255], [255, 255, 255, 255], 0.5);
    assert_eq!(out[3], 255);
    assert!((i32::from(out[0]) - 128).abs() <= 1);
}

#[test]
fn premultiply_round_trips_opaque() {
    let px = [12, 34, 56, 255];
    assert_eq!(unpremultiply(premultiply(px)), px);
    assert_eq!(unpremultiply([0, 0, 0, 0]), [0, 0, 0, 0]);
}

#[test]
fn tinted_keeps_coverage() {
    let layer = PremulLayer::from_premul(1, 1, vec![255, 255, 255, 255]).unwrap();
    assert_eq!(layer.tinted([0, 0, 0]).data, vec![0, 0, 0, 255]);
    let half = PremulLayer::from_premul(1, 1, vec![128, 128, 128, 128]).unwrap();
    assert_eq!(half.tinted([255, 0, 0]).data, vec![128, 0, 0, 128]);
}

#[test]
fn composite_layer_clips_and_offsets() {
    let mut dst = RasterRGBA::solid(3, 3, [0, 0, 255, 255]).unwrap();
    let layer = PremulLayer::from_premul(2, 2, [255, 255, 255, 255].repeat(4)).unwrap();
    composite_layer(&mut dst, &layer, 2, -1, 1.0);
    assert_eq!(dst.pixel(2, 0), [255, 255, 255, 255]);
    assert_eq!(dst.pixel(1, 0), [0, 0, 255, 255]);
    assert_eq!(dst.pixel(2, 1), [0, 0, 255, 255]);
}

#[test]
fn transparent_layer_is_empty_and_noop() {
    let mut dst = RasterRGBA::solid(2, 2, [9, 8, 7, 255]).unwrap();
    let before = dst.clone();
    let layer = PremulLayer::transparent(2, 2).unwrap();
    assert!(layer.is_empty());
    composite_layer(&mut dst, &layer, 0, 0, 1.0);
    assert_eq!(dst, before);
}
