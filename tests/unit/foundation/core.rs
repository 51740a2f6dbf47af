use super::*;

#[test]
fn face_index_rejects_out_of_range() {
    assert!(FaceIndex::new(5).is_ok());
    assert!(FaceIndex::new(6).is_err());
    assert!(FaceIndex::new(3).unwrap().is_logo_face());
    assert_eq!(FaceIndex::ALL.len(), FaceIndex::COUNT);
}

#[test]
fn face_index_serde_is_checked() {
    let f: FaceIndex = serde_json::from_str("2").unwrap();
    assert_eq!(f.get(), 2);
    assert!(serde_json::from_str::<FaceIndex>("9").is_err());
}

#[test]
fn cube_size_bounds() {
    assert!(CubeSize::new(0).is_err());
    assert!(CubeSize::new(CubeSize::MAX + 1).is_err());
    assert_eq!(CubeSize::new(8).unwrap().face_bytes(), 8 * 8 * 4);
    assert_eq!(CubeSize::default().get(), 4096);
    assert!(CubeSize::default().is_preset());
    assert!(!CubeSize::new(64).unwrap().is_preset());
}

#[test]
fn quality_is_clamped_and_rounded() {
    assert_eq!(Quality::new(1.7).unwrap().get(), 1.0);
    assert_eq!(Quality::new(-0.2).unwrap().get(), 0.0);
    assert_eq!(Quality::new(0.8).unwrap().percent(), 80);
    assert_eq!(Quality::new(0.555).unwrap().percent(), 56);
    assert!(Quality::new(f32::NAN).is_err());
}

#[test]
fn raster_validates_length() {
    assert!(RasterRGBA::new(2, 2, vec![0; 16]).is_ok());
    assert!(RasterRGBA::new(2, 2, vec![0; 15]).is_err());
    let r = RasterRGBA::solid(3, 1, [1, 2, 3, 255]).unwrap();
    assert_eq!(r.pixel(2, 0), [1, 2, 3, 255]);
}
