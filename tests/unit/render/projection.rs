use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn bases_are_orthonormal() {
    for b in RAW_FACE_BASIS.iter() {
        for v in [b.forward, b.right, b.up] {
            assert!(approx(dot(v, v), 1.0));
        }
        assert!(approx(dot(b.forward, b.right), 0.0));
        assert!(approx(dot(b.forward, b.up), 0.0));
        assert!(approx(dot(b.right, b.up), 0.0));
    }
}

#[test]
fn forward_axes_cover_all_six_directions() {
    let mut seen: Vec<[i8; 3]> = RAW_FACE_BASIS
        .iter()
        .map(|b| b.forward.map(|c| c as i8))
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 6);
}

#[test]
fn equirect_uv_landmarks() {
    let (u, v) = dir_to_equirect_uv([0.0, 0.0, -1.0]);
    assert!(approx(u, 0.5) && approx(v, 0.5));

    let (u, _) = dir_to_equirect_uv([1.0, 0.0, 0.0]);
    assert!(approx(u, 0.75));

    let (_, v) = dir_to_equirect_uv([0.0, 2.0, 0.0]);
    assert!(approx(v, 0.0));

    let (_, v) = dir_to_equirect_uv([0.0, -1.0, 0.0]);
    assert!(approx(v, 1.0));
}

#[test]
fn bilinear_sample_of_solid_panorama_is_exact() {
    let pano = PanoramaImage::from_rgba8(4, 2, [10u8, 20, 200, 255].repeat(8), 0).unwrap();
    for (u, v) in [(0.0, 0.0), (0.999, 0.5), (0.3, 1.0)] {
        assert_eq!(sample_bilinear(&pano, u, v), [10, 20, 200, 255]);
    }
}

#[test]
fn bilinear_wraps_horizontally() {
    let mut px = Vec::new();
    px.extend_from_slice(&[0, 0, 0, 255]);
    px.extend_from_slice(&[255, 255, 255, 255]);
    let pano = PanoramaImage::from_rgba8(2, 1, px, 0).unwrap();
    // u = 0 sits halfway between the last and first texel.
    let s = sample_bilinear(&pano, 0.0, 0.5);
    assert!((i32::from(s[0]) - 128).abs() <= 1);
}

#[test]
fn camera_clips_sphere_outside_near_far() {
    let basis = FaceBasis::for_face(FaceIndex::new(4).unwrap());
    let center = basis.texel_dir(0, 0, 1);
    let sphere = SkySphere::default();
    assert!(CubeCamera::default().sees(&sphere, basis, center));

    let short = CubeCamera {
        near: 0.1,
        far: 100.0,
    };
    assert!(!short.sees(&sphere, basis, center));
}
