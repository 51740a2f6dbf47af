use super::*;
use crate::{foundation::core::FaceIndex, render::projection::CubeCamera};

fn split_pano(left: [u8; 4], right: [u8; 4]) -> PanoramaImage {
    let (w, h) = (8u32, 4u32);
    let mut data = Vec::with_capacity((w * h * 4) as usize);
    for _y in 0..h {
        for x in 0..w {
            data.extend_from_slice(if x < w / 2 { &left } else { &right });
        }
    }
    PanoramaImage::from_rgba8(w, h, data, 0).unwrap()
}

fn texel_at(face: &[u8], size: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * size + x) * 4) as usize;
    [face[i], face[i + 1], face[i + 2], face[i + 3]]
}

#[test]
fn solid_panorama_fills_every_face() {
    let pano = PanoramaImage::from_rgba8(4, 2, [10, 20, 200, 255].repeat(8), 0).unwrap();
    let mut r = CpuCubeRenderer::new(RenderSettings::default());
    let target = r.render(&pano, CubeSize::new(16).unwrap()).unwrap();
    assert_eq!(target.size(), 16);
    for face in FaceIndex::ALL {
        let px = target.read_face_rgba8(face).unwrap();
        assert_eq!(px.len(), 16 * 16 * 4);
        assert!(px.chunks_exact(4).all(|p| p == [10, 20, 200, 255]));
    }
}

#[test]
fn opposite_side_faces_see_opposite_halves() {
    let a = [255, 0, 0, 255];
    let b = [0, 255, 0, 255];
    let pano = split_pano(a, b);
    let mut r = CpuCubeRenderer::new(RenderSettings::default());
    let target = r.render(&pano, CubeSize::new(8).unwrap()).unwrap();

    let pos_x = target.read_face_rgba8(FaceIndex::new(0).unwrap()).unwrap();
    let neg_x = target.read_face_rgba8(FaceIndex::new(1).unwrap()).unwrap();
    assert_eq!(texel_at(&pos_x, 8, 4, 4), b);
    assert_eq!(texel_at(&neg_x, 8, 4, 4), a);
}

#[test]
fn clipped_sphere_renders_clear_color() {
    let pano = PanoramaImage::from_rgba8(2, 1, [255; 8].to_vec(), 0).unwrap();
    let settings = RenderSettings {
        camera: CubeCamera {
            near: 600.0,
            far: 1000.0,
        },
        clear_rgba: [1, 2, 3, 255],
        ..RenderSettings::default()
    };
    let mut r = CpuCubeRenderer::new(settings);
    let target = r.render(&pano, CubeSize::new(4).unwrap()).unwrap();
    let px = target.read_face_rgba8(FaceIndex::new(5).unwrap()).unwrap();
    assert!(px.chunks_exact(4).all(|p| p == [1, 2, 3, 255]));
}

#[test]
fn live_targets_track_drop() {
    let pano = PanoramaImage::from_rgba8(2, 1, [0; 8].to_vec(), 0).unwrap();
    let mut r = CpuCubeRenderer::new(RenderSettings::default());
    assert_eq!(r.live_targets(), 0);
    let t1 = r.render(&pano, CubeSize::new(2).unwrap()).unwrap();
    let t2 = r.render(&pano, CubeSize::new(2).unwrap()).unwrap();
    assert_eq!(r.live_targets(), 2);
    drop(t1);
    assert_eq!(r.live_targets(), 1);
    drop(t2);
    assert_eq!(r.live_targets(), 0);
    assert_eq!(r.kind(), BackendKind::Cpu);
}
