use std::sync::Arc;

use super::*;

fn font_or_skip() -> Option<FontBytes> {
    match FontBytes::system_sans() {
        Ok(f) => Some(f),
        Err(_) => {
            eprintln!("skipping: no system fonts");
            None
        }
    }
}

fn spec(text: &str) -> WatermarkSpec {
    WatermarkSpec {
        text: text.to_string(),
        quality: Quality::new(0.8).unwrap(),
        source_len: 2048,
    }
}

fn region_changed(a: &RasterRGBA, b: &RasterRGBA, x0: u32, y0: u32, x1: u32, y1: u32) -> bool {
    (y0..y1).any(|y| (x0..x1).any(|x| a.pixel(x, y) != b.pixel(x, y)))
}

#[test]
fn caption_formats_source_size_and_quality() {
    let q = Quality::new(0.8).unwrap();
    assert_eq!(
        caption_text(1024, 1024, 1536, q),
        "1024x1024 | 1.50KB | Quality: 80% | Type: jpeg"
    );
    assert_eq!(
        caption_text(8, 8, 0, Quality::MAX),
        "8x8 | 0.00KB | Quality: 100% | Type: jpeg"
    );
}

#[test]
fn caption_size_rounds_exact_halves_up() {
    let q = Quality::new(0.8).unwrap();
    assert_eq!(
        caption_text(1024, 1024, 128, q),
        "1024x1024 | 0.13KB | Quality: 80% | Type: jpeg"
    );
    assert_eq!(kib_two_places(640), "0.63");
    assert_eq!(kib_two_places(1152), "1.13");
    assert_eq!(kib_two_places(5248), "5.13");
    assert_eq!(kib_two_places(5000), "4.88");
    assert_eq!(kib_two_places(1023), "1.00");
    assert_eq!(kib_two_places(3 * 1024 * 1024), "3072.00");
}

#[test]
fn empty_text_leaves_top_center_untouched_but_draws_caption() {
    let Some(font) = font_or_skip() else { return };
    let comp = WatermarkCompositor::new(font);
    let before = RasterRGBA::solid(256, 256, [0, 0, 255, 255]).unwrap();
    let mut after = before.clone();
    comp.composite(&mut after, FaceIndex::new(0).unwrap(), &spec(""), None)
        .unwrap();

    assert!(!region_changed(&before, &after, 64, 96, 192, 160));
    assert!(region_changed(&before, &after, 0, 236, 256, 256));
}

#[test]
fn watermark_skips_logo_face() {
    let Some(font) = font_or_skip() else { return };
    let comp = WatermarkCompositor::new(font);
    let before = RasterRGBA::solid(256, 256, [0, 0, 255, 255]).unwrap();

    let mut side = before.clone();
    comp.composite(&mut side, FaceIndex::new(1).unwrap(), &spec("TEST"), None)
        .unwrap();
    assert!(region_changed(&before, &side, 64, 96, 192, 140));

    let mut nadir = before.clone();
    comp.composite(&mut nadir, FaceIndex::LOGO, &spec("TEST"), None)
        .unwrap();
    assert!(!region_changed(&before, &nadir, 64, 96, 192, 140));
}

#[test]
fn logo_is_centered_on_logo_face_only() {
    let Some(font) = font_or_skip() else { return };
    let comp = WatermarkCompositor::new(font);
    let logo = PreparedLogo::Raster {
        width: 2,
        height: 2,
        rgba8: Arc::new([255, 0, 0, 255].repeat(4)),
    };
    let before = RasterRGBA::solid(200, 200, [0, 0, 255, 255]).unwrap();

    let mut nadir = before.clone();
    comp.composite(&mut nadir, FaceIndex::LOGO, &spec(""), Some(&logo))
        .unwrap();
    assert_eq!(nadir.pixel(100, 100), [255, 0, 0, 255]);
    assert_eq!(nadir.pixel(76, 76), [255, 0, 0, 255]);
    assert_eq!(nadir.pixel(20, 20), [0, 0, 255, 255]);

    let mut side = before.clone();
    comp.composite(&mut side, FaceIndex::new(4).unwrap(), &spec(""), Some(&logo))
        .unwrap();
    assert_eq!(side.pixel(100, 100), [0, 0, 255, 255]);
}

#[test]
fn overlong_watermark_is_clipped_not_fatal() {
    let Some(font) = font_or_skip() else { return };
    let comp = WatermarkCompositor::new(font);
    let before = RasterRGBA::solid(1024, 1024, [0, 0, 255, 255]).unwrap();
    let mut face = before.clone();

    // 102px glyphs: 700 of them are far wider than any single layer can be.
    let text = "W".repeat(700);
    comp.composite(&mut face, FaceIndex::new(0).unwrap(), &spec(&text), None)
        .unwrap();

    // The line runs off both edges.
    assert!(region_changed(&before, &face, 0, 440, 24, 512));
    assert!(region_changed(&before, &face, 1000, 440, 1024, 512));
}

#[test]
fn default_style_matches_overlay_paint() {
    let s = OverlayStyle::default();
    assert_eq!(s.fill_opacity, 0.75);
    assert_eq!(s.shadow_offset, (3, 3));
    assert_eq!(s.shadow_sigma(), 3.5);
}
