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

#[test]
fn rendered_text_has_coverage_inside_margin() {
    let Some(font) = font_or_skip() else { return };
    let mut engine = TextLayoutEngine::new();
    let anchor = LineAnchor {
        center_x: 200.0,
        baseline_y: 100.0,
    };
    let t = render_text_line(&mut engine, &font, "TEST", 40.0, anchor, (400, 200), 8).unwrap();

    assert!(t.advance > 0.0);
    assert!(!t.layer.is_empty());
    assert!(t.x <= (200.0 - t.advance / 2.0 - 8.0) as i32);
    assert!(t.y < 100 - 8);

    // Margin rows stay transparent.
    let row = (t.layer.width * 4) as usize;
    assert!(t.layer.data[..row * 8].chunks_exact(4).all(|px| px[3] == 0));
    // Coverage is white.
    assert!(
        t.layer
            .data
            .chunks_exact(4)
            .filter(|px| px[3] == 255)
            .all(|px| px[..3] == [255, 255, 255])
    );
}

#[test]
fn empty_text_renders_nothing() {
    let Some(font) = font_or_skip() else { return };
    let mut engine = TextLayoutEngine::new();
    let anchor = LineAnchor {
        center_x: 50.0,
        baseline_y: 50.0,
    };
    let t = render_text_line(&mut engine, &font, "", 20.0, anchor, (100, 100), 4).unwrap();
    assert!(t.layer.is_empty());
}

#[test]
fn text_wider_than_target_is_clipped_to_bounds() {
    let Some(font) = font_or_skip() else { return };
    let mut engine = TextLayoutEngine::new();
    let anchor = LineAnchor {
        center_x: 50.0,
        baseline_y: 40.0,
    };
    let long = "W".repeat(400);
    let t = render_text_line(&mut engine, &font, &long, 200.0, anchor, (100, 60), 6).unwrap();

    assert!(t.advance > f32::from(u16::MAX));
    assert_eq!(t.x, -6);
    assert!(t.layer.width <= 100 + 12);
    assert!(t.y >= -6);
    assert!(t.layer.height <= 60 + 12);
    assert!(!t.layer.is_empty());
}

#[test]
fn text_outside_target_yields_empty_layer() {
    let Some(font) = font_or_skip() else { return };
    let mut engine = TextLayoutEngine::new();
    let anchor = LineAnchor {
        center_x: 5000.0,
        baseline_y: 40.0,
    };
    let t = render_text_line(&mut engine, &font, "far", 20.0, anchor, (100, 60), 4).unwrap();
    assert!(t.layer.is_empty());
}
