use super::*;

#[test]
fn defaults_match_documented_values() {
    let cfg = PipelineConfig::default();
    assert_eq!(cfg.cube_size.get(), 4096);
    assert_eq!(cfg.quality.get(), 1.0);
    assert!(cfg.watermark_text.is_empty());
    assert_eq!(cfg.backend, BackendKind::Cpu);
    assert_eq!(cfg.logo_wait_ms, 0);
    assert!(cfg.validate().is_ok());
}

#[test]
fn partial_json_fills_defaults() {
    let cfg = PipelineConfig::from_json_str(
        r#"{ "cube_size": 1024, "quality": 0.8, "watermark_text": "TEST", "upload": {} }"#,
    )
    .unwrap();
    assert_eq!(cfg.cube_size.get(), 1024);
    assert_eq!(cfg.quality.percent(), 80);
    assert_eq!(cfg.watermark_text, "TEST");
    assert_eq!(cfg.upload.unwrap().max_attempts, 3);
}

#[test]
fn quality_is_clamped_on_load() {
    let cfg = PipelineConfig::from_json_str(r#"{ "quality": 1.7 }"#).unwrap();
    assert_eq!(cfg.quality.get(), 1.0);
}

#[test]
fn invalid_values_are_rejected() {
    assert!(PipelineConfig::from_json_str(r#"{ "cube_size": 0 }"#).is_err());
    assert!(PipelineConfig::from_json_str(r#"{ "cube_size": 20000 }"#).is_err());
    assert!(PipelineConfig::from_json_str(r#"{ "bogus": 1 }"#).is_err());
    assert!(PipelineConfig::from_json_str(r#"{ "backend": "metal" }"#).is_err());
    assert!(PipelineConfig::from_json_str(r#"{ "threads": 0 }"#).is_err());
    assert!(PipelineConfig::from_json_str(r#"{ "upload": { "max_attempts": 0 } }"#).is_err());
}

#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    let cfg = PipelineConfig {
        cube_size: CubeSize::new(2048).unwrap(),
        parallel: true,
        ..PipelineConfig::default()
    };
    std::fs::write(&path, serde_json::to_string(&cfg).unwrap()).unwrap();
    assert_eq!(PipelineConfig::from_json_file(&path).unwrap(), cfg);
}

#[test]
fn endpoint_resolution_order() {
    assert_eq!(
        resolve_endpoint_with(Some("http://x/up"), Some("http://env/up"), Some("prod.example")),
        "http://x/up"
    );
    assert_eq!(
        resolve_endpoint_with(None, Some("http://env/up"), Some("prod.example")),
        "http://env/up"
    );
    assert_eq!(resolve_endpoint_with(None, None, None), LOCAL_UPLOAD_URL);
    assert_eq!(
        resolve_endpoint_with(None, None, Some("localhost")),
        LOCAL_UPLOAD_URL
    );
    assert_eq!(
        resolve_endpoint_with(None, None, Some("viewer.skynav.app")),
        PRODUCTION_UPLOAD_URL
    );
}

#[test]
fn blank_explicit_endpoint_falls_back_to_env_url() {
    assert_eq!(
        resolve_endpoint_with(Some(""), Some("http://env/up"), Some("prod.example")),
        "http://env/up"
    );
    assert_eq!(
        resolve_endpoint_with(Some("  "), Some(" http://env/up "), None),
        "http://env/up"
    );
    assert_eq!(
        resolve_endpoint_with(Some(""), Some(""), Some("prod.example")),
        PRODUCTION_UPLOAD_URL
    );
}
