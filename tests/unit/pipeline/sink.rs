use super::*;

fn face(i: u8) -> EncodedFace {
    EncodedFace {
        face: FaceIndex::new(i).unwrap(),
        bytes: vec![0xFF, 0xD8, i],
        width: 4,
        height: 4,
        caption: String::new(),
    }
}

fn cfg() -> SinkConfig {
    SinkConfig {
        cube_size: 4,
        quality: Quality::MAX,
    }
}

#[test]
fn in_memory_sink_records_faces_and_resets_on_begin() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    sink.publish(&face(0)).unwrap();
    sink.end().unwrap();
    assert_eq!(sink.faces().len(), 1);
    assert!(sink.ended());

    sink.begin(cfg()).unwrap();
    assert!(sink.faces().is_empty());
    assert!(!sink.ended());
    assert_eq!(sink.config(), Some(cfg()));
}

#[test]
fn dir_sink_writes_named_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("faces");
    let mut sink = DirSink::new(&out);
    sink.begin(cfg()).unwrap();
    for i in 0..6 {
        sink.publish(&face(i)).unwrap();
    }
    sink.end().unwrap();
    for i in 0..6u8 {
        let bytes = std::fs::read(out.join(format!("CubeFace{i}.jpeg"))).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, i]);
    }
    assert_eq!(sink.written().len(), 6);
}

#[test]
fn dir_sink_rejects_short_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirSink::new(dir.path());
    sink.begin(cfg()).unwrap();
    sink.publish(&face(0)).unwrap();
    assert!(sink.end().is_err());
}
