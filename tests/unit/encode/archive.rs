use std::io::Read;

use super::*;
use crate::encode::jpeg::EncodedFace;

fn faces(n: u8) -> EncodedFaces {
    let mut out = EncodedFaces::new();
    for i in 0..n {
        out.insert(EncodedFace {
            face: FaceIndex::new(i).unwrap(),
            bytes: vec![0xFF, 0xD8, i],
            width: 1,
            height: 1,
            caption: String::new(),
        })
        .unwrap();
    }
    out
}

#[test]
fn archive_has_six_named_entries() {
    let bytes = write_archive(&faces(6)).unwrap();
    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(zip.len(), 6);
    for i in 0..6u8 {
        let mut entry = zip.by_name(&format!("CubeFace{i}.jpeg")).unwrap();
        let mut body = Vec::new();
        entry.read_to_end(&mut body).unwrap();
        assert_eq!(body, vec![0xFF, 0xD8, i]);
    }
}

#[test]
fn incomplete_run_cannot_be_archived() {
    let err = write_archive(&faces(5)).unwrap_err();
    assert!(matches!(err, CubeError::Archive(_)));
}

#[test]
fn save_archive_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cube.zip");
    save_archive(&faces(6), &path).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}
