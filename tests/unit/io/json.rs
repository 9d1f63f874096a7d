use super::*;
use crate::foundation::core::FrameIndex;
use crate::model::motion::BoneFrame;
use glam::DVec3;

fn scratch(name: &str) -> std::path::PathBuf {
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("unit-io")
        .join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn reads_fixture_model() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/humanoid.json");
    let s = JsonIo::default().read_model(&path).unwrap();
    assert_eq!(s.name, "humanoid");
    assert!(s.has_bone("左足ＩＫ"));
}

#[test]
fn missing_files_are_unprocessable() {
    let err = JsonIo::default()
        .read_motion(std::path::Path::new("does/not/exist.json"))
        .unwrap_err();
    assert!(matches!(err, SizingError::Unprocessable(_)));
}

#[test]
fn motion_write_then_read() {
    let dir = scratch("motion_write_then_read");
    let mut m = Motion::new();
    m.model_name = "humanoid".to_string();
    m.regist_bf(
        BoneFrame::new(FrameIndex(3)).with_position(DVec3::new(0.5, 1.0, -2.0)),
        "センター",
        FrameIndex(3),
    );
    let path = dir.join("nested").join("out.json");
    let io = JsonIo { pretty: true };
    io.write_motion(&m, &path).unwrap();
    let back = io.read_motion(&path).unwrap();
    assert_eq!(back, m);
}
