use super::*;

fn motion_with_center() -> Motion {
    let mut m = Motion::new();
    let track = m.bones.entry("センター".to_string()).or_default();
    track.insert(
        FrameIndex(0),
        BoneFrame::new(FrameIndex(0)).with_position(DVec3::new(0.0, 0.0, 0.0)),
    );
    track.insert(
        FrameIndex(10),
        BoneFrame::new(FrameIndex(10))
            .with_position(DVec3::new(10.0, 20.0, -10.0))
            .with_rotation(DQuat::from_rotation_y(1.0)),
    );
    m
}

#[test]
fn calc_bf_interpolates_between_keys() {
    let m = motion_with_center();
    let bf = m.calc_bf("センター", FrameIndex(5));
    assert!(!bf.key);
    assert!((bf.position - DVec3::new(5.0, 10.0, -5.0)).length() < 1e-9);
    let expected = DQuat::from_rotation_y(0.5);
    assert!(bf.rotation.dot(expected).abs() > 1.0 - 1e-9);
}

#[test]
fn calc_bf_holds_outside_range_and_defaults_for_missing_tracks() {
    let m = motion_with_center();
    let after = m.calc_bf("センター", FrameIndex(40));
    assert_eq!(after.position, DVec3::new(10.0, 20.0, -10.0));
    assert_eq!(after.frame, FrameIndex(40));
    assert!(!after.key);

    let missing = m.calc_bf("頭", FrameIndex(3));
    assert_eq!(missing.position, DVec3::ZERO);
    assert_eq!(missing.rotation, DQuat::IDENTITY);
}

#[test]
fn exact_keys_are_returned_as_stored() {
    let m = motion_with_center();
    let bf = m.calc_bf("センター", FrameIndex(10));
    assert!(bf.key);
    assert_eq!(bf.frame, FrameIndex(10));
}

#[test]
fn bone_fnos_is_sorted_union() {
    let mut m = motion_with_center();
    m.regist_bf(BoneFrame::new(FrameIndex(7)), "グルーブ", FrameIndex(7));
    m.regist_bf(BoneFrame::new(FrameIndex(10)), "グルーブ", FrameIndex(10));
    assert_eq!(
        m.bone_fnos(&["センター", "グルーブ", "missing"]),
        vec![FrameIndex(0), FrameIndex(7), FrameIndex(10)]
    );
}

#[test]
fn regist_inside_segment_keeps_shape() {
    let mut m = motion_with_center();
    let before = m.calc_bf("センター", FrameIndex(3)).position;
    let bf = m.calc_bf("センター", FrameIndex(5));
    m.regist_bf(bf, "センター", FrameIndex(5));
    let stored = &m.bones["センター"][&FrameIndex(5)];
    assert!(stored.key && stored.registered);
    let after = m.calc_bf("センター", FrameIndex(3)).position;
    assert!((before - after).length() < 1e-6);
}

#[test]
fn split_requires_strict_midpoint() {
    let mut m = motion_with_center();
    assert!(!m.split_bf_by_fno("センター", FrameIndex(0), FrameIndex(10), FrameIndex(10)));
    assert!(m.split_bf_by_fno("センター", FrameIndex(0), FrameIndex(10), FrameIndex(5)));
    assert_eq!(m.key_count("センター"), 3);
}

#[test]
fn remove_and_counts() {
    let mut m = motion_with_center();
    m.morphs.entry("あ".to_string()).or_default().insert(
        FrameIndex(12),
        MorphFrame {
            frame: FrameIndex(12),
            ratio: 0.5,
        },
    );
    assert_eq!(m.bone_frame_count(), 2);
    assert_eq!(m.morph_frame_count(), 1);
    assert_eq!(m.last_frame(), FrameIndex(12));
    assert!(m.remove_bone("センター").is_some());
    assert!(!m.has_bone("センター"));
}

#[test]
fn snapshot_evaluates_each_track_once() {
    let m = motion_with_center();
    let snap = m.snapshot(&["センター", "上半身"], FrameIndex(5));
    assert_eq!(snap.key_count("センター"), 1);
    assert_eq!(snap.key_count("上半身"), 1);
    assert!(snap.bones["センター"][&FrameIndex(5)].key);
}

#[test]
fn json_round_trip_keeps_integer_frame_keys() {
    let m = motion_with_center();
    let text = serde_json::to_string(&m).unwrap();
    let back: Motion = serde_json::from_str(&text).unwrap();
    assert_eq!(back, m);
}
