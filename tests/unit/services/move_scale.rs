use super::*;
use crate::foundation::core::build_thread_pool;
use crate::foundation::error::SizingError;
use crate::model::motion::BoneFrame;
use crate::model::skeleton::SkeletonData;
use crate::sizing::data_set::aggregate_ratios;
use glam::DQuat;
use std::path::PathBuf;

fn fixture() -> SkeletonData {
    serde_json::from_str(include_str!("../../data/humanoid.json")).unwrap()
}

fn data_set(rep: SkeletonData, motion: Motion) -> DataSet {
    let ds = DataSet::new(
        motion,
        Skeleton::try_from(fixture()).unwrap(),
        Skeleton::try_from(rep).unwrap(),
        PathBuf::from("out.json"),
    );
    let r = ds.measure_ratios().unwrap();
    ds.fix_ratios(aggregate_ratios(&[r], 1.0)[0]).unwrap();
    ds
}

fn key(m: &mut Motion, bone: &str, frame: u32, pos: DVec3) {
    m.regist_bf(
        BoneFrame::new(FrameIndex(frame)).with_position(pos),
        bone,
        FrameIndex(frame),
    );
}

#[test]
fn uniform_scale_doubles_translations_without_offsets() {
    let mut m = Motion::new();
    key(&mut m, "センター", 0, DVec3::new(0.5, -1.0, 2.0));
    key(&mut m, "センター", 10, DVec3::new(-1.5, 0.25, 0.0));
    key(&mut m, "左足ＩＫ", 0, DVec3::new(0.1, 0.4, -0.3));
    key(&mut m, "右つま先ＩＫ", 5, DVec3::new(0.0, 0.0, 1.0));
    let mut ds = data_set(fixture().scaled(2.0), m.clone());
    let pool = build_thread_pool(Some(2)).unwrap();

    let adjusted = adjust_move(&mut ds, 0, &pool, &CancelToken::new()).unwrap();
    assert_eq!(adjusted.len(), 3);

    for (name, track) in &m.bones {
        for (frame, bf) in track {
            let out = &ds.motion.bones[name][frame];
            assert!((out.position - bf.position * 2.0).length() < 1e-9, "{name}@{frame}");
        }
    }
    for b in ds.rep_model.bones() {
        assert_eq!(b.local_offset, DVec3::ZERO, "{}", b.name);
    }
}

#[test]
fn scratch_offset_follows_world_orientation() {
    let mut m = Motion::new();
    let q = DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2);
    m.regist_bf(
        BoneFrame::new(FrameIndex(0)).with_rotation(q),
        "左足IK親",
        FrameIndex(0),
    );
    key(&mut m, "左足ＩＫ", 0, DVec3::new(0.2, 0.0, 0.0));
    let mut rep = Skeleton::try_from(fixture()).unwrap();
    rep.set_local_offset("左足ＩＫ", DVec3::new(0.5, 0.0, 0.0));

    let out = scale_track(
        &rep,
        &m,
        "左足ＩＫ",
        SizingRatios::default(),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(out.len(), 1);
    let expected = DVec3::new(0.2, 0.0, 0.0) + DVec3::new(0.0, 0.0, -0.5);
    assert!((out[0].1 - expected).length() < 1e-9, "{:?}", out[0].1);
}

#[test]
fn manual_leg_offset_is_sign_matched_and_lands_on_ik_parent_when_keyed() {
    let mut m = Motion::new();
    key(&mut m, "左足IK親", 0, DVec3::ZERO);
    let mut ds = data_set(fixture(), m);
    ds.leg_offset = 0.5;

    assert!(set_leg_ik_offset(&mut ds, 1.0));
    assert_eq!(ds.rep_model.local_offset("左足IK親"), DVec3::new(0.5, 0.0, 0.0));
    assert_eq!(ds.rep_model.local_offset("左足ＩＫ"), DVec3::ZERO);
    assert_eq!(ds.rep_model.local_offset("右足ＩＫ"), DVec3::new(-0.5, 0.0, 0.0));
}

#[test]
fn straighter_rep_legs_lower_the_center() {
    let mut rep = fixture();
    for b in &mut rep.bones {
        if b.name.ends_with("ひざ") {
            b.position.z = 0.0;
        }
    }
    let mut ds = data_set(rep, Motion::new());
    assert!(set_center_y_offset(&mut ds));

    let org_sum = DVec3::new(0.0, 4.5, -0.3).length() + DVec3::new(0.0, -4.3, 0.3).length();
    let expected = 8.8 / org_sum * 8.8 - 8.8;
    let y = ds.rep_model.local_offset("センター").y;
    assert!(y < 0.0);
    assert!((y - expected).abs() < 1e-9, "{y} vs {expected}");
}

#[test]
fn identical_legs_keep_center_in_place() {
    let mut ds = data_set(fixture(), Motion::new());
    assert!(!set_center_y_offset(&mut ds));
    assert!(set_center_z_offset(&mut ds));
    assert_eq!(ds.rep_model.local_offset("センター"), DVec3::ZERO);
}

#[test]
fn heel_shifted_ankle_moves_center_depth() {
    let mut rep = fixture();
    for b in &mut rep.bones {
        if b.name == "左足首" {
            b.position.z = 0.3;
        }
    }
    let mut ds = data_set(rep, Motion::new());
    assert!(set_center_z_offset(&mut ds));

    // org: ankle over hip, foot 1.8 long; rep: ankle 0.3 back, foot 2.1 long.
    let expected = (0.3 / 2.1) * (2.1 / 1.8);
    let z = ds.rep_model.local_offset("センター").z;
    assert!((z - expected).abs() < 1e-9, "{z} vs {expected}");
}

#[test]
fn missing_foot_bones_skip_offsets() {
    let mut rep = fixture();
    rep.bones.retain(|b| !b.name.starts_with("左足ＩＫ") && b.name != "左つま先ＩＫ");
    let mut ds = data_set(rep, Motion::new());
    assert!(!set_leg_ik_offset(&mut ds, 1.0));
    assert!(!set_center_z_offset(&mut ds));
}

#[test]
fn cancellation_leaves_motion_untouched() {
    let mut m = Motion::new();
    key(&mut m, "センター", 0, DVec3::new(1.0, 1.0, 1.0));
    let mut ds = data_set(fixture().scaled(2.0), m.clone());
    let pool = build_thread_pool(Some(1)).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = adjust_move(&mut ds, 0, &pool, &cancel).unwrap_err();
    assert!(matches!(err, SizingError::Interrupted));
    assert_eq!(ds.motion, m);
}
