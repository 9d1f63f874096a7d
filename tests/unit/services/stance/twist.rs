use super::*;
use crate::foundation::core::FrameIndex;
use crate::foundation::math;
use crate::model::motion::{BoneFrame, Motion};
use crate::model::skeleton::{Skeleton, SkeletonData};
use glam::DQuat;
use std::path::PathBuf;

fn fixture() -> SkeletonData {
    serde_json::from_str(include_str!("../../../data/humanoid.json")).unwrap()
}

fn data_set(motion: Motion) -> DataSet {
    DataSet::new(
        motion,
        Skeleton::try_from(fixture()).unwrap(),
        Skeleton::try_from(fixture()).unwrap(),
        PathBuf::from("out.json"),
    )
}

#[test]
fn arm_roll_moves_to_arm_twist() {
    let skel = Skeleton::try_from(fixture()).unwrap();
    let axis = skel.local_x_axis("左腕");
    let roll = DQuat::from_axis_angle(axis, 0.6);
    let mut m = Motion::new();
    m.regist_bf(BoneFrame::new(FrameIndex(3)).with_rotation(roll), "左腕", FrameIndex(3));
    let mut ds = data_set(m);

    assert!(spread_twist(&mut ds, &CancelToken::new()).unwrap());

    let arm = ds.motion.calc_bf("左腕", FrameIndex(3));
    assert!(math::abs_dot(arm.rotation, DQuat::IDENTITY) > 1.0 - 1e-9);
    let twist = ds.motion.calc_bf("左腕捩", FrameIndex(3));
    assert!(twist.key);
    let twist_axis = skel.local_x_axis("左腕捩");
    assert!(math::abs_dot(twist.rotation, DQuat::from_axis_angle(twist_axis, 0.6)) > 1.0 - 1e-9);
    for bone in ["左ひじ", "左手捩", "左手首"] {
        assert!(ds.motion.calc_bf(bone, FrameIndex(3)).key, "{bone}");
    }
    assert!(!ds.motion.has_bone("右腕捩"));
}

#[test]
fn elbow_swing_becomes_a_bend() {
    let skel = Skeleton::try_from(fixture()).unwrap();
    let elbow_x = skel.local_x_axis("左ひじ");
    let bend_axis = elbow_x.cross(DVec3::NEG_Z).normalize();
    let mut m = Motion::new();
    m.regist_bf(
        BoneFrame::new(FrameIndex(0)).with_rotation(DQuat::from_axis_angle(bend_axis, 0.8)),
        "左ひじ",
        FrameIndex(0),
    );
    let mut ds = data_set(m);
    spread_twist(&mut ds, &CancelToken::new()).unwrap();

    let elbow = ds.motion.calc_bf("左ひじ", FrameIndex(0)).rotation;
    assert!(math::abs_dot(elbow, DQuat::from_axis_angle(bend_axis, 0.8)) > 1.0 - 1e-6);
    let wrist_twist = ds.motion.calc_bf("左手捩", FrameIndex(0)).rotation;
    assert!(math::abs_dot(wrist_twist, DQuat::IDENTITY) > 1.0 - 1e-6);
}

#[test]
fn missing_twist_bones_skip() {
    let mut data = fixture();
    data.bones.retain(|b| !b.name.ends_with("手捩"));
    for b in &mut data.bones {
        if b.parent.as_deref().is_some_and(|p| p.ends_with("手捩")) {
            b.parent = Some(format!("{}ひじ", &b.name[..3]));
        }
    }
    let mut ds = DataSet::new(
        Motion::new(),
        Skeleton::try_from(fixture()).unwrap(),
        Skeleton::try_from(data).unwrap(),
        PathBuf::from("out.json"),
    );
    assert!(!spread_twist(&mut ds, &CancelToken::new()).unwrap());
}
