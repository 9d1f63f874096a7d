use super::*;
use crate::foundation::core::FrameIndex;
use crate::foundation::math;
use crate::model::motion::{BoneFrame, Motion};
use crate::model::skeleton::SkeletonData;
use glam::DVec3;
use std::path::PathBuf;

fn fixture() -> SkeletonData {
    serde_json::from_str(include_str!("../../../data/humanoid.json")).unwrap()
}

// Arms lowered from the fixture's slight slope to a steeper A-stance.
fn a_stance() -> SkeletonData {
    let mut data = fixture();
    for b in &mut data.bones {
        let lowered = match b.name.get(3..) {
            Some("ひじ") => Some(DVec3::new(2.8, 11.5, 0.2)),
            Some("手首") => Some(DVec3::new(4.0, 9.0, 0.0)),
            Some("中指１") => Some(DVec3::new(4.5, 8.2, 0.0)),
            _ => None,
        };
        if let Some(p) = lowered {
            let sign = if b.name.starts_with('右') { -1.0 } else { 1.0 };
            b.position = DVec3::new(p.x * sign, p.y, p.z);
        }
    }
    data
}

#[test]
fn identical_stances_need_no_diff() {
    let s = Skeleton::try_from(fixture()).unwrap();
    let diffs = calc_arm_stance(&s, &s);
    assert_eq!(diffs.len(), 6);
    assert_eq!(diffs["左腕"].from, None);
    for diff in diffs.values() {
        assert!(math::abs_dot(diff.to, DQuat::IDENTITY) > 1.0 - 1e-12);
        if let Some(from) = diff.from {
            assert!(math::abs_dot(from, DQuat::IDENTITY) > 1.0 - 1e-12);
        }
    }
}

#[test]
fn keys_absorb_the_slope_difference() {
    let org = Skeleton::try_from(fixture()).unwrap();
    let rep = Skeleton::try_from(a_stance()).unwrap();
    let key = DQuat::from_rotation_z(0.4);
    let mut m = Motion::new();
    m.regist_bf(BoneFrame::new(FrameIndex(0)).with_rotation(key), "左腕", FrameIndex(0));
    m.regist_bf(BoneFrame::new(FrameIndex(0)).with_rotation(key), "左ひじ", FrameIndex(0));
    let mut ds = DataSet::new(m, org, rep, PathBuf::from("out.json"));

    assert!(adjust_arm_stance(&mut ds));

    let diffs = calc_arm_stance(&ds.org_model, &ds.rep_model);
    let arm = ds.motion.calc_bf("左腕", FrameIndex(0)).rotation;
    assert!(math::abs_dot(arm, key * diffs["左腕"].to) > 1.0 - 1e-9);

    let elbow_diff = diffs["左ひじ"];
    let expected = elbow_diff.from.unwrap().inverse() * key * elbow_diff.to;
    let elbow = ds.motion.calc_bf("左ひじ", FrameIndex(0)).rotation;
    assert!(math::abs_dot(elbow, expected) > 1.0 - 1e-9);
    assert!(math::abs_dot(diffs["左腕"].to, DQuat::IDENTITY) < 1.0 - 1e-6);
}

#[test]
fn no_arm_keys_reports_nothing_done() {
    let s = Skeleton::try_from(fixture()).unwrap();
    let mut ds = DataSet::new(Motion::new(), s.clone(), s, PathBuf::from("out.json"));
    assert!(!adjust_arm_stance(&mut ds));
}
