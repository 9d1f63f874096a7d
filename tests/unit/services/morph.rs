use super::*;
use crate::foundation::core::FrameIndex;
use crate::model::skeleton::{Skeleton, SkeletonData};
use std::path::PathBuf;

fn track(keys: &[(u32, f64)]) -> MorphTrack {
    keys.iter()
        .map(|&(f, ratio)| {
            (
                FrameIndex(f),
                MorphFrame {
                    frame: FrameIndex(f),
                    ratio,
                },
            )
        })
        .collect()
}

fn map(source: &str, target: &str, ratio: f64) -> MorphMapping {
    (source.to_string(), target.to_string(), ratio)
}

#[test]
fn source_is_renamed_and_scaled() {
    let mut m = Motion::new();
    m.morphs.insert("A".into(), track(&[(10, 0.4)]));

    assert!(replace_morphs(&mut m, &[map("A", "B", 1.5)]));
    assert!(!m.morphs.contains_key("A"));
    let b = &m.morphs["B"];
    assert_eq!(b.len(), 1);
    assert!((b[&FrameIndex(10)].ratio - 0.6).abs() < 1e-12);
}

#[test]
fn existing_target_keys_are_summed() {
    let mut m = Motion::new();
    m.morphs.insert("A".into(), track(&[(0, 0.5), (5, 1.0)]));
    m.morphs.insert("B".into(), track(&[(5, 0.25), (8, 0.3)]));

    replace_morphs(&mut m, &[map("A", "B", 0.5)]);
    let b = &m.morphs["B"];
    assert_eq!(b[&FrameIndex(0)].ratio, 0.25);
    assert_eq!(b[&FrameIndex(5)].ratio, 0.75);
    assert_eq!(b[&FrameIndex(8)].ratio, 0.3);
}

#[test]
fn self_mapping_rescales_in_place() {
    let mut m = Motion::new();
    m.morphs.insert("smile".into(), track(&[(3, 0.5)]));
    replace_morphs(&mut m, &[map("smile", "smile", 2.0)]);
    assert_eq!(m.morphs["smile"][&FrameIndex(3)].ratio, 1.0);
}

#[test]
fn later_mappings_add_onto_earlier_targets() {
    let mut m = Motion::new();
    m.morphs.insert("A".into(), track(&[(1, 0.2)]));
    m.morphs.insert("C".into(), track(&[(1, 0.3)]));
    replace_morphs(&mut m, &[map("A", "B", 1.0), map("C", "B", 1.0)]);
    assert!((m.morphs["B"][&FrameIndex(1)].ratio - 0.5).abs() < 1e-12);
    assert_eq!(m.morphs.len(), 1);
}

#[test]
fn second_pass_is_a_no_op() {
    let mut m = Motion::new();
    m.morphs.insert("A".into(), track(&[(10, 0.4)]));
    m.morphs.insert("other".into(), track(&[(2, 1.0)]));
    let mapping = [map("A", "B", 1.5)];
    replace_morphs(&mut m, &mapping);
    let once = m.clone();
    replace_morphs(&mut m, &mapping);
    assert_eq!(m, once);
}

#[test]
fn repeated_pass_reports_no_change() {
    let mut m = Motion::new();
    m.morphs.insert("A".into(), track(&[(10, 0.4)]));
    let mapping = [map("A", "B", 1.5)];
    assert!(replace_morphs(&mut m, &mapping));
    let once = m.clone();
    assert!(!replace_morphs(&mut m, &mapping));
    assert_eq!(m, once);

    // an identity mapping on a keyed track changes nothing either
    assert!(!replace_morphs(&mut m, &[map("B", "B", 1.0)]));
    assert_eq!(m, once);
}

#[test]
fn unmapped_or_empty_motion_is_skipped() {
    let data: SkeletonData = serde_json::from_str(include_str!("../../data/humanoid.json")).unwrap();
    let skel = Skeleton::try_from(data).unwrap();
    let mut ds = DataSet::new(Motion::new(), skel.clone(), skel, PathBuf::from("out.json"))
        .with_morphs(vec![map("A", "B", 1.0)]);
    assert!(!replace_morph(&mut ds, 0));

    ds.motion.morphs.insert("A".into(), track(&[(0, 1.0)]));
    ds.morph_list.clear();
    assert!(!replace_morph(&mut ds, 0));
}
