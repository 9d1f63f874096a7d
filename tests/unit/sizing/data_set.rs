use super::*;
use crate::model::skeleton::SkeletonData;

fn fixture() -> SkeletonData {
    serde_json::from_str(include_str!("../../data/humanoid.json")).unwrap()
}

fn pair(scale: f64) -> DataSet {
    let org = Skeleton::try_from(fixture()).unwrap();
    let rep = Skeleton::try_from(fixture().scaled(scale)).unwrap();
    DataSet::new(Motion::new(), org, rep, PathBuf::from("out.json"))
}

#[test]
fn uniform_scale_gives_uniform_ratios() {
    let ds = pair(2.0);
    let r = ds.measure_ratios().unwrap();
    assert!((r.xz - 2.0).abs() < 1e-12);
    assert!((r.y - 2.0).abs() < 1e-12);
    assert!((r.heads_tall - 1.0).abs() < 1e-12);
}

#[test]
fn ratios_are_measured_once() {
    let ds = pair(1.0);
    ds.measure_ratios().unwrap();
    assert!(ds.measure_ratios().is_err());
    assert!(ds.ratios().is_err());
    ds.fix_ratios(SizingRatios::default()).unwrap();
    assert!(ds.fix_ratios(SizingRatios::default()).is_err());
    assert_eq!(ds.ratios().unwrap(), SizingRatios::default());
}

#[test]
fn missing_leg_bones_keep_unit_ratios() {
    let mut data = fixture();
    data.bones.retain(|b| b.name != "左ひざ");
    for b in &mut data.bones {
        if b.parent.as_deref() == Some("左ひざ") {
            b.parent = Some("左足".to_string());
        }
        if b.tail.is_some() && b.name == "左足" {
            b.tail = None;
        }
    }
    let org = Skeleton::try_from(data).unwrap();
    let rep = Skeleton::try_from(fixture()).unwrap();
    let r = SizingRatios::measure(&org, &rep);
    assert_eq!(r.xz, 1.0);
    assert_eq!(r.y, 1.0);
}

#[test]
fn batch_uses_mean_xz_and_own_y() {
    let originals = [
        SizingRatios {
            xz: 1.0,
            y: 0.8,
            heads_tall: 1.1,
        },
        SizingRatios {
            xz: 2.0,
            y: 1.2,
            heads_tall: 0.9,
        },
    ];
    let out = aggregate_ratios(&originals, 1.0);
    assert_eq!(out[0].xz, 1.5);
    assert_eq!(out[1].xz, 1.5);
    assert_eq!(out[0].y, 0.8);
    assert_eq!(out[1].heads_tall, 0.9);

    let single = aggregate_ratios(&originals[..1], 1.2);
    assert!((single[0].xz - 1.2).abs() < 1e-12);
    assert!((single[0].y - 0.96).abs() < 1e-12);
}

#[test]
fn stance_selection_requires_detail_flag() {
    let ds = pair(1.0).with_stance(false, StanceDetail::ALL.to_vec());
    assert!(!ds.runs(StanceDetail::Upper));
    let ds = pair(1.0).with_stance(true, vec![StanceDetail::Toe]);
    assert!(ds.runs(StanceDetail::Toe));
    assert!(!ds.runs(StanceDetail::Center));
}
