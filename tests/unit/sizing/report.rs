use super::*;
use crate::model::motion::Motion;
use crate::model::skeleton::{Skeleton, SkeletonData};

fn data_set() -> DataSet {
    let data: SkeletonData =
        serde_json::from_str(include_str!("../../data/humanoid.json")).unwrap();
    let s = Skeleton::try_from(data).unwrap();
    DataSet::new(Motion::new(), s.clone(), s, PathBuf::from("out/dance.json"))
        .with_morphs(vec![("あ".into(), "a".into(), 1.5)])
}

#[test]
fn log_sits_next_to_the_output() {
    assert_eq!(
        log_path(Path::new("out/dance.json")),
        PathBuf::from("out/dance.json.log")
    );
}

#[test]
fn failures_are_counted_and_printed() {
    let ds = data_set();
    let mut ok = DataSetReport::new(0, &ds);
    ok.outcome = Outcome::Written(PathBuf::from("/abs/out/dance.json"));
    let mut bad = DataSetReport::new(1, &ds);
    bad.fail("move: unprocessable data: missing bone");

    let report = SizingReport {
        data_sets: vec![ok.clone(), bad.clone()],
        camera: None,
        steps_total: 12,
        steps_done: 10,
    };
    assert_eq!(report.failed(), 1);
    assert!(!report.is_success());
    assert!(report.skipped_steps());

    let text = bad.to_string();
    assert!(text.starts_with("[No.2]"));
    assert!(text.contains("FAILED: move: unprocessable data"));
    assert!(ok.to_string().contains("written: /abs/out/dance.json"));
}

#[test]
fn stance_steps_are_listed() {
    let ds = data_set();
    let mut r = DataSetReport::new(0, &ds);
    r.stance.center = true;
    r.stance.arm = true;
    r.moved = vec!["センター".into()];
    let text = r.to_string();
    assert!(text.contains("stance: center, arm"));
    assert!(text.contains("moved: センター"));
}

#[test]
fn batch_header_lists_data_sets_and_options() {
    let ds = data_set();
    let options = SizingOptions::default();
    let text = describe_batch(std::slice::from_ref(&ds), &options);
    assert!(text.contains("[No.1]"));
    assert!(text.contains("target model: humanoid"));
    assert!(text.contains("あ -> a (1.5)"));
    assert!(text.contains("center, upper, toe, shoulder"));
    assert!(text.contains("camera distance limit: 1.3\n"));
}
