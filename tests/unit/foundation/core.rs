use super::*;

#[test]
fn frame_midpoint_rounds_down() {
    assert_eq!(FrameIndex(10).midpoint(FrameIndex(21)), FrameIndex(15));
    assert_eq!(FrameIndex(21).midpoint(FrameIndex(10)), FrameIndex(15));
    assert_eq!(FrameIndex(4).midpoint(FrameIndex(5)), FrameIndex(4));
}

#[test]
fn side_names_and_signs() {
    assert_eq!(Side::Left.bone("足ＩＫ"), "左足ＩＫ");
    assert_eq!(Side::Right.bone("腕"), "右腕");
    assert_eq!(Side::Left.sign(), 1.0);
    assert_eq!(Side::Right.sign(), -1.0);
    assert_eq!(Side::Left.opposite(), Side::Right);
}

#[test]
fn cancel_token_is_shared_between_clones() {
    let token = CancelToken::new();
    let other = token.clone();
    assert!(token.check().is_ok());
    other.cancel();
    assert!(token.is_cancelled());
    assert!(matches!(token.check(), Err(SizingError::Interrupted)));
}

#[test]
fn progress_never_exceeds_total() {
    let p = Progress::new(2);
    assert_eq!(p.advance(), 1);
    assert_eq!(p.advance(), 2);
    assert_eq!(p.advance(), 2);
    assert_eq!(p.done(), 2);
    assert!(!p.finish());
}

#[test]
fn progress_reports_skipped_steps() {
    let p = Progress::new(3);
    p.advance();
    assert!(p.finish());
}

#[test]
fn worker_count_is_bounded() {
    let n = default_worker_count();
    assert!((5..=32).contains(&n));
    let pool = build_thread_pool(Some(1)).unwrap();
    assert_eq!(pool.current_num_threads(), 1);
}
