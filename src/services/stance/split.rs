use glam::DQuat;

use crate::foundation::core::FrameIndex;
use crate::model::motion::Motion;

/// Adjacent keys whose rotations agree less than this get a key inserted between them.
pub const SPLIT_DOT_THRESHOLD: f64 = 0.2;

/// Insert a midpoint key wherever two adjacent keys of `bone` rotate far apart, so later
/// corrections have an intermediate pose to work with. Returns the number of keys inserted.
pub fn prepare_split_stance(motion: &mut Motion, bone: &str) -> usize {
    let Some(track) = motion.track(bone) else {
        return 0;
    };
    let keys: Vec<(FrameIndex, DQuat)> = track
        .values()
        .filter(|bf| bf.key)
        .map(|bf| (bf.frame, bf.rotation))
        .collect();

    let mut inserted = 0;
    for pair in keys.windows(2) {
        let [(prev, prev_rot), (next, next_rot)] = pair else {
            continue;
        };
        if prev_rot.dot(*next_rot).abs() >= SPLIT_DOT_THRESHOLD {
            continue;
        }
        let half = prev.midpoint(*next);
        if motion.split_bf_by_fno(bone, *prev, *next, half) {
            inserted += 1;
        }
    }
    if inserted > 0 {
        tracing::debug!(bone, inserted, "split keys before stance correction");
    }
    inserted
}

#[cfg(test)]
#[path = "../../../tests/unit/services/stance/split.rs"]
mod tests;
