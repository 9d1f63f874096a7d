use std::collections::BTreeMap;

use crate::model::motion::{MorphFrame, MorphTrack, Motion};
use crate::sizing::data_set::{DataSet, MorphMapping};

/// Rename, rescale and merge morph tracks.
///
/// Every source and target track named in `mapping` is taken out of the motion first, so a
/// mapping onto itself does not collide with its own output. Sources are then re-keyed under
/// their targets with ratios multiplied, summing onto whatever the target already holds at the
/// same frame (its own original keys, or earlier mappings' output). Returns whether a keyed
/// source was renamed or rescaled; a pass whose sources are already gone reports no change.
pub fn replace_morphs(motion: &mut Motion, mapping: &[MorphMapping]) -> bool {
    let mut sources: BTreeMap<&str, MorphTrack> = BTreeMap::new();
    let mut replaced: BTreeMap<String, MorphTrack> = BTreeMap::new();
    let mut changed = false;

    for (source, target, _) in mapping {
        if let Some(track) = motion.morphs.get(source) {
            sources.insert(source.as_str(), track.clone());
        }
        if source != target
            && let Some(track) = motion.morphs.get(target)
        {
            replaced.insert(target.clone(), track.clone());
        }
    }

    for (source, target, _) in mapping {
        motion.morphs.remove(source);
        motion.morphs.remove(target);
    }

    for (source, target, ratio) in mapping {
        let Some(track) = sources.get(source.as_str()) else {
            tracing::debug!(source = %source, "morph source has no keys");
            continue;
        };
        changed |= source != target || *ratio != 1.0;
        let out = replaced.entry(target.clone()).or_default();
        for (&frame, mf) in track {
            let mut value = mf.ratio * ratio;
            if let Some(existing) = out.get(&frame) {
                value += existing.ratio;
            }
            out.insert(frame, MorphFrame { frame, ratio: value });
        }
        tracing::info!(source = %source, target = %target, ratio, "morph replaced");
    }

    motion.morphs.extend(replaced);
    changed
}

/// Apply the data set's morph mapping. Skipped when the motion has no morph keys or no
/// mapping is configured.
#[tracing::instrument(skip_all, fields(data_set = idx + 1))]
pub fn replace_morph(ds: &mut DataSet, idx: usize) -> bool {
    if ds.motion.morph_frame_count() == 0 || ds.morph_list.is_empty() {
        return false;
    }
    replace_morphs(&mut ds.motion, &ds.morph_list)
}

#[cfg(test)]
#[path = "../../tests/unit/services/morph.rs"]
mod tests;
