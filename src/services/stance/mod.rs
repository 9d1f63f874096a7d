//! Rotation and floor-contact corrections that run after the move stage.

pub mod arm;
pub mod center;
pub mod chain;
pub mod shoulder;
pub mod split;
pub mod toe;
pub mod trunk;
pub mod twist;

use crate::foundation::core::{CancelToken, FrameIndex, Progress};
use crate::foundation::error::SizingResult;
use crate::sizing::data_set::DataSet;
use crate::sizing::options::StanceDetail;

/// Long tracks log once per this many frames.
pub const LOG_FRAME_INTERVAL: u32 = 500;

pub(crate) fn frame_milestone(last: &mut u32, frame: FrameIndex, bone: &str) {
    let bucket = frame.0 / LOG_FRAME_INTERVAL;
    if bucket > *last {
        tracing::info!(frame = frame.0, bone, "frames done");
        *last = bucket;
    }
}

/// Which stance steps ran for one data set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StanceSteps {
    pub center: bool,
    pub upper: bool,
    pub toe: bool,
    pub shoulder: bool,
    pub twist: bool,
    pub arm: bool,
}

impl StanceSteps {
    pub fn count(&self) -> usize {
        [
            self.center,
            self.upper,
            self.toe,
            self.shoulder,
            self.twist,
            self.arm,
        ]
        .into_iter()
        .filter(|&ran| ran)
        .count()
    }
}

/// Run the stance corrections selected on `ds`: center, upper body, toe, then the arm family
/// (shoulder, twist spread, arm stance) when both skeletons support it.
#[tracing::instrument(skip_all, fields(data_set = idx + 1))]
pub fn adjust_stance(
    ds: &mut DataSet,
    idx: usize,
    progress: &Progress,
    cancel: &CancelToken,
) -> SizingResult<StanceSteps> {
    let mut steps = StanceSteps::default();
    let step = |ran: bool| {
        if ran {
            progress.advance();
        }
        ran
    };

    if ds.runs(StanceDetail::Center) {
        steps.center = step(center::adjust_center_stance(ds, cancel)?);
    }
    if ds.runs(StanceDetail::Upper) {
        steps.upper = step(trunk::adjust_upper_stance(ds, cancel)?);
    }
    if ds.runs(StanceDetail::Toe) {
        steps.toe = step(toe::adjust_toe_stance(ds, cancel)?);
    }

    let org_ok = ds.org_model.can_arm_sizing();
    let rep_ok = ds.rep_model.can_arm_sizing();
    if org_ok && rep_ok {
        if ds.runs(StanceDetail::Shoulder) {
            steps.shoulder = step(shoulder::adjust_shoulder_stance(ds, cancel)?);
        }
        if ds.twist {
            steps.twist = step(twist::spread_twist(ds, cancel)?);
        }
        cancel.check()?;
        steps.arm = step(arm::adjust_arm_stance(ds));
    } else {
        let models: Vec<&str> = [(org_ok, "source"), (rep_ok, "target")]
            .into_iter()
            .filter(|(ok, _)| !ok)
            .map(|(_, which)| which)
            .collect();
        tracing::warn!(
            models = %models.join("/"),
            "arm structure not supported; skipping arm processing"
        );
    }
    Ok(steps)
}

#[cfg(test)]
#[path = "../../../tests/unit/services/stance/mod.rs"]
mod tests;
