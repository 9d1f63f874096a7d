use std::collections::BTreeMap;

use crate::foundation::core::default_worker_count;
use crate::foundation::error::{SizingError, SizingResult};

/// Upper-body, center, toe and shoulder stance corrections, selectable per data set.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StanceDetail {
    Center,
    Upper,
    Toe,
    Shoulder,
}

impl StanceDetail {
    pub const ALL: [StanceDetail; 4] = [
        StanceDetail::Center,
        StanceDetail::Upper,
        StanceDetail::Toe,
        StanceDetail::Shoulder,
    ];
}

/// How far the camera distance may deviate from the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceLimit {
    Strict,
    #[default]
    Loose,
    None,
    /// Explicit multiplier ceiling.
    Custom(f64),
}

/// Ceiling at or above which the camera distance is not clamped.
pub const UNLIMITED_DISTANCE: f64 = 5.0;

impl DistanceLimit {
    pub fn ceiling(self) -> f64 {
        match self {
            DistanceLimit::Strict => 1.05,
            DistanceLimit::Loose => 1.3,
            DistanceLimit::None => UNLIMITED_DISTANCE,
            DistanceLimit::Custom(v) => v,
        }
    }

    pub fn is_unlimited(self) -> bool {
        self.ceiling() >= UNLIMITED_DISTANCE
    }
}

/// Batch-level arm post-processing switches and alignment thresholds.
///
/// Thresholds are in org hand-size units (wrist to middle finger length).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArmOptions {
    pub avoidance: bool,
    pub alignment: bool,
    pub alignment_finger: bool,
    pub alignment_floor: bool,
    pub wrist_threshold: f64,
    pub finger_threshold: f64,
    pub floor_threshold: f64,
}

impl Default for ArmOptions {
    fn default() -> Self {
        Self {
            avoidance: false,
            alignment: false,
            alignment_finger: false,
            alignment_floor: false,
            wrist_threshold: 1.7,
            finger_threshold: 1.4,
            floor_threshold: 1.2,
        }
    }
}

/// Worker pool sizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WorkerMode {
    /// Run single-threaded.
    pub power_saving: bool,
    /// Explicit thread count; ignored in power-saving mode.
    pub threads: Option<usize>,
}

impl WorkerMode {
    pub fn thread_count(self) -> usize {
        if self.power_saving {
            1
        } else {
            self.threads.unwrap_or_else(default_worker_count).max(1)
        }
    }
}

/// Options shared by every data set of a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct SizingOptions {
    pub arm: ArmOptions,
    /// Multiplier applied on top of the aggregated leg ratios.
    pub move_correction: f64,
    /// Manual horizontal leg offset keyed by data set index.
    pub leg_offsets: BTreeMap<usize, f64>,
    pub distance_limit: DistanceLimit,
    pub worker: WorkerMode,
    /// Write a `.log` next to every output, not only failed ones.
    pub write_log: bool,
    /// Skip everything except camera sizing and start from previously written outputs.
    pub camera_only: bool,
}

impl Default for SizingOptions {
    fn default() -> Self {
        Self {
            arm: ArmOptions::default(),
            move_correction: 1.0,
            leg_offsets: BTreeMap::new(),
            distance_limit: DistanceLimit::default(),
            worker: WorkerMode::default(),
            write_log: false,
            camera_only: false,
        }
    }
}

pub const MOVE_CORRECTION_RANGE: (f64, f64) = (0.5, 1.5);
pub const LEG_OFFSET_RANGE: (f64, f64) = (-2.0, 2.0);

impl SizingOptions {
    pub fn validate(&self) -> SizingResult<()> {
        let (lo, hi) = MOVE_CORRECTION_RANGE;
        if !(lo..=hi).contains(&self.move_correction) {
            return Err(SizingError::validation(format!(
                "move correction ratio {} is outside {lo}..={hi}",
                self.move_correction
            )));
        }
        let (lo, hi) = LEG_OFFSET_RANGE;
        for (idx, v) in &self.leg_offsets {
            if !(lo..=hi).contains(v) {
                return Err(SizingError::validation(format!(
                    "leg offset {v} of data set {} is outside {lo}..={hi}",
                    idx + 1
                )));
            }
        }
        let arm = &self.arm;
        for (name, v) in [
            ("wrist", arm.wrist_threshold),
            ("finger", arm.finger_threshold),
            ("floor", arm.floor_threshold),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(SizingError::validation(format!(
                    "{name} alignment threshold must be > 0"
                )));
            }
        }
        if let DistanceLimit::Custom(v) = self.distance_limit
            && !(v.is_finite() && v >= 1.0)
        {
            return Err(SizingError::validation(
                "custom camera distance limit must be >= 1",
            ));
        }
        if self.worker.threads == Some(0) {
            return Err(SizingError::validation("thread count must be > 0"));
        }
        Ok(())
    }

    pub fn leg_offset(&self, data_set_idx: usize) -> f64 {
        self.leg_offsets.get(&data_set_idx).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sizing/options.rs"]
mod tests;
