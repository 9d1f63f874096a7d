use std::path::PathBuf;
use std::sync::OnceLock;

use crate::foundation::core::Side;
use crate::foundation::error::{SizingError, SizingResult};
use crate::foundation::math;
use crate::model::motion::Motion;
use crate::model::names;
use crate::model::skeleton::Skeleton;
use crate::sizing::options::StanceDetail;

/// `(source morph, target morph, ratio)`.
pub type MorphMapping = (String, String, f64);

/// Scale factors between the org and rep skeletons.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizingRatios {
    pub xz: f64,
    pub y: f64,
    pub heads_tall: f64,
}

impl Default for SizingRatios {
    fn default() -> Self {
        Self {
            xz: 1.0,
            y: 1.0,
            heads_tall: 1.0,
        }
    }
}

impl SizingRatios {
    /// Leg and head proportions of `rep` relative to `org`.
    ///
    /// `xz` compares summed thigh and shin lengths, `y` the vertical hip-to-ankle span and
    /// `heads_tall` the head-to-body proportion. Unmeasurable ratios stay at `1.0`.
    pub fn measure(org: &Skeleton, rep: &Skeleton) -> SizingRatios {
        let mut out = SizingRatios::default();
        let leg = Side::Left.bone(names::LEG);
        let knee = Side::Left.bone(names::KNEE);
        let ankle = Side::Left.bone(names::ANKLE);
        let leg_bones = [leg.as_str(), knee.as_str(), ankle.as_str()];

        if org.has_all(&leg_bones) && rep.has_all(&leg_bones) {
            let lengths = |s: &Skeleton| {
                let (l, k, a) = (
                    s.position(&leg).unwrap_or_default(),
                    s.position(&knee).unwrap_or_default(),
                    s.position(&ankle).unwrap_or_default(),
                );
                ((k - l).length() + (a - k).length(), (l - a).y)
            };
            let (org_len, org_span) = lengths(org);
            let (rep_len, rep_span) = lengths(rep);
            out.xz = math::ratio(rep_len, org_len);
            out.y = math::ratio(rep_span, org_span);
        } else {
            tracing::warn!(
                org = %org.name,
                rep = %rep.name,
                "leg bones missing; keeping unit move ratios"
            );
        }

        if let (Some(o), Some(r)) = (heads_tall(org), heads_tall(rep)) {
            out.heads_tall = math::ratio(o, r);
        }
        out
    }
}

fn heads_tall(s: &Skeleton) -> Option<f64> {
    let neck = s.position(names::NECK)?;
    let top = s.head_top();
    let head = top.y - neck.y;
    if math::effective_scalar(head) == 0.0 {
        return None;
    }
    Some(top.y / head)
}

/// One retargeting unit: a motion and the skeleton pair it moves between.
#[derive(Debug)]
pub struct DataSet {
    /// Working copy mutated by the pipeline.
    pub motion: Motion,
    /// Untouched copy of the input, used as the reference baseline.
    pub org_motion: Motion,
    pub org_model: Skeleton,
    pub rep_model: Skeleton,
    pub output_path: PathBuf,
    pub detail_stance: bool,
    pub stance_details: Vec<StanceDetail>,
    pub twist: bool,
    pub morph_list: Vec<MorphMapping>,
    pub avoidance_bodies: Vec<String>,
    pub camera_org_model: Option<Skeleton>,
    pub camera_offset_y: f64,
    pub leg_offset: f64,
    original_ratios: OnceLock<SizingRatios>,
    ratios: OnceLock<SizingRatios>,
}

impl DataSet {
    pub fn new(motion: Motion, org_model: Skeleton, rep_model: Skeleton, output_path: PathBuf) -> Self {
        Self {
            org_motion: motion.clone(),
            motion,
            org_model,
            rep_model,
            output_path,
            detail_stance: true,
            stance_details: StanceDetail::ALL.to_vec(),
            twist: false,
            morph_list: Vec::new(),
            avoidance_bodies: Vec::new(),
            camera_org_model: None,
            camera_offset_y: 0.0,
            leg_offset: 0.0,
            original_ratios: OnceLock::new(),
            ratios: OnceLock::new(),
        }
    }

    pub fn with_twist(mut self, twist: bool) -> Self {
        self.twist = twist;
        self
    }

    pub fn with_morphs(mut self, morphs: Vec<MorphMapping>) -> Self {
        self.morph_list = morphs;
        self
    }

    pub fn with_stance(mut self, detail_stance: bool, details: Vec<StanceDetail>) -> Self {
        self.detail_stance = detail_stance;
        self.stance_details = details;
        self
    }

    /// Whether `detail` is selected and detail stance is on.
    pub fn runs(&self, detail: StanceDetail) -> bool {
        self.detail_stance && self.stance_details.contains(&detail)
    }

    /// Measure and store this data set's own ratios. Fails if already measured.
    pub fn measure_ratios(&self) -> SizingResult<SizingRatios> {
        let r = SizingRatios::measure(&self.org_model, &self.rep_model);
        self.original_ratios
            .set(r)
            .map_err(|_| SizingError::validation("sizing ratios were already measured"))?;
        Ok(r)
    }

    /// Ratios as measured on this pair alone.
    pub fn original_ratios(&self) -> SizingResult<SizingRatios> {
        self.original_ratios
            .get()
            .copied()
            .ok_or_else(|| SizingError::validation("sizing ratios have not been measured"))
    }

    /// Fix the batch-adjusted ratios consumed by every later stage.
    pub fn fix_ratios(&self, ratios: SizingRatios) -> SizingResult<()> {
        self.ratios
            .set(ratios)
            .map_err(|_| SizingError::validation("sizing ratios are already fixed"))
    }

    pub fn ratios(&self) -> SizingResult<SizingRatios> {
        self.ratios
            .get()
            .copied()
            .ok_or_else(|| SizingError::validation("sizing ratios have not been fixed"))
    }

    pub fn label(&self, idx: usize) -> String {
        format!("No.{} {}", idx + 1, self.output_path.display())
    }
}

/// Apply the batch rule: every `xz` becomes the batch mean, everything scaled by `correction`.
pub fn aggregate_ratios(originals: &[SizingRatios], correction: f64) -> Vec<SizingRatios> {
    if originals.is_empty() {
        return Vec::new();
    }
    let mean_xz = originals.iter().map(|r| r.xz).sum::<f64>() / originals.len() as f64;
    originals
        .iter()
        .map(|r| SizingRatios {
            xz: mean_xz * correction,
            y: r.y * correction,
            heads_tall: r.heads_tall,
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/sizing/data_set.rs"]
mod tests;
