use std::fmt;
use std::path::{Path, PathBuf};

use crate::services::camera::CameraScale;
use crate::services::stance::StanceSteps;
use crate::sizing::data_set::{DataSet, SizingRatios};
use crate::sizing::options::SizingOptions;

/// How one output ended up.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Written and found again at this resolved path.
    Written(PathBuf),
    /// Not written; the message says why.
    Failed(String),
    /// Camera-only runs leave the motions alone.
    Untouched,
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// What happened to one data set.
#[derive(Clone, Debug)]
pub struct DataSetReport {
    pub index: usize,
    pub output_path: PathBuf,
    pub org_model: String,
    pub rep_model: String,
    pub ratios: Option<SizingRatios>,
    /// Bones whose translation keys were rescaled.
    pub moved: Vec<String>,
    pub stance: StanceSteps,
    pub avoided: usize,
    pub aligned: usize,
    pub morphs_replaced: bool,
    pub outcome: Outcome,
}

impl DataSetReport {
    pub fn new(index: usize, ds: &DataSet) -> Self {
        Self {
            index,
            output_path: ds.output_path.clone(),
            org_model: ds.org_model.name.clone(),
            rep_model: ds.rep_model.name.clone(),
            ratios: ds.ratios().ok(),
            moved: Vec::new(),
            stance: StanceSteps::default(),
            avoided: 0,
            aligned: 0,
            morphs_replaced: false,
            outcome: Outcome::Untouched,
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.outcome = Outcome::Failed(message.into());
    }
}

impl fmt::Display for DataSetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[No.{}] {}", self.index + 1, self.output_path.display())?;
        writeln!(f, "  source model: {}", self.org_model)?;
        writeln!(f, "  target model: {}", self.rep_model)?;
        if let Some(r) = self.ratios {
            writeln!(
                f,
                "  ratios: xz {:.5}, y {:.5}, heads tall {:.5}",
                r.xz, r.y, r.heads_tall
            )?;
        }
        if !self.moved.is_empty() {
            writeln!(f, "  moved: {}", self.moved.join(", "))?;
        }
        let s = &self.stance;
        let mut stance = Vec::new();
        for (ran, name) in [
            (s.center, "center"),
            (s.upper, "upper"),
            (s.toe, "toe"),
            (s.shoulder, "shoulder"),
            (s.twist, "twist"),
            (s.arm, "arm"),
        ] {
            if ran {
                stance.push(name);
            }
        }
        if !stance.is_empty() {
            writeln!(f, "  stance: {}", stance.join(", "))?;
        }
        if self.avoided > 0 {
            writeln!(f, "  avoidance corrections: {}", self.avoided)?;
        }
        if self.aligned > 0 {
            writeln!(f, "  alignment corrections: {}", self.aligned)?;
        }
        if self.morphs_replaced {
            writeln!(f, "  morphs replaced")?;
        }
        match &self.outcome {
            Outcome::Written(p) => writeln!(f, "  written: {}", p.display()),
            Outcome::Failed(msg) => writeln!(f, "  FAILED: {msg}"),
            Outcome::Untouched => writeln!(f, "  not written"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraReport {
    pub output_path: PathBuf,
    pub scale: Option<CameraScale>,
    pub outcome: Outcome,
}

/// Result of one batch run.
#[derive(Clone, Debug)]
pub struct SizingReport {
    pub data_sets: Vec<DataSetReport>,
    pub camera: Option<CameraReport>,
    pub steps_total: usize,
    pub steps_done: usize,
}

impl SizingReport {
    pub fn failed(&self) -> usize {
        self.data_sets
            .iter()
            .filter(|d| d.outcome.is_failed())
            .count()
            + usize::from(self.camera.as_ref().is_some_and(|c| c.outcome.is_failed()))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn skipped_steps(&self) -> bool {
        self.steps_done < self.steps_total
    }
}

/// Batch header written at the top of every run log.
pub fn describe_batch(data_sets: &[DataSet], options: &SizingOptions) -> String {
    let mut out = String::from("motion sizing\n------------------------\n");
    for (idx, ds) in data_sets.iter().enumerate() {
        out.push_str(&format!("[No.{}]\n", idx + 1));
        out.push_str(&format!("  source model: {}\n", ds.org_model.name));
        out.push_str(&format!("  target model: {}\n", ds.rep_model.name));
        if let Some(cam) = &ds.camera_org_model {
            out.push_str(&format!("  camera source model: {}\n", cam.name));
            out.push_str(&format!("  camera y offset: {}\n", ds.camera_offset_y));
        }
        out.push_str(&format!("  detail stance: {}\n", ds.detail_stance));
        if ds.detail_stance {
            let details: Vec<String> = ds
                .stance_details
                .iter()
                .map(|d| format!("{d:?}").to_lowercase())
                .collect();
            out.push_str(&format!("    {}\n", details.join(", ")));
        }
        out.push_str(&format!("  twist spread: {}\n", ds.twist));
        if !ds.morph_list.is_empty() {
            let morphs: Vec<String> = ds
                .morph_list
                .iter()
                .map(|(s, t, r)| format!("{s} -> {t} ({r})"))
                .collect();
            out.push_str(&format!("  morphs: {}\n", morphs.join(", ")));
        }
        if !ds.avoidance_bodies.is_empty() {
            out.push_str(&format!(
                "  avoidance bodies: {}\n",
                ds.avoidance_bodies.join(", ")
            ));
        }
        if ds.leg_offset != 0.0 {
            out.push_str(&format!("  leg offset: {}\n", ds.leg_offset));
        }
    }
    out.push_str("------------------------\n");
    let arm = &options.arm;
    if arm.avoidance {
        out.push_str("arm avoidance: true\n");
    }
    if arm.alignment {
        out.push_str(&format!(
            "wrist alignment: true ({})\nfinger alignment: {} ({})\nfloor alignment: {} ({})\n",
            arm.wrist_threshold,
            arm.alignment_finger,
            arm.finger_threshold,
            arm.alignment_floor,
            arm.floor_threshold
        ));
    }
    out.push_str(&format!("move correction: {}\n", options.move_correction));
    let limit = options.distance_limit.ceiling();
    out.push_str(&format!(
        "camera distance limit: {limit}{}\n",
        if options.distance_limit.is_unlimited() {
            " (unlimited)"
        } else {
            ""
        }
    ));
    out.push_str("------------------------\n");
    out
}

/// `<output>.log`, next to the output file.
pub fn log_path(output: &Path) -> PathBuf {
    let mut p = output.as_os_str().to_owned();
    p.push(".log");
    PathBuf::from(p)
}

#[cfg(test)]
#[path = "../../tests/unit/sizing/report.rs"]
mod tests;
