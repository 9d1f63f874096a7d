use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::foundation::error::{SizingError, SizingResult};
use crate::io::json::{ModelReader, MotionReader};
use crate::sizing::data_set::{DataSet, MorphMapping};
use crate::sizing::options::{
    ArmOptions, DistanceLimit, SizingOptions, StanceDetail, WorkerMode,
};
use crate::sizing::service::{CameraJob, SizingJob};

/// One motion and the model pair it is sized between.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataSetConfig {
    pub motion: PathBuf,
    pub org_model: PathBuf,
    pub rep_model: PathBuf,
    pub output: PathBuf,
    #[serde(default = "default_true")]
    pub detail_stance: bool,
    #[serde(default = "all_stance_details")]
    pub stance_details: Vec<StanceDetail>,
    #[serde(default)]
    pub twist: bool,
    /// `[source, target, ratio]` triples.
    #[serde(default)]
    pub morphs: Vec<MorphMapping>,
    /// Rigid bodies of the target model the wrists must stay out of.
    #[serde(default)]
    pub avoidance_bodies: Vec<String>,
    #[serde(default)]
    pub leg_offset: f64,
    #[serde(default)]
    pub camera_org_model: Option<PathBuf>,
    #[serde(default)]
    pub camera_offset_y: f64,
}

fn default_true() -> bool {
    true
}

fn all_stance_details() -> Vec<StanceDetail> {
    StanceDetail::ALL.to_vec()
}

fn default_move_correction() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraConfig {
    pub motion: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub distance_limit: DistanceLimit,
}

/// Batch file read by the command line.
///
/// Relative paths are resolved against the directory holding the batch file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SizingConfig {
    pub data_sets: Vec<DataSetConfig>,
    #[serde(default)]
    pub arm: ArmOptions,
    #[serde(default = "default_move_correction")]
    pub move_correction: f64,
    #[serde(default)]
    pub camera: Option<CameraConfig>,
    #[serde(default)]
    pub worker: WorkerMode,
    #[serde(default)]
    pub write_log: bool,
}

impl SizingConfig {
    pub fn load(path: &Path) -> SizingResult<SizingConfig> {
        let f = File::open(path).map_err(|e| {
            SizingError::validation(format!("open batch config '{}': {e}", path.display()))
        })?;
        let mut config: SizingConfig = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| {
                SizingError::validation(format!("parse batch config '{}': {e}", path.display()))
            })?;
        if let Some(root) = path.parent() {
            config.resolve_paths(root);
        }
        Ok(config)
    }

    /// Join every relative path onto `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        for ds in &mut self.data_sets {
            fix(&mut ds.motion);
            fix(&mut ds.org_model);
            fix(&mut ds.rep_model);
            fix(&mut ds.output);
            if let Some(p) = ds.camera_org_model.as_mut() {
                fix(p);
            }
        }
        if let Some(cam) = self.camera.as_mut() {
            fix(&mut cam.motion);
            fix(&mut cam.output);
        }
    }

    pub fn validate(&self) -> SizingResult<()> {
        if self.data_sets.is_empty() {
            return Err(SizingError::validation("batch has no data sets"));
        }
        for (idx, ds) in self.data_sets.iter().enumerate() {
            let no = idx + 1;
            for (what, p) in [
                ("motion", &ds.motion),
                ("org_model", &ds.org_model),
                ("rep_model", &ds.rep_model),
                ("output", &ds.output),
            ] {
                if p.as_os_str().is_empty() {
                    return Err(SizingError::validation(format!(
                        "data set {no}: {what} path must be non-empty"
                    )));
                }
            }
            if ds.output == ds.motion {
                return Err(SizingError::validation(format!(
                    "data set {no}: output would overwrite the input motion"
                )));
            }
            for (source, target, ratio) in &ds.morphs {
                if source.trim().is_empty() || target.trim().is_empty() {
                    return Err(SizingError::validation(format!(
                        "data set {no}: morph names must be non-empty"
                    )));
                }
                if !ratio.is_finite() {
                    return Err(SizingError::validation(format!(
                        "data set {no}: morph ratio for '{source}' must be finite"
                    )));
                }
            }
            if !ds.camera_offset_y.is_finite() {
                return Err(SizingError::validation(format!(
                    "data set {no}: camera y offset must be finite"
                )));
            }
        }
        if let Some(cam) = &self.camera
            && cam.output == cam.motion
        {
            return Err(SizingError::validation(
                "camera output would overwrite the input camera motion",
            ));
        }
        self.options(false).validate()
    }

    /// Batch-level options; `camera_only` comes from the command rather than the file.
    pub fn options(&self, camera_only: bool) -> SizingOptions {
        let leg_offsets: BTreeMap<usize, f64> = self
            .data_sets
            .iter()
            .enumerate()
            .filter(|(_, ds)| ds.leg_offset != 0.0)
            .map(|(idx, ds)| (idx, ds.leg_offset))
            .collect();
        SizingOptions {
            arm: self.arm,
            move_correction: self.move_correction,
            leg_offsets,
            distance_limit: self
                .camera
                .as_ref()
                .map(|c| c.distance_limit)
                .unwrap_or_default(),
            worker: self.worker,
            write_log: self.write_log,
            camera_only,
        }
    }

    /// Read every model and motion the batch names.
    ///
    /// Camera-only runs start from the previously written outputs instead of the input
    /// motions.
    pub fn load_job<R>(&self, reader: &R, camera_only: bool) -> SizingResult<SizingJob>
    where
        R: ModelReader + MotionReader,
    {
        let mut data_sets = Vec::with_capacity(self.data_sets.len());
        for (idx, cfg) in self.data_sets.iter().enumerate() {
            let motion_path = if camera_only { &cfg.output } else { &cfg.motion };
            let motion = reader.read_motion(motion_path)?;
            let org = reader.read_model(&cfg.org_model)?;
            let rep = reader.read_model(&cfg.rep_model)?;
            let mut ds = DataSet::new(motion, org, rep, cfg.output.clone())
                .with_stance(cfg.detail_stance, cfg.stance_details.clone())
                .with_twist(cfg.twist)
                .with_morphs(cfg.morphs.clone());
            ds.avoidance_bodies = cfg.avoidance_bodies.clone();
            ds.leg_offset = cfg.leg_offset;
            ds.camera_offset_y = cfg.camera_offset_y;
            if let Some(p) = &cfg.camera_org_model {
                ds.camera_org_model = Some(reader.read_model(p)?);
            }
            tracing::info!(
                data_set = idx + 1,
                motion = %motion_path.display(),
                org = %ds.org_model.name,
                rep = %ds.rep_model.name,
                "data set loaded"
            );
            data_sets.push(ds);
        }
        let camera = match &self.camera {
            Some(cam) => Some(CameraJob {
                motion: reader.read_motion(&cam.motion)?,
                output_path: cam.output.clone(),
            }),
            None => None,
        };
        Ok(SizingJob { data_sets, camera })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/io/config.rs"]
mod tests;
