use std::path::{Path, PathBuf};

use crate::foundation::core::{CancelToken, Progress, build_thread_pool};
use crate::foundation::error::{SizingError, SizingResult};
use crate::io::json::MotionWriter;
use crate::model::motion::Motion;
use crate::services::arm_alignment::align_arms;
use crate::services::arm_avoidance::avoid_arm_collisions;
use crate::services::camera::adjust_camera;
use crate::services::morph::replace_morph;
use crate::services::move_scale::adjust_move;
use crate::services::stance::adjust_stance;
use crate::sizing::data_set::{DataSet, aggregate_ratios};
use crate::sizing::options::{SizingOptions, StanceDetail};
use crate::sizing::report::{
    CameraReport, DataSetReport, Outcome, SizingReport, describe_batch, log_path,
};

/// Camera track sized alongside a batch.
#[derive(Clone, Debug)]
pub struct CameraJob {
    pub motion: Motion,
    pub output_path: PathBuf,
}

/// Everything one run works on, already loaded.
#[derive(Debug, Default)]
pub struct SizingJob {
    pub data_sets: Vec<DataSet>,
    pub camera: Option<CameraJob>,
}

impl SizingJob {
    /// Steps the progress counter expects for this job.
    ///
    /// Per data set: move and arm stance, each selected stance detail, twist spread and morph
    /// replacement when mapped. Per batch: avoidance once per data set, alignment once, and
    /// the camera once.
    pub fn total_steps(&self, options: &SizingOptions) -> usize {
        let camera = usize::from(self.camera.is_some());
        if options.camera_only {
            return camera;
        }
        let per_data_set: usize = self
            .data_sets
            .iter()
            .map(|ds| {
                let details = StanceDetail::ALL.iter().filter(|d| ds.runs(**d)).count();
                2 + details + usize::from(ds.twist) + usize::from(!ds.morph_list.is_empty())
            })
            .sum();
        let avoidance = if options.arm.avoidance {
            self.data_sets.len()
        } else {
            0
        };
        per_data_set + avoidance + usize::from(options.arm.alignment) + camera
    }
}

/// Runs the sizing stages over a batch and writes the results.
pub struct SizingService<'a> {
    options: SizingOptions,
    writer: &'a dyn MotionWriter,
}

impl<'a> SizingService<'a> {
    pub fn new(options: SizingOptions, writer: &'a dyn MotionWriter) -> SizingResult<Self> {
        options.validate()?;
        Ok(Self { options, writer })
    }

    pub fn options(&self) -> &SizingOptions {
        &self.options
    }

    /// Size every data set of `job`, then the camera, then write the outputs.
    ///
    /// A data set that fails is reported and skipped by the later stages while the rest of
    /// the batch carries on. Cancellation aborts the whole run before anything is written.
    #[tracing::instrument(skip_all, fields(data_sets = job.data_sets.len()))]
    pub fn run(&self, job: &mut SizingJob, cancel: &CancelToken) -> SizingResult<SizingReport> {
        let opts = &self.options;
        for (idx, ds) in job.data_sets.iter_mut().enumerate() {
            ds.org_model.reset_local_offsets();
            ds.rep_model.reset_local_offsets();
            if let Some(&offset) = opts.leg_offsets.get(&idx) {
                ds.leg_offset = offset;
            }
        }
        let header = describe_batch(&job.data_sets, opts);
        tracing::info!(camera_only = opts.camera_only, "sizing started");
        tracing::debug!("\n{header}");

        let progress = Progress::new(job.total_steps(opts));
        self.fix_ratios(&job.data_sets)?;
        let mut reports: Vec<DataSetReport> = job
            .data_sets
            .iter()
            .enumerate()
            .map(|(idx, ds)| DataSetReport::new(idx, ds))
            .collect();

        if !opts.camera_only {
            let pool = build_thread_pool(Some(opts.worker.thread_count()))?;
            let data_sets = &mut job.data_sets;

            stage("move", data_sets, &mut reports, |idx, ds, report| {
                report.moved = adjust_move(ds, idx, &pool, cancel)?;
                progress.advance();
                Ok(())
            })?;
            stage("stance", data_sets, &mut reports, |idx, ds, report| {
                report.stance = adjust_stance(ds, idx, &progress, cancel)?;
                Ok(())
            })?;
            if opts.arm.avoidance {
                stage("avoidance", data_sets, &mut reports, |idx, ds, report| {
                    report.avoided = avoid_arm_collisions(ds, idx, cancel)?;
                    progress.advance();
                    Ok(())
                })?;
            }
            if opts.arm.alignment {
                let mut ran = false;
                stage("alignment", data_sets, &mut reports, |idx, ds, report| {
                    report.aligned = align_arms(ds, idx, &opts.arm, cancel)?;
                    ran = true;
                    Ok(())
                })?;
                // One step for the whole batch, counted only if some data set got this far.
                if ran {
                    progress.advance();
                }
            }
        }

        let camera = match job.camera.as_mut() {
            Some(cam) => Some(self.size_camera(cam, &job.data_sets, &progress, cancel)?),
            None => None,
        };

        if !opts.camera_only {
            stage("morph", &mut job.data_sets, &mut reports, |idx, ds, report| {
                report.morphs_replaced = replace_morph(ds, idx);
                if report.morphs_replaced {
                    progress.advance();
                }
                Ok(())
            })?;
        }

        cancel.check()?;
        if !opts.camera_only {
            for (ds, report) in job.data_sets.iter().zip(reports.iter_mut()) {
                if report.outcome.is_failed() {
                    continue;
                }
                report.outcome = self.write(&ds.motion, &ds.output_path);
                if let Outcome::Written(path) = &report.outcome {
                    tracing::info!(data_set = report.index + 1, path = %path.display(), "output written");
                }
            }
        }
        let camera = match (camera, &job.camera) {
            (Some(mut c), Some(cam)) if !c.outcome.is_failed() => {
                c.outcome = self.write(&cam.motion, &c.output_path);
                Some(c)
            }
            (c, _) => c,
        };

        let skipped = progress.finish();
        let report = SizingReport {
            data_sets: reports,
            camera,
            steps_total: progress.total(),
            steps_done: progress.done(),
        };
        self.write_logs(&header, &report);
        tracing::info!(
            failed = report.failed(),
            skipped,
            steps = report.steps_done,
            total = report.steps_total,
            "sizing finished"
        );
        Ok(report)
    }

    /// Measure every pair, then fix the batch-aggregated ratios on each data set.
    fn fix_ratios(&self, data_sets: &[DataSet]) -> SizingResult<()> {
        let originals = data_sets
            .iter()
            .map(DataSet::measure_ratios)
            .collect::<SizingResult<Vec<_>>>()?;
        let fixed = aggregate_ratios(&originals, self.options.move_correction);
        for (idx, (ds, r)) in data_sets.iter().zip(fixed).enumerate() {
            ds.fix_ratios(r)?;
            tracing::info!(
                data_set = idx + 1,
                xz = r.xz,
                y = r.y,
                heads_tall = r.heads_tall,
                "sizing ratios fixed"
            );
        }
        Ok(())
    }

    fn size_camera(
        &self,
        cam: &mut CameraJob,
        data_sets: &[DataSet],
        progress: &Progress,
        cancel: &CancelToken,
    ) -> SizingResult<CameraReport> {
        let mut report = CameraReport {
            output_path: cam.output_path.clone(),
            scale: None,
            outcome: Outcome::Untouched,
        };
        match adjust_camera(&mut cam.motion, data_sets, self.options.distance_limit, cancel) {
            Ok(scale) => {
                report.scale = Some(scale);
                progress.advance();
            }
            Err(e) if e.is_interrupted() => return Err(e),
            Err(e) => {
                tracing::error!(error = %e, "camera sizing failed");
                report.outcome = Outcome::Failed(e.to_string());
            }
        }
        Ok(report)
    }

    /// Write `motion` and confirm it landed.
    fn write(&self, motion: &Motion, path: &Path) -> Outcome {
        let written = self.writer.write_motion(motion, path).and_then(|()| {
            std::fs::canonicalize(path).map_err(|e| {
                SizingError::unprocessable(format!(
                    "output '{}' was not created: {e}",
                    path.display()
                ))
            })
        });
        match written {
            Ok(resolved) => Outcome::Written(resolved),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "output write failed");
                Outcome::Failed(e.to_string())
            }
        }
    }

    fn write_logs(&self, header: &str, report: &SizingReport) {
        for ds in &report.data_sets {
            if !(self.options.write_log || ds.outcome.is_failed()) {
                continue;
            }
            let path = log_path(&ds.output_path);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %path.display(), error = %e, "run log directory not created");
                continue;
            }
            if let Err(e) = std::fs::write(&path, format!("{header}{ds}")) {
                tracing::warn!(path = %path.display(), error = %e, "run log not written");
            }
        }
    }
}

/// Run `f` on every data set that has not failed yet, recording new failures.
///
/// Interruption stops the whole stage and is returned as-is.
fn stage<F>(
    name: &'static str,
    data_sets: &mut [DataSet],
    reports: &mut [DataSetReport],
    mut f: F,
) -> SizingResult<()>
where
    F: FnMut(usize, &mut DataSet, &mut DataSetReport) -> SizingResult<()>,
{
    for (idx, (ds, report)) in data_sets.iter_mut().zip(reports.iter_mut()).enumerate() {
        if report.outcome.is_failed() {
            continue;
        }
        if let Err(e) = f(idx, ds, report) {
            if e.is_interrupted() {
                tracing::info!(stage = name, "sizing interrupted");
                return Err(e);
            }
            tracing::error!(stage = name, data_set = idx + 1, error = %e, "data set aborted");
            report.fail(format!("{name}: {e}"));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/sizing/service.rs"]
mod tests;
