use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::foundation::error::{SizingError, SizingResult};

/// Keyframe frame number.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct FrameIndex(pub u32);

impl FrameIndex {
    /// Midpoint between two frames, rounded toward `self`.
    pub fn midpoint(self, other: FrameIndex) -> FrameIndex {
        let (lo, hi) = if self.0 <= other.0 {
            (self.0, other.0)
        } else {
            (other.0, self.0)
        };
        FrameIndex(lo + (hi - lo) / 2)
    }
}

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Body side. MMD models face -Z, so the character's left sits on +X.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn prefix(self) -> &'static str {
        match self {
            Side::Left => "左",
            Side::Right => "右",
        }
    }

    /// Side-qualified bone name, e.g. `Side::Left.bone("足ＩＫ") == "左足ＩＫ"`.
    pub fn bone(self, base: &str) -> String {
        format!("{}{}", self.prefix(), base)
    }

    /// `+1.0` for left, `-1.0` for right.
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Cooperative cancellation flag shared between a run and its controller.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns [`SizingError::Interrupted`] once cancellation has been requested.
    pub fn check(&self) -> SizingResult<()> {
        if self.is_cancelled() {
            Err(SizingError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Flat step counter for a batch run.
///
/// `advance` is monotonic and never moves past `total`. A run that finishes
/// below `total` has skipped steps, which [`Progress::finish`] reports.
#[derive(Debug)]
pub struct Progress {
    total: usize,
    done: AtomicUsize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: AtomicUsize::new(0),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    /// Count one finished step and return the new count.
    pub fn advance(&self) -> usize {
        let total = self.total;
        let prev = self
            .done
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| {
                Some(d.saturating_add(1).min(total))
            })
            .unwrap_or(total);
        let now = (prev + 1).min(total);
        tracing::debug!(done = now, total, "sizing progress");
        now
    }

    /// `true` when some counted steps never ran.
    pub fn finish(&self) -> bool {
        let done = self.done();
        if done < self.total {
            tracing::warn!(
                done,
                total = self.total,
                "some steps were skipped; check the run log for the missing bones"
            );
            return true;
        }
        false
    }
}

/// Build the worker pool used for per-bone parallel stages.
///
/// `None` picks `min(32, cores + 4)`.
pub fn build_thread_pool(threads: Option<usize>) -> SizingResult<rayon::ThreadPool> {
    let n = threads.unwrap_or_else(default_worker_count).max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .thread_name(|i| format!("sizing-worker-{i}"))
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}

pub fn default_worker_count() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores + 4).min(32)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
