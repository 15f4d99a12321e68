//! Execution controller for plane fill builds
//!
//! [`PlaneFragmentsBuilder`] runs a build either on the calling thread or on
//! one background worker. The worker only sees an immutable [`Job`] and an
//! abort flag; its outcome comes back over a channel and is committed to the
//! board by whoever calls [`PlaneFragmentsBuilder::poll`] or
//! [`PlaneFragmentsBuilder::wait`], i.e. the thread that owns the board.
//!
//! Events: `Started` is sent from the thread running the build (the worker
//! for asynchronous builds), `Finished` from the thread that commits or
//! cancels.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use super::builder::build_fragments;
use super::extract::create_job;
use super::job::Job;
use super::result::{BuildStatus, BuildSummary, BuilderEvent, FragmentResult};
use crate::board::{Board, Layer};
use crate::error::FillError;

type Outcome = Result<FragmentResult, FillError>;

/// The one outstanding background build
struct Task {
    job: Arc<Job>,
    abort: Arc<AtomicBool>,
    outcome: Receiver<Outcome>,
    handle: JoinHandle<()>,
    started: Instant,
}

/// Runs plane fill builds and commits their fragments
#[derive(Default)]
pub struct PlaneFragmentsBuilder {
    subscribers: Vec<Sender<BuilderEvent>>,
    task: Option<Task>,
}

impl PlaneFragmentsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive `Started`/`Finished` events; drop the receiver to unsubscribe
    pub fn subscribe(&mut self) -> Receiver<BuilderEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// True while an asynchronous build has not been applied or cancelled
    pub fn is_busy(&self) -> bool {
        self.task.is_some()
    }

    /// Build and commit on the calling thread
    ///
    /// Returns `Ok(None)` if no plane layer was scheduled for rebuild. On
    /// error nothing is committed.
    pub fn run_synchronously(
        &mut self,
        board: &mut Board,
        layers: Option<&BTreeSet<Layer>>,
    ) -> Result<Option<BuildSummary>, FillError> {
        self.cancel();
        let Some(job) = create_job(board, layers) else {
            return Ok(None);
        };
        let started = Instant::now();
        self.emit(started_event(&job));

        match build_fragments(&job, &AtomicBool::new(false)) {
            Ok(result) => {
                let summary = commit(board, &job, result, started);
                self.emit(BuilderEvent::Finished(BuildStatus::Succeeded(summary.clone())));
                Ok(Some(summary))
            }
            Err(e) => {
                log::error!("[PlaneFill] Build failed: {}", e);
                self.emit(BuilderEvent::Finished(BuildStatus::Failed(e.clone())));
                Err(e)
            }
        }
    }

    /// Snapshot the board and build on a background worker
    ///
    /// Returns false if nothing is scheduled for rebuild. A build already in
    /// flight is cancelled first.
    pub fn start_asynchronously(&mut self, board: &Board, layers: Option<&BTreeSet<Layer>>) -> bool {
        let Some(job) = create_job(board, layers) else {
            return false;
        };
        self.cancel();

        let job = Arc::new(job);
        let abort = Arc::new(AtomicBool::new(false));
        let (tx, rx) = bounded::<Outcome>(1);
        let worker_job = Arc::clone(&job);
        let worker_abort = Arc::clone(&abort);
        let subscribers = self.subscribers.clone();

        let spawned = thread::Builder::new()
            .name("plane-fill".to_string())
            .spawn(move || {
                let event = started_event(&worker_job);
                for subscriber in &subscribers {
                    let _ = subscriber.send(event.clone());
                }
                let _ = tx.send(build_fragments(&worker_job, &worker_abort));
            });
        match spawned {
            Ok(handle) => {
                self.task = Some(Task { job, abort, outcome: rx, handle, started: Instant::now() });
                true
            }
            Err(e) => {
                log::error!("[PlaneFill] Failed to spawn worker: {}", e);
                false
            }
        }
    }

    /// Apply the outcome of the background build if it is ready
    pub fn poll(&mut self, board: &mut Board) -> Option<BuildStatus> {
        let outcome = match self.task.as_ref()?.outcome.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(FillError::Worker("worker exited without result".to_string())),
        };
        Some(self.finish(board, outcome))
    }

    /// Block until the background build is done and apply its outcome
    pub fn wait(&mut self, board: &mut Board) -> Option<BuildStatus> {
        let outcome = self
            .task
            .as_ref()?
            .outcome
            .recv()
            .unwrap_or_else(|_| Err(FillError::Worker("worker exited without result".to_string())));
        Some(self.finish(board, outcome))
    }

    /// Abort the background build and discard its outcome
    pub fn cancel(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort.store(true, Ordering::Relaxed);
        if task.handle.join().is_err() {
            log::error!("[PlaneFill] Worker panicked while cancelling");
        }
        log::debug!("[PlaneFill] Build cancelled");
        self.emit(BuilderEvent::Finished(BuildStatus::Cancelled));
    }

    fn finish(&mut self, board: &mut Board, outcome: Outcome) -> BuildStatus {
        let Some(task) = self.task.take() else {
            return BuildStatus::Cancelled;
        };
        let outcome = match task.handle.join() {
            Ok(()) => outcome,
            Err(_) => Err(FillError::Worker("worker panicked".to_string())),
        };
        let status = match outcome {
            Ok(result) => BuildStatus::Succeeded(commit(board, &task.job, result, task.started)),
            Err(FillError::Cancelled) => BuildStatus::Cancelled,
            Err(e) => {
                log::error!("[PlaneFill] Build failed: {}", e);
                BuildStatus::Failed(e)
            }
        };
        self.emit(BuilderEvent::Finished(status.clone()));
        status
    }

    fn emit(&mut self, event: BuilderEvent) {
        self.subscribers.retain(|s| s.send(event.clone()).is_ok());
    }
}

impl Drop for PlaneFragmentsBuilder {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn started_event(job: &Job) -> BuilderEvent {
    BuilderEvent::Started {
        planes: job.planes.len(),
        layers: job.layers.iter().copied().collect(),
    }
}

/// Replace the fragments of every plane in `result` and acknowledge the schedule
fn commit(board: &mut Board, job: &Job, result: FragmentResult, started: Instant) -> BuildSummary {
    let mut summary = BuildSummary {
        planes: 0,
        layers: job.layers.iter().copied().collect(),
        fragments: 0,
        warnings: result.warnings,
        elapsed_ms: 0.0,
    };
    if board.uuid != job.board {
        log::warn!("[PlaneFill] Result for board {} discarded, board is {}", job.board, board.uuid);
        return summary;
    }
    for (plane, layers) in result.planes {
        let mut applied = false;
        for (layer, fragments) in layers {
            let count = fragments.len();
            if board.set_plane_fragments(&plane, layer, fragments) {
                summary.fragments += count;
                applied = true;
            }
        }
        if applied {
            summary.planes += 1;
        } else {
            log::debug!("[PlaneFill] Plane {} was removed during the build", plane);
        }
    }
    board.acknowledge_planes_rebuild(&job.revisions);
    summary.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    log::debug!(
        "[PlaneFill] Committed {} fragments of {} planes in {:.2}ms",
        summary.fragments,
        summary.planes,
        summary.elapsed_ms
    );
    summary
}
