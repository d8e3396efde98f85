//! The per-instance supervisor loop.
//!
//! Every transition is one call to [`Supervisor::step`], which consumes the
//! current [`State`] and returns the next one. The per-run data (the request
//! that was submitted, the convergence tracker) travels inside the state, so
//! nothing leaks from one run into the next.

use scanmon_client::{
    ArtifactCounter, MirrorSpec, MirrorTransport, RemoteScheduler, SubmitSpec,
};
use scanmon_core::config::SupervisorSettings;
use scanmon_core::convergence::{Convergence, Progress};
use scanmon_core::liveness::LivenessProbe;
use scanmon_core::model::{JobRequest, JobStatus, SupervisorPhase};
use scanmon_core::store::RequestStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SLEEP_SLICE: Duration = Duration::from_secs(1);

/// The collaborators a supervisor drives. Production wires files, ssh and
/// rsync; tests wire scripted stand-ins.
#[derive(Clone)]
pub struct SupervisorParts {
    pub store: Arc<dyn RequestStore>,
    pub liveness: Arc<dyn LivenessProbe>,
    pub scheduler: Arc<dyn RemoteScheduler>,
    pub mirror: Arc<dyn MirrorTransport>,
    pub counter: Arc<dyn ArtifactCounter>,
}

/// One submitted request being watched until it converges.
#[derive(Debug, Clone)]
pub struct MonitorRun {
    pub request: JobRequest,
    pub job_id: Option<String>,
    pub convergence: Convergence,
    pub ticks: u32,
    pub last_mirror_succeeded: bool,
}

impl MonitorRun {
    fn status(&self, phase: SupervisorPhase, message: impl Into<String>) -> JobStatus {
        JobStatus::new(phase, message)
            .with_counts(self.convergence.observed(), self.convergence.expected())
            .with_mirror(self.last_mirror_succeeded)
            .with_job_id(self.job_id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Timeout,
    Cancelled,
}

impl Outcome {
    fn phase(&self) -> SupervisorPhase {
        match self {
            Outcome::Complete => SupervisorPhase::Complete,
            Outcome::Timeout => SupervisorPhase::Timeout,
            Outcome::Cancelled => SupervisorPhase::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The controller's heartbeat went stale.
    Orphaned,
    /// SIGINT/SIGTERM.
    Interrupted,
    /// A single run finished and the supervisor was asked to stop after one.
    Finished,
}

#[derive(Debug)]
pub enum State {
    Idle,
    Submitting(JobRequest),
    Monitoring(Box<MonitorRun>),
    Finished(Outcome, Box<MonitorRun>),
    Orphaned(Option<Box<MonitorRun>>),
    Stopping(Option<Box<MonitorRun>>),
    Exited(SupervisorExit),
}

enum Interruption {
    ControllerLost,
    Cancelled,
    Shutdown,
}

pub struct Supervisor {
    instance: String,
    settings: SupervisorSettings,
    mirror_dir: PathBuf,
    parts: SupervisorParts,
    shutdown: CancellationToken,
    once: bool,
}

impl Supervisor {
    pub fn new(
        instance: impl Into<String>,
        settings: SupervisorSettings,
        mirror_dir: impl Into<PathBuf>,
        parts: SupervisorParts,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            instance: instance.into(),
            settings,
            mirror_dir: mirror_dir.into(),
            parts,
            shutdown,
            once: false,
        }
    }

    /// Return [`SupervisorExit::Finished`] after the first terminal outcome
    /// instead of going back to idle.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub async fn run(&self) -> SupervisorExit {
        tracing::info!("Supervisor for '{}' started.", self.instance);
        self.write_status(&JobStatus::idle());

        let mut state = State::Idle;
        loop {
            let finished = matches!(state, State::Finished(..));
            state = self.step(state).await;
            match state {
                State::Exited(exit) => {
                    tracing::info!("Supervisor for '{}' exiting: {:?}", self.instance, exit);
                    return exit;
                }
                State::Idle if finished && self.once => {
                    return SupervisorExit::Finished;
                }
                _ => {}
            }
        }
    }

    pub async fn step(&self, state: State) -> State {
        match state {
            State::Idle => self.idle().await,
            State::Submitting(request) => self.submit(request).await,
            State::Monitoring(run) => self.tick(run).await,
            State::Finished(outcome, run) => self.finish(outcome, run),
            State::Orphaned(run) => self.orphan(run),
            State::Stopping(run) => self.stop(run),
            State::Exited(exit) => State::Exited(exit),
        }
    }

    async fn idle(&self) -> State {
        if self.shutdown.is_cancelled() {
            return State::Stopping(None);
        }

        if let Some(request) = self.parts.store.load_request() {
            if request.active {
                tracing::info!(
                    "Picked up request for target '{}' on {}.",
                    request.target_identifier,
                    request.remote_host
                );
                return State::Submitting(request);
            }
        }

        tokio::select! {
            _ = self.shutdown.cancelled() => State::Stopping(None),
            _ = tokio::time::sleep(self.settings.idle_poll()) => State::Idle,
        }
    }

    async fn submit(&self, request: JobRequest) -> State {
        if !self.parts.liveness.is_controller_alive() {
            return State::Orphaned(None);
        }

        let spec = SubmitSpec::from_request(&request);
        self.write_status(
            &JobStatus::new(
                SupervisorPhase::Submitting,
                format!("Submitting job to {}...", spec.host),
            )
            .with_counts(0, request.expected_artifact_count),
        );

        let (job_id, message) = match self.parts.scheduler.submit(&spec).await {
            Ok(report) => match report.job_id {
                Some(id) => {
                    tracing::info!("Remote job {} submitted.", id);
                    if let Err(e) = self.parts.store.append_job_id(&request, &id) {
                        tracing::warn!("Failed to record job id {}: {}", id, e);
                    }
                    let message = format!("Job {} submitted - waiting for data", id);
                    (Some(id), message)
                }
                None => {
                    tracing::warn!(
                        "Submission returned no job id; tracking by artifact count only. stdout: {}",
                        report.stdout.trim()
                    );
                    (
                        None,
                        "Job submitted (no job id returned) - waiting for data".to_string(),
                    )
                }
            },
            Err(e) => {
                tracing::warn!("Submission failed, monitoring anyway: {}", e);
                (
                    None,
                    format!("Warning: submission not confirmed ({}) - monitoring anyway", e),
                )
            }
        };

        let baseline = self.parts.counter.count();
        tracing::debug!("Monitoring baseline for '{}': {}", self.instance, baseline);
        let run = MonitorRun {
            convergence: Convergence::begin(
                baseline,
                request.expected_artifact_count,
                self.settings.max_stagnant_polls,
            ),
            request,
            job_id,
            ticks: 0,
            last_mirror_succeeded: false,
        };
        self.write_status(&run.status(SupervisorPhase::Monitoring, message));
        State::Monitoring(Box::new(run))
    }

    async fn tick(&self, mut run: Box<MonitorRun>) -> State {
        if let Some(interruption) = self.check_interruptions(&run.request) {
            return self.interrupted(interruption, run);
        }

        run.ticks += 1;
        let spec = MirrorSpec::from_request(&run.request, self.mirror_dir.clone());
        let report = self.parts.mirror.mirror(&spec).await;
        if !report.succeeded {
            tracing::warn!("{}", report.message);
        }
        run.last_mirror_succeeded = report.succeeded;

        let progress = run.convergence.observe(self.parts.counter.count());
        tracing::debug!(
            "Tick {}: {}/{} (stagnant {})",
            run.ticks,
            progress.observed,
            progress.expected,
            progress.stagnant_polls
        );

        if progress.converged {
            return State::Finished(Outcome::Complete, run);
        }
        if progress.stalled {
            return State::Finished(Outcome::Timeout, run);
        }

        let message = tick_message(&progress, report.succeeded, &report.message);
        self.write_status(&run.status(SupervisorPhase::Monitoring, message));

        match self.sleep_interruptible(&run.request).await {
            Some(interruption) => self.interrupted(interruption, run),
            None => State::Monitoring(run),
        }
    }

    fn finish(&self, outcome: Outcome, run: Box<MonitorRun>) -> State {
        let observed = run.convergence.observed();
        let expected = run.convergence.expected();
        let message = match outcome {
            Outcome::Complete => format!(
                "Monitoring complete - all {} data points collected",
                expected
            ),
            Outcome::Timeout => format!(
                "Timeout - only {}/{} data points collected after {} polls without progress",
                observed, expected, self.settings.max_stagnant_polls
            ),
            Outcome::Cancelled => "Stopped by user - ready for new requests".to_string(),
        };
        tracing::info!("Run finished ({:?}): {}", outcome, message);

        if let Err(e) = self.parts.store.deactivate_request(&run.request) {
            tracing::warn!("Failed to clear the active flag on the request: {}", e);
        }
        self.write_status(&run.status(outcome.phase(), message));
        State::Idle
    }

    fn orphan(&self, run: Option<Box<MonitorRun>>) -> State {
        tracing::warn!("Controller heartbeat lost; '{}' is orphaned.", self.instance);
        let message = "Controller lost - supervisor exiting";
        let status = match run {
            Some(run) => run.status(SupervisorPhase::Orphaned, message),
            None => JobStatus::new(SupervisorPhase::Orphaned, message),
        };
        self.write_status(&status);
        State::Exited(SupervisorExit::Orphaned)
    }

    fn stop(&self, run: Option<Box<MonitorRun>>) -> State {
        let message = "Supervisor stopped";
        let status = match run {
            Some(run) => run.status(SupervisorPhase::Stopped, message),
            None => JobStatus::new(SupervisorPhase::Stopped, message),
        };
        self.write_status(&status);
        State::Exited(SupervisorExit::Interrupted)
    }

    fn interrupted(&self, interruption: Interruption, run: Box<MonitorRun>) -> State {
        match interruption {
            Interruption::ControllerLost => State::Orphaned(Some(run)),
            Interruption::Cancelled => State::Finished(Outcome::Cancelled, run),
            Interruption::Shutdown => State::Stopping(Some(run)),
        }
    }

    /// A request that is gone, inactive, or replaced by different work
    /// cancels the run that `submitted` started.
    fn check_interruptions(&self, submitted: &JobRequest) -> Option<Interruption> {
        if !self.parts.liveness.is_controller_alive() {
            return Some(Interruption::ControllerLost);
        }
        if self.shutdown.is_cancelled() {
            return Some(Interruption::Shutdown);
        }
        match self.parts.store.load_request() {
            Some(request) if request.active && request.is_same_work(submitted) => None,
            Some(request) if request.active => {
                tracing::info!(
                    "Request replaced by target '{}'; cancelling the current run.",
                    request.target_identifier
                );
                Some(Interruption::Cancelled)
            }
            _ => Some(Interruption::Cancelled),
        }
    }

    /// Sleeps the request's poll interval one second at a time, returning
    /// early on the first interruption.
    async fn sleep_interruptible(&self, request: &JobRequest) -> Option<Interruption> {
        for _ in 0..request.poll_interval_seconds.max(1) {
            tokio::select! {
                _ = self.shutdown.cancelled() => return Some(Interruption::Shutdown),
                _ = tokio::time::sleep(SLEEP_SLICE) => {}
            }
            if let Some(interruption) = self.check_interruptions(request) {
                return Some(interruption);
            }
        }
        None
    }

    fn write_status(&self, status: &JobStatus) {
        if let Err(e) = self.parts.store.save_status(status) {
            tracing::warn!("Failed to write status for '{}': {}", self.instance, e);
        }
    }
}

fn tick_message(progress: &Progress, mirror_succeeded: bool, mirror_message: &str) -> String {
    if !mirror_succeeded {
        format!(
            "{} - retrying ({}/{})",
            mirror_message, progress.observed, progress.expected
        )
    } else if progress.advanced {
        format!(
            "Synced {}/{} data points",
            progress.observed, progress.expected
        )
    } else {
        format!(
            "Waiting for data... ({}/{})",
            progress.observed, progress.expected
        )
    }
}
