//! In-memory stand-ins for the supervisor's collaborators. Each one records
//! how it was called so tests can assert on the interaction.

use async_trait::async_trait;
use scanmon_client::error::{ClientError, Result as ClientResult};
use scanmon_client::{
    ArtifactCounter, MirrorReport, MirrorSpec, MirrorTransport, RemoteScheduler,
    SubmissionReport, SubmitSpec,
};
use scanmon_core::liveness::LivenessProbe;
use scanmon_core::model::{JobRequest, JobStatus};
use scanmon_core::store::{RequestStore, Result as StoreResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

type StatusHook = Box<dyn Fn(&JobStatus, &mut Option<JobRequest>) + Send + Sync>;

#[derive(Default)]
struct MemoryState {
    request: Option<JobRequest>,
    statuses: Vec<JobStatus>,
}

/// Request/status store held in memory. An optional hook runs on every status
/// write and may mutate the stored request, which is how tests play the
/// controller mid-run.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    on_status: Arc<Mutex<Option<StatusHook>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_request(&self, request: JobRequest) {
        lock(&self.state).request = Some(request);
    }

    pub fn request(&self) -> Option<JobRequest> {
        lock(&self.state).request.clone()
    }

    pub fn statuses(&self) -> Vec<JobStatus> {
        lock(&self.state).statuses.clone()
    }

    pub fn last_status(&self) -> Option<JobStatus> {
        lock(&self.state).statuses.last().cloned()
    }

    pub fn on_status<F>(&self, hook: F)
    where
        F: Fn(&JobStatus, &mut Option<JobRequest>) + Send + Sync + 'static,
    {
        *lock(&self.on_status) = Some(Box::new(hook));
    }

    /// Flips the stored request to inactive once `after` monitoring status
    /// writes have been seen.
    pub fn cancel_after_statuses(&self, after: usize) {
        let seen = Arc::new(AtomicUsize::new(0));
        self.on_status(move |status, request| {
            if status.state == scanmon_core::model::SupervisorPhase::Monitoring
                && seen.fetch_add(1, Ordering::SeqCst) + 1 >= after
            {
                if let Some(r) = request.as_mut() {
                    r.active = false;
                }
            }
        });
    }
}

impl RequestStore for MemoryStore {
    fn load_request(&self) -> Option<JobRequest> {
        self.request()
    }

    fn save_request(&self, request: &JobRequest) -> StoreResult<()> {
        lock(&self.state).request = Some(request.clone());
        Ok(())
    }

    fn load_status(&self) -> Option<JobStatus> {
        self.last_status()
    }

    fn save_status(&self, status: &JobStatus) -> StoreResult<()> {
        let mut state = lock(&self.state);
        state.statuses.push(status.clone());
        if let Some(hook) = lock(&self.on_status).as_ref() {
            hook(status, &mut state.request);
        }
        Ok(())
    }
}

/// Reports alive for a fixed number of checks, then dead forever.
#[derive(Clone)]
pub struct ScriptedLiveness {
    alive_checks: Option<usize>,
    checks: Arc<AtomicUsize>,
}

impl ScriptedLiveness {
    pub fn always_alive() -> Self {
        Self {
            alive_checks: None,
            checks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn alive_for(checks: usize) -> Self {
        Self {
            alive_checks: Some(checks),
            checks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl LivenessProbe for ScriptedLiveness {
    fn is_controller_alive(&self) -> bool {
        let n = self.checks.fetch_add(1, Ordering::SeqCst);
        match self.alive_checks {
            Some(limit) => n < limit,
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    JobId(Option<String>),
    Fail,
    Timeout,
}

#[derive(Clone)]
pub struct ScriptedScheduler {
    outcome: SubmitOutcome,
    specs: Arc<Mutex<Vec<SubmitSpec>>>,
}

impl ScriptedScheduler {
    pub fn new(outcome: SubmitOutcome) -> Self {
        Self {
            outcome,
            specs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn accepting(job_id: &str) -> Self {
        Self::new(SubmitOutcome::JobId(Some(job_id.to_string())))
    }

    pub fn calls(&self) -> usize {
        lock(&self.specs).len()
    }

    pub fn specs(&self) -> Vec<SubmitSpec> {
        lock(&self.specs).clone()
    }
}

#[async_trait]
impl RemoteScheduler for ScriptedScheduler {
    async fn submit(&self, spec: &SubmitSpec) -> ClientResult<SubmissionReport> {
        lock(&self.specs).push(spec.clone());
        match &self.outcome {
            SubmitOutcome::JobId(id) => Ok(SubmissionReport {
                stdout: id
                    .as_ref()
                    .map(|id| format!("Submitted batch job {}\n", id))
                    .unwrap_or_default(),
                stderr: String::new(),
                job_id: id.clone(),
            }),
            SubmitOutcome::Fail => Err(ClientError::RemoteSubmissionFailed {
                host: spec.host.clone(),
                code: Some(1),
                stdout: String::new(),
                stderr: "sbatch: error: invalid partition".to_string(),
            }),
            SubmitOutcome::Timeout => Err(ClientError::RemoteTimeout {
                host: spec.host.clone(),
                timeout: Duration::from_secs(120),
            }),
        }
    }
}

/// Replays a sequence of mirror outcomes, repeating the last one.
#[derive(Clone)]
pub struct ScriptedMirror {
    outcomes: Arc<Mutex<VecDeque<bool>>>,
    last: Arc<Mutex<bool>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedMirror {
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into_iter().collect())),
            last: Arc::new(Mutex::new(true)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn succeeding() -> Self {
        Self::new([true])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MirrorTransport for ScriptedMirror {
    async fn mirror(&self, _spec: &MirrorSpec) -> MirrorReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let succeeded = match lock(&self.outcomes).pop_front() {
            Some(next) => {
                *lock(&self.last) = next;
                next
            }
            None => *lock(&self.last),
        };
        MirrorReport {
            succeeded,
            message: if succeeded {
                "Synced scan, hv".to_string()
            } else {
                "Mirror failed (scan: unreachable)".to_string()
            },
        }
    }
}

/// Replays absolute artifact counts, repeating the last one.
#[derive(Clone)]
pub struct ScriptedCounter {
    counts: Arc<Mutex<VecDeque<u64>>>,
    last: Arc<Mutex<u64>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedCounter {
    pub fn new(counts: impl IntoIterator<Item = u64>) -> Self {
        Self {
            counts: Arc::new(Mutex::new(counts.into_iter().collect())),
            last: Arc::new(Mutex::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArtifactCounter for ScriptedCounter {
    fn count(&self) -> u64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match lock(&self.counts).pop_front() {
            Some(next) => {
                *lock(&self.last) = next;
                next
            }
            None => *lock(&self.last),
        }
    }
}
