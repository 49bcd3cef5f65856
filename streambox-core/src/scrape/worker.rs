use std::{
    fmt,
    path::PathBuf,
    process::{ExitStatus, Stdio},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use streambox_model::{ScrapeRequest, SessionId, WorkerState};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, ChildStderr, ChildStdout, Command},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::ScrapeError;

/// How long a worker that closed its stdout may take to exit on its own.
pub const REAP_GRACE: Duration = Duration::from_secs(2);

/// How scrape workers are launched.
///
/// The worker is started as `program [args..] <title_id> [season] [episode]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub program: PathBuf,
    /// Leading arguments placed before the request parameters, e.g. the
    /// script path when `program` is an interpreter.
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Capacity of the per-session event channel.
    pub event_buffer: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("node"),
            args: vec!["scrape.js".to_string()],
            working_dir: None,
            event_buffer: 64,
        }
    }
}

impl WorkerConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    fn command(&self, request: &ScrapeRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(request.worker_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

struct ProcessSlot {
    child: Option<Child>,
    state: WorkerState,
}

struct HandleInner {
    id: SessionId,
    request: ScrapeRequest,
    pid: Option<u32>,
    process: Mutex<ProcessSlot>,
}

/// One spawned worker process.
///
/// Cloning yields another reference to the same process. Killing is
/// idempotent and releases the process handle immediately; it does not wait
/// for the process to exit.
#[derive(Clone)]
pub struct ScrapeWorkerHandle {
    inner: Arc<HandleInner>,
}

impl fmt::Debug for ScrapeWorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeWorkerHandle")
            .field("id", &self.inner.id)
            .field("request", &self.inner.request)
            .field("pid", &self.inner.pid)
            .field("state", &self.state())
            .finish()
    }
}

impl ScrapeWorkerHandle {
    /// Spawn a worker for `request`. Returns the handle together with the
    /// worker's stdout, which carries the message stream.
    pub(crate) fn spawn(
        id: SessionId,
        request: ScrapeRequest,
        config: &WorkerConfig,
    ) -> Result<(Self, ChildStdout), ScrapeError> {
        let mut child =
            config.command(&request).spawn().map_err(|source| {
                ScrapeError::Spawn {
                    program: config.program.clone(),
                    source,
                }
            })?;

        let pid = child.id();
        let stdout = child.stdout.take();
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(id, stderr));
        }

        let handle = Self {
            inner: Arc::new(HandleInner {
                id,
                request,
                pid,
                process: Mutex::new(ProcessSlot {
                    child: Some(child),
                    state: WorkerState::Spawning,
                }),
            }),
        };

        let Some(stdout) = stdout else {
            handle.kill();
            return Err(ScrapeError::MissingStdout);
        };

        handle.slot().state = WorkerState::Running;
        info!(
            session = %id,
            pid = ?pid,
            request = %handle.inner.request,
            "scrape worker spawned"
        );

        Ok((handle, stdout))
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn request(&self) -> &ScrapeRequest {
        &self.inner.request
    }

    pub fn pid(&self) -> Option<u32> {
        self.inner.pid
    }

    pub fn state(&self) -> WorkerState {
        self.slot().state
    }

    /// The worker reported completion; it is about to be killed.
    pub(crate) fn mark_finishing(&self) {
        let mut slot = self.slot();
        if slot.state == WorkerState::Running {
            slot.state = WorkerState::Finishing;
        }
    }

    /// Send the kill signal and release the process handle.
    ///
    /// Returns `false` if the worker was already terminated.
    pub fn kill(&self) -> bool {
        let mut slot = self.slot();
        let Some(mut child) = slot.child.take() else {
            return false;
        };
        slot.state = WorkerState::Terminated;
        drop(slot);

        let session = self.inner.id;
        if let Err(err) = child.start_kill() {
            // Fails once the exit status has already been collected.
            debug!(%session, error = %err, "kill signal not delivered");
        }
        if let Ok(Some(status)) = child.try_wait() {
            trace!(%session, %status, "scrape worker reaped");
        }
        debug!(%session, pid = ?self.inner.pid, "scrape worker killed");
        true
    }

    /// Collect a worker whose output has ended, killing it if it has not
    /// exited within [`REAP_GRACE`] or as soon as `cancel` fires.
    pub(crate) async fn reap(
        &self,
        cancel: &CancellationToken,
    ) -> Option<ExitStatus> {
        let mut child = self.slot().child.take()?;
        let session = self.inner.id;

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            waited = tokio::time::timeout(REAP_GRACE, child.wait()) => {
                waited.ok().and_then(Result::ok)
            }
        };

        let status = match status {
            Some(status) => Some(status),
            None => {
                if let Err(err) = child.start_kill() {
                    debug!(%session, error = %err, "kill signal not delivered");
                }
                // Collect the killed process so it does not linger.
                tokio::time::timeout(REAP_GRACE, child.wait())
                    .await
                    .ok()
                    .and_then(Result::ok)
            }
        };

        self.slot().state = WorkerState::Terminated;
        trace!(%session, status = ?status, "scrape worker reaped");
        status
    }

    fn slot(&self) -> MutexGuard<'_, ProcessSlot> {
        self.inner
            .process
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn drain_stderr(session: SessionId, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(session = %session, "worker: {}", line);
    }
}
