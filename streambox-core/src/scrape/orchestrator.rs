use std::fmt;

use streambox_model::{ModelError, ScrapeEvent, ScrapeRequest, SessionId};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::ChildStdout,
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{
    protocol::decode_line,
    session::{ScrapeSession, SessionInfo},
    worker::{ScrapeWorkerHandle, WorkerConfig},
};
use crate::error::{Result, ScrapeError};

/// Runs at most one scrape worker at a time.
///
/// Starting a scrape kills whatever worker is current, without waiting for
/// it, and installs the new one under the same lock, so no caller can ever
/// observe two current workers. A superseded session's remaining output is
/// discarded.
pub struct ScrapeOrchestrator {
    config: WorkerConfig,
    current: Mutex<CurrentWorker>,
    shutdown: CancellationToken,
}

impl fmt::Debug for ScrapeOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self
            .current
            .try_lock()
            .ok()
            .and_then(|guard| guard.info());

        f.debug_struct("ScrapeOrchestrator")
            .field("config", &self.config)
            .field("current", &current)
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl ScrapeOrchestrator {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            current: Mutex::new(CurrentWorker::default()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Supersede the current session (if any) and start a worker for
    /// `request`. Returns as soon as the worker is spawned.
    pub async fn start_scrape(
        &self,
        request: ScrapeRequest,
    ) -> Result<ScrapeSession> {
        if request.title_id().trim().is_empty() {
            return Err(ScrapeError::InvalidRequest(ModelError::EmptyTitleId));
        }

        let mut current = self.current.lock().await;
        if self.shutdown.is_cancelled() {
            return Err(ScrapeError::ShutDown);
        }

        if let Some(previous) = current.take() {
            let session = previous.handle.id();
            let superseded = previous.handle.request().clone();
            if previous.supersede() {
                info!(
                    %session,
                    request = %superseded,
                    "scrape session superseded"
                );
            }
        }

        let id = SessionId::new();
        let (handle, stdout) =
            ScrapeWorkerHandle::spawn(id, request.clone(), &self.config)
                .inspect_err(|err| {
                    warn!(
                        request = %request,
                        error = %err,
                        "scrape worker failed to spawn"
                    )
                })?;

        let cancel = self.shutdown.child_token();
        let (events_tx, events_rx) =
            mpsc::channel(self.config.event_buffer.max(1));
        let relay = tokio::spawn(relay_events(
            handle.clone(),
            stdout,
            events_tx,
            cancel.clone(),
        ));

        current.install(ActiveSession {
            handle,
            cancel: cancel.clone(),
            relay,
        });

        Ok(ScrapeSession::new(id, request, events_rx, cancel))
    }

    /// The installed session, including ones that already terminated.
    pub async fn current(&self) -> Option<SessionInfo> {
        self.current.lock().await.info()
    }

    /// Kill the current worker and detach its session.
    ///
    /// Returns `true` if a live worker was signalled.
    pub async fn kill_current(&self) -> bool {
        self.current.lock().await.kill_current()
    }

    /// Kill the current worker and refuse further scrapes.
    pub async fn shutdown(&self) {
        let mut current = self.current.lock().await;
        self.shutdown.cancel();
        if current.kill_current() {
            info!("scrape orchestrator shut down with a live worker");
        }
    }
}

impl Drop for ScrapeOrchestrator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Slot holding the one current session. Only ever touched under the
/// orchestrator's lock.
#[derive(Default)]
struct CurrentWorker {
    active: Option<ActiveSession>,
}

impl CurrentWorker {
    fn install(&mut self, session: ActiveSession) -> Option<ActiveSession> {
        self.active.replace(session)
    }

    fn take(&mut self) -> Option<ActiveSession> {
        self.active.take()
    }

    fn kill_current(&mut self) -> bool {
        self.take().is_some_and(|session| session.supersede())
    }

    fn info(&self) -> Option<SessionInfo> {
        self.active.as_ref().map(|session| SessionInfo {
            id: session.handle.id(),
            request: session.handle.request().clone(),
            pid: session.handle.pid(),
            state: session.handle.state(),
        })
    }
}

struct ActiveSession {
    handle: ScrapeWorkerHandle,
    cancel: CancellationToken,
    relay: JoinHandle<()>,
}

impl ActiveSession {
    /// Detach the subscriber and kill the worker. The relay task winds down
    /// on its own once it observes the cancellation.
    fn supersede(self) -> bool {
        self.cancel.cancel();
        let killed = self.handle.kill();
        trace!(
            session = %self.handle.id(),
            relay_finished = self.relay.is_finished(),
            "session detached"
        );
        killed
    }
}

/// Forward decoded worker messages to the subscriber until a terminal
/// message, end of output, or cancellation.
async fn relay_events(
    handle: ScrapeWorkerHandle,
    stdout: ChildStdout,
    events: mpsc::Sender<ScrapeEvent>,
    cancel: CancellationToken,
) {
    let session = handle.id();
    let mut lines = BufReader::new(stdout).split(b'\n');
    let mut subscriber_gone = false;

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if handle.kill() {
                    info!(%session, "scrape session cancelled");
                }
                return;
            }
            line = lines.next_segment() => line,
        };

        let line = match line {
            Ok(Some(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(None) => {
                let status = handle.reap(&cancel).await;
                warn!(
                    %session,
                    status = ?status,
                    "scrape worker output ended without finishing"
                );
                return;
            }
            Err(err) => {
                warn!(
                    %session,
                    error = %err,
                    "failed to read scrape worker output"
                );
                handle.kill();
                return;
            }
        };

        let Some(event) = decode_line(&line) else {
            continue;
        };

        match &event {
            ScrapeEvent::StreamFound(_) => {
                trace!(%session, "stream source found");
            }
            ScrapeEvent::Finished => {
                handle.mark_finishing();
                handle.kill();
                info!(%session, "scrape worker finished");
            }
            ScrapeEvent::UnknownEvent(raw) => {
                handle.kill();
                warn!(%session, message = %raw, "scrape worker broke protocol");
            }
        }

        let terminal = event.is_terminal();
        if !subscriber_gone {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    handle.kill();
                    return;
                }
                sent = events.send(event) => {
                    if sent.is_err() {
                        debug!(%session, "subscriber gone, discarding events");
                        subscriber_gone = true;
                    }
                }
            }
        }

        if terminal {
            return;
        }
    }
}
