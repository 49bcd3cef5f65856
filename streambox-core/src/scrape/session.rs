use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use streambox_model::{ScrapeEvent, ScrapeRequest, SessionId, WorkerState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Subscriber side of one scrape session.
///
/// Yields events in the order the worker emitted them. The stream ends after
/// a terminal event, when the worker's output ends, or as soon as the session
/// is superseded or cancelled. Events still buffered at that point are
/// dropped.
#[derive(Debug)]
pub struct ScrapeSession {
    id: SessionId,
    request: ScrapeRequest,
    events: mpsc::Receiver<ScrapeEvent>,
    cancel: CancellationToken,
    done: bool,
}

impl ScrapeSession {
    pub(crate) fn new(
        id: SessionId,
        request: ScrapeRequest,
        events: mpsc::Receiver<ScrapeEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            request,
            events,
            cancel,
            done: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn request(&self) -> &ScrapeRequest {
        &self.request
    }

    /// Token that ends this session when cancelled. Lets the embedding
    /// application impose its own deadline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Kill this session's worker and end the stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn finish(&mut self) {
        self.done = true;
        self.events.close();
    }
}

impl Stream for ScrapeSession {
    type Item = ScrapeEvent;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.cancel.is_cancelled() {
            this.finish();
            return Poll::Ready(None);
        }

        match this.events.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    this.finish();
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Snapshot of the session currently installed in the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub request: ScrapeRequest,
    pub pid: Option<u32>,
    pub state: WorkerState,
}
