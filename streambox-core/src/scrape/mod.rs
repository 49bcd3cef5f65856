//! Scrape sessions: one external worker process at a time, its output
//! decoded into [`ScrapeEvent`](streambox_model::ScrapeEvent)s and relayed to
//! the caller that started it.

mod orchestrator;
pub mod protocol;
mod session;
mod worker;

pub use orchestrator::ScrapeOrchestrator;
pub use protocol::decode_line;
pub use session::{ScrapeSession, SessionInfo};
pub use worker::{REAP_GRACE, ScrapeWorkerHandle, WorkerConfig};
