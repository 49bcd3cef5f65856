#![cfg(unix)]

use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use streambox_core::{ScrapeError, ScrapeOrchestrator, WorkerConfig};
use streambox_model::{ScrapeEvent, ScrapeRequest, WorkerState};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Worker running `script` under `/bin/sh`; request parameters arrive as
/// `$1..`.
fn sh_worker(script: &str) -> ScrapeOrchestrator {
    ScrapeOrchestrator::new(
        WorkerConfig::new("/bin/sh").with_args(["-c", script, "worker"]),
    )
}

async fn collect_events(
    session: streambox_core::ScrapeSession,
) -> Vec<ScrapeEvent> {
    tokio::time::timeout(TEST_TIMEOUT, session.collect::<Vec<_>>())
        .await
        .expect("session ended in time")
}

/// Whether `pid` names a process that has not exited. Zombies count as
/// exited.
fn process_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            .is_some_and(|state| state != 'Z' && state != 'X'),
        Err(_) if std::path::Path::new("/proc/self/stat").exists() => false,
        Err(_) => std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(std::process::Stdio::null())
            .status()
            .is_ok_and(|status| status.success()),
    }
}

async fn exits_within(pid: u32, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if !process_alive(pid) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn relays_events_in_order_and_stops_at_finished() {
    let scraper = sh_worker(
        r#"printf '%s\n' \
            '{"event":"stream","data":{"n":1}}' \
            '' \
            '{"event":"stream","data":{"n":2}}' \
            '{"event":"finished"}' \
            '{"event":"stream","data":{"n":3}}'
        exec sleep 30"#,
    );

    let session = scraper
        .start_scrape(ScrapeRequest::movie("tt0111161").unwrap())
        .await
        .unwrap();
    let events = collect_events(session).await;

    assert_eq!(
        events,
        vec![
            ScrapeEvent::StreamFound(json!({ "n": 1 })),
            ScrapeEvent::StreamFound(json!({ "n": 2 })),
            ScrapeEvent::Finished,
        ]
    );
    let current = scraper.current().await.expect("session stays installed");
    assert_eq!(current.state, WorkerState::Terminated);
}

#[tokio::test]
async fn worker_receives_positional_parameters() {
    let scraper = sh_worker(
        r#"printf '{"event":"stream","data":"%s"}\n' "$*"
        printf '{"event":"finished"}\n'"#,
    );

    let episode = scraper
        .start_scrape(ScrapeRequest::for_episode("tt1", 1, 2).unwrap())
        .await
        .unwrap();
    assert_eq!(
        collect_events(episode).await[0],
        ScrapeEvent::StreamFound(json!("tt1 1 2"))
    );

    let movie = scraper
        .start_scrape(ScrapeRequest::movie("tt2").unwrap())
        .await
        .unwrap();
    assert_eq!(
        collect_events(movie).await[0],
        ScrapeEvent::StreamFound(json!("tt2"))
    );
}

#[tokio::test]
async fn unknown_message_is_terminal() {
    let scraper = sh_worker(
        r#"printf '%s\n' 'garbage' '{"event":"stream","data":1}'
        exec sleep 30"#,
    );

    let session = scraper
        .start_scrape(ScrapeRequest::movie("tt1").unwrap())
        .await
        .unwrap();

    assert_eq!(
        collect_events(session).await,
        vec![ScrapeEvent::UnknownEvent("garbage".into())]
    );
}

#[tokio::test]
async fn invalid_utf8_line_is_terminal_violation() {
    let scraper = sh_worker(
        r#"printf '{"event":"stream","data":1}\n\377\376\n'
        exec sleep 30"#,
    );

    let session = scraper
        .start_scrape(ScrapeRequest::movie("tt1").unwrap())
        .await
        .unwrap();
    let events = collect_events(session).await;

    assert_eq!(events.len(), 2, "{events:?}");
    assert_eq!(events[0], ScrapeEvent::StreamFound(json!(1)));
    assert!(
        matches!(&events[1], ScrapeEvent::UnknownEvent(raw) if !raw.is_empty()),
        "{events:?}"
    );
}

#[tokio::test]
async fn output_ending_without_finished_ends_stream() {
    let scraper = sh_worker(r#"printf '{"event":"stream","data":1}\n'"#);

    let session = scraper
        .start_scrape(ScrapeRequest::movie("tt1").unwrap())
        .await
        .unwrap();

    assert_eq!(
        collect_events(session).await,
        vec![ScrapeEvent::StreamFound(json!(1))]
    );
}

#[tokio::test]
async fn newer_scrape_supersedes_older() {
    let scraper = sh_worker(
        r#"printf '{"event":"stream","data":"%s"}\n' "$1"
        exec sleep 30"#,
    );

    let mut first = scraper
        .start_scrape(ScrapeRequest::movie("first").unwrap())
        .await
        .unwrap();
    let event = tokio::time::timeout(TEST_TIMEOUT, first.next())
        .await
        .unwrap();
    assert_eq!(event, Some(ScrapeEvent::StreamFound(json!("first"))));

    let mut second = scraper
        .start_scrape(ScrapeRequest::movie("second").unwrap())
        .await
        .unwrap();

    assert!(first.is_cancelled());
    assert_eq!(first.next().await, None);

    let event = tokio::time::timeout(TEST_TIMEOUT, second.next())
        .await
        .unwrap();
    assert_eq!(event, Some(ScrapeEvent::StreamFound(json!("second"))));

    let current = scraper.current().await.unwrap();
    assert_eq!(current.id, second.id());
    assert!(current.state.is_live());
}

#[tokio::test]
async fn superseding_kills_flooding_worker_and_drops_its_backlog() {
    let scraper = sh_worker(
        r#"if [ "$1" = old ]; then
            while :; do printf '{"event":"stream","data":"old"}\n'; done
        fi
        printf '{"event":"stream","data":"new"}\n{"event":"finished"}\n'
        exec sleep 30"#,
    );

    let mut old = scraper
        .start_scrape(ScrapeRequest::movie("old").unwrap())
        .await
        .unwrap();
    let old_pid = scraper.current().await.unwrap().pid.unwrap();
    let event = tokio::time::timeout(TEST_TIMEOUT, old.next())
        .await
        .unwrap();
    assert_eq!(event, Some(ScrapeEvent::StreamFound(json!("old"))));

    let new = scraper
        .start_scrape(ScrapeRequest::movie("new").unwrap())
        .await
        .unwrap();

    assert_eq!(old.next().await, None);
    assert_eq!(
        collect_events(new).await,
        vec![
            ScrapeEvent::StreamFound(json!("new")),
            ScrapeEvent::Finished,
        ]
    );
    assert!(exits_within(old_pid, Duration::from_secs(1)).await);
}

#[tokio::test]
async fn superseding_kills_worker_that_closed_its_output() {
    let scraper = sh_worker("exec 1>&-; exec sleep 30");

    let old = scraper
        .start_scrape(ScrapeRequest::movie("old").unwrap())
        .await
        .unwrap();
    let old_pid = scraper.current().await.unwrap().pid.unwrap();
    // Let the relay see end of output and start waiting for the exit.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let _new = scraper
        .start_scrape(ScrapeRequest::movie("new").unwrap())
        .await
        .unwrap();

    assert!(old.is_cancelled());
    // Well inside the grace period a closed-output worker is otherwise given.
    assert!(exits_within(old_pid, Duration::from_secs(1)).await);
}

#[tokio::test]
async fn shutdown_kills_worker_that_closed_its_output() {
    let scraper = sh_worker("exec 1>&-; exec sleep 30");

    let _session = scraper
        .start_scrape(ScrapeRequest::movie("tt1").unwrap())
        .await
        .unwrap();
    let pid = scraper.current().await.unwrap().pid.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    scraper.shutdown().await;

    assert!(exits_within(pid, Duration::from_secs(1)).await);
}

#[tokio::test]
async fn first_scrape_starts_without_previous_worker() {
    let scraper = sh_worker("exec sleep 30");
    assert!(scraper.current().await.is_none());
    assert!(!scraper.kill_current().await);

    let session = scraper
        .start_scrape(ScrapeRequest::movie("tt1").unwrap())
        .await
        .unwrap();

    let current = scraper.current().await.unwrap();
    assert_eq!(current.id, session.id());
    assert_eq!(current.state, WorkerState::Running);
    assert!(current.pid.is_some());

    assert!(scraper.kill_current().await);
    assert!(scraper.current().await.is_none());
}

#[tokio::test]
async fn spawn_failure_leaves_no_current_worker() {
    let scraper = ScrapeOrchestrator::new(WorkerConfig::new(
        "/nonexistent/streambox-worker",
    ));

    let err = scraper
        .start_scrape(ScrapeRequest::movie("tt1").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Spawn { .. }));
    assert!(scraper.current().await.is_none());
}

#[tokio::test]
async fn blank_title_is_rejected_before_spawning() {
    let scraper = sh_worker("exec sleep 30");
    let request: ScrapeRequest =
        serde_json::from_value(json!({ "title_id": "  " })).unwrap();

    let err = scraper.start_scrape(request).await.unwrap_err();

    assert!(matches!(err, ScrapeError::InvalidRequest(_)));
    assert!(scraper.current().await.is_none());
}

#[tokio::test]
async fn cancelling_the_session_ends_the_stream() {
    let scraper = sh_worker(
        r#"printf '{"event":"stream","data":1}\n'
        exec sleep 30"#,
    );

    let mut session = scraper
        .start_scrape(ScrapeRequest::movie("tt1").unwrap())
        .await
        .unwrap();
    let deadline = session.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        deadline.cancel();
    });

    let first = tokio::time::timeout(TEST_TIMEOUT, session.next())
        .await
        .unwrap();
    assert_eq!(first, Some(ScrapeEvent::StreamFound(json!(1))));

    let rest = tokio::time::timeout(TEST_TIMEOUT, session.next())
        .await
        .unwrap();
    assert_eq!(rest, None);
}

#[tokio::test]
async fn shutdown_refuses_new_scrapes() {
    let scraper = sh_worker("exec sleep 30");
    let mut session = scraper
        .start_scrape(ScrapeRequest::movie("tt1").unwrap())
        .await
        .unwrap();

    scraper.shutdown().await;

    assert_eq!(session.next().await, None);
    assert!(matches!(
        scraper
            .start_scrape(ScrapeRequest::movie("tt2").unwrap())
            .await,
        Err(ScrapeError::ShutDown)
    ));
}
