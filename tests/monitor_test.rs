mod fakes;

use fakes::ScriptedFetcher;
use seowatch::error::ConfigError;
use seowatch::models::{MonitorEvent, MonitorState};
use seowatch::monitor::{ContentMonitor, MonitorOptions, content_hash};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const URL: &str = "https://example.com/";
const INTERVAL: Duration = Duration::from_secs(60);

const PAGE_A: &str = "<html><head><title>Version A</title></head><body><h1>Hello</h1><p>Alpha text</p></body></html>";
const PAGE_B: &str = "<html><head><title>Version B</title></head><body><h1>Hello there</h1><p>Alpha text</p></body></html>";

async fn next_event(events: &mut UnboundedReceiver<MonitorEvent>) -> MonitorEvent {
    timeout(Duration::from_secs(3600), events.recv())
        .await
        .expect("Timed out waiting for monitor event")
        .expect("Event channel closed")
}

async fn assert_quiet(events: &mut UnboundedReceiver<MonitorEvent>) {
    let result = timeout(Duration::from_secs(3600), events.recv()).await;
    assert!(result.is_err(), "Unexpected event: {:?}", result);
}

fn monitor(fetcher: ScriptedFetcher) -> (ContentMonitor, UnboundedReceiver<MonitorEvent>) {
    ContentMonitor::new(Arc::new(fetcher), MonitorOptions::default())
}

#[tokio::test(start_paused = true)]
async fn test_identical_fetches_never_emit_changed() {
    let (mut monitor, mut events) = monitor(ScriptedFetcher::always(PAGE_A));
    monitor.start(URL, INTERVAL).unwrap();

    match next_event(&mut events).await {
        MonitorEvent::BaselineEstablished { url, hash } => {
            assert_eq!(url, URL);
            assert_eq!(hash, content_hash(PAGE_A));
        }
        other => panic!("Expected baseline, got {:?}", other),
    }
    assert_eq!(monitor.state(), MonitorState::Watching);

    for _ in 0..5 {
        assert!(matches!(
            next_event(&mut events).await,
            MonitorEvent::NoChange { .. }
        ));
    }

    monitor.stop();
    assert_eq!(
        next_event(&mut events).await,
        MonitorEvent::Stopped {
            url: URL.to_string()
        }
    );
    assert_eq!(monitor.state(), MonitorState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_changed_content_emits_one_changed_event() {
    let fetcher = ScriptedFetcher::new(vec![Ok(PAGE_A), Ok(PAGE_A), Ok(PAGE_B)]);
    let (mut monitor, mut events) = monitor(fetcher);
    monitor.start(URL, INTERVAL).unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        MonitorEvent::BaselineEstablished { .. }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        MonitorEvent::NoChange { .. }
    ));

    match next_event(&mut events).await {
        MonitorEvent::Changed {
            url, diffs, audit, ..
        } => {
            assert_eq!(url, URL);
            let fields: Vec<&str> = diffs.iter().map(|d| d.field.as_str()).collect();
            assert_eq!(fields, vec!["title", "h1"]);
            assert_eq!(diffs[0].before, "Version A");
            assert_eq!(diffs[0].after, "Version B");
            assert_eq!(audit.url, URL);
            assert_eq!(audit.snapshot.title, "Version B");
        }
        other => panic!("Expected change, got {:?}", other),
    }

    // The new content becomes the baseline, so repeats are quiet again
    assert_eq!(
        monitor.baseline().map(|b| b.hash),
        Some(content_hash(PAGE_B))
    );
    for _ in 0..3 {
        assert!(matches!(
            next_event(&mut events).await,
            MonitorEvent::NoChange { .. }
        ));
    }
}

#[tokio::test(start_paused = true)]
async fn test_fetch_errors_do_not_halt_the_timer() {
    let fetcher = ScriptedFetcher::new(vec![Err("boom"), Ok(PAGE_A), Err("flaky"), Ok(PAGE_A)]);
    let (mut monitor, mut events) = monitor(fetcher);
    monitor.start(URL, INTERVAL).unwrap();

    match next_event(&mut events).await {
        MonitorEvent::Error { url, message } => {
            assert_eq!(url, URL);
            assert!(message.contains("boom"));
        }
        other => panic!("Expected error, got {:?}", other),
    }
    assert_eq!(monitor.state(), MonitorState::BaselinePending);
    assert!(monitor.baseline().is_none());

    assert!(matches!(
        next_event(&mut events).await,
        MonitorEvent::BaselineEstablished { .. }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        MonitorEvent::Error { .. }
    ));
    assert_eq!(monitor.state(), MonitorState::Watching);
    assert!(matches!(
        next_event(&mut events).await,
        MonitorEvent::NoChange { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_times_out() {
    let fetcher = ScriptedFetcher::always(PAGE_A).with_delay(Duration::from_secs(30));
    let (mut monitor, mut events) = ContentMonitor::new(
        Arc::new(fetcher),
        MonitorOptions {
            fetch_timeout: Duration::from_secs(5),
        },
    );
    monitor.start(URL, INTERVAL).unwrap();

    match next_event(&mut events).await {
        MonitorEvent::Error { message, .. } => assert!(message.contains("timed out")),
        other => panic!("Expected timeout error, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_discards_in_flight_check() {
    let fetcher = Arc::new(
        ScriptedFetcher::new(vec![Ok(PAGE_A), Ok(PAGE_B)]).with_delay(Duration::from_secs(10)),
    );
    let (mut monitor, mut events) =
        ContentMonitor::new(fetcher.clone(), MonitorOptions::default());
    monitor.start(URL, INTERVAL).unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        MonitorEvent::BaselineEstablished { .. }
    ));

    // Second check starts 60s after the baseline and is still fetching at +65s
    tokio::time::sleep(Duration::from_secs(65)).await;
    assert_eq!(fetcher.calls(), 2);
    monitor.stop();

    assert!(matches!(
        next_event(&mut events).await,
        MonitorEvent::Stopped { .. }
    ));
    assert_quiet(&mut events).await;
    assert_eq!(monitor.state(), MonitorState::Stopped);
    assert_eq!(
        monitor.baseline().map(|b| b.hash),
        Some(content_hash(PAGE_A))
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_start_is_rejected_synchronously() {
    let (mut monitor, mut events) = monitor(ScriptedFetcher::always(PAGE_A));

    assert!(matches!(
        monitor.start("ftp://example.com/", INTERVAL),
        Err(ConfigError::UnsupportedScheme(_))
    ));
    assert!(matches!(
        monitor.start("not a url", INTERVAL),
        Err(ConfigError::InvalidUrl(_))
    ));
    assert_eq!(
        monitor.start(URL, Duration::ZERO),
        Err(ConfigError::InvalidInterval)
    );

    assert_eq!(monitor.state(), MonitorState::Idle);
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_restart_replaces_previous_watch() {
    let (mut monitor, mut events) = monitor(ScriptedFetcher::always(PAGE_A));
    monitor.start(URL, INTERVAL).unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        MonitorEvent::BaselineEstablished { .. }
    ));

    monitor.start("https://example.org/", INTERVAL).unwrap();
    assert_eq!(
        next_event(&mut events).await,
        MonitorEvent::Stopped {
            url: URL.to_string()
        }
    );
    match next_event(&mut events).await {
        MonitorEvent::BaselineEstablished { url, .. } => assert_eq!(url, "https://example.org/"),
        other => panic!("Expected new baseline, got {:?}", other),
    }
    assert_eq!(
        monitor.baseline().map(|b| b.url),
        Some("https://example.org/".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_overrunning_check_skips_ticks_missed_while_busy() {
    // Every fetch takes 90s against a 60s interval
    let fetcher = ScriptedFetcher::always(PAGE_A).with_delay(Duration::from_secs(90));
    let (mut monitor, mut events) = ContentMonitor::new(
        Arc::new(fetcher),
        MonitorOptions {
            fetch_timeout: Duration::from_secs(120),
        },
    );
    let origin = tokio::time::Instant::now();
    monitor.start(URL, INTERVAL).unwrap();

    let mut finished_at = Vec::new();
    for _ in 0..3 {
        next_event(&mut events).await;
        finished_at.push(origin.elapsed().as_secs());
    }

    // Checks start at 0, 150 and 270; the tick due at 210 is dropped
    assert_eq!(finished_at, vec![90, 240, 360]);
}
