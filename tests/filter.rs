//! Integration tests for the tracing filter.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_dedup::infrastructure::mocks::{MockCaptureLayer, MockClock};
use tracing_dedup::{DedupFilter, EvictionReason, SummaryRecord};

#[test]
fn test_filter_integration() {
    let capture = MockCaptureLayer::new();
    let dedup = DedupFilter::builder().with_threshold(3).build().unwrap();

    let subscriber = tracing_subscriber::registry().with(capture.clone().with_filter(dedup));

    tracing::subscriber::with_default(subscriber, || {
        for _ in 0..10 {
            info!("test event");
        }
    });

    // Only first 3 should pass through
    assert_eq!(capture.count(), 3);
}

#[test]
fn test_rendered_message_is_the_key() {
    let capture = MockCaptureLayer::new();
    let dedup = DedupFilter::new();

    let subscriber = tracing_subscriber::registry().with(capture.clone().with_filter(dedup));

    tracing::subscriber::with_default(subscriber, || {
        for user in ["alice", "bob", "alice"] {
            warn!("login failed for {}", user);
        }
    });

    assert_eq!(
        capture.messages(),
        vec!["login failed for alice", "login failed for bob"]
    );
}

#[test]
fn test_level_does_not_split_keys() {
    let capture = MockCaptureLayer::new();
    let dedup = DedupFilter::new();

    let subscriber = tracing_subscriber::registry().with(capture.clone().with_filter(dedup));

    tracing::subscriber::with_default(subscriber, || {
        info!("same message");
        warn!("same message");
    });

    let captured = capture.get_captured();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].level, Level::INFO);
}

#[test]
fn test_unfiltered_layer_sees_everything() {
    let filtered = MockCaptureLayer::new();
    let unfiltered = MockCaptureLayer::new();
    let dedup = DedupFilter::new();

    let subscriber = tracing_subscriber::registry()
        .with(filtered.clone().with_filter(dedup))
        .with(unfiltered.clone());

    tracing::subscriber::with_default(subscriber, || {
        for _ in 0..4 {
            info!("repeated");
        }
    });

    assert_eq!(filtered.count(), 1);
    assert_eq!(unfiltered.count(), 4);
}

#[test]
fn test_capacity_eviction_reaches_handler() {
    let clock = MockClock::new(0);
    let summaries: Arc<Mutex<Vec<SummaryRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let handler_summaries = Arc::clone(&summaries);

    let dedup = DedupFilter::builder()
        .with_capacity(2)
        .with_clock(Arc::new(clock.clone()))
        .with_summary_handler(Arc::new(move |summary: &SummaryRecord| {
            handler_summaries.lock().unwrap().push(summary.clone());
        }))
        .build()
        .unwrap();
    let inspect = dedup.clone();

    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone().with_filter(dedup));

    tracing::subscriber::with_default(subscriber, || {
        info!("first");
        clock.advance(Duration::from_millis(5));
        info!("first");
        info!("second");
        info!("third");
    });

    assert_eq!(capture.messages(), vec!["first", "second", "third"]);

    let summaries = summaries.lock().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].reason, EvictionReason::CapacityEvicted);
    assert_eq!(summaries[0].key, "first");
    assert_eq!(summaries[0].history.timestamps(), &[0, 5]);

    assert_eq!(inspect.cache().len(), 2);
    assert_eq!(inspect.metrics().summaries_produced(), 1);
}

#[test]
fn test_structured_events_without_message_pass_through() {
    let capture = MockCaptureLayer::new();
    let dedup = DedupFilter::new();
    let inspect = dedup.clone();

    let subscriber = tracing_subscriber::registry().with(capture.clone().with_filter(dedup));

    tracing::subscriber::with_default(subscriber, || {
        info!(request_id = 1, status = 200);
        info!(request_id = 2, status = 500);
        info!(user = "bob", action = "delete");
        info!("with message");
        info!("with message");
    });

    // The three field-only events plus the first "with message"
    assert_eq!(capture.count(), 4);
    assert_eq!(inspect.cache().len(), 1);
    assert!(!inspect.cache().contains(""));
    assert_eq!(inspect.metrics().messages_suppressed(), 1);
}
