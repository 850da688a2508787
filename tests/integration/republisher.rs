//! Republisher timing and delivery behaviour, on a paused clock

use crate::integration::test_utils::{hash_of, timeouts, ScriptedPublisher};
use dagfs::error::RepublishError;
use dagfs::republisher::{Publisher, Republisher};
use dagfs::telemetry::{EventBus, NoopObserver, RepublishEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn start(publisher: &Arc<ScriptedPublisher>, last: Option<[u8; 32]>) -> Republisher {
    let publisher: Arc<dyn Publisher> = publisher.clone();
    Republisher::new(publisher, timeouts(), last, Arc::new(NoopObserver))
}

#[tokio::test(start_paused = true)]
async fn quick_updates_coalesce_into_one_publish() {
    let publisher = ScriptedPublisher::new();
    let repub = start(&publisher, None);

    repub.update(hash_of(1));
    sleep(Duration::from_millis(100)).await;
    repub.update(hash_of(2));
    sleep(Duration::from_secs(1)).await;

    assert_eq!(publisher.published(), vec![hash_of(2)]);
    repub.close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn continuous_updates_publish_within_long_timeout() {
    let publisher = ScriptedPublisher::new();
    let repub = start(&publisher, None);
    let started = Instant::now();

    // Updates every 100ms never let the 300ms short timer fire.
    for i in 0..50u8 {
        repub.update(hash_of(i + 1));
        sleep(Duration::from_millis(100)).await;
    }

    let times = publisher.attempt_times();
    assert_eq!(times.len(), 1);
    assert!(times[0] - started <= Duration::from_millis(3100));

    repub.close(Duration::from_secs(1)).await.unwrap();
    let published = publisher.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[1], hash_of(50));
}

#[tokio::test(start_paused = true)]
async fn updating_to_last_published_value_never_publishes() {
    let publisher = ScriptedPublisher::new();
    let repub = start(&publisher, Some(hash_of(7)));

    for _ in 0..5 {
        repub.update(hash_of(7));
        sleep(Duration::from_millis(50)).await;
    }
    sleep(Duration::from_secs(10)).await;
    assert!(publisher.attempts().is_empty());

    repub.update(hash_of(8));
    repub.wait_pub().await.unwrap();
    repub.update(hash_of(8));
    sleep(Duration::from_secs(10)).await;
    assert_eq!(publisher.attempts(), vec![hash_of(8)]);
    repub.close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn pending_update_returning_to_published_value_cancels_publish() {
    let publisher = ScriptedPublisher::new();
    let repub = start(&publisher, Some(hash_of(1)));

    repub.update(hash_of(2));
    sleep(Duration::from_millis(50)).await;
    repub.update(hash_of(1));
    sleep(Duration::from_secs(10)).await;

    assert!(publisher.attempts().is_empty());
    repub.close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn retry_publishes_newest_value() {
    let publisher = ScriptedPublisher::failing(1);
    let repub = start(&publisher, None);

    repub.update(hash_of(1));
    sleep(Duration::from_millis(400)).await;
    assert_eq!(publisher.attempts(), vec![hash_of(1)]);
    assert!(publisher.published().is_empty());

    repub.update(hash_of(2));
    // Retry waits for the long timer, not the short one.
    sleep(Duration::from_secs(1)).await;
    assert_eq!(publisher.attempts().len(), 1);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(publisher.attempts(), vec![hash_of(1), hash_of(2)]);
    assert_eq!(publisher.published(), vec![hash_of(2)]);
    repub.close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn wait_pub_outlasts_a_failed_attempt() {
    let publisher = ScriptedPublisher::failing(2);
    let repub = start(&publisher, None);

    repub.update(hash_of(3));
    repub.wait_pub().await.unwrap();

    assert_eq!(publisher.attempts().len(), 3);
    assert_eq!(publisher.published(), vec![hash_of(3)]);
    repub.close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn wait_pub_deadline_while_publish_blocks() {
    let publisher = ScriptedPublisher::hanging();
    let repub = start(&publisher, None);

    repub.update(hash_of(4));
    let result = repub.wait_pub_timeout(Duration::from_millis(100)).await;
    assert_eq!(result, Err(RepublishError::DeadlineExceeded));

    // Close gives up on the stuck attempt after its own deadline.
    let result = repub.close(Duration::from_millis(100)).await;
    assert_eq!(result, Err(RepublishError::DeadlineExceeded));
    assert!(repub.is_stopped());
}

#[tokio::test(start_paused = true)]
async fn concurrent_waiters_are_all_released() {
    let publisher = ScriptedPublisher::new();
    let repub = start(&publisher, None);

    repub.update(hash_of(5));
    let (a, b) = tokio::join!(repub.wait_pub(), repub.wait_pub());
    assert_eq!(a, Ok(()));
    assert_eq!(b, Ok(()));
    assert_eq!(publisher.published(), vec![hash_of(5)]);
    repub.close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn close_publishes_pending_value() {
    let publisher = ScriptedPublisher::new();
    let repub = start(&publisher, None);

    repub.update(hash_of(6));
    repub.close(Duration::from_secs(1)).await.unwrap();

    assert_eq!(publisher.published(), vec![hash_of(6)]);
    assert!(repub.is_stopped());
    assert_eq!(repub.wait_pub().await, Err(RepublishError::Closed));
}

#[tokio::test(start_paused = true)]
async fn observer_sees_publish_lifecycle() {
    let publisher = ScriptedPublisher::failing(1);
    let (bus, events) = EventBus::new_pair();
    let dyn_publisher: Arc<dyn Publisher> = publisher.clone();
    let repub = Republisher::new(dyn_publisher, timeouts(), None, Arc::new(bus));

    repub.update(hash_of(9));
    repub.wait_pub().await.unwrap();
    repub.close(Duration::from_secs(1)).await.unwrap();

    let types: Vec<&'static str> = events
        .try_iter()
        .map(|envelope| envelope.event.event_type())
        .collect();
    assert_eq!(
        types,
        vec!["scheduled", "attempt", "failed", "attempt", "published", "stopped"]
    );
}

#[tokio::test(start_paused = true)]
async fn stopped_event_reports_last_published() {
    let publisher = ScriptedPublisher::new();
    let (bus, events) = EventBus::new_pair();
    let dyn_publisher: Arc<dyn Publisher> = publisher.clone();
    let repub = Republisher::new(dyn_publisher, timeouts(), Some(hash_of(2)), Arc::new(bus));
    repub.close(Duration::from_secs(1)).await.unwrap();

    let last = events.try_iter().last().unwrap();
    assert_eq!(
        last.event,
        RepublishEvent::Stopped {
            last_published: Some(dagfs::types::hash_hex(&hash_of(2)))
        }
    );
}
