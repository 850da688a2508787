//! Republisher
//!
//! Debounced, retrying publication of the root hash. Callers hand values to
//! a single background task through message passing; the task owns the
//! timers and the pending-value slot for its whole lifetime.
//!
//! Scheduling rules:
//! 1. The first update after a publish arms the long timer.
//! 2. Every update re-arms the short timer.
//! 3. Whichever fires first publishes the latest pending value.
//! 4. A failed attempt keeps the value pending and retries when the long
//!    timer fires again. Newer updates replace the value being retried.
//!
//! The long timer bounds staleness under a continuous stream of updates; the
//! short timer publishes soon after updates stop.

use crate::error::{PublishError, RepublishError};
use crate::telemetry::{EventEnvelope, PublishObserver, RepublishEvent};
use crate::types::{hash_hex, Hash};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

pub const DEFAULT_SHORT_TIMEOUT: Duration = Duration::from_millis(300);
pub const DEFAULT_LONG_TIMEOUT: Duration = Duration::from_secs(3);

const WAIT_QUEUE_DEPTH: usize = 16;

type Waiter = oneshot::Sender<Result<(), RepublishError>>;

/// Publishes a root hash to the outside world
///
/// May be slow and may fail; it is called again with the same or a newer
/// value until it succeeds. Dropping the returned future cancels it.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, hash: Hash) -> Result<(), PublishError>;
}

#[async_trait]
impl<F, Fut> Publisher for F
where
    F: Fn(Hash) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), PublishError>> + Send + 'static,
{
    async fn publish(&self, hash: Hash) -> Result<(), PublishError> {
        (self)(hash).await
    }
}

/// Short and long debounce intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepublishTimeouts {
    pub short: Duration,
    pub long: Duration,
}

impl Default for RepublishTimeouts {
    fn default() -> Self {
        Self {
            short: DEFAULT_SHORT_TIMEOUT,
            long: DEFAULT_LONG_TIMEOUT,
        }
    }
}

/// Handle to the background publishing task
pub struct Republisher {
    updates: watch::Sender<Option<Hash>>,
    immediate: mpsc::Sender<Waiter>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stopped: Arc<AtomicBool>,
}

impl Republisher {
    /// Start the republisher task. `last_published` is treated as already
    /// published and will never be sent to `publisher` again on its own.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        publisher: Arc<dyn Publisher>,
        timeouts: RepublishTimeouts,
        last_published: Option<Hash>,
        observer: Arc<dyn PublishObserver>,
    ) -> Self {
        let (updates_tx, updates_rx) = watch::channel(None);
        let (immediate_tx, immediate_rx) = mpsc::channel(WAIT_QUEUE_DEPTH);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let stopped = Arc::new(AtomicBool::new(false));

        let task = RepublishLoop {
            publisher,
            observer,
            timeouts,
            updates: updates_rx,
            immediate: immediate_rx,
            shutdown: shutdown_rx,
            last_published,
            state: State::Idle,
            quick: None,
            long: None,
            waiters: Vec::new(),
            attempts: 0,
            stopped: Arc::clone(&stopped),
        };
        let handle = tokio::spawn(task.run());

        Self {
            updates: updates_tx,
            immediate: immediate_tx,
            shutdown: Mutex::new(Some(shutdown_tx)),
            worker: Mutex::new(Some(handle)),
            stopped,
        }
    }

    /// Submit a new candidate value. Never blocks.
    ///
    /// Values submitted before the previous one was picked up replace it;
    /// intermediate values are never published individually.
    pub fn update(&self, hash: Hash) {
        self.updates.send_replace(Some(hash));
    }

    /// Force an attempt with the latest pending value and wait for its
    /// outcome.
    ///
    /// Returns immediately when nothing is pending. A failed attempt keeps
    /// the caller waiting until a later attempt succeeds. Dropping the
    /// returned future stops waiting without cancelling the attempt.
    pub async fn wait_pub(&self) -> Result<(), RepublishError> {
        let (tx, rx) = oneshot::channel();
        self.immediate
            .send(tx)
            .await
            .map_err(|_| RepublishError::Closed)?;
        rx.await.map_err(|_| RepublishError::Closed)?
    }

    /// `wait_pub` bounded by a deadline
    pub async fn wait_pub_timeout(&self, timeout: Duration) -> Result<(), RepublishError> {
        tokio::time::timeout(timeout, self.wait_pub())
            .await
            .map_err(|_| RepublishError::DeadlineExceeded)?
    }

    /// Publish whatever is pending (bounded by `timeout`), then stop the
    /// task. Calling it again after the task stopped is a no-op.
    pub async fn close(&self, timeout: Duration) -> Result<(), RepublishError> {
        let Some(shutdown) = self.shutdown.lock().take() else {
            return Ok(());
        };

        let result = self.wait_pub_timeout(timeout).await;

        let _ = shutdown.send(());
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        result
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// States the loop rests in between events. Publishing and closing are
/// transient and happen inside a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// Debouncing a value; short and long timers armed
    Pending(Hash),
    /// Last attempt failed; long timer armed for the retry
    Retrying(Hash),
}

impl State {
    fn value(&self) -> Option<Hash> {
        match self {
            State::Idle => None,
            State::Pending(v) | State::Retrying(v) => Some(*v),
        }
    }
}

enum Event {
    Updated,
    PublishNow(Waiter),
    QuickTimeout,
    LongTimeout,
    Shutdown,
}

enum Outcome {
    Continue,
    Shutdown,
}

struct RepublishLoop {
    publisher: Arc<dyn Publisher>,
    observer: Arc<dyn PublishObserver>,
    timeouts: RepublishTimeouts,
    updates: watch::Receiver<Option<Hash>>,
    immediate: mpsc::Receiver<Waiter>,
    shutdown: oneshot::Receiver<()>,
    last_published: Option<Hash>,
    state: State,
    quick: Option<Instant>,
    long: Option<Instant>,
    waiters: Vec<Waiter>,
    attempts: u32,
    stopped: Arc<AtomicBool>,
}

impl RepublishLoop {
    async fn run(mut self) {
        loop {
            let outcome = match self.next_event().await {
                Event::Shutdown => Outcome::Shutdown,
                Event::Updated => {
                    let value = *self.updates.borrow_and_update();
                    if let Some(value) = value {
                        self.on_update(value);
                    }
                    Outcome::Continue
                }
                Event::PublishNow(waiter) => {
                    self.waiters.push(waiter);
                    // Pick up a value submitted just before the request.
                    if self.updates.has_changed().unwrap_or(false) {
                        let value = *self.updates.borrow_and_update();
                        if let Some(value) = value {
                            self.on_update(value);
                        }
                    }
                    if self.state == State::Idle {
                        self.release_waiters(Ok(()));
                        Outcome::Continue
                    } else {
                        self.attempt().await
                    }
                }
                Event::QuickTimeout | Event::LongTimeout => self.attempt().await,
            };

            if let Outcome::Shutdown = outcome {
                break;
            }
        }
        self.finish();
    }

    async fn next_event(&mut self) -> Event {
        let quick = self.quick;
        let long = self.long;
        tokio::select! {
            biased;
            _ = &mut self.shutdown => Event::Shutdown,
            changed = self.updates.changed() => match changed {
                Ok(()) => Event::Updated,
                // Every handle is gone
                Err(_) => Event::Shutdown,
            },
            Some(waiter) = self.immediate.recv() => Event::PublishNow(waiter),
            _ = sleep_until_opt(quick) => Event::QuickTimeout,
            _ = sleep_until_opt(long) => Event::LongTimeout,
        }
    }

    fn on_update(&mut self, value: Hash) {
        if Some(value) == self.last_published {
            self.state = State::Idle;
            self.quick = None;
            self.long = None;
            self.attempts = 0;
            self.release_waiters(Ok(()));
            return;
        }

        let now = Instant::now();
        self.state = match self.state {
            State::Idle => {
                self.long = Some(now + self.timeouts.long);
                self.quick = Some(now + self.timeouts.short);
                self.emit(RepublishEvent::Scheduled {
                    hash: hash_hex(&value),
                });
                State::Pending(value)
            }
            State::Pending(_) => {
                self.quick = Some(now + self.timeouts.short);
                State::Pending(value)
            }
            // Keep the retry on the long-timer cadence.
            State::Retrying(_) => State::Retrying(value),
        };
    }

    async fn attempt(&mut self) -> Outcome {
        let Some(value) = self.state.value() else {
            self.quick = None;
            self.long = None;
            return Outcome::Continue;
        };

        self.quick = None;
        self.long = None;
        self.attempts += 1;
        let attempt = self.attempts;
        self.emit(RepublishEvent::Attempt {
            hash: hash_hex(&value),
            attempt,
        });

        let publisher = Arc::clone(&self.publisher);
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = &mut self.shutdown => return Outcome::Shutdown,
            result = publisher.publish(value) => result,
        };

        match result {
            Ok(()) => {
                self.last_published = Some(value);
                self.state = State::Idle;
                self.attempts = 0;
                self.emit(RepublishEvent::Published {
                    hash: hash_hex(&value),
                    attempt,
                    duration_ms: started.elapsed().as_millis(),
                });
                self.release_waiters(Ok(()));
            }
            Err(err) => {
                self.emit(RepublishEvent::Failed {
                    hash: hash_hex(&value),
                    attempt,
                    error: err.to_string(),
                });
                self.state = State::Retrying(value);
                self.long = Some(Instant::now() + self.timeouts.long);
            }
        }
        Outcome::Continue
    }

    fn release_waiters(&mut self, result: Result<(), RepublishError>) {
        for waiter in self.waiters.drain(..) {
            // The waiter may have given up already.
            let _ = waiter.send(result);
        }
    }

    fn finish(mut self) {
        self.release_waiters(Err(RepublishError::Cancelled));
        self.immediate.close();
        while let Ok(waiter) = self.immediate.try_recv() {
            let _ = waiter.send(Err(RepublishError::Cancelled));
        }
        self.emit(RepublishEvent::Stopped {
            last_published: self.last_published.as_ref().map(hash_hex),
        });
        self.stopped.store(true, Ordering::Release);
    }

    fn emit(&self, event: RepublishEvent) {
        self.observer.on_event(&EventEnvelope::with_now(event));
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
