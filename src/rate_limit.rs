//! Serialized, throttled execution of outbound calls.
//!
//! Canvas does not announce its quota up front. When a client goes over it,
//! the server answers `403 Forbidden` with `Rate Limit Exceeded` in the body.
//! A [`RateLimiter`] runs every call through a single worker loop. When a call
//! bounces on the limit, it goes back to the front of the queue and the loop
//! waits until the current window is over before trying again.

use crate::transport::RawResponse;
use crate::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use http::StatusCode;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Notify};

/// Status code Canvas uses when the quota is exhausted.
pub const RATE_LIMIT_STATUS: StatusCode = StatusCode::FORBIDDEN;

/// Body marker that distinguishes a quota bounce from a permission error.
pub const RATE_LIMIT_MARKER: &str = "Rate Limit Exceeded";

/// Default length of a throttling window.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

static SHARED: OnceLock<RateLimiter> = OnceLock::new();

type Call = Box<dyn Fn() -> BoxFuture<'static, Result<RawResponse>> + Send + Sync>;

struct WorkItem {
    id: u64,
    reply: oneshot::Sender<Result<RawResponse>>,
    call: Call,
}

struct State {
    pending: VecDeque<WorkItem>,
    idle: bool,
    window_start: Instant,
    next_delay: Duration,
    call_counter: u64,
}

impl State {
    fn reset_window_if_elapsed(&mut self, interval: Duration) {
        if self.window_start.elapsed() >= interval {
            self.window_start = Instant::now();
            self.next_delay = Duration::ZERO;
        }
    }

    fn delay_until_next_window(&mut self, interval: Duration) {
        let remaining = interval.saturating_sub(self.window_start.elapsed());
        if self.next_delay < remaining {
            self.next_delay = remaining;
        }
    }

    fn next_id(&mut self) -> u64 {
        self.call_counter = self.call_counter.checked_add(1).unwrap_or(1);
        self.call_counter
    }
}

struct Inner {
    interval: Duration,
    state: Mutex<State>,
    /// Signalled when a worker loop is dropped before draining the queue.
    stalled: Notify,
}

/// A FIFO call queue drained by one worker loop at a time.
///
/// Cloning a `RateLimiter` yields a handle to the same queue. All clients
/// share [`RateLimiter::shared`] unless given another instance.
///
/// # Examples
///
/// ```no_run
/// use canvas_api::{Client, RateLimiter};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), canvas_api::Error> {
/// // A client with its own queue, unaffected by other clients
/// let limiter = RateLimiter::new(Duration::from_millis(500));
/// let client = Client::builder()
///     .base_url("https://canvas.example.com/api/v1")?
///     .rate_limiter(limiter)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("RateLimiter")
            .field("interval", &self.inner.interval)
            .field("pending", &state.pending.len())
            .field("idle", &state.idle)
            .finish()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl RateLimiter {
    /// Creates an isolated limiter with the given window length.
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                interval,
                state: Mutex::new(State {
                    pending: VecDeque::new(),
                    idle: true,
                    window_start: Instant::now(),
                    next_delay: Duration::ZERO,
                    call_counter: 0,
                }),
                stalled: Notify::new(),
            }),
        }
    }

    /// Returns the process-wide limiter, created with [`DEFAULT_INTERVAL`] on
    /// first use.
    pub fn shared() -> Self {
        Self::shared_with_interval(DEFAULT_INTERVAL)
    }

    /// Returns the process-wide limiter. `interval` only applies if this call
    /// creates it.
    pub fn shared_with_interval(interval: Duration) -> Self {
        SHARED.get_or_init(|| Self::new(interval)).clone()
    }

    /// The window length of this limiter.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Returns `true` if both handles point to the same queue.
    pub fn same_queue(&self, other: &RateLimiter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Queues `call` and waits for its outcome.
    ///
    /// `call` performs one network call. It runs only when it reaches the
    /// head of the queue, and runs again if the server answers with the
    /// rate-limit signal. Any other outcome, success or failure, is returned
    /// as is.
    ///
    /// Dropping the returned future before the call starts removes it from
    /// the queue without running it.
    pub async fn enqueue<F, Fut>(&self, call: F) -> Result<RawResponse>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RawResponse>> + Send + 'static,
    {
        let (reply, mut outcome) = oneshot::channel();

        // Registered before the push so a loop dying right after it is seen.
        let stalled = self.inner.stalled.notified();
        tokio::pin!(stalled);

        {
            let mut state = self.lock();
            let id = state.next_id();
            state.pending.push_back(WorkItem {
                id,
                reply,
                call: Box::new(move || call().boxed()),
            });
        }

        self.start();

        loop {
            tokio::select! {
                result = &mut outcome => {
                    return result.unwrap_or_else(|_| {
                        Err(Error::Request {
                            endpoint: String::new(),
                            message: "The rate limiter stopped before the call completed"
                                .to_string(),
                        })
                    });
                }
                _ = &mut stalled => {
                    // The loop lived on a runtime that went away. Take over
                    // on this one.
                    tracing::debug!("Rate limiter loop was dropped, restarting it");
                    stalled.set(self.inner.stalled.notified());
                    self.start();
                }
            }
        }
    }

    /// Starts the worker loop on the next tick of the current runtime, so a
    /// burst of calls shares one loop start. No-op if a loop is running.
    fn start(&self) {
        let limiter = self.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            limiter.run().await;
        });
    }

    async fn run(self) {
        {
            let mut state = self.lock();
            if !state.idle {
                return;
            }
            state.idle = false;
            state.window_start = Instant::now();
        }

        let mut guard = IdleGuard {
            limiter: &self,
            armed: true,
        };
        tracing::trace!("Rate limiter loop started");

        loop {
            let delay = {
                let mut state = self.lock();
                if state.pending.is_empty() {
                    state.idle = true;
                    guard.armed = false;
                    break;
                }
                state.next_delay
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let item = {
                let mut state = self.lock();
                state.reset_window_if_elapsed(self.inner.interval);
                match state.pending.pop_front() {
                    Some(item) => item,
                    None => continue,
                }
            };

            if item.reply.is_closed() {
                tracing::debug!(call_id = item.id, "Caller gave up, dropping queued call");
                continue;
            }

            let outcome = (item.call)().await;

            match outcome {
                Ok(raw) if is_rate_limited(&raw) => {
                    let mut state = self.lock();
                    state.delay_until_next_window(self.inner.interval);
                    tracing::warn!(
                        call_id = item.id,
                        delay_ms = state.next_delay.as_millis(),
                        "Rate limit exceeded - call requeued"
                    );
                    state.pending.push_front(item);
                }
                outcome => {
                    // The caller may have timed out meanwhile.
                    let _ = item.reply.send(outcome);
                }
            }
        }

        tracing::trace!("Rate limiter loop stopped");
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the limiter idle if the worker loop is dropped mid-flight, and wakes
/// the waiting callers so one of them restarts it.
struct IdleGuard<'a> {
    limiter: &'a RateLimiter,
    armed: bool,
}

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.limiter.lock().idle = true;
            self.limiter.inner.stalled.notify_waiters();
        }
    }
}

/// Returns `true` if `response` is the rate-limit signal.
pub fn is_rate_limited(response: &RawResponse) -> bool {
    response.status == RATE_LIMIT_STATUS
        && String::from_utf8_lossy(&response.body).contains(RATE_LIMIT_MARKER)
}
