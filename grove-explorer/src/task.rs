//! Cancellation, debounce, throttle and timeout racing for async jobs.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::host::BoxFuture;
use crate::sync::lock;

/// Result of a scheduled call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    /// Superseded by a later call or cancelled before it ran.
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation flag shared between a job and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

type Job<A, R> = Arc<dyn Fn(A) -> BoxFuture<'static, R> + Send + Sync>;

fn boxed_job<A, R, F, Fut>(job: F) -> Job<A, R>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    Arc::new(move |args| -> BoxFuture<'static, R> { Box::pin(job(args)) })
}

struct Pending<A, R> {
    args: A,
    reply: oneshot::Sender<Outcome<R>>,
}

impl<A, R> Pending<A, R> {
    fn cancel(self) {
        let _ = self.reply.send(Outcome::Cancelled);
    }
}

async fn run<A, R>(job: Job<A, R>, pending: Pending<A, R>) {
    let result = job(pending.args).await;
    let _ = pending.reply.send(Outcome::Completed(result));
}

fn receive<R: Send + 'static>(
    reply: oneshot::Receiver<Outcome<R>>,
) -> BoxFuture<'static, Outcome<R>> {
    Box::pin(async move { reply.await.unwrap_or(Outcome::Cancelled) })
}

struct DebounceState<A, R> {
    generation: u64,
    pending: Option<Pending<A, R>>,
}

/// Runs a job once calls stop arriving for `delay`.
///
/// Only the last call of a burst runs, with its own arguments; earlier
/// calls of the burst resolve to [`Outcome::Cancelled`].
pub struct Debouncer<A, R> {
    delay: Duration,
    job: Job<A, R>,
    state: Arc<Mutex<DebounceState<A, R>>>,
}

impl<A, R> Debouncer<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    pub fn new<F, Fut>(delay: Duration, job: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self {
            delay,
            job: boxed_job(job),
            state: Arc::new(Mutex::new(DebounceState {
                generation: 0,
                pending: None,
            })),
        }
    }

    /// Schedule a run with `args`, superseding any pending call.
    ///
    /// Must be called inside a tokio runtime.
    pub fn call(&self, args: A) -> BoxFuture<'static, Outcome<R>> {
        let (reply, receiver) = oneshot::channel();
        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            if let Some(previous) =
                state.pending.replace(Pending { args, reply })
            {
                previous.cancel();
            }
            state.generation
        };

        let state = self.state.clone();
        let job = self.job.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let pending = {
                let mut state = lock(&state);
                if state.generation != generation {
                    return;
                }
                state.pending.take()
            };
            if let Some(pending) = pending {
                run(job, pending).await;
            }
        });

        receive(receiver)
    }

    /// Drop the pending call, if any.
    pub fn cancel(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }
}

/// Edges of a throttle window on which the job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleOptions {
    /// Run the first call of a window immediately.
    pub leading: bool,
    /// Run the last call of a window when the window closes.
    pub trailing: bool,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self {
            leading: true,
            trailing: true,
        }
    }
}

struct ThrottleState<A, R> {
    window_end: Option<Instant>,
    trailing: Option<Pending<A, R>>,
}

/// Runs a job at most once per window.
pub struct Throttler<A, R> {
    window: Duration,
    options: ThrottleOptions,
    job: Job<A, R>,
    state: Arc<Mutex<ThrottleState<A, R>>>,
}

impl<A, R> Throttler<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    /// With neither edge enabled the throttler behaves as leading-only.
    pub fn new<F, Fut>(window: Duration, options: ThrottleOptions, job: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let options = if options.leading || options.trailing {
            options
        } else {
            ThrottleOptions {
                leading: true,
                trailing: false,
            }
        };
        Self {
            window,
            options,
            job: boxed_job(job),
            state: Arc::new(Mutex::new(ThrottleState {
                window_end: None,
                trailing: None,
            })),
        }
    }

    /// Run or queue `args` depending on the current window.
    ///
    /// Must be called inside a tokio runtime.
    pub fn call(&self, args: A) -> BoxFuture<'static, Outcome<R>> {
        let (reply, receiver) = oneshot::channel();
        let pending = Pending { args, reply };
        let now = Instant::now();

        let mut state = lock(&self.state);
        let open = state.window_end.is_some_and(|end| now < end);
        if open {
            if self.options.trailing {
                if let Some(previous) = state.trailing.replace(pending) {
                    previous.cancel();
                }
            } else {
                pending.cancel();
            }
            return receive(receiver);
        }

        let window_end = now + self.window;
        state.window_end = Some(window_end);
        if self.options.leading {
            tokio::spawn(run(self.job.clone(), pending));
        } else {
            state.trailing = Some(pending);
        }
        drop(state);

        self.close_window_at(window_end);
        receive(receiver)
    }

    fn close_window_at(&self, window_end: Instant) {
        let state = self.state.clone();
        let job = self.job.clone();
        let window = self.window;
        tokio::spawn(async move {
            let mut deadline = window_end;
            loop {
                tokio::time::sleep_until(deadline).await;
                let pending = {
                    let mut state = lock(&state);
                    match state.trailing.take() {
                        Some(pending) => {
                            deadline = Instant::now() + window;
                            state.window_end = Some(deadline);
                            pending
                        },
                        None => {
                            state.window_end = None;
                            return;
                        },
                    }
                };
                run(job.clone(), pending).await;
            }
        });
    }

    /// Drop the queued trailing call, if any.
    pub fn cancel(&self) {
        if let Some(pending) = lock(&self.state).trailing.take() {
            pending.cancel();
        }
    }
}

/// Outcome of [`race_timeout`].
#[derive(Debug)]
pub enum Raced<T> {
    Completed(T),
    /// The timer fired first; the job keeps running behind the handle.
    TimedOut(JoinHandle<T>),
    /// The job panicked or was aborted.
    Aborted,
}

/// Run `future` on its own task and wait at most `timeout` for it.
pub async fn race_timeout<F>(future: F, timeout: Duration) -> Raced<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let mut handle = tokio::spawn(future);
    tokio::select! {
        joined = &mut handle => {
            return match joined {
                Ok(value) => Raced::Completed(value),
                Err(err) => {
                    log::warn!("raced job did not finish: {err}");
                    Raced::Aborted
                },
            };
        },
        () = tokio::time::sleep(timeout) => {},
    }
    Raced::TimedOut(handle)
}
