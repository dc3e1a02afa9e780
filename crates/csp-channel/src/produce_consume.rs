//! `produce`/`consume`: spawning a background task that repeatedly
//! drives a channel, and a handle to stop it early.
//!
//! Both loops `await` their channel operation unconditionally and then
//! unconditionally `yield_now` before the next iteration. A tight
//! producer or consumer with no other `.await` points would otherwise
//! starve the rest of the runtime on a single-threaded executor; the
//! teacher's worker loops use the same unconditional yield for the same
//! reason.
//!
//! `consume` issues its next take before awaiting the current handler,
//! so a slow handler doesn't stall the matchmaking of the *next* value
//! against its producer — only against this consumer's own delivery.
//!
//! A `consume` handler's error is not propagated to the caller — there
//! is no caller left to propagate it to once the loop has been spawned
//! off. Instead it's surfaced the way an uncaught exception reaches a
//! host scheduler's top-level error sink: logged via `tracing` and the
//! loop continues.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::channel::Channel;
use crate::sentinel::Taken;
use crate::state;

/// A handle to stop a running `produce`/`consume` loop.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests the loop stop at its next iteration boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Spawns a task that repeatedly calls `generate`, `put`-ing each
/// `Some(value)` onto `channel`, until `generate` returns `None`, a put
/// resolves `Done`, or the returned handle is cancelled. `None` also
/// closes the channel.
pub fn produce<T, F, Fut>(channel: Channel<T>, mut generate: F) -> CancelHandle
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Option<T>> + Send + 'static,
{
    let cancel = CancelHandle::new();
    let task_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            if task_cancel.is_cancelled() {
                break;
            }
            match generate().await {
                Some(value) => {
                    if channel.put(value).await.is_done() {
                        break;
                    }
                }
                None => {
                    channel.close(false);
                    break;
                }
            }
            tokio::task::yield_now().await;
        }
    });
    cancel
}

type TakeFuture<T> = Pin<Box<dyn Future<Output = Taken<T>> + Send>>;

fn take_future<T: Send + 'static>(channel: &Channel<T>) -> TakeFuture<T> {
    let channel = channel.clone();
    Box::pin(async move { channel.take().await })
}

/// Spawns a task that repeatedly `take`s from `channel` and hands each
/// value to `handle`, until the channel ends or the returned handle is
/// cancelled. A handler error is logged, not propagated.
///
/// Sets `Inner::consuming` for the loop's lifetime and overlaps the next
/// `take` with the in-flight handler invocation — the next take is
/// issued before the current handler's future is awaited, matching
/// spec.md §4.6's "issue the next take before awaiting the current
/// consumer" to avoid pipeline stalls. On exit, clears `consuming` and
/// finishes the channel if it hasn't ended already (spec.md §4.4/§4.6's
/// flush/finish handshake, I6).
pub fn consume<T, E, F, Fut>(channel: Channel<T>, mut handle: F) -> CancelHandle
where
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    let cancel = CancelHandle::new();
    let task_cancel = cancel.clone();
    {
        let mut inner = channel.inner.lock().unwrap();
        inner.consuming = true;
    }
    tokio::spawn(async move {
        let mut pending_take = take_future(&channel);
        let mut ended = false;
        loop {
            if task_cancel.is_cancelled() {
                break;
            }
            match pending_take.await {
                Taken::Value(v) => {
                    // Overlap: issue the next take before awaiting this
                    // value's handler.
                    pending_take = take_future(&channel);
                    if let Err(err) = handle(v).await {
                        tracing::error!(%err, "unhandled error in consume handler");
                    }
                }
                Taken::Done => {
                    ended = true;
                    break;
                }
            }
            tokio::task::yield_now().await;
        }
        {
            let mut inner = channel.inner.lock().unwrap();
            inner.consuming = false;
        }
        // A cancelled (not ended) loop leaves the channel exactly as it
        // was; only a real `Taken::Done` warrants finishing it here, in
        // case `settle` deferred that step to this exit (see `state.rs`).
        if ended {
            state::finish(&channel).await;
        }
    });
    cancel
}
