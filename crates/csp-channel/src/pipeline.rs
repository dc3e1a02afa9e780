//! Wiring channels together: `pipe`/`unpipe` (single forwarder),
//! `pipeline` (a head-to-tail transform chain) and `merge` (fan-in from
//! several sources into a freshly created child), plus `map` and `to_vec`
//! convenience wrappers.
//!
//! Cancellation mirrors the teacher's shutdown handshake
//! (`ringmpsc-stream`'s `ShutdownState`/`ShutdownHandle`): a shared
//! cancelled flag plus a `Notify` so a forwarding task wakes promptly
//! instead of waiting out a `take()` that may never resolve on its own.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::channel::Channel;
use crate::sentinel::Taken;
use crate::transform::Transform;

/// A handle to stop a running `pipe`/`pipeline`/`merge` forwarder.
#[derive(Clone)]
pub struct PipeCancel {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl PipeCancel {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Stops the forwarder at its next opportunity. Already-in-flight
    /// `take`/`put` calls still complete.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Forwards every value `source` yields into `dest`, one at a time,
/// until `source` ends, `dest` stops accepting puts, or the returned
/// handle is cancelled. Registers `dest` on `source`'s pipeline so
/// `source.close(true)` propagates downstream (spec.md §4.7).
pub fn pipe<T: Clone + Send + 'static>(source: &Channel<T>, dest: Channel<T>) -> PipeCancel {
    let cancel = PipeCancel::new();
    {
        let mut inner = source.inner.lock().unwrap();
        inner.pipeline.push(dest.clone());
    }

    let task_cancel = cancel.clone();
    let task_source = source.clone();
    tokio::spawn(async move {
        loop {
            if task_cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                () = task_cancel.notify.notified() => break,
                taken = task_source.take() => match taken {
                    Taken::Value(v) => {
                        if dest.put(v).await.is_done() {
                            break;
                        }
                    }
                    Taken::Done => break,
                },
            }
        }
    });

    cancel
}

/// Removes `dest` from `source`'s pipeline and cancels the forwarder
/// `cancel` was returned from. A no-op if `dest` was never piped.
pub fn unpipe<T: Send + 'static>(source: &Channel<T>, dest: &Channel<T>, cancel: &PipeCancel) {
    cancel.cancel();
    let mut inner = source.inner.lock().unwrap();
    inner
        .pipeline
        .retain(|child| !Arc::ptr_eq(&child.inner, &dest.inner));
}

/// One participant in a [`pipeline`] chain: either a transform to
/// materialize into a fresh unbuffered channel, or an existing channel to
/// splice in as-is (spec.md §4.7: "given a sequence of transforms and/or
/// channels").
pub enum PipelineStage<T> {
    Transform(Transform<T>),
    Channel(Channel<T>),
}

/// Builds a transform chain: one unbuffered channel per [`PipelineStage::Transform`]
/// (a [`PipelineStage::Channel`] stage is reused as-is), wired head-to-tail
/// with [`pipe`]. Returns `(head, tail)` — putting into `head` runs a value
/// through every stage's transform in order before it's available from
/// `tail` (spec.md §4.7, scenario S6).
pub fn pipeline<T: Clone + Send + 'static>(stages: Vec<PipelineStage<T>>) -> (Channel<T>, Channel<T>) {
    let channels: Vec<Channel<T>> = if stages.is_empty() {
        vec![Channel::unbounded()]
    } else {
        stages
            .into_iter()
            .map(|stage| match stage {
                PipelineStage::Transform(t) => Channel::unbounded_with(t),
                PipelineStage::Channel(c) => c,
            })
            .collect()
    };

    for pair in channels.windows(2) {
        let _ = pipe(&pair[0], pair[1].clone());
    }

    let head = channels.first().expect("at least one stage").clone();
    let tail = channels.last().expect("at least one stage").clone();
    (head, tail)
}

/// Creates a single new child, pipes every one of `sources` into it, and
/// returns the child (spec.md §4.7, §6). The child is closed once every
/// source has ended.
pub fn merge<T: Send + 'static>(sources: Vec<Channel<T>>) -> Channel<T> {
    let dest = Channel::unbounded();
    let remaining = Arc::new(AtomicUsize::new(sources.len()));

    for source in sources {
        let task_dest = dest.clone();
        let task_remaining = Arc::clone(&remaining);
        tokio::spawn(async move {
            loop {
                match source.take().await {
                    Taken::Value(v) => {
                        if task_dest.put(v).await.is_done() {
                            break;
                        }
                    }
                    Taken::Done => break,
                }
            }
            if task_remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                task_dest.close(false);
            }
        });
    }

    dest
}

/// Spawns a task that takes from `source`, applies `f`, and puts the
/// result on a freshly-created unbounded channel, closing it once
/// `source` ends.
pub fn map<T, U, F, Fut>(source: Channel<T>, f: F) -> Channel<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = U> + Send + 'static,
{
    let dest = Channel::unbounded();
    let task_dest = dest.clone();
    tokio::spawn(async move {
        loop {
            match source.take().await {
                Taken::Value(v) => {
                    let mapped = f(v).await;
                    if task_dest.put(mapped).await.is_done() {
                        break;
                    }
                }
                Taken::Done => {
                    task_dest.close(false);
                    break;
                }
            }
        }
    });
    dest
}

/// Drains `channel` into a `Vec`, in delivery order, resolving once it
/// ends.
pub async fn to_vec<T: Send + 'static>(channel: &Channel<T>) -> Vec<T> {
    let mut out = Vec::new();
    loop {
        match channel.take().await {
            Taken::Value(v) => out.push(v),
            Taken::Done => break,
        }
    }
    out
}
