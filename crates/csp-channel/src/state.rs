//! The `Open -> Closed -> Ended` lifecycle (invariant I1) and the
//! `flush`/`finish` steps that advance it once a channel has drained.
//!
//! Mirrors spec.md §4.4's split: `flush` drains pending takes with
//! `Taken::Done` once the channel is `Closed` and empty, but only
//! promotes to `Ended` itself (via `finish`) when no `consume` loop is
//! active (`Inner::consuming`). An active `consume` loop instead calls
//! [`finish`] itself once its own take resolves `Done` and its loop
//! exits (see `produce_consume::consume`) — spec.md §4.6's "on exit,
//! if a flush is in progress, waits for it; otherwise calls finish
//! directly." In this crate flush never spans an `.await` boundary (the
//! whole drain-and-decide step runs under one lock acquisition), so
//! there is no observable "flush in progress" state for the exiting
//! consume loop to wait on — it only ever needs the "otherwise" branch.

use crate::channel::Channel;
use crate::invariants::{debug_assert_flush_once, debug_assert_monotonic_state};
use crate::sentinel::{ChannelState, Taken};

/// Called once a [`crate::slide::kick`] loop has quiesced (no more
/// matchable work). If the channel is `Closed` and fully drained —
/// `puts`, `tails` and `buf` (if any) all empty — resolves every
/// still-pending `take()` as `Taken::Done` (spec.md's `flush`), then
/// promotes the channel to `Ended` via [`finish`] unless a `consume`
/// loop is currently active on it.
pub(crate) async fn settle<T: Send + 'static>(channel: &Channel<T>) {
    let outcome = {
        let mut inner = channel.inner.lock().unwrap();
        let drained = inner.puts.is_empty()
            && inner.tails.is_empty()
            && inner.buf.as_ref().is_none_or(|b| b.is_empty());

        if inner.state == ChannelState::Closed && drained {
            debug_assert_flush_once!(inner.flushing);
            inner.flushing = true;

            let mut stranded_takes = Vec::new();
            inner.takes.drain_into(|tx| stranded_takes.push(tx));
            let should_finish = !inner.consuming;

            inner.flushing = false;
            Some((stranded_takes, should_finish))
        } else {
            None
        }
    };

    let Some((stranded_takes, should_finish)) = outcome else {
        return;
    };

    for tx in stranded_takes {
        let _ = tx.send(Taken::Done);
    }

    if should_finish {
        finish(channel).await;
    }
}

/// Promotes the channel to `Ended` (idempotent — a no-op if already
/// `Ended`), wakes every `done()` waiter, and, if `close(true)` was
/// used, propagates the close through the pipeline.
pub(crate) async fn finish<T: Send + 'static>(channel: &Channel<T>) {
    let outcome = {
        let mut inner = channel.inner.lock().unwrap();
        if inner.state == ChannelState::Ended {
            None
        } else {
            let old = inner.state;
            inner.state = ChannelState::Ended;
            debug_assert_monotonic_state!(old, inner.state);

            let mut waiters = Vec::new();
            inner.waiting.drain_into(|tx| waiters.push(tx));
            let propagate = inner.should_close_pipeline;
            Some((waiters, propagate))
        }
    };

    let Some((waiters, propagate)) = outcome else {
        return;
    };

    for tx in waiters {
        let _ = tx.send(());
    }

    if propagate {
        let children = {
            let inner = channel.inner.lock().unwrap();
            inner.pipeline.clone()
        };
        for child in children {
            child.close(true);
        }
    }
}
