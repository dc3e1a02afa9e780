//! The matchmaker: pairs pending producers with pending consumers.
//!
//! This is the one piece of the channel that genuinely needs to run with
//! exclusive access to the queues, and the one piece where a cooperative
//! single-threaded scheduler and a pre-emptively-scheduled Tokio runtime
//! disagree. `SPEC_FULL.md` §4.3 works through the argument in full; the
//! short version: `sliding` is guarded by the *same* `std::sync::Mutex`
//! as the queues it gates, and is never held across an `.await`. Claiming
//! it, doing one "slide" (matching as much work as is currently visible),
//! and re-checking for new work before releasing it closes the lost-wakeup
//! window that a naive claim/release pair would leave open.

use tokio::sync::oneshot;

use crate::channel::{Channel, Inner};
use crate::invariants::debug_assert_single_slider;
use crate::queue::BufEntry;
use crate::sentinel::{ChannelState, PutOutcome, Taken};
use crate::state;
use crate::transform::{invoke_transform, split_resolver, DeferredPut, Resolved, Resolver};

/// Claims the slide loop (bailing if another task already owns it),
/// drains as much matched work as is currently possible, and hands off
/// to [`state::settle`] once the channel has quiesced.
pub(crate) async fn kick<T: Send + 'static>(channel: &Channel<T>) {
    loop {
        let claimed = {
            let mut inner = channel.inner.lock().unwrap();
            if inner.sliding {
                debug_assert_single_slider!(true);
                return;
            }
            inner.sliding = true;
            true
        };
        debug_assert!(claimed);

        loop {
            let progressed = if channel.is_buffered() {
                buffered_slide(channel).await
            } else {
                unbuffered_slide(channel).await
            };
            if !progressed {
                break;
            }
        }

        let stay_claimed = {
            let mut inner = channel.inner.lock().unwrap();
            if has_pending_work(&inner) {
                true
            } else {
                inner.sliding = false;
                false
            }
        };
        if !stay_claimed {
            break;
        }
    }

    state::settle(channel).await;
}

fn has_pending_work<T>(inner: &Inner<T>) -> bool {
    let tails_eligible = inner.state != ChannelState::Open && !inner.tails.is_empty();
    match &inner.buf {
        Some(buf) => {
            let can_fill = !buf.full() && (!inner.puts.is_empty() || tails_eligible);
            let can_drain = !buf.is_empty() && !inner.takes.is_empty();
            can_fill || can_drain
        }
        None => !inner.takes.is_empty() && (!inner.puts.is_empty() || tails_eligible),
    }
}

/// Unbuffered channel: one pending put/tail paired directly with one
/// pending take. Returns `true` iff a pair was matched.
async fn unbuffered_slide<T: Send + 'static>(channel: &Channel<T>) -> bool {
    let (deferred, take_tx) = {
        let mut inner = channel.inner.lock().unwrap();
        if inner.takes.is_empty() {
            return false;
        }
        let next = next_producer_record(&mut inner);
        match next {
            Some(dp) => {
                let tx = inner.takes.shift().expect("checked non-empty above");
                (dp, tx)
            }
            None => return false,
        }
    };

    let DeferredPut {
        value,
        transform,
        resolver,
    } = deferred;
    let resolved = invoke_transform(&transform, value).await;
    apply_resolved(channel, resolved, resolver, take_tx, false).await;
    true
}

/// Buffered channel: two independent phases.
///
/// Phase B (synchronous, single lock acquisition) moves as many pending
/// puts/tails into `buf` as fit. Phase A (one lock acquisition per
/// element) drains `buf` into waiting takes, invoking each element's
/// transform outside the lock.
async fn buffered_slide<T: Send + 'static>(channel: &Channel<T>) -> bool {
    let mut progressed = false;

    {
        let mut inner = channel.inner.lock().unwrap();
        loop {
            let full = inner.buf.as_ref().expect("buffered channel").full();
            if full {
                break;
            }
            match next_producer_record(&mut inner) {
                Some(dp) => {
                    progressed = true;
                    inner
                        .buf
                        .as_mut()
                        .expect("buffered channel")
                        .push(BufEntry::Deferred(dp));
                }
                None => break,
            }
        }
    }

    loop {
        let entry_and_take = {
            let mut inner = channel.inner.lock().unwrap();
            if inner.takes.is_empty() {
                None
            } else {
                let entry = inner.buf.as_mut().expect("buffered channel").shift();
                entry.map(|e| (e, inner.takes.shift().expect("checked non-empty above")))
            }
        };
        let Some((entry, take_tx)) = entry_and_take else {
            break;
        };
        progressed = true;
        match entry {
            BufEntry::Raw(v) => {
                let _ = take_tx.send(Taken::Value(v));
            }
            BufEntry::Deferred(DeferredPut {
                value,
                transform,
                resolver,
            }) => {
                let resolved = invoke_transform(&transform, value).await;
                apply_resolved(channel, resolved, resolver, take_tx, true).await;
            }
        }
    }

    progressed
}

/// Picks the next producer record: `puts` takes priority, `tails` only
/// become eligible once the channel is no longer `Open` (spec.md §4.8:
/// tail values drain strictly after ordinary puts and after `close`).
fn next_producer_record<T>(inner: &mut Inner<T>) -> Option<DeferredPut<T>> {
    if !inner.puts.is_empty() {
        return inner.puts.shift();
    }
    if inner.state != ChannelState::Open && !inner.tails.is_empty() {
        return inner.tails.shift();
    }
    None
}

/// Dispatches a transform's result against the take that's waiting for
/// it, re-queuing surplus/deficit work as needed.
///
/// - `Dropped` or an empty expansion: the waiting take is handed back
///   unconsumed (it will pair with the next producer record instead).
/// - `Single`: delivered directly.
/// - `Many`: the first element is delivered directly; the rest are
///   re-queued as already-transformed (`Identity`) records sharing a
///   [`crate::transform::SharedResolver`] so the original put resolves
///   only once every element has actually been taken.
async fn apply_resolved<T: Send + 'static>(
    channel: &Channel<T>,
    resolved: Resolved<T>,
    resolver: Resolver,
    take_tx: oneshot::Sender<Taken<T>>,
    buffered: bool,
) {
    match resolved {
        Resolved::Dropped => {
            resolver.resolve(PutOutcome::Accepted);
            return_take(channel, take_tx);
        }
        Resolved::Single(v) => {
            resolver.resolve(PutOutcome::Accepted);
            let _ = take_tx.send(Taken::Value(v));
        }
        Resolved::Many(mut values) => {
            if values.is_empty() {
                resolver.resolve(PutOutcome::Accepted);
                return_take(channel, take_tx);
                return;
            }
            let mut resolvers = split_resolver(resolver, values.len());
            let first = values.remove(0);
            let first_resolver = resolvers.remove(0);
            first_resolver.resolve(PutOutcome::Accepted);
            let _ = take_tx.send(Taken::Value(first));

            let mut inner = channel.inner.lock().unwrap();
            // `unshift` prepends, so walk the surplus back-to-front: the
            // last element unshifted ends up at the very front, which must
            // be the first surplus element for delivery order to hold.
            for (v, res) in values.into_iter().zip(resolvers.into_iter()).rev() {
                let record = DeferredPut {
                    value: v,
                    transform: crate::transform::Transform::Identity,
                    resolver: res,
                };
                if buffered {
                    inner
                        .buf
                        .as_mut()
                        .expect("buffered channel")
                        .unshift(BufEntry::Deferred(record));
                } else {
                    inner.puts.unshift(record);
                }
            }
        }
    }
}

/// Hands a take back to the front of the queue so the next matching
/// attempt sees it first.
fn return_take<T>(channel: &Channel<T>, take_tx: oneshot::Sender<Taken<T>>) {
    let mut inner = channel.inner.lock().unwrap();
    inner.takes.unshift(take_tx);
}
