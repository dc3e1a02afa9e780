//! The channel object: spec.md §3's primary entity and §4.1's
//! constructors, plus the `put`/`take`/`tail`/`close`/`done` surface
//! from §6.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::error::ChannelError;
use crate::invariants::debug_assert_put_outcome_matches_state;
use crate::pipeline::PipeCancel;
use crate::queue::{BufEntry, Deque, RingBuffer};
use crate::sentinel::{ChannelState, PutOutcome, Taken};
use crate::slide;
use crate::transform::{DeferredPut, Resolver, Transform};

/// Everything spec.md §3 lists on the `Channel` entity, minus the
/// `Channel<T>` handle wrapper itself (see below).
pub(crate) struct Inner<T> {
    pub(crate) puts: Deque<DeferredPut<T>>,
    pub(crate) tails: Deque<DeferredPut<T>>,
    pub(crate) takes: Deque<oneshot::Sender<Taken<T>>>,
    pub(crate) buf: Option<RingBuffer<BufEntry<T>>>,
    pub(crate) pipeline: Vec<Channel<T>>,
    pub(crate) should_close_pipeline: bool,
    pub(crate) pipe_cancel: Option<PipeCancel>,
    pub(crate) waiting: Deque<oneshot::Sender<()>>,
    pub(crate) transform: Transform<T>,
    pub(crate) state: ChannelState,
    pub(crate) sliding: bool,
    pub(crate) flushing: bool,
    pub(crate) consuming: bool,
}

impl<T> Inner<T> {
    fn new(buf: Option<RingBuffer<BufEntry<T>>>, transform: Transform<T>) -> Self {
        Self {
            puts: Deque::new(),
            tails: Deque::new(),
            takes: Deque::new(),
            buf,
            pipeline: Vec::new(),
            should_close_pipeline: false,
            pipe_cancel: None,
            waiting: Deque::new(),
            transform,
            state: ChannelState::Open,
            sliding: false,
            flushing: false,
            consuming: false,
        }
    }

    pub(crate) fn is_empty_of_work(&self) -> bool {
        self.puts.is_empty() && self.buf.as_ref().is_none_or(RingBuffer::is_empty)
    }
}

/// A first-class, shared coordination object mediating between producers
/// (`put`/`tail`) and consumers (`take`) — spec.md §2/§3.
///
/// Cloning a `Channel` is cheap (an `Arc` bump) and gives a handle to the
/// *same* channel, matching the teacher's `Channel<T>` (`ringmpsc::Channel`)
/// being `Clone` for the same reason.
pub struct Channel<T> {
    pub(crate) inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Channel<T> {
    fn from_inner(inner: Inner<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Unbuffered channel, identity transform.
    pub fn unbounded() -> Self {
        Self::from_inner(Inner::new(None, Transform::Identity))
    }

    /// Unbuffered channel with an explicit transform.
    pub fn unbounded_with(transform: Transform<T>) -> Self {
        Self::from_inner(Inner::new(None, transform))
    }

    /// Buffered channel of the given capacity, identity transform.
    pub fn bounded(capacity: usize) -> Result<Self, ChannelError> {
        Self::bounded_with(capacity, Transform::Identity)
    }

    /// Buffered channel of the given capacity with an explicit transform.
    pub fn bounded_with(capacity: usize, transform: Transform<T>) -> Result<Self, ChannelError> {
        if capacity == 0 {
            return Err(ChannelError::ZeroCapacity);
        }
        Ok(Self::with_buffer_and(RingBuffer::new(capacity), transform))
    }

    /// Buffered channel sized to match a caller-provided ring buffer,
    /// identity transform. Only `buffer`'s capacity is used; its contents
    /// (if any) are not pre-loaded — use [`Channel::from_iter`] to seed a
    /// channel with values.
    pub fn with_buffer(buffer: RingBuffer<T>) -> Self {
        Self::with_buffer_and(buffer, Transform::Identity)
    }

    /// Buffered channel sized to match a caller-provided ring buffer,
    /// with an explicit transform.
    pub fn with_buffer_and(buffer: RingBuffer<T>, transform: Transform<T>) -> Self {
        Self::from_inner(Inner::new(Some(RingBuffer::new(buffer.size())), transform))
    }

    /// spec.md §4.1's static `Channel.from`: materialises `iter`, builds a
    /// buffered channel sized to its length, and pushes each value
    /// directly as a raw (unwrapped) value. Closes the channel unless
    /// `keep_open` is `true`.
    pub fn from_iter<I>(iter: I, keep_open: bool) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let values: Vec<T> = iter.into_iter().collect();
        let mut buf = RingBuffer::new(values.len().max(1));
        for v in values {
            buf.push(BufEntry::Raw(v));
        }
        let channel = Self::with_buffer(buf);
        if !keep_open {
            channel.close(false);
        }
        channel
    }

    /// Returns `true` iff the channel was constructed with buffering.
    pub fn is_buffered(&self) -> bool {
        self.inner.lock().unwrap().buf.is_some()
    }

    /// Submits `value`, suspending until it is delivered to a take (or,
    /// on a buffered channel, until it is accepted into `buf`). Resolves
    /// `PutOutcome::Done` immediately if the channel is not `Open`
    /// (invariant I8).
    pub async fn put(&self, value: T) -> PutOutcome {
        let (tx, rx) = oneshot::channel();
        let is_open = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != ChannelState::Open {
                false
            } else {
                let transform = inner.transform.clone();
                inner.puts.push(DeferredPut {
                    value,
                    transform,
                    resolver: Resolver::Direct(tx),
                });
                true
            }
        };
        if !is_open {
            debug_assert_put_outcome_matches_state!(is_open, true);
            return PutOutcome::Done;
        }
        slide::kick(self).await;
        rx.await.unwrap_or(PutOutcome::Done)
    }

    /// Submits `value` to be delivered strictly after `close` but before
    /// the channel ends (spec.md §4.8). Rejected with `PutOutcome::Done`
    /// if the channel is not `Open`.
    pub async fn tail(&self, value: T) -> PutOutcome {
        let (tx, rx) = oneshot::channel();
        let is_open = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != ChannelState::Open {
                false
            } else {
                let transform = inner.transform.clone();
                inner.tails.push(DeferredPut {
                    value,
                    transform,
                    resolver: Resolver::Direct(tx),
                });
                true
            }
        };
        if !is_open {
            return PutOutcome::Done;
        }
        slide::kick(self).await;
        rx.await.unwrap_or(PutOutcome::Done)
    }

    /// Requests a value, suspending until one is delivered. Resolves
    /// `Taken::Done` immediately if the channel is `Ended` (invariant I9).
    pub async fn take(&self) -> Taken<T> {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == ChannelState::Ended {
                let _ = tx.send(Taken::Done);
            } else {
                inner.takes.push(tx);
            }
        }
        slide::kick(self).await;
        rx.await.unwrap_or(Taken::Done)
    }

    /// Marks the channel `Closed` and triggers a slide. If `all` is
    /// `true`, once the channel fully drains, `Closed` propagates through
    /// the pipeline to every downstream child (spec.md §4.7's `close(true)`).
    pub fn close(&self, all: bool) {
        let kick_needed = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != ChannelState::Open {
                false
            } else {
                inner.state = ChannelState::Closed;
                inner.should_close_pipeline = all;
                true
            }
        };
        if kick_needed {
            let channel = self.clone();
            tokio::spawn(async move {
                slide::kick(&channel).await;
            });
        }
    }

    /// Resolves once the channel reaches `Ended` (invariant I7, "end
    /// once").
    pub async fn done(&self) {
        let rx = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == ChannelState::Ended {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                inner.waiting.push(tx);
                Some(rx)
            }
        };
        if let Some(rx) = rx {
            let _ = rx.await;
        }
    }

    /// `true` iff both `buf` and `puts` are empty.
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.is_empty_of_work()
    }

    /// `buf.length + puts.length`, or just `puts.length` if unbuffered.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.puts.len() + inner.buf.as_ref().map_or(0, RingBuffer::len)
    }

    /// The buffer's nominal capacity, or `None` if unbuffered.
    pub fn capacity(&self) -> Option<usize> {
        self.inner.lock().unwrap().buf.as_ref().map(RingBuffer::size)
    }

    /// The channel's current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.inner.lock().unwrap().state
    }
}
