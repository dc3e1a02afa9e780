//! Async receiver implementing `futures::Stream` over a `csp_channel::Channel`.

use std::pin::Pin;
use std::task::{Context, Poll};

use csp_channel::{Channel, Taken};
use futures_core::{Future, Stream};
use futures_util::future::BoxFuture;
use pin_project_lite::pin_project;

pin_project! {
    /// Stream adapter wrapping a [`Channel`].
    ///
    /// Each poll drives a single in-flight `take()` future to completion;
    /// `csp_channel::Channel` already does its own producer/consumer
    /// matchmaking internally, so there's no separate notify/backpressure
    /// bookkeeping to duplicate here the way a lower-level ring would need.
    pub struct ChannelStream<T: Send + 'static> {
        channel: Channel<T>,
        #[pin]
        pending: Option<BoxFuture<'static, Taken<T>>>,
    }
}

impl<T: Send + 'static> ChannelStream<T> {
    /// Wraps `channel` as a `Stream` yielding its values in delivery order.
    pub fn new(channel: Channel<T>) -> Self {
        Self {
            channel,
            pending: None,
        }
    }

    /// Returns a clone of the underlying channel, e.g. to `close()` it or
    /// hand a paired `put`-side handle to a producer.
    pub fn channel(&self) -> Channel<T> {
        self.channel.clone()
    }
}

impl<T: Send + 'static> Stream for ChannelStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let mut this = self.project();

        if this.pending.as_ref().get_ref().is_none() {
            let channel = this.channel.clone();
            let fut: BoxFuture<'static, Taken<T>> = Box::pin(async move { channel.take().await });
            this.pending.set(Some(fut));
        }

        let poll = this
            .pending
            .as_mut()
            .as_pin_mut()
            .expect("just initialized above")
            .poll(cx);

        match poll {
            Poll::Pending => Poll::Pending,
            Poll::Ready(taken) => {
                this.pending.set(None);
                match taken {
                    Taken::Value(v) => Poll::Ready(Some(v)),
                    Taken::Done => Poll::Ready(None),
                }
            }
        }
    }
}
