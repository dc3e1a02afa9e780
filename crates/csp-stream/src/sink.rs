//! Async sender implementing `futures::Sink` over a `csp_channel::Channel`.

use std::pin::Pin;
use std::task::{Context, Poll};

use csp_channel::{Channel, PutOutcome};
use futures_core::Future;
use futures_sink::Sink;
use futures_util::future::BoxFuture;
use pin_project_lite::pin_project;

use crate::error::SinkError;

pin_project! {
    /// Sink adapter wrapping a [`Channel`].
    ///
    /// `start_send` begins a `put()` without waiting for it to resolve;
    /// `poll_ready`/`poll_flush` drive that put to completion, giving the
    /// usual `Sink` contract (at most one item in flight between
    /// `start_send` calls) without the channel needing its own
    /// reserve/commit protocol.
    pub struct ChannelSink<T: Send + 'static> {
        channel: Channel<T>,
        #[pin]
        pending: Option<BoxFuture<'static, PutOutcome>>,
    }
}

impl<T: Send + 'static> ChannelSink<T> {
    /// Wraps `channel` as a `Sink` accepting values in submission order.
    pub fn new(channel: Channel<T>) -> Self {
        Self {
            channel,
            pending: None,
        }
    }

    /// Returns a clone of the underlying channel.
    pub fn channel(&self) -> Channel<T> {
        self.channel.clone()
    }

    fn poll_pending(
        this: &mut ChannelSinkProj<'_, T>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), SinkError>> {
        let Some(fut) = this.pending.as_mut().as_pin_mut() else {
            return Poll::Ready(Ok(()));
        };
        match fut.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(outcome) => {
                this.pending.set(None);
                if outcome.is_done() {
                    Poll::Ready(Err(SinkError::Closed))
                } else {
                    Poll::Ready(Ok(()))
                }
            }
        }
    }
}

impl<T: Send + 'static> Sink<T> for ChannelSink<T> {
    type Error = SinkError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let mut this = self.project();
        Self::poll_pending(&mut this, cx)
    }

    fn start_send(self: Pin<&mut Self>, item: T) -> Result<(), Self::Error> {
        let this = self.project();
        debug_assert!(
            this.pending.as_ref().get_ref().is_none(),
            "start_send called before the previous item was flushed"
        );
        let channel = this.channel.clone();
        let fut: BoxFuture<'static, PutOutcome> = Box::pin(async move { channel.put(item).await });
        this.pending.set(Some(fut));
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let mut this = self.project();
        Self::poll_pending(&mut this, cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let mut this = self.project();
        match Self::poll_pending(&mut this, cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
            Poll::Ready(Ok(())) => {}
        }
        this.channel.close(false);
        Poll::Ready(Ok(()))
    }
}
