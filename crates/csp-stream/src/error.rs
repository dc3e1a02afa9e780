//! Error type surfaced by the `Sink` adapter.

use thiserror::Error;

/// Error returned by [`crate::sink::ChannelSink`] when a write is
/// attempted after the channel has stopped accepting puts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The channel is `Closed` or `Ended`; the item was not accepted.
    #[error("channel is no longer open")]
    Closed,
}
