//! `futures::Stream`/`futures::Sink` adapters over [`csp_channel::Channel`].

mod error;
mod sink;
mod stream;

pub use error::SinkError;
pub use sink::ChannelSink;
pub use stream::ChannelStream;
