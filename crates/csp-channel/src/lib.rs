//! A first-class, shared channel for coordinating asynchronous producers
//! and consumers: unbuffered rendezvous or bounded buffering, optional
//! per-value transforms (map / drop / one-to-many expansion), a
//! three-state lifecycle (`Open -> Closed -> Ended`), and pipeline
//! wiring (`pipe`, `pipeline`, `merge`) for composing channels together.
//!
//! See `produce`/`consume` for the common "spawn a task that drives a
//! channel" pattern, and [`Transform`] for the transform protocol.

mod channel;
mod error;
mod invariants;
mod pipeline;
mod produce_consume;
mod queue;
mod sentinel;
mod slide;
mod state;
mod transform;

pub use channel::Channel;
pub use error::ChannelError;
pub use pipeline::{map, merge, pipe, pipeline, to_vec, unpipe, PipeCancel, PipelineStage};
pub use produce_consume::{consume, produce, CancelHandle};
pub use queue::RingBuffer;
pub use sentinel::{ChannelState, PutOutcome, Taken};
pub use transform::{ExpandSink, Transform};
