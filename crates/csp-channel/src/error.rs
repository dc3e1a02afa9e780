//! Error types for channel construction.
//!
//! Per `SPEC_FULL.md` §7, operating on a non-`Open` channel is not an
//! error (it resolves the `Done` sentinel); this type only covers the
//! handful of genuinely fallible, synchronous construction paths.

use thiserror::Error;

/// Errors that can occur while constructing a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A bounded channel was asked for zero capacity.
    #[error("bounded channel capacity must be non-zero")]
    ZeroCapacity,
}
