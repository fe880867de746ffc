//! Presents a block-based VP8 encoder through a strict, in-order host interface.
//!
//! The encoder is free to buffer frames, emit them late, drop them, or emit invisible alternate
//! reference frames. [`EncodeSession`] keeps a ledger of the source frames it has submitted and
//! reconciles every packet that comes back with exactly one of them, so that the host sees each
//! of its frames either emitted or explicitly dropped, in order.

mod alt_ref;
pub use alt_ref::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod host;
pub use host::*;

mod output;

mod pass;
pub use pass::*;

mod pending;
pub use pending::*;

mod session;
pub use session::*;

mod stats;
pub use stats::*;

mod time;
pub use time::*;

#[cfg(test)]
mod testing;

use av_traits::BlockVideoEncoder;

/// A block encoder that is configured the way this crate configures VP8.
pub trait VpxEncoder: BlockVideoEncoder<Config = EncoderConfig, Control = EncoderControl> {}

impl<T: BlockVideoEncoder<Config = EncoderConfig, Control = EncoderControl>> VpxEncoder for T {}
