use crate::{HostError, Pass};
use av_traits::CodecError;
use snafu::Snafu;
use std::collections::TryReserveError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EncodeSessionError {
    #[snafu(display("failed to initialize encoder for the {pass} pass: {source} ({})", detail.as_deref().unwrap_or("no detail")))]
    CodecInit {
        pass: Pass,
        detail: Option<String>,
        source: CodecError,
    },
    #[snafu(display("failed to encode frame {frame}: {source} ({})", detail.as_deref().unwrap_or("no detail")))]
    Encode {
        frame: u64,
        detail: Option<String>,
        source: CodecError,
    },
    #[snafu(display("host error {operation}: {source}"))]
    Host { operation: &'static str, source: HostError },
    #[snafu(display("asked to output a frame at time {pts} but no source frames are pending ({submitted} submitted)"))]
    UnmatchedPacket { pts: i64, submitted: u64 },
    #[snafu(display("buffer overload: encoded frame of {size} bytes doesn't fit in {capacity} byte output buffer"))]
    BufferOverload { size: usize, capacity: usize },
    #[snafu(display("got a {incoming} byte alt-ref frame while a {held} byte alt-ref frame is still waiting to be merged"))]
    AltRefAlreadyHeld { held: usize, incoming: usize },
    #[snafu(display("source frame queue is empty"))]
    EmptyQueue,
    #[snafu(display("unable to grow {buffer}: {source}"))]
    AllocationFailed {
        buffer: &'static str,
        source: TryReserveError,
    },
    #[snafu(display("cannot start the {pass} pass with {pending} source frames still pending"))]
    PendingInputsAtPassBoundary { pass: Pass, pending: usize },
}

pub type Result<T> = core::result::Result<T, EncodeSessionError>;
