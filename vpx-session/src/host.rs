use av_traits::RawVideoFrame;
use snafu::Snafu;

/// A status code returned by the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Snafu)]
#[snafu(display("status {status}"))]
pub struct HostError {
    pub status: i32,
}

/// Timing the host attached to a source frame. A timestamp the host didn't mark valid is `None`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FrameTiming {
    pub display_timestamp: Option<i64>,
    pub timescale: i32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameType {
    I,
    P,
    /// The frame carries a merged alt-ref frame, so the usual dependency rules don't apply.
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SampleFlags {
    pub not_sync: bool,
    pub droppable: bool,
    pub does_not_depend_on_others: bool,
}

/// A finished frame, ready for the host.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodedFrame {
    pub data: Vec<u8>,
    pub frame_type: FrameType,
    pub sample_flags: SampleFlags,
    /// In the source frame's timescale.
    pub display_timestamp: i64,
}

/// The consumer side of an encode session. Every source frame submitted to a session is
/// eventually handed back through exactly one of `emit_frame` or `drop_frame`.
pub trait HostSession {
    /// A cheap handle to a source frame owned by the host.
    type Input: Clone + PartialEq;

    fn timing(&self, input: &Self::Input) -> Result<FrameTiming, HostError>;

    /// The frame's pixels, already in the layout the encoder expects.
    fn pixel_buffer<'a>(&'a self, input: &'a Self::Input) -> Result<&'a dyn RawVideoFrame<u8>, HostError>;

    /// Delivers the encoded frame for `input`, retiring it.
    fn emit_frame(&mut self, input: Self::Input, frame: EncodedFrame) -> Result<(), HostError>;

    /// Tells the host that `input` will never be encoded.
    fn drop_frame(&mut self, input: Self::Input) -> Result<(), HostError>;
}
