use alloc::string::String;
use core::fmt;

pub trait RawVideoFrame<S> {
    /// The samples that make up the frame's image. Typically this consists of 3 Y/U/V planes of
    /// `u8`s, but any format that the encoder supports can be used.
    fn samples(&self, plane: usize) -> &[S];
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EncodedFrameType {
    /// Let the encoder decide.
    #[default]
    Auto,
    /// Force a key frame.
    Key,
}

/// How much time the encoder may spend on a single frame.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EncodeDeadline {
    Realtime,
    #[default]
    GoodQuality,
    BestQuality,
}

impl EncodeDeadline {
    /// The deadline in microseconds, where 0 means "no deadline".
    pub fn as_micros(self) -> u64 {
        match self {
            Self::Realtime => 1,
            Self::GoodQuality => 1_000_000,
            Self::BestQuality => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FramePacketFlags {
    pub is_key: bool,
    /// The frame isn't referenced by any later frame.
    pub is_droppable: bool,
    /// The frame is never displayed on its own. Alternate reference frames are emitted like this.
    pub is_invisible: bool,
}

/// A compressed frame, borrowed from the encoder until the next call to
/// [`BlockVideoEncoder::next_packet`].
#[derive(Clone, Copy, Debug)]
pub struct FramePacket<'a> {
    pub data: &'a [u8],
    /// Presentation time in the units passed to [`BlockVideoEncoder::encode`].
    pub pts: i64,
    pub flags: FramePacketFlags,
}

#[derive(Clone, Copy, Debug)]
pub enum EncoderPacket<'a> {
    Frame(FramePacket<'a>),
    /// First pass rate control statistics.
    Stats(&'a [u8]),
    Other,
}

/// A status code reported by an encoder library.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CodecError {
    pub code: i32,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "codec error (code = {})", self.code)
    }
}

impl core::error::Error for CodecError {}

/// Implements the low-level interface of a block-based video encoder such as libvpx: frames go
/// in, and any number of packets come out afterwards.
///
/// Typical usage should look like this:
///
/// ```
/// # use av_traits::{BlockVideoEncoder, CodecError, EncodeDeadline, EncodedFrameType, EncoderPacket, RawVideoFrame};
/// fn encode<E>(mut encoder: E, config: &E::Config, frames: &[&dyn RawVideoFrame<u8>]) -> Result<Vec<u8>, CodecError>
///     where E: BlockVideoEncoder
/// {
///     let mut out = Vec::new();
///     encoder.init(config, None)?;
///     for (i, frame) in frames.iter().map(Some).chain([None]).enumerate() {
///         encoder.encode(frame.copied(), i as i64, 1, EncodedFrameType::Auto, EncodeDeadline::GoodQuality)?;
///         while let Some(packet) = encoder.next_packet() {
///             if let EncoderPacket::Frame(frame) = packet {
///                 out.extend_from_slice(frame.data);
///             }
///         }
///     }
///     encoder.close();
///     Ok(out)
/// }
/// ```
pub trait BlockVideoEncoder {
    type Config;
    type Control;

    /// Creates the underlying encoder instance. `stats_in` carries the first pass statistics when
    /// initializing for a final pass.
    fn init(&mut self, config: &Self::Config, stats_in: Option<&[u8]>) -> Result<(), CodecError>;

    /// Adjusts a setting that can only be changed once the encoder is initialized.
    fn control(&mut self, control: Self::Control) -> Result<(), CodecError>;

    /// Sends a frame to the encoder. `None` signals the end of the stream or pass, asking the
    /// encoder to emit whatever it has buffered.
    ///
    /// This may block while the encoder performs encoding. Output is retrieved afterwards via
    /// `next_packet`.
    fn encode(
        &mut self,
        frame: Option<&dyn RawVideoFrame<u8>>,
        pts: i64,
        duration: u64,
        frame_type: EncodedFrameType,
        deadline: EncodeDeadline,
    ) -> Result<(), CodecError>;

    /// Returns the next packet produced by the most recent `encode` call, or `None` once they've
    /// all been retrieved.
    fn next_packet(&mut self) -> Option<EncoderPacket<'_>>;

    /// A human readable description of the last error, if the library provides one.
    fn error_detail(&self) -> Option<String>;

    /// Destroys the underlying encoder instance. `init` may be called again afterwards.
    fn close(&mut self);
}
