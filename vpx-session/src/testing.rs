//! Test doubles for the encoder and the host.

use crate::{EncodedFrame, EncoderConfig, EncoderControl, FrameTiming, HostError, HostSession};
use av_traits::{BlockVideoEncoder, CodecError, EncodeDeadline, EncodedFrameType, EncoderPacket, FramePacket, FramePacketFlags, RawVideoFrame};
use std::collections::{HashMap, VecDeque};

#[derive(Clone, Debug)]
pub enum ScriptedPacket {
    Frame { data: Vec<u8>, pts: i64, flags: FramePacketFlags },
    Stats(Vec<u8>),
    Other,
}

impl ScriptedPacket {
    pub fn frame(pts: i64, size: usize) -> Self {
        Self::Frame {
            data: vec![pts as u8; size],
            pts,
            flags: FramePacketFlags::default(),
        }
    }

    pub fn key_frame(pts: i64, size: usize) -> Self {
        Self::Frame {
            data: vec![pts as u8; size],
            pts,
            flags: FramePacketFlags {
                is_key: true,
                ..Default::default()
            },
        }
    }

    pub fn droppable_frame(pts: i64, size: usize) -> Self {
        Self::Frame {
            data: vec![pts as u8; size],
            pts,
            flags: FramePacketFlags {
                is_droppable: true,
                ..Default::default()
            },
        }
    }

    pub fn alt_ref(pts: i64, data: Vec<u8>) -> Self {
        Self::Frame {
            data,
            pts,
            flags: FramePacketFlags {
                is_invisible: true,
                ..Default::default()
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EncodeCall {
    pub has_frame: bool,
    pub pts: i64,
    pub duration: u64,
    pub deadline: EncodeDeadline,
}

/// Replays a fixed list of outputs: the nth call to `encode` makes the nth entry of `script`
/// available. Calls past the end of the script produce nothing.
#[derive(Default)]
pub struct ScriptedEncoder {
    pub script: VecDeque<Vec<ScriptedPacket>>,
    pub calls: Vec<EncodeCall>,
    pub inits: Vec<(EncoderConfig, Option<Vec<u8>>)>,
    pub controls: Vec<EncoderControl>,
    pub closed: usize,
    pub fail_init: Option<&'static str>,
    pub fail_encode_on_call: Option<(usize, &'static str)>,
    pub fail_controls: bool,
    available: VecDeque<ScriptedPacket>,
    current: Option<ScriptedPacket>,
    last_error: Option<&'static str>,
}

impl ScriptedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: Vec<Vec<ScriptedPacket>>) -> Self {
        Self {
            script: script.into(),
            ..Default::default()
        }
    }
}

impl BlockVideoEncoder for ScriptedEncoder {
    type Config = EncoderConfig;
    type Control = EncoderControl;

    fn init(&mut self, config: &EncoderConfig, stats_in: Option<&[u8]>) -> Result<(), CodecError> {
        if let Some(detail) = self.fail_init {
            self.last_error = Some(detail);
            return Err(CodecError { code: 8 });
        }
        self.inits.push((config.clone(), stats_in.map(|s| s.to_vec())));
        Ok(())
    }

    fn control(&mut self, control: EncoderControl) -> Result<(), CodecError> {
        if self.fail_controls {
            self.last_error = Some("unsupported control");
            return Err(CodecError { code: 4 });
        }
        self.controls.push(control);
        Ok(())
    }

    fn encode(
        &mut self,
        frame: Option<&dyn RawVideoFrame<u8>>,
        pts: i64,
        duration: u64,
        _frame_type: EncodedFrameType,
        deadline: EncodeDeadline,
    ) -> Result<(), CodecError> {
        let call = self.calls.len();
        self.calls.push(EncodeCall {
            has_frame: frame.is_some(),
            pts,
            duration,
            deadline,
        });
        self.available.clear();
        if let Some((failing_call, detail)) = self.fail_encode_on_call {
            if failing_call == call {
                self.last_error = Some(detail);
                return Err(CodecError { code: 1 });
            }
        }
        if let Some(packets) = self.script.pop_front() {
            self.available.extend(packets);
        }
        Ok(())
    }

    fn next_packet(&mut self) -> Option<EncoderPacket<'_>> {
        self.current = self.available.pop_front();
        Some(match self.current.as_ref()? {
            ScriptedPacket::Frame { data, pts, flags } => EncoderPacket::Frame(FramePacket {
                data: data.as_slice(),
                pts: *pts,
                flags: *flags,
            }),
            ScriptedPacket::Stats(data) => EncoderPacket::Stats(data.as_slice()),
            ScriptedPacket::Other => EncoderPacket::Other,
        })
    }

    fn error_detail(&self) -> Option<String> {
        self.last_error.map(str::to_string)
    }

    fn close(&mut self) {
        self.closed += 1;
    }
}

#[derive(Default)]
pub struct TestPixels {
    planes: Vec<Vec<u8>>,
}

impl RawVideoFrame<u8> for TestPixels {
    fn samples(&self, plane: usize) -> &[u8] {
        &self.planes[plane]
    }
}

/// A host whose source frames are identified by number. Frame `n` has a display timestamp of
/// `n * 100` in a timescale of 3000, unless overridden.
#[derive(Default)]
pub struct RecordingHost {
    pub emitted: Vec<(u32, EncodedFrame)>,
    pub dropped: Vec<u32>,
    pub timestamps: HashMap<u32, Option<i64>>,
    pub fail_drops: bool,
    pub fail_pixels: bool,
    pub fail_timing: bool,
    pixels: TestPixels,
}

impl RecordingHost {
    pub const TIMESCALE: i32 = 3000;

    pub fn new() -> Self {
        Self {
            pixels: TestPixels {
                planes: vec![vec![16; 64], vec![128; 16], vec![128; 16]],
            },
            ..Default::default()
        }
    }

    pub fn emitted_inputs(&self) -> Vec<u32> {
        self.emitted.iter().map(|(input, _)| *input).collect()
    }
}

impl HostSession for RecordingHost {
    type Input = u32;

    fn timing(&self, input: &u32) -> Result<FrameTiming, HostError> {
        if self.fail_timing {
            return Err(HostError { status: -12909 });
        }
        Ok(FrameTiming {
            display_timestamp: self.timestamps.get(input).copied().unwrap_or(Some(*input as i64 * 100)),
            timescale: Self::TIMESCALE,
        })
    }

    fn pixel_buffer<'a>(&'a self, _input: &'a u32) -> Result<&'a dyn RawVideoFrame<u8>, HostError> {
        if self.fail_pixels {
            return Err(HostError { status: -50 });
        }
        Ok(&self.pixels)
    }

    fn emit_frame(&mut self, input: u32, frame: EncodedFrame) -> Result<(), HostError> {
        self.emitted.push((input, frame));
        Ok(())
    }

    fn drop_frame(&mut self, input: u32) -> Result<(), HostError> {
        if self.fail_drops {
            return Err(HostError { status: -108 });
        }
        self.dropped.push(input);
        Ok(())
    }
}
