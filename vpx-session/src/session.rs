use crate::{
    output::OutputMatcher, AltRefHold, EmptyQueueSnafu, EncodeSessionError, EncoderConfig, HostSession, HostSnafu, Pass, PassController,
    PendingInputs, PendingInputsAtPassBoundarySnafu, Result, SessionOptions, StatsBuffer, VpxEncoder,
};
use av_traits::{EncodeDeadline, EncodedFrameType, EncoderPacket};
use snafu::{OptionExt, ResultExt};
use tracing::{debug, trace, warn};

/// Every submission to the encoder covers one frame's worth of time units.
const FRAME_DURATION: u64 = 1;

/// An encode session for one stream of source frames of type `I`.
///
/// The host calls [`EncodeSession::complete`] for each of its frames, in order. By the time it
/// returns, that frame has been either emitted or dropped through the host, along with any older
/// frames the encoder was still holding on to.
pub struct EncodeSession<E: VpxEncoder, I> {
    passes: PassController<E>,
    pending: PendingInputs<I>,
    alt_ref: AltRefHold,
    stats: StatsBuffer,
}

impl<E: VpxEncoder, I: Clone + PartialEq> EncodeSession<E, I> {
    /// Creates a single pass session. The encoder is initialized when the first frame arrives.
    pub fn new(codec: E, options: SessionOptions) -> Self {
        Self {
            passes: PassController::new(codec, options),
            pending: PendingInputs::new(),
            alt_ref: AltRefHold::new(),
            stats: StatsBuffer::new(),
        }
    }

    pub fn current_pass(&self) -> Pass {
        self.passes.pass()
    }

    pub fn is_initialized(&self) -> bool {
        self.passes.is_initialized()
    }

    /// The configuration the encoder was initialized with during the current pass.
    pub fn config(&self) -> Option<&EncoderConfig> {
        self.passes.config()
    }

    pub fn codec(&self) -> &E {
        self.passes.codec()
    }

    pub fn frame_count(&self) -> u64 {
        self.passes.frame_count()
    }

    pub fn submitted_count(&self) -> u64 {
        self.pending.submitted_count()
    }

    pub fn accounted_count(&self) -> u64 {
        self.pending.accounted_count()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, input: &I) -> bool {
        self.pending.contains(input)
    }

    pub fn is_holding_alt_ref(&self) -> bool {
        self.alt_ref.is_held()
    }

    /// First pass statistics collected so far.
    pub fn stats(&self) -> &[u8] {
        self.stats.as_slice()
    }

    /// Starts a new pass with a fresh encoder instance. Starting a first pass discards any
    /// previously collected statistics.
    pub fn begin_pass(&mut self, pass: Pass) -> Result<()> {
        if !self.pending.is_empty() {
            return PendingInputsAtPassBoundarySnafu {
                pass,
                pending: self.pending.len(),
            }
            .fail();
        }
        if let Some(alt_ref) = self.alt_ref.take() {
            warn!(size = alt_ref.len(), "discarding unmerged alt-ref frame at pass boundary");
        }
        if pass == Pass::FirstPass {
            self.stats.clear();
        }
        self.pending.begin_pass();
        self.passes.begin_pass(pass);
        Ok(())
    }

    /// Signals the end of the pass to the encoder so it emits everything it has buffered.
    pub fn end_pass<H: HostSession<Input = I>>(&mut self, host: &mut H) -> Result<()> {
        debug!(pass = %self.passes.pass(), pending = self.pending.len(), "ending pass");
        self.submit(host, None)
    }

    /// Makes sure `input` is accounted for, submitting it if that hasn't happened yet and then
    /// flushing the encoder until it's been emitted or dropped.
    pub fn complete<H: HostSession<Input = I>>(&mut self, host: &mut H, input: I) -> Result<()> {
        if !self.pending.contains(&input) {
            self.submit(host, Some(input.clone()))?;
        }

        // a lagging encoder may need several flushes before it lets go of this frame
        while self.pending.contains(&input) {
            let pending = self.pending.len();
            self.submit(host, None)?;

            // no progress means the encoder is never going to emit the oldest frame
            if self.pending.len() == pending {
                let dropped = self.pending.pop().context(EmptyQueueSnafu)?;
                warn!(frame = self.pending.accounted_count() - 1, "encoder never emitted source frame, dropping it");
                host.drop_frame(dropped).context(HostSnafu { operation: "dropping frame" })?;
            }
        }
        Ok(())
    }

    /// Sends one frame, or a flush if `input` is `None`, to the encoder and handles every packet
    /// that comes out.
    pub fn submit<H: HostSession<Input = I>>(&mut self, host: &mut H, input: Option<I>) -> Result<()> {
        let frame_index = self.passes.frame_count();
        let pts = self.passes.frame_time();

        let result = match input {
            Some(input) => {
                self.passes.ensure_initialized(self.stats.as_slice())?;
                let frame = host.pixel_buffer(&input).context(HostSnafu {
                    operation: "getting pixel buffer",
                })?;
                // first pass frames never produce output, so there's nothing to match them to
                if self.passes.pass() != Pass::FirstPass {
                    self.pending.push(input.clone())?;
                }
                trace!(frame_index, pts, pending = self.pending.len(), "encoding frame");
                self.passes
                    .codec_mut()
                    .encode(Some(frame), pts, FRAME_DURATION, EncodedFrameType::Auto, EncodeDeadline::GoodQuality)
            }
            None => {
                if !self.passes.is_initialized() {
                    trace!("nothing to flush, encoder was never initialized");
                    return Ok(());
                }
                trace!(frame_index, pts, pending = self.pending.len(), "flushing encoder");
                self.passes
                    .codec_mut()
                    .encode(None, pts, FRAME_DURATION, EncodedFrameType::Auto, EncodeDeadline::GoodQuality)
            }
        };
        // the encoder's notion of time has moved on whether or not it succeeded
        self.passes.advance_frame_counter();

        if let Err(source) = result {
            let detail = self.passes.codec().error_detail();
            warn!(frame_index, error = %source, detail = detail.as_deref(), "encode failed");
            return Err(EncodeSessionError::Encode {
                frame: frame_index,
                detail,
                source,
            });
        }

        self.drain(host)
    }

    fn drain<H: HostSession<Input = I>>(&mut self, host: &mut H) -> Result<()> {
        let pass = self.passes.pass();
        let timebase = self.passes.timebase();
        let max_encoded_size = self.passes.options().max_encoded_size;
        let Self {
            passes,
            pending,
            alt_ref,
            stats,
        } = self;

        while let Some(packet) = passes.codec_mut().next_packet() {
            match packet {
                EncoderPacket::Frame(frame) if pass == Pass::FirstPass => {
                    trace!(pts = frame.pts, "ignoring first pass frame");
                }
                EncoderPacket::Frame(frame) => {
                    let mut matcher = OutputMatcher {
                        pending: &mut *pending,
                        alt_ref: &mut *alt_ref,
                        max_encoded_size,
                        timebase,
                    };
                    matcher.handle(host, &frame)?;
                }
                EncoderPacket::Stats(data) => {
                    trace!(size = data.len(), total = stats.len() + data.len(), "appending first pass stats");
                    stats.append(data)?;
                }
                EncoderPacket::Other => {}
            }
        }
        Ok(())
    }

    /// Closes the encoder. Dropping the session does the same.
    pub fn close(&mut self) {
        self.passes.close();
    }
}
