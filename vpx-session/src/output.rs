use crate::{
    packet_time_to_timescale, AllocationFailedSnafu, AltRefHold, BufferOverloadSnafu, EmptyQueueSnafu, EncodedFrame, FrameType,
    HostSession, HostSnafu, PendingInputs, Result, SampleFlags, Timebase, UnmatchedPacketSnafu,
};
use av_traits::FramePacket;
use snafu::{OptionExt, ResultExt};
use tracing::{debug, error, warn};

/// Pairs visible frame packets with the source frames they were encoded from.
pub(crate) struct OutputMatcher<'a, I> {
    pub pending: &'a mut PendingInputs<I>,
    pub alt_ref: &'a mut AltRefHold,
    pub max_encoded_size: usize,
    pub timebase: Timebase,
}

impl<I: Clone + PartialEq> OutputMatcher<'_, I> {
    pub fn handle<H: HostSession<Input = I>>(&mut self, host: &mut H, packet: &FramePacket<'_>) -> Result<()> {
        debug!(
            pts = packet.pts,
            size = packet.data.len(),
            accounted = self.pending.accounted_count(),
            pending = self.pending.len(),
            "got frame packet"
        );

        if packet.flags.is_invisible {
            debug!(size = packet.data.len(), "holding alt-ref frame");
            return self.alt_ref.hold(packet.data);
        }

        // nothing leaves the ledger until the frame is known to fit
        self.check_size(packet)?;
        self.drop_skipped(host, packet.pts)?;
        let matched = self.pending.front().cloned().context(EmptyQueueSnafu)?;
        let frame = self.assemble(host, &matched, packet)?;
        let input = self.pending.pop().context(EmptyQueueSnafu)?;
        debug!(
            size = frame.data.len(),
            frame_type = ?frame.frame_type,
            display_timestamp = frame.display_timestamp,
            "emitting encoded frame"
        );
        host.emit_frame(input, frame).context(HostSnafu {
            operation: "emitting encoded frame",
        })
    }

    fn check_size(&self, packet: &FramePacket<'_>) -> Result<()> {
        let size = self.alt_ref.merged_len() + packet.data.len();
        if size >= self.max_encoded_size {
            error!(size, capacity = self.max_encoded_size, "buffer overload, encoded frame larger than output buffer");
            return BufferOverloadSnafu {
                size,
                capacity: self.max_encoded_size,
            }
            .fail();
        }
        Ok(())
    }

    /// Drops pending frames until the oldest one was submitted at or after `pts`. Every frame
    /// submitted before that was skipped by the encoder. The match stays at the front.
    fn drop_skipped<H: HostSession<Input = I>>(&mut self, host: &mut H, pts: i64) -> Result<()> {
        loop {
            if self.pending.is_empty() {
                let submitted = self.pending.submitted_count();
                error!(pts, submitted, "asked to output a frame but no source frames are pending");
                return UnmatchedPacketSnafu { pts, submitted }.fail();
            }
            let expected_time = self.pending.next_expected_time();
            if expected_time >= pts {
                return Ok(());
            }
            let input = self.pending.pop().context(EmptyQueueSnafu)?;
            warn!(expected_time, pts, pending = self.pending.len(), "encoder skipped source frame, dropping it");
            host.drop_frame(input).context(HostSnafu { operation: "dropping frame" })?;
        }
    }

    fn assemble<H: HostSession<Input = I>>(&mut self, host: &H, input: &I, packet: &FramePacket<'_>) -> Result<EncodedFrame> {
        let size = self.alt_ref.merged_len() + packet.data.len();
        let timing = host.timing(input).context(HostSnafu {
            operation: "getting frame timing",
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(size).context(AllocationFailedSnafu { buffer: "encoded frame" })?;
        let merged_alt_ref = self.alt_ref.merge_into(&mut data);
        data.extend_from_slice(packet.data);

        let is_key = packet.flags.is_key;
        let frame_type = match (merged_alt_ref, is_key) {
            (true, _) => FrameType::Unknown,
            (false, true) => FrameType::I,
            (false, false) => FrameType::P,
        };
        let sample_flags = SampleFlags {
            not_sync: !is_key,
            droppable: !is_key && packet.flags.is_droppable,
            does_not_depend_on_others: frame_type == FrameType::I,
        };

        let display_timestamp = match timing.display_timestamp {
            Some(timestamp) if timestamp != 0 => timestamp,
            _ => packet_time_to_timescale(packet.pts, self.timebase, timing.timescale),
        };

        Ok(EncodedFrame {
            data,
            frame_type,
            sample_flags,
            display_timestamp,
        })
    }
}
