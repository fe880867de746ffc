use crate::{AllocationFailedSnafu, AltRefAlreadyHeldSnafu, BufferOverloadSnafu, Result};
use snafu::ResultExt;
use tracing::error;

/// Length of the little-endian size field that precedes a merged alt-ref payload.
pub const ALT_REF_SIZE_PREFIX_LEN: usize = 4;

/// Holds an invisible alt-ref frame until it can be merged into the next visible frame.
///
/// A second alt-ref arriving before the first is merged is unrecoverable for the session.
#[derive(Debug, Default)]
pub struct AltRefHold {
    payload: Option<Vec<u8>>,
}

impl AltRefHold {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies and holds an alt-ref payload. Only one payload can be held at a time: a second one
    /// fails and leaves the first in place.
    pub fn hold(&mut self, data: &[u8]) -> Result<()> {
        if let Some(held) = &self.payload {
            error!(held = held.len(), incoming = data.len(), "alt-ref frame received before the previous one was merged");
            return AltRefAlreadyHeldSnafu {
                held: held.len(),
                incoming: data.len(),
            }
            .fail();
        }
        if u32::try_from(data.len()).is_err() {
            return BufferOverloadSnafu {
                size: data.len(),
                capacity: u32::MAX as usize,
            }
            .fail();
        }
        let mut payload = Vec::new();
        payload
            .try_reserve_exact(data.len())
            .context(AllocationFailedSnafu { buffer: "alt-ref frame" })?;
        payload.extend_from_slice(data);
        self.payload = Some(payload);
        Ok(())
    }

    pub fn take(&mut self) -> Option<Vec<u8>> {
        self.payload.take()
    }

    pub fn is_held(&self) -> bool {
        self.payload.is_some()
    }

    /// The number of bytes merging would add to the next frame, size prefix included.
    pub fn merged_len(&self) -> usize {
        self.payload.as_ref().map_or(0, |p| ALT_REF_SIZE_PREFIX_LEN + p.len())
    }

    /// Appends the held payload, prefixed by its size, and releases it. Returns whether anything
    /// was merged.
    pub fn merge_into(&mut self, out: &mut Vec<u8>) -> bool {
        match self.payload.take() {
            Some(payload) => {
                // hold() guarantees the length fits
                out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
                out.extend_from_slice(&payload);
                true
            }
            None => false,
        }
    }
}
