use crate::{AllocationFailedSnafu, Result};
use snafu::ResultExt;

/// Accumulates first pass statistics packets for the final pass.
///
/// Storage grows to exactly fit what's been appended since the statistics for a whole pass are
/// bounded by its length.
#[derive(Debug, Default)]
pub struct StatsBuffer {
    data: Vec<u8>,
}

impl StatsBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.data
            .try_reserve_exact(bytes.len())
            .context(AllocationFailedSnafu { buffer: "statistics buffer" })?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn clear(&mut self) {
        self.data = Vec::new();
    }
}
