use crate::{frame_time, AllocationFailedSnafu, Result};
use snafu::ResultExt;
use std::collections::VecDeque;

/// The queue grows by this many entries at a time. Its depth is bounded by the encoder's lag, so
/// it rarely grows at all.
const GROWTH_INCREMENT: usize = 10;

/// Source frames that were submitted to the encoder but haven't been emitted or dropped yet,
/// oldest first.
#[derive(Debug)]
pub struct PendingInputs<I> {
    queue: VecDeque<I>,
    submitted: u64,
    accounted: u64,
    /// `accounted` when the current pass began. Encoder time restarts at 0 with every pass.
    pass_start: u64,
}

impl<I> Default for PendingInputs<I> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            submitted: 0,
            accounted: 0,
            pass_start: 0,
        }
    }
}

impl<I> PendingInputs<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, input: I) -> Result<()> {
        if self.queue.len() == self.queue.capacity() {
            self.queue
                .try_reserve_exact(GROWTH_INCREMENT)
                .context(AllocationFailedSnafu { buffer: "source frame queue" })?;
        }
        self.queue.push_back(input);
        self.submitted += 1;
        Ok(())
    }

    /// Removes the oldest pending frame, marking it as accounted for.
    pub fn pop(&mut self) -> Option<I> {
        let input = self.queue.pop_front()?;
        self.accounted += 1;
        Some(input)
    }

    pub fn front(&self) -> Option<&I> {
        self.queue.front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total number of frames ever pushed.
    pub fn submitted_count(&self) -> u64 {
        self.submitted
    }

    /// Total number of frames ever popped.
    pub fn accounted_count(&self) -> u64 {
        self.accounted
    }

    /// Restarts encoder time, so that the next frame pushed is expected at time 0.
    pub fn begin_pass(&mut self) {
        self.pass_start = self.accounted;
    }

    /// The encoder time the oldest pending frame was submitted at.
    pub fn next_expected_time(&self) -> i64 {
        frame_time(self.accounted - self.pass_start)
    }
}

impl<I: PartialEq> PendingInputs<I> {
    pub fn contains(&self, input: &I) -> bool {
        self.queue.contains(input)
    }
}
