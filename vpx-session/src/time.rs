/// Every submitted frame occupies this many encoder time units. The odd slots are left free so
/// alt-ref frames never collide with a source frame's time.
pub const TIME_UNITS_PER_FRAME: i64 = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timebase {
    pub num: u32,
    pub den: u32,
}

impl Timebase {
    /// 29.97 fps.
    pub const NTSC: Self = Self { num: 1001, den: 30000 };
}

impl Default for Timebase {
    fn default() -> Self {
        Self { num: 1, den: 30 }
    }
}

/// The encoder time at which the frame with the given index is submitted.
pub fn frame_time(frame_index: u64) -> i64 {
    frame_index as i64 * TIME_UNITS_PER_FRAME
}

/// Converts a packet time, in units of `timebase / TIME_UNITS_PER_FRAME`, to units of
/// `1 / timescale`.
///
/// The result is `pts * num * timescale / 2 / den`, computed without intermediate overflow and
/// truncated toward zero after each division. A zero denominator yields 0.
pub fn packet_time_to_timescale(pts: i64, timebase: Timebase, timescale: i32) -> i64 {
    if timebase.den == 0 {
        return 0;
    }
    let scaled = pts as i128 * timebase.num as i128 * timescale as i128 / TIME_UNITS_PER_FRAME as i128 / timebase.den as i128;
    scaled.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}
