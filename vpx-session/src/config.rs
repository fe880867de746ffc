use crate::Timebase;
use std::fmt;
use tracing::trace;

/// Used when the host doesn't ask for a key frame interval. 0 can't be passed through since the
/// encoder reserves it to mean "every frame is a key frame".
pub const DEFAULT_KEY_FRAME_MAX_DISTANCE: u32 = 300;

/// Quality slider range, matching the host's codec quality constants.
pub const NORMAL_QUALITY: u16 = 0x200;
pub const MAX_QUALITY: u16 = 0x3ff;

/// Frame area at which the quality slider maps directly to kbit/s.
const REFERENCE_FRAME_AREA: f64 = 640.0 * 480.0;

/// Raw setting slots that the host leaves untouched hold this value.
pub const UNSET_SLOT: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Pass {
    #[default]
    OnePass,
    /// Statistics only. Nothing is delivered to the host.
    FirstPass,
    /// The final pass of a two pass encode, driven by the first pass statistics.
    LastPass,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OnePass => "single",
            Self::FirstPass => "first",
            Self::LastPass => "last",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RateControlMode {
    #[default]
    Vbr,
    Cbr,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum KeyFrameMode {
    Disabled,
    #[default]
    Auto,
}

/// The encoder configuration. Defaults match the VP8 library's own defaults.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncoderConfig {
    pub usage: u32,
    pub threads: u32,
    pub profile: u32,
    pub width: u32,
    pub height: u32,
    pub timebase: Timebase,
    pub error_resilient: u32,
    pub pass: Pass,
    pub lag_in_frames: u32,
    pub drop_frame_threshold: u32,
    pub resize_allowed: u32,
    pub resize_up_threshold: u32,
    pub resize_down_threshold: u32,
    pub rate_control: RateControlMode,
    /// kbit/s
    pub target_bitrate: u32,
    pub min_quantizer: u32,
    pub max_quantizer: u32,
    pub undershoot_pct: u32,
    pub overshoot_pct: u32,
    /// Decoder buffer model sizes, in milliseconds.
    pub buffer_size: u32,
    pub buffer_initial_size: u32,
    pub buffer_optimal_size: u32,
    pub two_pass_vbr_bias_pct: u32,
    pub two_pass_vbr_min_section_pct: u32,
    pub two_pass_vbr_max_section_pct: u32,
    pub key_frame_mode: KeyFrameMode,
    pub key_frame_min_distance: u32,
    pub key_frame_max_distance: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            usage: 0,
            threads: 0,
            profile: 0,
            width: 320,
            height: 240,
            timebase: Timebase::default(),
            error_resilient: 0,
            pass: Pass::OnePass,
            lag_in_frames: 0,
            drop_frame_threshold: 0,
            resize_allowed: 0,
            resize_up_threshold: 60,
            resize_down_threshold: 30,
            rate_control: RateControlMode::Vbr,
            target_bitrate: 256,
            min_quantizer: 4,
            max_quantizer: 63,
            undershoot_pct: 100,
            overshoot_pct: 100,
            buffer_size: 6000,
            buffer_initial_size: 4000,
            buffer_optimal_size: 5000,
            two_pass_vbr_bias_pct: 50,
            two_pass_vbr_min_section_pct: 0,
            two_pass_vbr_max_section_pct: 400,
            key_frame_mode: KeyFrameMode::Auto,
            key_frame_min_distance: 0,
            key_frame_max_distance: 128,
        }
    }
}

impl EncoderConfig {
    /// Builds the configuration for a pass: host-derived bitrate, key frame distance and
    /// timebase first, then the user's overrides, then the pass itself.
    pub fn derive(options: &SessionOptions, pass: Pass) -> Self {
        let mut config = Self {
            width: options.width,
            height: options.height,
            target_bitrate: options.target_bitrate(),
            key_frame_max_distance: options.key_frame_max_distance(),
            ..Default::default()
        };
        if let Some(timebase) = options.timebase() {
            config.timebase = timebase;
        }
        options.settings.apply(&mut config);
        config.pass = pass;
        config
    }
}

/// Settings that can only be applied to an initialized encoder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EncoderControl {
    CpuUsed(i32),
    NoiseSensitivity(u32),
    Sharpness(u32),
    StaticThreshold(u32),
    AutoAltRef(u32),
    AltRefMaxFrames(u32),
    AltRefStrength(u32),
    AltRefType(u32),
}

/// User overrides. `None` leaves the encoder's default in place.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EncoderSettings {
    pub threads: Option<u32>,
    pub error_resilient: Option<u32>,
    pub drop_frame_threshold: Option<u32>,
    pub rate_control: Option<RateControlMode>,
    pub lag_in_frames: Option<u32>,
    pub min_quantizer: Option<u32>,
    pub max_quantizer: Option<u32>,
    pub undershoot_pct: Option<u32>,
    pub overshoot_pct: Option<u32>,
    pub resize_allowed: Option<u32>,
    pub resize_up_threshold: Option<u32>,
    pub resize_down_threshold: Option<u32>,
    pub buffer_size: Option<u32>,
    pub buffer_initial_size: Option<u32>,
    pub buffer_optimal_size: Option<u32>,
    pub key_frame_mode: Option<KeyFrameMode>,
    pub key_frame_min_distance: Option<u32>,
    pub key_frame_max_distance: Option<u32>,
    pub two_pass_vbr_bias_pct: Option<u32>,
    pub two_pass_vbr_min_section_pct: Option<u32>,
    pub two_pass_vbr_max_section_pct: Option<u32>,

    pub cpu_used: Option<i32>,
    pub noise_sensitivity: Option<u32>,
    pub sharpness: Option<u32>,
    pub static_threshold: Option<u32>,
    pub auto_alt_ref: Option<u32>,
    pub alt_ref_max_frames: Option<u32>,
    pub alt_ref_strength: Option<u32>,
    pub alt_ref_type: Option<u32>,
}

impl EncoderSettings {
    /// Reads the host's raw settings slots, where [`UNSET_SLOT`] marks a setting the user never
    /// touched. Missing slots are treated as unset.
    pub fn from_slots(slots: &[u32]) -> Self {
        let slot = |i: usize| slots.get(i).copied().filter(|&v| v != UNSET_SLOT);
        Self {
            threads: slot(2),
            error_resilient: slot(3),
            drop_frame_threshold: slot(4),
            rate_control: match slot(5) {
                Some(1) => Some(RateControlMode::Cbr),
                Some(2) => Some(RateControlMode::Vbr),
                _ => None,
            },
            lag_in_frames: slot(6),
            min_quantizer: slot(8),
            max_quantizer: slot(9),
            undershoot_pct: slot(10),
            overshoot_pct: slot(11),
            // the slot is unsigned but the control is signed, negative values wrap
            cpu_used: slot(12).map(|v| v as i32),
            noise_sensitivity: slot(13),
            sharpness: slot(14),
            static_threshold: slot(15),
            resize_allowed: slot(16),
            resize_up_threshold: slot(17),
            resize_down_threshold: slot(18),
            buffer_size: slot(19),
            buffer_initial_size: slot(20),
            buffer_optimal_size: slot(21),
            key_frame_mode: match slot(22) {
                Some(1) => Some(KeyFrameMode::Disabled),
                Some(2) => Some(KeyFrameMode::Auto),
                _ => None,
            },
            key_frame_min_distance: slot(23),
            key_frame_max_distance: slot(24),
            auto_alt_ref: slot(25),
            alt_ref_max_frames: slot(26),
            alt_ref_strength: slot(27),
            alt_ref_type: slot(28),
            two_pass_vbr_bias_pct: slot(30),
            two_pass_vbr_min_section_pct: slot(31),
            two_pass_vbr_max_section_pct: slot(32),
        }
    }

    fn apply(&self, config: &mut EncoderConfig) {
        fn set(name: &'static str, field: &mut u32, value: Option<u32>) {
            if let Some(value) = value {
                trace!(name, value, "overriding encoder setting");
                *field = value;
            }
        }

        set("threads", &mut config.threads, self.threads);
        set("error_resilient", &mut config.error_resilient, self.error_resilient);
        set("drop_frame_threshold", &mut config.drop_frame_threshold, self.drop_frame_threshold);
        if let Some(mode) = self.rate_control {
            config.rate_control = mode;
        }
        set("lag_in_frames", &mut config.lag_in_frames, self.lag_in_frames);
        set("min_quantizer", &mut config.min_quantizer, self.min_quantizer);
        set("max_quantizer", &mut config.max_quantizer, self.max_quantizer);
        set("undershoot_pct", &mut config.undershoot_pct, self.undershoot_pct);
        set("overshoot_pct", &mut config.overshoot_pct, self.overshoot_pct);
        set("resize_allowed", &mut config.resize_allowed, self.resize_allowed);
        set("resize_up_threshold", &mut config.resize_up_threshold, self.resize_up_threshold);
        set("resize_down_threshold", &mut config.resize_down_threshold, self.resize_down_threshold);
        set("buffer_size", &mut config.buffer_size, self.buffer_size);
        set("buffer_initial_size", &mut config.buffer_initial_size, self.buffer_initial_size);
        set("buffer_optimal_size", &mut config.buffer_optimal_size, self.buffer_optimal_size);
        if let Some(mode) = self.key_frame_mode {
            config.key_frame_mode = mode;
        }
        set("key_frame_min_distance", &mut config.key_frame_min_distance, self.key_frame_min_distance);
        set("key_frame_max_distance", &mut config.key_frame_max_distance, self.key_frame_max_distance);
        set("two_pass_vbr_bias_pct", &mut config.two_pass_vbr_bias_pct, self.two_pass_vbr_bias_pct);
        set(
            "two_pass_vbr_min_section_pct",
            &mut config.two_pass_vbr_min_section_pct,
            self.two_pass_vbr_min_section_pct,
        );
        set(
            "two_pass_vbr_max_section_pct",
            &mut config.two_pass_vbr_max_section_pct,
            self.two_pass_vbr_max_section_pct,
        );
    }

    /// The post-init controls that were set, in the order they should be applied.
    pub fn post_init_controls(&self) -> Vec<EncoderControl> {
        [
            self.cpu_used.map(EncoderControl::CpuUsed),
            self.noise_sensitivity.map(EncoderControl::NoiseSensitivity),
            self.sharpness.map(EncoderControl::Sharpness),
            self.static_threshold.map(EncoderControl::StaticThreshold),
            self.auto_alt_ref.map(EncoderControl::AutoAltRef),
            self.alt_ref_max_frames.map(EncoderControl::AltRefMaxFrames),
            self.alt_ref_strength.map(EncoderControl::AltRefStrength),
            self.alt_ref_type.map(EncoderControl::AltRefType),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Properties the host fixes for the lifetime of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionOptions {
    pub width: u32,
    pub height: u32,
    /// Size of the buffer each encoded frame is written into. Encoded frames must be strictly
    /// smaller than this.
    pub max_encoded_size: usize,
    /// Bytes per second. Takes precedence over `quality` when set and non-zero.
    pub average_data_rate: Option<u32>,
    pub quality: u16,
    pub max_key_frame_interval: Option<u32>,
    pub expected_frame_rate: Option<f64>,
    pub settings: EncoderSettings,
}

impl SessionOptions {
    /// Options for a frame size with everything else left to defaults. The output buffer is
    /// sized to fit a raw 4:2:2 frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            max_encoded_size: width as usize * height as usize * 2,
            average_data_rate: None,
            quality: NORMAL_QUALITY,
            max_key_frame_interval: None,
            expected_frame_rate: None,
            settings: EncoderSettings::default(),
        }
    }

    /// Target bitrate in kbit/s.
    pub fn target_bitrate(&self) -> u32 {
        match self.average_data_rate.filter(|&rate| rate != 0) {
            Some(rate) => (rate as u64 * 8 / 1000) as u32,
            None => {
                // 10 to 1033 kbit/s for 640x480
                let quality = self.quality.min(MAX_QUALITY) as f64;
                let area = self.width as f64 * self.height as f64;
                (area * quality / REFERENCE_FRAME_AREA + 10.0) as u32
            }
        }
    }

    pub fn key_frame_max_distance(&self) -> u32 {
        self.max_key_frame_interval
            .filter(|&interval| interval != 0)
            .unwrap_or(DEFAULT_KEY_FRAME_MAX_DISTANCE)
    }

    /// The timebase implied by the expected frame rate, or `None` to keep the encoder's default.
    pub fn timebase(&self) -> Option<Timebase> {
        let fps = self.expected_frame_rate.filter(|&fps| fps > 0.0)?;
        if fps > 29.965 && fps < 29.975 {
            Some(Timebase::NTSC)
        } else {
            // millisecond precision, which is what the container uses anyway
            Some(Timebase {
                num: 1000,
                den: (fps * 1000.0) as u32,
            })
        }
    }
}
