use crate::{frame_time, CodecInitSnafu, EncoderConfig, EncoderControl, Pass, Result, SessionOptions, Timebase, VpxEncoder};
use snafu::ResultExt;
use tracing::{debug, error, info, warn};

/// Owns the encoder instance and everything that's fixed for the duration of a pass.
///
/// The encoder is initialized lazily, on the first frame of each pass, and closed when the pass
/// changes or the controller is dropped.
pub struct PassController<E: VpxEncoder> {
    codec: E,
    options: SessionOptions,
    pass: Pass,
    frame_count: u64,
    config: Option<EncoderConfig>,
}

impl<E: VpxEncoder> PassController<E> {
    pub fn new(codec: E, options: SessionOptions) -> Self {
        Self {
            codec,
            options,
            pass: Pass::OnePass,
            frame_count: 0,
            config: None,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// The configuration the encoder was initialized with during this pass.
    pub fn config(&self) -> Option<&EncoderConfig> {
        self.config.as_ref()
    }

    /// The encoder's timebase, or the default one if the encoder isn't initialized yet.
    pub fn timebase(&self) -> Timebase {
        self.config.as_ref().map(|c| c.timebase).unwrap_or_default()
    }

    /// Frames (and flushes) sent to the encoder so far in this pass.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The time unit for the next submission.
    pub fn frame_time(&self) -> i64 {
        frame_time(self.frame_count)
    }

    pub fn advance_frame_counter(&mut self) {
        self.frame_count += 1;
    }

    pub fn codec(&self) -> &E {
        &self.codec
    }

    pub fn codec_mut(&mut self) -> &mut E {
        &mut self.codec
    }

    /// Initializes the encoder if this pass hasn't done so yet. `stats` is only handed to the
    /// encoder for the last pass of a two pass encode.
    pub fn ensure_initialized(&mut self, stats: &[u8]) -> Result<()> {
        if self.config.is_some() {
            return Ok(());
        }

        let config = EncoderConfig::derive(&self.options, self.pass);
        info!(pass = %self.pass, ?config, "initializing encoder");
        let stats_in = match self.pass {
            Pass::LastPass => Some(stats),
            Pass::OnePass | Pass::FirstPass => None,
        };
        let pass = self.pass;
        let result = self.codec.init(&config, stats_in);
        result.with_context(|e| {
            let detail = self.codec.error_detail();
            error!(%pass, error = %e, detail = detail.as_deref(), "failed to initialize encoder");
            CodecInitSnafu { pass, detail }
        })?;
        self.config = Some(config);

        for control in self.options.settings.post_init_controls() {
            self.apply_control(control);
        }
        Ok(())
    }

    fn apply_control(&mut self, control: EncoderControl) {
        debug!(?control, "setting encoder control");
        if let Err(e) = self.codec.control(control) {
            let detail = self.codec.error_detail();
            warn!(?control, error = %e, detail = detail.as_deref(), "ignoring failed encoder control");
        }
    }

    /// Closes the current encoder instance, if any, and starts counting frames for a new pass.
    pub fn begin_pass(&mut self, pass: Pass) {
        self.close();
        info!(%pass, "beginning pass");
        self.pass = pass;
        self.frame_count = 0;
    }

    pub fn close(&mut self) {
        if self.config.take().is_some() {
            debug!(pass = %self.pass, frames = self.frame_count, "closing encoder");
            self.codec.close();
        }
    }
}

impl<E: VpxEncoder> Drop for PassController<E> {
    fn drop(&mut self) {
        self.close();
    }
}
