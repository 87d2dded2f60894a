//! # Delay Voice Engine
//!
//! The engine owns the delay store and the parameter smoothers and turns
//! one block of input into one block of output. It is the part of the
//! plugin that runs on the real-time thread.
//!
//! ## Per-Sample Algorithm
//!
//! For every sample, across all channels:
//!
//! 1. **Smooth** every parameter one step toward its current target
//! 2. **Convert** the delay time to samples and clamp it to the buffer
//! 3. **Read** the delayed sample `d` from the store
//! 4. **Saturate** `input + feedback * d` through the soft clipper
//! 5. **Write** the result into the store at the cursor
//! 6. **Mix** `input * dry + d * wet`, then apply the output gain
//! 7. **Advance** the cursor once all channels are done
//!
//! ## Lifecycle
//!
//! ```text
//!                 prepare()              process_block()
//!  Unprepared ───────────────► Prepared ───────────────► Processing
//!      ▲                          ▲  prepare()               │
//!      │                          └──────────────────────────┤
//!      └──────────────────── release_resources() ────────────┘
//! ```

pub mod parameters;

use std::sync::Arc;

use nih_plug::{nih_debug_assert, nih_log};

use crate::config::{DelaySettings, EngineConfig, Interpolation, ProcessingMode};
use crate::dsp::delay_store::DelayStore;
use crate::dsp::saturation::soft_clip;
use crate::dsp::smoother::LinearSmoother;
use crate::error::Result;
use parameters::{level_to_gain, DelayParameters, ParamId, ParamSpec, PARAMETER_LAYOUT};

/// Shortest delay in sample-accurate mode. Reading happens before writing,
/// so zero samples would read the oldest slot instead of the input.
const MIN_DELAY_SAMPLES: f32 = 1.0;

/// The host-facing contract of an audio processor.
pub trait AudioProcessor {
    /// (Re)configure for a sample rate, block size and channel count.
    /// Everything the processor will need is allocated here.
    fn prepare(&mut self, config: EngineConfig) -> Result<()>;

    /// Process one block in place, one slice per channel.
    ///
    /// # Panics
    ///
    /// If called before [`prepare()`](Self::prepare), with a different
    /// channel count, or with a block longer than the prepared maximum.
    fn process_block(&mut self, channels: &mut [&mut [f32]]);

    /// Give up the audio buffers. `prepare()` must be called again.
    fn release_resources(&mut self);

    /// The parameters this processor reads.
    fn parameter_layout(&self) -> &'static [ParamSpec];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unprepared,
    Prepared,
    Processing,
}

/// The delay effect's DSP core.
pub struct DelayEngine {
    params: Arc<DelayParameters>,
    settings: DelaySettings,
    state: EngineState,
    sample_rate: f32,
    max_block_size: usize,
    channel_count: usize,
    store: DelayStore,

    delay_time: LinearSmoother,
    feedback: LinearSmoother,
    wet_gain: LinearSmoother,
    dry_gain: LinearSmoother,
    output_gain: LinearSmoother,
}

impl DelayEngine {
    pub fn new(params: Arc<DelayParameters>, settings: DelaySettings) -> Self {
        Self {
            params,
            settings,
            state: EngineState::Unprepared,
            sample_rate: 0.0,
            max_block_size: 0,
            channel_count: 0,
            store: DelayStore::new(),
            delay_time: LinearSmoother::default(),
            feedback: LinearSmoother::default(),
            wet_gain: LinearSmoother::default(),
            dry_gain: LinearSmoother::default(),
            output_gain: LinearSmoother::default(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The shared parameter store, for display and for the control side.
    pub fn params(&self) -> &Arc<DelayParameters> {
        &self.params
    }

    /// Ring buffer length per channel, in samples.
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// The delay time the read head is at right now, which lags the
    /// parameter while a ramp is running.
    pub fn current_delay_ms(&self) -> f32 {
        self.delay_time.current()
    }

    /// Silence the buffers and snap every smoother to its target. Called
    /// when the host stops playback.
    pub fn reset(&mut self) {
        self.store.clear();
        self.seed_smoothers();
    }

    /// How long the output keeps ringing after the input stops, in samples.
    ///
    /// Each echo is `feedback` times the previous one, so it takes
    /// `N = log(0.001) / log(feedback)` repeats to fall below -60 dB. The
    /// tail is the first echo plus those `N` repeats. `None` means the tail
    /// never ends (feedback at 100%).
    pub fn tail_samples(&self) -> Option<u32> {
        let feedback = self.params.get(ParamId::Feedback);
        let delay_samples = ms_to_samples(self.params.get(ParamId::DelayTime), self.sample_rate);

        if feedback >= 1.0 {
            None
        } else if feedback > 0.001 {
            let repeats = -3.0 / feedback.log10();
            Some(((repeats + 1.0) * delay_samples).ceil() as u32)
        } else {
            Some(delay_samples.ceil() as u32)
        }
    }

    fn seed_smoothers(&mut self) {
        let ramp_ms = self.settings.smoothing_ms;
        let params = &self.params;
        let targets = [
            (&mut self.delay_time, params.get(ParamId::DelayTime)),
            (&mut self.feedback, params.get(ParamId::Feedback)),
            (&mut self.wet_gain, level_to_gain(params.get(ParamId::WetLevel))),
            (&mut self.dry_gain, level_to_gain(params.get(ParamId::DryLevel))),
            (&mut self.output_gain, level_to_gain(params.get(ParamId::OutputGain))),
        ];
        for (smoother, value) in targets {
            smoother.set_ramp_time(self.sample_rate, ramp_ms);
            smoother.reset(value);
        }
    }

    fn process_sample_accurate(&mut self, channels: &mut [&mut [f32]], num_samples: usize) {
        let params = &self.params;
        self.delay_time.set_target(params.get(ParamId::DelayTime));
        self.feedback.set_target(params.get(ParamId::Feedback));
        self.wet_gain.set_target(level_to_gain(params.get(ParamId::WetLevel)));
        self.dry_gain.set_target(level_to_gain(params.get(ParamId::DryLevel)));
        self.output_gain.set_target(level_to_gain(params.get(ParamId::OutputGain)));

        let max_delay = (self.store.capacity() - 1) as f32;

        for i in 0..num_samples {
            // Every parameter moves one ramp step per sample, shared by all
            // channels.
            let delay_ms = self.delay_time.next();
            let feedback = self.feedback.next();
            let wet = self.wet_gain.next();
            let dry = self.dry_gain.next();
            let output_gain = self.output_gain.next();

            // At least one sample: the read below happens before this
            // sample's write.
            let delay_samples =
                ms_to_samples(delay_ms, self.sample_rate).clamp(MIN_DELAY_SAMPLES, max_delay);

            for (channel, samples) in channels.iter_mut().enumerate() {
                let input = samples[i];

                // 1. Read the echo from `delay_samples` ago.
                let delayed = match self.settings.interpolation {
                    Interpolation::Linear => self.store.read_interpolated(channel, delay_samples),
                    Interpolation::Nearest => {
                        self.store.read_sample(channel, delay_samples.round() as usize)
                    }
                };

                // 2. Feed part of the echo back in with the new input,
                //    soft-clipped so 100% feedback can't run away.
                let stored = soft_clip(input + feedback * delayed);
                nih_debug_assert!(stored.is_finite());

                // 3. Write at the cursor, where a later read will find it.
                self.store.write_sample(channel, stored);

                // 4. Mix dry and wet, then apply the output level.
                samples[i] = (input * dry + delayed * wet) * output_gain;
            }

            // 5. All channels share one cursor, so move it once per sample.
            self.store.advance(1);
        }
    }

    /// One integer delay per block and no feedback: write the block, keep the
    /// dry signal in place and add the delayed block on top.
    fn process_block_granular(&mut self, channels: &mut [&mut [f32]], num_samples: usize) {
        let delay_ms = self.params.get(ParamId::DelayTime);
        let wet = level_to_gain(self.params.get(ParamId::WetLevel));
        let dry = level_to_gain(self.params.get(ParamId::DryLevel));
        let output_gain = level_to_gain(self.params.get(ParamId::OutputGain));

        let max_delay = self.store.capacity() - 1;
        let delay_samples = (ms_to_samples(delay_ms, self.sample_rate).round() as usize).min(max_delay);

        for (channel, samples) in channels.iter_mut().enumerate() {
            let samples = &mut samples[..num_samples];

            self.store.write(channel, samples);
            for sample in samples.iter_mut() {
                *sample *= dry;
            }
            self.store.add_from(channel, delay_samples, samples, wet);
            for sample in samples.iter_mut() {
                *sample *= output_gain;
            }
        }

        self.store.advance(num_samples);
        self.delay_time.reset(delay_ms);
    }
}

impl AudioProcessor for DelayEngine {
    fn prepare(&mut self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        self.settings.validate()?;

        let capacity = config.delay_capacity(&self.settings);
        self.store.configure(config.channel_count, capacity)?;

        self.sample_rate = config.sample_rate;
        self.max_block_size = config.max_block_size;
        self.channel_count = config.channel_count;
        self.seed_smoothers();
        self.state = EngineState::Prepared;

        nih_log!(
            "delay engine prepared: {} Hz, {} channels, max block {}, {} samples of history",
            config.sample_rate,
            config.channel_count,
            config.max_block_size,
            capacity
        );
        Ok(())
    }

    fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        assert!(
            self.state != EngineState::Unprepared,
            "process_block() called before prepare()"
        );
        assert_eq!(
            channels.len(),
            self.channel_count,
            "channel count differs from the one passed to prepare()"
        );

        let num_samples = channels.first().map_or(0, |samples| samples.len());
        assert!(
            num_samples <= self.max_block_size,
            "block of {num_samples} samples exceeds the prepared maximum of {}",
            self.max_block_size
        );
        assert!(
            channels.iter().all(|samples| samples.len() == num_samples),
            "channels have different lengths"
        );

        match self.settings.mode {
            ProcessingMode::SampleAccurate => self.process_sample_accurate(channels, num_samples),
            ProcessingMode::BlockGranular => self.process_block_granular(channels, num_samples),
        }
        self.state = EngineState::Processing;
    }

    fn release_resources(&mut self) {
        self.store.release();
        self.state = EngineState::Unprepared;
        nih_log!("delay engine released");
    }

    fn parameter_layout(&self) -> &'static [ParamSpec] {
        &PARAMETER_LAYOUT
    }
}

/// `samples = ms * sample_rate / 1000`. At 44.1 kHz, 400 ms is 17640 samples.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
