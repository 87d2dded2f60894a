//! # Engine Configuration
//!
//! Two kinds of configuration reach the engine:
//!
//! - [`EngineConfig`] comes from the host: sample rate, maximum block size
//!   and channel count. It can change every time the host re-initializes us.
//! - [`DelaySettings`] is chosen by whoever builds the engine: processing
//!   mode, interpolation, smoothing time and how much audio history to keep.
//!
//! ## Sizing the Ring Buffer
//!
//! The buffer must always hold more history than the longest delay we can
//! be asked for. Rather than hard-coding "two seconds", the capacity is
//! derived from the parameter range:
//!
//! ```text
//! capacity = ceil((max_delay_ms + headroom_ms) * sample_rate / 1000) + max_block_size
//! ```
//!
//! The extra block covers the block-granular mode, which writes a whole
//! block before reading one back.

use crate::error::{DelayError, Result};

/// Upper end of the delay time parameter, in milliseconds.
pub const MAX_DELAY_MS: f32 = 1000.0;

/// Extra history kept beyond [`MAX_DELAY_MS`].
pub const DELAY_HEADROOM_MS: f32 = 100.0;

/// Default ramp time for parameter changes.
pub const DEFAULT_SMOOTHING_MS: f32 = 50.0;

/// What the host tells us in `prepare()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Sample rate in Hz (e.g. 44100.0 or 48000.0).
    pub sample_rate: f32,
    /// Largest block the host will ever pass to `process_block()`.
    pub max_block_size: usize,
    /// Number of audio channels processed in place.
    pub channel_count: usize,
}

impl EngineConfig {
    pub fn new(sample_rate: f32, max_block_size: usize, channel_count: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            channel_count,
        }
    }

    /// Reject configurations the engine can't run with.
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(DelayError::InvalidSampleRate {
                rate: self.sample_rate,
            });
        }
        if self.max_block_size == 0 {
            return Err(DelayError::InvalidBlockSize {
                size: self.max_block_size,
            });
        }
        if self.channel_count == 0 {
            return Err(DelayError::InvalidChannelCount {
                count: self.channel_count,
            });
        }
        Ok(())
    }

    /// Ring buffer length in samples for these settings.
    pub fn delay_capacity(&self, settings: &DelaySettings) -> usize {
        let history_ms = settings.max_delay_ms + settings.headroom_ms;
        let history = (history_ms * self.sample_rate / 1000.0).ceil() as usize;
        history + self.max_block_size
    }
}

/// How delay time maps onto the ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Per-sample read/write with feedback and smoothed parameters.
    #[default]
    SampleAccurate,
    /// One integer delay per block, no feedback, unsmoothed parameters.
    /// Kept as a reference for testing.
    BlockGranular,
}

/// How fractional delay positions are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Blend the two neighbouring samples.
    #[default]
    Linear,
    /// Round to the closest sample. Cheaper, but a moving delay time steps
    /// audibly ("zipper noise").
    Nearest,
}

/// Engine-side settings that don't come from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelaySettings {
    pub mode: ProcessingMode,
    pub interpolation: Interpolation,
    /// Ramp duration for every smoothed parameter. `0.0` disables smoothing.
    pub smoothing_ms: f32,
    /// Longest delay the buffer must support.
    pub max_delay_ms: f32,
    /// History kept beyond `max_delay_ms`.
    pub headroom_ms: f32,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::default(),
            interpolation: Interpolation::default(),
            smoothing_ms: DEFAULT_SMOOTHING_MS,
            max_delay_ms: MAX_DELAY_MS,
            headroom_ms: DELAY_HEADROOM_MS,
        }
    }
}

impl DelaySettings {
    pub fn validate(&self) -> Result<()> {
        let check = |name: &'static str, value: f32, ok: bool| {
            if value.is_finite() && ok {
                Ok(())
            } else {
                Err(DelayError::InvalidSetting { name, value })
            }
        };

        check("smoothing_ms", self.smoothing_ms, self.smoothing_ms >= 0.0)?;
        check("max_delay_ms", self.max_delay_ms, self.max_delay_ms > 0.0)?;
        check("headroom_ms", self.headroom_ms, self.headroom_ms >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_exceeds_max_delay() {
        let config = EngineConfig::new(44100.0, 512, 2);
        let settings = DelaySettings::default();
        let capacity = config.delay_capacity(&settings);

        // 1.1 s of history plus one block.
        assert_eq!(capacity, 48510 + 512);
        assert!(capacity as f32 > MAX_DELAY_MS * 44100.0 / 1000.0);
    }

    #[test]
    fn test_rejects_bad_host_config() {
        assert_eq!(
            EngineConfig::new(0.0, 512, 2).validate(),
            Err(DelayError::InvalidSampleRate { rate: 0.0 })
        );
        assert!(matches!(
            EngineConfig::new(f32::NAN, 512, 2).validate(),
            Err(DelayError::InvalidSampleRate { .. })
        ));
        assert_eq!(
            EngineConfig::new(48000.0, 0, 2).validate(),
            Err(DelayError::InvalidBlockSize { size: 0 })
        );
        assert_eq!(
            EngineConfig::new(48000.0, 512, 0).validate(),
            Err(DelayError::InvalidChannelCount { count: 0 })
        );
        assert!(EngineConfig::new(48000.0, 512, 2).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_settings() {
        let settings = DelaySettings {
            smoothing_ms: -1.0,
            ..DelaySettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(DelayError::InvalidSetting {
                name: "smoothing_ms",
                value: -1.0
            })
        );

        let settings = DelaySettings {
            max_delay_ms: 0.0,
            ..DelaySettings::default()
        };
        assert!(settings.validate().is_err());

        assert!(DelaySettings::default().validate().is_ok());
    }
}
