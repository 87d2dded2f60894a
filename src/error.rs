//! Error types for the delay core.
//!
//! Only configuration problems are errors. They surface from `prepare()`,
//! before any audio runs. Everything that can go wrong on the audio thread
//! is either clamped (parameter ranges, delay beyond capacity) or a
//! programming error that panics (processing before `prepare()`).

use thiserror::Error;

/// Result type for delay core operations.
pub type Result<T, E = DelayError> = std::result::Result<T, E>;

/// Errors reported when the host hands us a configuration we can't run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DelayError {
    /// Sample rate is zero, negative or not a number.
    #[error("invalid sample rate: {rate} Hz")]
    InvalidSampleRate {
        /// The rejected sample rate.
        rate: f32,
    },

    /// The host announced a maximum block size of zero samples.
    #[error("invalid maximum block size: {size} samples")]
    InvalidBlockSize {
        /// The rejected block size.
        size: usize,
    },

    /// Zero channels, or a layout without a main input.
    #[error("invalid channel count: {count}")]
    InvalidChannelCount {
        /// The rejected channel count.
        count: usize,
    },

    /// The delay store can't hold zero samples.
    #[error("invalid delay store capacity: {capacity} samples")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// A `DelaySettings` field is out of range.
    #[error("invalid setting '{name}': {value}")]
    InvalidSetting {
        /// Field name.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },
}
