//! # Host Parameters
//!
//! These are the knobs the DAW sees, saves with the session and automates.
//! nih-plug owns them; the DSP core never reads them directly. Instead every
//! `FloatParam` carries a callback that copies each new value into the
//! engine's lock-free [`DelayParameters`] store. Whatever thread the host
//! changes a value on (GUI, automation, preset recall), the audio thread
//! only ever sees a single atomic load.
//!
//! IDs (`#[id = "..."]`) are saved in presets and sessions. Never change
//! them once released.

use std::sync::Arc;

use nih_plug::prelude::*;

use crate::engine::parameters::{DelayParameters, ParamId};

#[derive(Params)]
pub struct PluginParams {
    /// Time between the input and the first echo. Skewed so the short
    /// slapback range gets more knob travel.
    #[id = "time"]
    pub delay_time: FloatParam,

    /// Share of each echo fed back into the delay line. 100% repeats forever,
    /// held in check by the saturation stage.
    #[id = "fdbk"]
    pub feedback: FloatParam,

    #[id = "wet"]
    pub wet_level: FloatParam,

    #[id = "dry"]
    pub dry_level: FloatParam,

    /// Master output level, after the wet/dry mix.
    #[id = "gain"]
    pub output_gain: FloatParam,
}

impl PluginParams {
    pub fn new(shared: &Arc<DelayParameters>) -> Self {
        Self {
            delay_time: float_param(shared, ParamId::DelayTime, skewed(ParamId::DelayTime, -1.0))
                .with_step_size(0.1),

            feedback: float_param(shared, ParamId::Feedback, linear(ParamId::Feedback))
                .with_value_to_string(formatters::v2s_f32_percentage(1))
                .with_string_to_value(formatters::s2v_f32_percentage()),

            wet_level: level_param(shared, ParamId::WetLevel),
            dry_level: level_param(shared, ParamId::DryLevel),
            output_gain: level_param(shared, ParamId::OutputGain),
        }
    }

    /// Copy every current value into `shared`. Used after the host restores
    /// a session, in case it bypassed the callbacks.
    pub fn publish(&self, shared: &DelayParameters) {
        shared.set(ParamId::DelayTime, self.delay_time.value());
        shared.set(ParamId::Feedback, self.feedback.value());
        shared.set(ParamId::WetLevel, self.wet_level.value());
        shared.set(ParamId::DryLevel, self.dry_level.value());
        shared.set(ParamId::OutputGain, self.output_gain.value());
    }
}

fn float_param(shared: &Arc<DelayParameters>, id: ParamId, range: FloatRange) -> FloatParam {
    let spec = id.spec();
    let shared = shared.clone();

    FloatParam::new(spec.label, spec.default, range)
        .with_unit(spec.unit)
        .with_callback(Arc::new(move |value| shared.set(id, value)))
}

/// Levels show "-inf" at the bottom of the range, which is what the core
/// does with that value.
fn level_param(shared: &Arc<DelayParameters>, id: ParamId) -> FloatParam {
    let min = id.spec().min;

    float_param(shared, id, linear(id))
        .with_step_size(0.1)
        .with_value_to_string(Arc::new(move |value| {
            if value <= min {
                String::from("-inf")
            } else {
                format!("{value:.1}")
            }
        }))
}

fn linear(id: ParamId) -> FloatRange {
    let spec = id.spec();
    FloatRange::Linear {
        min: spec.min,
        max: spec.max,
    }
}

fn skewed(id: ParamId, skew: f32) -> FloatRange {
    let spec = id.spec();
    FloatRange::Skewed {
        min: spec.min,
        max: spec.max,
        factor: FloatRange::skew_factor(skew),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_core() {
        let shared = Arc::new(DelayParameters::default());
        let params = PluginParams::new(&shared);

        assert_eq!(params.delay_time.value(), shared.get(ParamId::DelayTime));
        assert_eq!(params.feedback.value(), shared.get(ParamId::Feedback));
        assert_eq!(params.wet_level.value(), shared.get(ParamId::WetLevel));
        assert_eq!(params.dry_level.value(), shared.get(ParamId::DryLevel));
        assert_eq!(params.output_gain.value(), shared.get(ParamId::OutputGain));
    }

    #[test]
    fn test_level_display() {
        let shared = Arc::new(DelayParameters::default());
        let params = PluginParams::new(&shared);

        assert_eq!(params.wet_level.normalized_value_to_string(0.0, false), "-inf");
        assert_eq!(params.wet_level.normalized_value_to_string(1.0, false), "0.0");
    }

    #[test]
    fn test_publish_copies_values() {
        let shared = Arc::new(DelayParameters::default());
        let params = PluginParams::new(&shared);
        shared.set(ParamId::Feedback, 0.9);

        params.publish(&shared);
        assert_eq!(shared.get(ParamId::Feedback), 0.5);
    }
}
