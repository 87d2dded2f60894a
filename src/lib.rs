//! # Loveless Delay II: A Feedback Delay for AU/VST3/CLAP
//!
//! A delay effect built with [nih-plug](https://github.com/robbert-vdh/nih-plug).
//! The DSP core (`engine` + `dsp`) knows nothing about plugin formats: it
//! is prepared with a sample rate and block size, reads five atomic
//! parameters, and processes slices of `f32` in place. This file is the thin
//! layer that plugs it into a host.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬─────────────────────────────────────── × dry ────┐
//!         │                                                  │
//!         │    ┌───────────────────────────────────────┐     │
//!         │    │            FEEDBACK LOOP              │     │
//!         └──►(+)──► [Soft Clip] ──► [Delay Store] ────┤     │
//!              ▲                      (ring buffer,    │     │
//!              │                       smoothed read)  │     │
//!              │                            │          │     │
//!              └──────── × feedback ────────┤          │     │
//!                                           │                │
//!                                           └──── × wet ───►(+)──► × output ──► Output
//! ```

pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
mod params;

use std::num::NonZeroU32;
use std::sync::Arc;

use nih_plug::prelude::*;

pub use config::{DelaySettings, EngineConfig, Interpolation, ProcessingMode};
pub use engine::parameters::{DelayParameters, ParamId, ParamSpec, ParameterSnapshot};
pub use engine::{AudioProcessor, DelayEngine, EngineState};
pub use error::{DelayError, Result};
use params::PluginParams;

/// The plugin: host parameters on one side, the DSP engine on the other.
///
/// `params` is shared with the host and read from any thread. `engine` is
/// owned by the audio thread and only touched from `initialize()`,
/// `reset()` and `process()`. The two meet in the engine's atomic
/// parameter store, which the host parameters write into.
struct LovelessDelay {
    params: Arc<PluginParams>,
    engine: DelayEngine,
}

impl Default for LovelessDelay {
    fn default() -> Self {
        let shared = Arc::new(DelayParameters::default());
        Self {
            params: Arc::new(PluginParams::new(&shared)),
            engine: DelayEngine::new(shared, DelaySettings::default()),
        }
    }
}

impl Plugin for LovelessDelay {
    const NAME: &'static str = "Loveless Delay II";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo first, since that's what most DAW tracks are.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Automation splits the buffer at each change. The engine picks up the
    // new value at the next sub-block and ramps to it.
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Called on load and whenever the sample rate, block size or layout
    /// changes. All audio buffers are allocated here.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        // The host may have restored a session before we got here.
        self.params.publish(self.engine.params());

        let channel_count = audio_io_layout
            .main_input_channels
            .map_or(0, |c| c.get() as usize);
        let config = EngineConfig::new(
            buffer_config.sample_rate,
            buffer_config.max_buffer_size as usize,
            channel_count,
        );

        match self.engine.prepare(config) {
            Ok(()) => true,
            Err(err) => {
                nih_error!("cannot initialize delay: {err}");
                false
            }
        }
    }

    /// Playback stopped or the plugin was bypassed. Drop the old echoes so
    /// they don't burst out on the next play.
    fn reset(&mut self) {
        self.engine.reset();
    }

    fn deactivate(&mut self) {
        self.engine.release_resources();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.engine.process_block(buffer.as_slice());

        // Keep the host calling process() while echoes are still audible.
        match self.engine.tail_samples() {
            Some(samples) => ProcessStatus::Tail(samples),
            None => ProcessStatus::KeepAlive,
        }
    }
}

impl ClapPlugin for LovelessDelay {
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-delay-v2";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A feedback delay with smoothed delay time and soft-clipped repeats");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for LovelessDelay {
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssDelay__v002";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

nih_export_clap!(LovelessDelay);
nih_export_vst3!(LovelessDelay);

// AUv2 entry point for Logic Pro, wrapping the CLAP export.
clap_wrapper::export_auv2!();
