//! # Lock-Free Parameter Store
//!
//! The UI or host automation writes parameters on one thread while the
//! audio thread reads them on another. A mutex is off the table: if the
//! audio thread ever waits on a lock held by the UI, the block misses its
//! deadline and the user hears a dropout.
//!
//! Instead every parameter is one `AtomicU32` holding the bit pattern of an
//! `f32` (`f32::to_bits` / `f32::from_bits`). Each value is always read
//! whole. No parameter is ever composite, so per-value atomicity is enough
//! for the audio thread.
//!
//! ## Snapshots
//!
//! Saving a session wants all five values from the *same instant*. For that
//! the store carries a sequence counter (a seqlock):
//!
//! - [`set()`] stores one value and bumps the sequence by 2. It never waits,
//!   so any thread may call it, the audio thread included.
//! - [`restore()`] claims the sequence by moving it from even to odd with a
//!   compare-and-swap, writes all values, then makes it even again. Two
//!   restores racing on different threads take turns.
//! - [`snapshot()`] retries until it has read all values under one
//!   unchanged even sequence number.
//!
//! Readers never block writers. The audio thread only uses [`get()`] and
//! [`set()`].
//!
//! [`get()`]: DelayParameters::get
//! [`set()`]: DelayParameters::set
//! [`restore()`]: DelayParameters::restore
//! [`snapshot()`]: DelayParameters::snapshot

use std::sync::atomic::{fence, AtomicU32, Ordering};

use nih_plug::util;
use serde::{Deserialize, Serialize};

use crate::config::MAX_DELAY_MS;

/// Bottom of the level ranges. Treated as silence rather than -60 dB.
pub const MIN_LEVEL_DB: f32 = -60.0;

/// The five user-facing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    DelayTime,
    Feedback,
    WetLevel,
    DryLevel,
    OutputGain,
}

impl ParamId {
    pub const ALL: [ParamId; 5] = [
        ParamId::DelayTime,
        ParamId::Feedback,
        ParamId::WetLevel,
        ParamId::DryLevel,
        ParamId::OutputGain,
    ];

    /// Stable name used by the host side to address a parameter.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PARAMETER_LAYOUT
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.id)
    }

    pub fn spec(self) -> &'static ParamSpec {
        &PARAMETER_LAYOUT[self.index()]
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Range, default and labels of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub id: ParamId,
    pub name: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamSpec {
    /// Clamp into range. Non-finite input falls back to the default, since
    /// the audio thread has no way to report a bad value.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.default
        }
    }
}

/// All parameters, indexed by `ParamId as usize`.
pub static PARAMETER_LAYOUT: [ParamSpec; 5] = [
    ParamSpec {
        id: ParamId::DelayTime,
        name: "TIME",
        label: "Delay Time",
        unit: " ms",
        min: 0.0,
        max: MAX_DELAY_MS,
        default: 400.0,
    },
    ParamSpec {
        id: ParamId::Feedback,
        name: "FEEDBACK",
        label: "Feedback",
        unit: "%",
        min: 0.0,
        max: 1.0,
        default: 0.5,
    },
    ParamSpec {
        id: ParamId::WetLevel,
        name: "WET",
        label: "Wet",
        unit: " dB",
        min: MIN_LEVEL_DB,
        max: 0.0,
        default: -6.0,
    },
    ParamSpec {
        id: ParamId::DryLevel,
        name: "DRY",
        label: "Dry",
        unit: " dB",
        min: MIN_LEVEL_DB,
        max: 0.0,
        default: -6.0,
    },
    ParamSpec {
        id: ParamId::OutputGain,
        name: "OUTPUT_GAIN",
        label: "Master Gain",
        unit: " dB",
        min: MIN_LEVEL_DB,
        max: 0.0,
        default: -6.0,
    },
];

/// Convert a level in dB to linear gain: `10^(db / 20)`.
///
/// Except at the bottom of the range: [`MIN_LEVEL_DB`] and below is a fader
/// pulled all the way down and maps to 0, not `10^(-3)`.
#[inline]
pub fn level_to_gain(db: f32) -> f32 {
    if db <= MIN_LEVEL_DB {
        0.0
    } else {
        util::db_to_gain(db)
    }
}

/// One consistent set of parameter values, for session save/restore.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSnapshot {
    pub delay_time_ms: f32,
    pub feedback: f32,
    pub wet_level_db: f32,
    pub dry_level_db: f32,
    pub output_gain_db: f32,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self::from_values(PARAMETER_LAYOUT.map(|spec| spec.default))
    }
}

impl ParameterSnapshot {
    pub fn get(&self, id: ParamId) -> f32 {
        self.values()[id.index()]
    }

    fn values(&self) -> [f32; 5] {
        [
            self.delay_time_ms,
            self.feedback,
            self.wet_level_db,
            self.dry_level_db,
            self.output_gain_db,
        ]
    }

    fn from_values(values: [f32; 5]) -> Self {
        let [delay_time_ms, feedback, wet_level_db, dry_level_db, output_gain_db] = values;
        Self {
            delay_time_ms,
            feedback,
            wet_level_db,
            dry_level_db,
            output_gain_db,
        }
    }
}

/// The shared, lock-free parameter values.
///
/// Held in an `Arc` by both the control side (which calls `set`) and the
/// engine (which calls `get` once per block).
#[derive(Debug)]
pub struct DelayParameters {
    values: [AtomicU32; 5],
    sequence: AtomicU32,
}

impl Default for DelayParameters {
    fn default() -> Self {
        Self::from_snapshot(&ParameterSnapshot::default())
    }
}

impl DelayParameters {
    pub fn from_snapshot(snapshot: &ParameterSnapshot) -> Self {
        let values = ParamId::ALL.map(|id| AtomicU32::new(id.spec().clamp(snapshot.get(id)).to_bits()));
        Self {
            values,
            sequence: AtomicU32::new(0),
        }
    }

    /// Current value of one parameter. Real-time safe.
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Store a new value, clamped into the parameter's range. Wait-free.
    pub fn set(&self, id: ParamId, value: f32) {
        let value = id.spec().clamp(value);
        self.values[id.index()].store(value.to_bits(), Ordering::Release);
        // Keeps the parity, so a restore in progress stays odd.
        self.sequence.fetch_add(2, Ordering::Release);
    }

    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        ParamId::from_name(name).map(|id| self.get(id))
    }

    /// Returns `false` if no parameter has that name.
    pub fn set_by_name(&self, name: &str, value: f32) -> bool {
        match ParamId::from_name(name) {
            Some(id) => {
                self.set(id, value);
                true
            }
            None => false,
        }
    }

    /// Read all values as of a single instant.
    pub fn snapshot(&self) -> ParameterSnapshot {
        loop {
            let before = self.sequence.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let values = ParamId::ALL.map(|id| self.get(id));

            fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) == before {
                return ParameterSnapshot::from_values(values);
            }
        }
    }

    /// Replace all values at once. Out-of-range values are clamped.
    ///
    /// Spins while another restore is in progress, so keep it off the audio
    /// thread.
    pub fn restore(&self, snapshot: &ParameterSnapshot) {
        self.lock_for_restore();
        for id in ParamId::ALL {
            let value = id.spec().clamp(snapshot.get(id));
            self.values[id.index()].store(value.to_bits(), Ordering::Relaxed);
        }
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Move the sequence from even to odd. Only one restore can win.
    fn lock_for_restore(&self) {
        let mut current = self.sequence.load(Ordering::Relaxed);
        loop {
            if current % 2 == 1 {
                std::hint::spin_loop();
                current = self.sequence.load(Ordering::Relaxed);
                continue;
            }

            match self.sequence.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        fence(Ordering::Release);
    }
}
