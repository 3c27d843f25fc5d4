//! In-memory configuration for the keyboard and its voice engine.
//!
//! Nothing is read from or written to disk. Hosts either start from
//! [`KeyboardConfig::default`] or hand over a JSON document / JS object with
//! any subset of the fields below.

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::error::{ConfigError, KeyboardError};
use crate::input::{DEFAULT_MIDI_BASE_OFFSET, Layout};
use crate::tuning::{TuningSystem, check_base_frequency, check_subdivisions};

/// Gain envelope constants. Times are in seconds, levels are linear gain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvelopeConfig {
    pub attack_time: f64,
    pub release_time: f64,
    /// Gain held after the attack.
    pub sustain_gain: f64,
    /// Starting gain of the attack ramp. Exponential ramps cannot start at 0.
    pub attack_floor: f64,
    /// Target of the exponential release ramp.
    pub release_floor: f64,
    /// Length of the final linear ramp from `release_floor` to silence.
    pub release_tail: f64,
    /// Time after `release_time` at which the oscillator stops.
    pub stop_buffer: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        EnvelopeConfig {
            attack_time: 0.02,
            release_time: 0.05,
            sustain_gain: 0.2,
            attack_floor: 0.0001,
            release_floor: 0.001,
            release_tail: 0.005,
            stop_buffer: 0.01,
        }
    }
}

impl EnvelopeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("attack time", self.attack_time),
            ("release time", self.release_time),
            ("release tail", self.release_tail),
            ("stop buffer", self.stop_buffer),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::EnvelopeTime { name, value });
            }
        }
        for (name, value) in [
            ("sustain gain", self.sustain_gain),
            ("attack floor", self.attack_floor),
            ("release floor", self.release_floor),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::EnvelopeLevel { name, value });
            }
        }
        // The oscillator must not stop before the tail has reached zero.
        if self.stop_buffer < self.release_tail {
            return Err(ConfigError::EnvelopeTime {
                name: "stop buffer",
                value: self.stop_buffer,
            });
        }
        Ok(())
    }
}

/// Settings owned by the voice engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Polyphony limit. `0` silences every note on arrival.
    pub max_voices: usize,
    pub waveform: Waveform,
    pub master_gain: f64,
    pub envelope: EnvelopeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100.0,
            max_voices: 8,
            waveform: Waveform::Sine,
            master_gain: 0.8,
            envelope: EnvelopeConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::SampleRate {
                value: self.sample_rate,
            });
        }
        if !(self.master_gain.is_finite() && self.master_gain >= 0.0) {
            return Err(ConfigError::EnvelopeLevel {
                name: "master gain",
                value: self.master_gain,
            });
        }
        self.envelope.validate()
    }
}

/// Everything needed to build a [`Keyboard`](crate::keyboard::Keyboard).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyboardConfig {
    pub subdivisions: usize,
    pub base_frequency: f64,
    pub tuning: TuningSystem,
    pub layout: Layout,
    /// Radius of the pitch circle in engine units.
    pub radius: f64,
    /// Angle of pitch class 0, in radians.
    pub start_angle: f64,
    /// Display scale; enlarges the pointer hit radius.
    pub scale_factor: f64,
    /// Distance outside the circle of the clickable note labels.
    pub label_offset: f64,
    pub midi_base_offset: u8,
    pub engine: EngineConfig,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        KeyboardConfig {
            subdivisions: 31,
            base_frequency: 440.0,
            tuning: TuningSystem::EqualDivision,
            layout: Layout::Azerty,
            radius: 50.0,
            start_angle: 0.0,
            scale_factor: 4.0,
            label_offset: 5.0,
            midi_base_offset: DEFAULT_MIDI_BASE_OFFSET,
            engine: EngineConfig::default(),
        }
    }
}

impl KeyboardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_subdivisions(self.subdivisions)?;
        check_base_frequency(self.base_frequency)?;
        self.engine.validate()
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<KeyboardConfig, KeyboardError> {
        let config: KeyboardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
