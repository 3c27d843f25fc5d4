use std::fmt;

/// Top-level error for every fallible keyboard operation.
///
/// Only configuration can fail. Unknown symbols resolve to `None` and a full
/// voice pool evicts instead of erroring, so neither has a variant here.
#[derive(Debug)]
pub enum KeyboardError {
    InvalidConfiguration(ConfigError),
    Json(serde_json::Error),
}

/// Reasons a configuration is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroSubdivisions,
    BaseFrequency { value: f64 },
    RatioTableTooShort { len: usize },
    RatioTableStart { first: f64 },
    RatioTableEnd { last: f64 },
    RatioNotIncreasing { index: usize, ratio: f64 },
    EnvelopeTime { name: &'static str, value: f64 },
    EnvelopeLevel { name: &'static str, value: f64 },
    SampleRate { value: f64 },
    UnknownWaveform { name: String },
}

impl fmt::Display for KeyboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyboardError::InvalidConfiguration(e) => write!(f, "Invalid configuration: {e}"),
            KeyboardError::Json(e) => write!(f, "Config JSON error: {e}"),
        }
    }
}

impl std::error::Error for KeyboardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeyboardError::InvalidConfiguration(e) => Some(e),
            KeyboardError::Json(e) => Some(e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroSubdivisions => write!(f, "subdivisions must be at least 1"),
            ConfigError::BaseFrequency { value } => {
                write!(f, "base frequency must be finite and positive, got {value}")
            }
            ConfigError::RatioTableTooShort { len } => {
                write!(f, "ratio table needs at least 2 entries, got {len}")
            }
            ConfigError::RatioTableStart { first } => {
                write!(f, "ratio table must start at 1, starts at {first}")
            }
            ConfigError::RatioTableEnd { last } => {
                write!(f, "ratio table must end at 2, ends at {last}")
            }
            ConfigError::RatioNotIncreasing { index, ratio } => {
                write!(f, "ratio {ratio} at index {index} does not increase")
            }
            ConfigError::EnvelopeTime { name, value } => {
                write!(f, "envelope {name} must be finite and non-negative, got {value}")
            }
            ConfigError::EnvelopeLevel { name, value } => {
                write!(f, "envelope {name} must be finite and positive, got {value}")
            }
            ConfigError::SampleRate { value } => {
                write!(f, "sample rate must be finite and positive, got {value}")
            }
            ConfigError::UnknownWaveform { name } => write!(f, "unknown waveform '{name}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for KeyboardError {
    fn from(e: ConfigError) -> Self {
        KeyboardError::InvalidConfiguration(e)
    }
}

impl From<serde_json::Error> for KeyboardError {
    fn from(e: serde_json::Error) -> Self {
        KeyboardError::Json(e)
    }
}
