//! Tuning model: pitch-class frequencies and their places on the circle.
//!
//! Everything here is a pure function of its arguments. The keyboard
//! recomputes the table whenever the subdivision count, tuning system or
//! base frequency changes.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, KeyboardError};

/// 5-limit just intonation over 12 steps, closed by the octave.
const JUST_INTONATION: [f64; 13] = [
    1.0,
    16.0 / 15.0,
    9.0 / 8.0,
    6.0 / 5.0,
    5.0 / 4.0,
    4.0 / 3.0,
    45.0 / 32.0,
    3.0 / 2.0,
    8.0 / 5.0,
    5.0 / 3.0,
    9.0 / 5.0,
    15.0 / 8.0,
    2.0,
];

/// Pythagorean (3-limit) tuning over 12 steps, closed by the octave.
const PYTHAGOREAN: [f64; 13] = [
    1.0,
    256.0 / 243.0,
    9.0 / 8.0,
    32.0 / 27.0,
    81.0 / 64.0,
    4.0 / 3.0,
    729.0 / 512.0,
    3.0 / 2.0,
    128.0 / 81.0,
    27.0 / 16.0,
    16.0 / 9.0,
    243.0 / 128.0,
    2.0,
];

const RATIO_EPSILON: f64 = 1e-9;

/// An ordered table of frequency multipliers spanning exactly one octave.
///
/// The first entry is 1 and the last is 2; the last one only closes the
/// octave, so a table of `n + 1` ratios tunes `n` pitch classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct RatioTable {
    ratios: Vec<f64>,
}

impl RatioTable {
    pub fn new(ratios: Vec<f64>) -> Result<RatioTable, ConfigError> {
        if ratios.len() < 2 {
            return Err(ConfigError::RatioTableTooShort { len: ratios.len() });
        }
        let first = ratios[0];
        if !((first - 1.0).abs() < RATIO_EPSILON) {
            return Err(ConfigError::RatioTableStart { first });
        }
        let last = ratios[ratios.len() - 1];
        if !((last - 2.0).abs() < RATIO_EPSILON) {
            return Err(ConfigError::RatioTableEnd { last });
        }
        for (index, pair) in ratios.windows(2).enumerate() {
            // `!(a < b)` also rejects NaN
            if !(pair[0] < pair[1]) {
                return Err(ConfigError::RatioNotIncreasing {
                    index: index + 1,
                    ratio: pair[1],
                });
            }
        }
        Ok(RatioTable { ratios })
    }

    /// Number of pitch classes this table tunes.
    pub fn steps(&self) -> usize {
        self.ratios.len() - 1
    }

    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }
}

impl TryFrom<Vec<f64>> for RatioTable {
    type Error = ConfigError;

    fn try_from(ratios: Vec<f64>) -> Result<Self, Self::Error> {
        RatioTable::new(ratios)
    }
}

impl From<RatioTable> for Vec<f64> {
    fn from(table: RatioTable) -> Self {
        table.ratios
    }
}

/// The rule mapping a pitch-class index to a frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TuningSystem {
    /// `N` equal steps per octave, for any `N >= 1`.
    #[default]
    EqualDivision,
    /// Fixed ratios; only applies when the subdivision count matches
    /// [`RatioTable::steps`], otherwise equal division is used.
    RatioTable(RatioTable),
}

impl TuningSystem {
    pub fn just_intonation() -> TuningSystem {
        TuningSystem::RatioTable(RatioTable {
            ratios: JUST_INTONATION.to_vec(),
        })
    }

    pub fn pythagorean() -> TuningSystem {
        TuningSystem::RatioTable(RatioTable {
            ratios: PYTHAGOREAN.to_vec(),
        })
    }

    /// The system actually used for `subdivisions` pitch classes.
    pub fn effective(&self, subdivisions: usize) -> &TuningSystem {
        match self {
            TuningSystem::RatioTable(table) if table.steps() != subdivisions => {
                &TuningSystem::EqualDivision
            }
            other => other,
        }
    }
}

/// A point on the pitch circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

/// One discrete step of the octave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchClass {
    pub index: usize,
    pub frequency: f64,
    pub angle: f64,
}

pub(crate) fn check_subdivisions(subdivisions: usize) -> Result<(), ConfigError> {
    if subdivisions == 0 {
        return Err(ConfigError::ZeroSubdivisions);
    }
    Ok(())
}

pub(crate) fn check_base_frequency(base_freq: f64) -> Result<(), ConfigError> {
    if !(base_freq.is_finite() && base_freq > 0.0) {
        return Err(ConfigError::BaseFrequency { value: base_freq });
    }
    Ok(())
}

/// Frequencies of every pitch class, in ascending index order.
pub fn frequencies(
    subdivisions: usize,
    system: &TuningSystem,
    base_freq: f64,
) -> Result<Vec<f64>, KeyboardError> {
    check_subdivisions(subdivisions)?;
    check_base_frequency(base_freq)?;

    if let TuningSystem::RatioTable(table) = system {
        if table.steps() != subdivisions {
            log::warn!(
                "ratio table has {} steps, using equal division for {} subdivisions",
                table.steps(),
                subdivisions
            );
        }
    }

    let freqs = match system.effective(subdivisions) {
        TuningSystem::RatioTable(table) => table.ratios[..subdivisions]
            .iter()
            .map(|ratio| base_freq * ratio)
            .collect(),
        TuningSystem::EqualDivision => {
            let n = subdivisions as f64;
            (0..subdivisions)
                .map(|i| base_freq * 2.0_f64.powf(i as f64 / n))
                .collect()
        }
    };
    Ok(freqs)
}

/// Evenly spaced points on a circle of `radius`, starting at `start_angle`.
///
/// Angles are `start_angle` plus the index offset and are not wrapped.
/// Each angle is computed from its index rather than accumulated, so the
/// spacing stays exact for large subdivision counts.
pub fn positions(subdivisions: usize, radius: f64, start_angle: f64) -> Vec<Position> {
    if subdivisions == 0 {
        return Vec::new();
    }
    let step = TAU / subdivisions as f64;
    (0..subdivisions)
        .map(|i| {
            let angle = start_angle + i as f64 * step;
            Position {
                x: radius * angle.cos(),
                y: radius * angle.sin(),
                angle,
            }
        })
        .collect()
}

/// Angle reduced to `[0, 2π)`.
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid of a tiny negative value rounds up to TAU itself
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// The full pitch-class table for the given tuning. Angles are wrapped
/// into `[0, 2π)`.
pub fn pitch_classes(
    subdivisions: usize,
    system: &TuningSystem,
    base_freq: f64,
    start_angle: f64,
) -> Result<Vec<PitchClass>, KeyboardError> {
    let freqs = frequencies(subdivisions, system, base_freq)?;
    let step = TAU / subdivisions as f64;
    Ok(freqs
        .into_iter()
        .enumerate()
        .map(|(index, frequency)| PitchClass {
            index,
            frequency,
            angle: wrap_angle(start_angle + index as f64 * step),
        })
        .collect())
}
