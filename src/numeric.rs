//! Small numeric helpers shared by the tuning, engine and layout code.

/// Smallest `r` such that `r * r >= n`.
///
/// Used to size the square note table next to the circle. `0` maps to `0`
/// and exact squares return their exact root.
pub fn next_perfect_square_root(n: usize) -> usize {
    let mut r = (n as f64).sqrt() as usize;
    // The float estimate can be one off in either direction for large n.
    while r.saturating_mul(r) > n {
        r -= 1;
    }
    if r.checked_mul(r).is_some_and(|sq| sq < n) {
        r += 1;
    }
    r
}

/// A frequency usable as a map key.
///
/// Only finite, strictly positive values are accepted, so the IEEE bit
/// pattern orders the same way as the value and equality is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrequencyKey(u64);

impl FrequencyKey {
    pub fn new(hz: f64) -> Option<FrequencyKey> {
        if hz.is_finite() && hz > 0.0 {
            Some(FrequencyKey(hz.to_bits()))
        } else {
            None
        }
    }

    pub fn hz(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl std::fmt::Display for FrequencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} Hz", self.hz())
    }
}
