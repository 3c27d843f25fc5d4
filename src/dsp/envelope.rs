//! Gain automation timeline.
//!
//! An envelope is a time-ordered list of breakpoints evaluated against the
//! audio clock, in the manner of a WebAudio `AudioParam`: a breakpoint
//! either sets a value at its time or ends a linear/exponential ramp that
//! starts at the previous breakpoint. Ramps are scheduled once and need no
//! per-sample bookkeeping, so a release can start from whatever gain the
//! envelope has at that instant.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Curve {
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Breakpoint {
    time: f64,
    value: f64,
    curve: Curve,
}

/// Scheduled gain curve for one voice.
#[derive(Debug, Clone, Default)]
pub struct GainEnvelope {
    points: Vec<Breakpoint>,
}

impl GainEnvelope {
    pub fn new() -> Self {
        GainEnvelope::default()
    }

    fn insert(&mut self, point: Breakpoint) {
        // Equal times keep insertion order.
        let at = self.points.partition_point(|p| p.time <= point.time);
        self.points.insert(at, point);
    }

    pub fn set_value_at(&mut self, value: f64, time: f64) {
        self.insert(Breakpoint {
            time,
            value,
            curve: Curve::Set,
        });
    }

    pub fn linear_ramp_to(&mut self, value: f64, end_time: f64) {
        self.insert(Breakpoint {
            time: end_time,
            value,
            curve: Curve::Linear,
        });
    }

    /// Exponential ramp from the previous breakpoint. Both ends must be
    /// strictly positive; otherwise the previous value is held.
    pub fn exponential_ramp_to(&mut self, value: f64, end_time: f64) {
        self.insert(Breakpoint {
            time: end_time,
            value,
            curve: Curve::Exponential,
        });
    }

    /// Drop every breakpoint at or after `time`.
    pub fn cancel_from(&mut self, time: f64) {
        let at = self.points.partition_point(|p| p.time < time);
        self.points.truncate(at);
    }

    /// Freeze the curve at its current value: cancel what follows `time`
    /// and pin the value the envelope had there.
    pub fn hold_at(&mut self, time: f64) -> f64 {
        let value = self.value_at(time);
        self.cancel_from(time);
        self.set_value_at(value, time);
        value
    }

    /// Gain at `time`. Zero before the first breakpoint.
    pub fn value_at(&self, time: f64) -> f64 {
        let next = self.points.partition_point(|p| p.time <= time);
        if next == 0 {
            return 0.0;
        }
        let prev = self.points[next - 1];
        let Some(end) = self.points.get(next) else {
            return prev.value;
        };

        let span = end.time - prev.time;
        let t = if span > 0.0 {
            (time - prev.time) / span
        } else {
            1.0
        };
        match end.curve {
            Curve::Set => prev.value,
            Curve::Linear => prev.value + (end.value - prev.value) * t,
            Curve::Exponential => {
                if prev.value > 0.0 && end.value > 0.0 {
                    prev.value * (end.value / prev.value).powf(t)
                } else {
                    prev.value
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn silent_before_first_point() {
        let mut env = GainEnvelope::new();
        assert_eq!(env.value_at(1.0), 0.0);
        env.set_value_at(0.5, 2.0);
        assert_eq!(env.value_at(1.0), 0.0);
        assert_eq!(env.value_at(2.0), 0.5);
        assert_eq!(env.value_at(9.0), 0.5);
    }

    #[test]
    fn exponential_attack_shape() {
        let mut env = GainEnvelope::new();
        env.set_value_at(0.0001, 0.0);
        env.exponential_ramp_to(0.2, 0.02);
        assert!(close(env.value_at(0.0), 0.0001));
        // geometric midpoint
        assert!(close(env.value_at(0.01), (0.0001_f64 * 0.2).sqrt()));
        assert!(close(env.value_at(0.02), 0.2));
        assert!(close(env.value_at(1.0), 0.2));
    }

    #[test]
    fn attack_is_monotonic() {
        let mut env = GainEnvelope::new();
        env.set_value_at(0.0001, 0.0);
        env.exponential_ramp_to(0.2, 0.02);
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = env.value_at(i as f64 * 0.0002);
            assert!(v > prev, "attack must rise, {v} <= {prev}");
            prev = v;
        }
    }

    #[test]
    fn linear_ramp_reaches_exact_zero() {
        let mut env = GainEnvelope::new();
        env.set_value_at(0.001, 1.0);
        env.linear_ramp_to(0.0, 1.005);
        assert!(close(env.value_at(1.0025), 0.0005));
        assert_eq!(env.value_at(1.005), 0.0);
        assert_eq!(env.value_at(2.0), 0.0);
    }

    #[test]
    fn exponential_ramp_to_zero_holds() {
        let mut env = GainEnvelope::new();
        env.set_value_at(0.5, 0.0);
        env.exponential_ramp_to(0.0, 1.0);
        assert_eq!(env.value_at(0.5), 0.5);
    }

    #[test]
    fn hold_freezes_mid_ramp() {
        let mut env = GainEnvelope::new();
        env.set_value_at(0.0001, 0.0);
        env.exponential_ramp_to(0.2, 0.02);
        let held = env.hold_at(0.01);
        assert!(held < 0.2 && held > 0.0001);
        assert!(close(env.value_at(0.5), held), "ramp after hold was cancelled");
        env.exponential_ramp_to(0.001, 0.06);
        assert!(close(env.value_at(0.06), 0.001));
        assert!(env.value_at(0.03) < held);
    }

    #[test]
    fn full_release_sequence() {
        let mut env = GainEnvelope::new();
        env.set_value_at(0.2, 0.0);
        env.exponential_ramp_to(0.001, 0.05);
        env.linear_ramp_to(0.0, 0.055);
        let mut prev = f64::INFINITY;
        for i in 0..=60 {
            let v = env.value_at(i as f64 * 0.001);
            assert!(v <= prev + 1e-12, "release must not rise");
            assert!(v >= 0.0);
            prev = v;
        }
        assert_eq!(env.value_at(0.055), 0.0);
        assert_eq!(env.value_at(0.06), 0.0);
    }

    #[test]
    fn cancel_drops_later_points() {
        let mut env = GainEnvelope::new();
        env.set_value_at(1.0, 0.0);
        env.linear_ramp_to(0.0, 1.0);
        env.cancel_from(0.5);
        assert_eq!(env.value_at(0.75), 1.0);
        assert_eq!(env.value_at(2.0), 1.0, "cancelled ramp never reaches 0");
    }
}
