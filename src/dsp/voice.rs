//! Voice: one sounding note, an oscillator shaped by a scheduled gain curve.

use crate::config::EnvelopeConfig;
use crate::numeric::FrequencyKey;

use super::envelope::GainEnvelope;
use super::oscillator::{Oscillator, Waveform};
use super::scheduler::VoiceId;

/// Lifecycle of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePhase {
    Attack,
    Sustain,
    Release,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    key: FrequencyKey,
    oscillator: Oscillator,
    envelope: GainEnvelope,
    start_time: f64,
    stop_time: Option<f64>,
    phase: VoicePhase,
}

impl Voice {
    /// Start a voice at `start_time` and schedule its attack ramp.
    pub fn start(
        id: VoiceId,
        key: FrequencyKey,
        waveform: Waveform,
        sample_rate: f64,
        start_time: f64,
        env: &EnvelopeConfig,
    ) -> Voice {
        let mut envelope = GainEnvelope::new();
        envelope.set_value_at(env.attack_floor, start_time);
        envelope.exponential_ramp_to(env.sustain_gain, start_time + env.attack_time);
        Voice {
            id,
            key,
            oscillator: Oscillator::new(waveform, key.hz(), sample_rate),
            envelope,
            start_time,
            stop_time: None,
            phase: VoicePhase::Attack,
        }
    }

    /// Schedule the release from the gain the voice has at `now` and return
    /// the time the oscillator stops.
    pub fn release(&mut self, now: f64, env: &EnvelopeConfig) -> f64 {
        if let Some(stop) = self.stop_time {
            return stop;
        }
        let held = self.envelope.hold_at(now);
        // Released early in the attack the gain can sit below the floor;
        // the release must never swell back up to it.
        let floor = env.release_floor.min(held);
        self.envelope.exponential_ramp_to(floor, now + env.release_time);
        self.envelope.linear_ramp_to(0.0, now + env.release_time + env.release_tail);

        let stop = now + env.release_time + env.stop_buffer;
        self.stop_time = Some(stop);
        self.phase = VoicePhase::Release;
        stop
    }

    pub(crate) fn set_phase(&mut self, phase: VoicePhase) {
        self.phase = phase;
    }

    /// Output sample at audio time `time`. Silent once stopped.
    pub fn next_sample(&mut self, time: f64) -> f64 {
        if self.stop_time.is_some_and(|stop| time >= stop) {
            return 0.0;
        }
        self.oscillator.next_sample() * self.envelope.value_at(time)
    }

    pub fn gain_at(&self, time: f64) -> f64 {
        self.envelope.value_at(time)
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn key(&self) -> FrequencyKey {
        self.key
    }

    pub fn waveform(&self) -> Waveform {
        self.oscillator.waveform()
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<f64> {
        self.stop_time
    }

    pub fn phase(&self) -> VoicePhase {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice_at(start: f64) -> Voice {
        Voice::start(
            VoiceId(0),
            FrequencyKey::new(440.0).unwrap(),
            Waveform::Sine,
            44100.0,
            start,
            &EnvelopeConfig::default(),
        )
    }

    #[test]
    fn attack_rises_from_floor_to_sustain() {
        let v = voice_at(1.0);
        let env = EnvelopeConfig::default();
        assert!((v.gain_at(1.0) - env.attack_floor).abs() < 1e-12);
        assert!((v.gain_at(1.0 + env.attack_time) - env.sustain_gain).abs() < 1e-12);
        assert!((v.gain_at(5.0) - env.sustain_gain).abs() < 1e-12);
        assert_eq!(v.phase(), VoicePhase::Attack);
    }

    #[test]
    fn release_during_attack_starts_from_current_gain() {
        let mut v = voice_at(0.0);
        let env = EnvelopeConfig::default();
        let before = v.gain_at(0.01);
        let stop = v.release(0.01, &env);
        assert!((v.gain_at(0.01) - before).abs() < 1e-12, "no jump at release");
        assert!(before < env.sustain_gain);
        assert!(v.gain_at(0.02) < before);
        assert!((stop - (0.01 + env.release_time + env.stop_buffer)).abs() < 1e-12);
        assert_eq!(v.phase(), VoicePhase::Release);
    }

    #[test]
    fn release_below_floor_never_rises() {
        let mut v = voice_at(0.0);
        let env = EnvelopeConfig::default();
        v.release(0.001, &env);
        let start = v.gain_at(0.001);
        assert!(start < env.release_floor);
        let mut prev = start;
        for i in 1..=60 {
            let g = v.gain_at(0.001 + i as f64 * 0.001);
            assert!(g <= prev + 1e-15, "gain rose to {g} from {prev}");
            prev = g;
        }
        assert_eq!(prev, 0.0);
    }

    #[test]
    fn release_ends_at_exact_zero_before_stop() {
        let mut v = voice_at(0.0);
        let env = EnvelopeConfig::default();
        let stop = v.release(0.1, &env);
        let tail_end = 0.1 + env.release_time + env.release_tail;
        assert!(tail_end <= stop);
        assert_eq!(v.gain_at(tail_end), 0.0);
        assert!((v.gain_at(0.1 + env.release_time) - env.release_floor).abs() < 1e-12);
    }

    #[test]
    fn second_release_is_ignored() {
        let mut v = voice_at(0.0);
        let env = EnvelopeConfig::default();
        let first = v.release(0.1, &env);
        let second = v.release(0.2, &env);
        assert_eq!(first, second);
    }

    #[test]
    fn silent_after_stop() {
        let mut v = voice_at(0.0);
        let stop = v.release(0.0, &EnvelopeConfig::default());
        assert_eq!(v.next_sample(stop), 0.0);
        assert_eq!(v.next_sample(stop + 1.0), 0.0);
    }
}
