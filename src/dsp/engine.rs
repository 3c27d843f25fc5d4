//! Voice engine: owns the pool of sounding voices.
//!
//! The engine keeps live voices in insertion order and steals the oldest
//! one when the pool is full. Releasing a voice takes it out of the live
//! set immediately; it keeps sounding from a separate list until its stop
//! time passes on the audio clock, so the same frequency can be triggered
//! again right away as a new, independent voice.

use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::error::KeyboardError;
use crate::numeric::FrequencyKey;

use super::clock::{AudioClock, SampleClock};
use super::mixer::Mixer;
use super::oscillator::Waveform;
use super::scheduler::{EnvelopeEvent, EventQueue, VoiceId};
use super::voice::{Voice, VoicePhase};

pub struct VoiceEngine<C: AudioClock = SampleClock> {
    config: EngineConfig,
    clock: C,
    /// Live voices, oldest first. At most one per frequency.
    live: VecDeque<Voice>,
    /// Released voices still ramping down.
    releasing: Vec<Voice>,
    events: EventQueue,
    mixer: Mixer,
    next_id: u64,
}

impl VoiceEngine<SampleClock> {
    /// An engine whose clock advances with rendered samples.
    pub fn new(config: EngineConfig) -> Result<Self, KeyboardError> {
        let clock = SampleClock::new(config.sample_rate);
        VoiceEngine::with_clock(config, clock)
    }
}

impl<C: AudioClock> VoiceEngine<C> {
    pub fn with_clock(config: EngineConfig, clock: C) -> Result<Self, KeyboardError> {
        config.validate()?;
        Ok(VoiceEngine {
            mixer: Mixer::new(config.master_gain),
            config,
            clock,
            live: VecDeque::new(),
            releasing: Vec::new(),
            events: EventQueue::new(),
            next_id: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Start a voice for `frequency`.
    ///
    /// Already sounding frequencies and non-positive or non-finite values
    /// are ignored. A full pool releases its oldest voice first.
    pub fn note_on(&mut self, frequency: f64) {
        self.poll();
        let Some(key) = FrequencyKey::new(frequency) else {
            log::trace!("ignoring note on for invalid frequency {frequency}");
            return;
        };
        if self.live.iter().any(|v| v.key() == key) {
            return;
        }
        if self.config.max_voices == 0 {
            log::trace!("no voices available, {key} dropped");
            return;
        }
        while self.live.len() >= self.config.max_voices {
            if let Some(oldest) = self.live.pop_front() {
                log::trace!("stealing {:?} ({}) for {key}", oldest.id(), oldest.key());
                self.release_voice(oldest);
            }
        }

        let id = VoiceId(self.next_id);
        self.next_id += 1;
        let now = self.clock.now();
        let voice = Voice::start(
            id,
            key,
            self.config.waveform,
            self.config.sample_rate,
            now,
            &self.config.envelope,
        );
        self.events.push(
            now + self.config.envelope.attack_time,
            EnvelopeEvent::AttackComplete(id),
        );
        log::trace!("{id:?} started at {key}, t={now:.4}");
        self.live.push_back(voice);
    }

    /// Release the live voice for `frequency`, if there is one.
    pub fn note_off(&mut self, frequency: f64) {
        self.poll();
        let Some(key) = FrequencyKey::new(frequency) else {
            return;
        };
        if let Some(pos) = self.live.iter().position(|v| v.key() == key) {
            if let Some(voice) = self.live.remove(pos) {
                self.release_voice(voice);
            }
        }
    }

    /// Release every live voice, oldest first.
    pub fn stop_all(&mut self) {
        self.poll();
        let voices: Vec<Voice> = self.live.drain(..).collect();
        for voice in voices {
            self.release_voice(voice);
        }
    }

    fn release_voice(&mut self, mut voice: Voice) {
        let now = self.clock.now();
        let stop = voice.release(now, &self.config.envelope);
        self.events.push(stop, EnvelopeEvent::ReleaseComplete(voice.id()));
        log::trace!("{:?} released at t={now:.4}, stops at {stop:.4}", voice.id());
        self.releasing.push(voice);
    }

    /// Shape for voices started from now on; sounding voices keep theirs.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        log::debug!("waveform set to {waveform}");
        self.config.waveform = waveform;
    }

    pub fn waveform(&self) -> Waveform {
        self.config.waveform
    }

    /// Change the polyphony limit, stealing the oldest voices that no
    /// longer fit.
    pub fn set_max_voices(&mut self, max_voices: usize) {
        self.config.max_voices = max_voices;
        while self.live.len() > max_voices {
            if let Some(oldest) = self.live.pop_front() {
                self.release_voice(oldest);
            }
        }
    }

    pub fn is_live(&self, frequency: f64) -> bool {
        FrequencyKey::new(frequency).is_some_and(|key| self.live.iter().any(|v| v.key() == key))
    }

    /// Frequencies of live voices, oldest first.
    pub fn live_frequencies(&self) -> Vec<f64> {
        self.live.iter().map(|v| v.key().hz()).collect()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Voices released but not yet stopped.
    pub fn releasing_count(&self) -> usize {
        self.releasing.len()
    }

    /// Nothing live and nothing ramping down.
    pub fn is_silent(&self) -> bool {
        self.live.is_empty() && self.releasing.is_empty()
    }

    /// Lifecycle phase of the live voice for `frequency`.
    pub fn phase_of(&self, frequency: f64) -> Option<VoicePhase> {
        let key = FrequencyKey::new(frequency)?;
        self.live.iter().find(|v| v.key() == key).map(|v| v.phase())
    }

    /// Apply every envelope event that is due on the clock.
    pub fn poll(&mut self) {
        let now = self.clock.now();
        while let Some(event) = self.events.pop_due(now) {
            match event {
                EnvelopeEvent::AttackComplete(id) => {
                    if let Some(voice) = self
                        .live
                        .iter_mut()
                        .find(|v| v.id() == id && v.phase() == VoicePhase::Attack)
                    {
                        voice.set_phase(VoicePhase::Sustain);
                    }
                }
                EnvelopeEvent::ReleaseComplete(id) => {
                    if let Some(pos) = self.releasing.iter().position(|v| v.id() == id) {
                        let mut voice = self.releasing.swap_remove(pos);
                        voice.set_phase(VoicePhase::Terminated);
                        log::trace!("{id:?} terminated");
                    }
                }
            }
        }
    }

    /// Render the next block of mono audio and advance the clock past it.
    pub fn render(&mut self, out: &mut [f32]) {
        let sample_rate = self.config.sample_rate;
        let start = self.clock.now();

        self.mixer.clear(out.len());
        for voice in self.live.iter_mut().chain(self.releasing.iter_mut()) {
            for i in 0..out.len() {
                let t = start + i as f64 / sample_rate;
                self.mixer.add(i, voice.next_sample(t));
            }
        }
        self.mixer.write_to(out);

        self.clock.rendered(out.len(), sample_rate);
        self.poll();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::clock::ManualClock;

    fn engine(max_voices: usize) -> (VoiceEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let config = EngineConfig {
            max_voices,
            ..EngineConfig::default()
        };
        let engine = VoiceEngine::with_clock(config, clock.clone()).unwrap();
        (engine, clock)
    }

    #[test]
    fn note_on_is_idempotent() {
        let (mut e, _) = engine(8);
        e.note_on(440.0);
        e.note_on(440.0);
        assert_eq!(e.live_count(), 1);
        assert_eq!(e.releasing_count(), 0);
    }

    #[test]
    fn overflow_steals_oldest() {
        let (mut e, _) = engine(3);
        for f in [100.0, 200.0, 300.0, 400.0] {
            e.note_on(f);
        }
        assert_eq!(e.live_frequencies(), vec![200.0, 300.0, 400.0]);
        assert_eq!(e.releasing_count(), 1);
        assert_eq!(e.releasing[0].key().hz(), 100.0);
        assert_eq!(e.releasing[0].phase(), VoicePhase::Release);
    }

    #[test]
    fn two_voice_scenario() {
        let (mut e, _) = engine(2);
        e.note_on(100.0);
        e.note_on(200.0);
        e.note_on(300.0);
        assert_eq!(e.live_frequencies(), vec![200.0, 300.0]);
    }

    #[test]
    fn stealing_follows_insertion_not_frequency() {
        let (mut e, _) = engine(2);
        e.note_on(900.0);
        e.note_on(100.0);
        e.note_on(500.0);
        assert_eq!(e.live_frequencies(), vec![100.0, 500.0]);
    }

    #[test]
    fn retrigger_after_release_is_a_new_voice() {
        let (mut e, clock) = engine(8);
        e.note_on(440.0);
        let first = e.live[0].id();
        clock.advance(0.1);
        e.note_off(440.0);
        assert!(!e.is_live(440.0));
        e.note_on(440.0);

        assert_eq!(e.live_count(), 1);
        assert_eq!(e.releasing_count(), 1);
        let second = &e.live[0];
        assert_ne!(second.id(), first);
        assert_eq!(second.phase(), VoicePhase::Attack);
        assert_eq!(second.start_time(), 0.1);
        assert!(second.stop_time().is_none());
        let floor = e.config().envelope.attack_floor;
        assert!((second.gain_at(0.1) - floor).abs() < 1e-12);
    }

    #[test]
    fn unknown_frequencies_are_no_ops() {
        let (mut e, _) = engine(8);
        e.note_off(123.0);
        e.note_on(f64::NAN);
        e.note_on(0.0);
        e.note_on(-5.0);
        assert!(e.is_silent());
    }

    #[test]
    fn zero_capacity_drops_every_note() {
        let (mut e, _) = engine(0);
        e.note_on(440.0);
        assert_eq!(e.live_count(), 0);
        assert!(e.is_silent());
        let mut out = [1.0f32; 64];
        e.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn attack_completes_into_sustain() {
        let (mut e, clock) = engine(8);
        e.note_on(440.0);
        assert_eq!(e.phase_of(440.0), Some(VoicePhase::Attack));
        clock.advance(0.019);
        e.poll();
        assert_eq!(e.phase_of(440.0), Some(VoicePhase::Attack));
        clock.advance(0.002);
        e.poll();
        assert_eq!(e.phase_of(440.0), Some(VoicePhase::Sustain));
    }

    #[test]
    fn release_terminates_after_stop_buffer() {
        let (mut e, clock) = engine(8);
        e.note_on(440.0);
        clock.advance(0.5);
        e.note_off(440.0);
        assert_eq!(e.phase_of(440.0), None);
        assert_eq!(e.releasing_count(), 1);

        clock.advance(0.055);
        e.poll();
        assert_eq!(e.releasing_count(), 1, "stop buffer not yet elapsed");
        clock.advance(0.01);
        e.poll();
        assert!(e.is_silent());
    }

    #[test]
    fn release_during_attack_starts_below_sustain() {
        let (mut e, clock) = engine(8);
        e.note_on(440.0);
        clock.advance(0.01);
        e.note_off(440.0);
        let voice = &e.releasing[0];
        let sustain = e.config().envelope.sustain_gain;
        assert!(voice.gain_at(0.01) < sustain);
        assert!(voice.gain_at(0.011) < voice.gain_at(0.01));
    }

    #[test]
    fn stale_attack_event_ignored_after_steal() {
        let (mut e, clock) = engine(1);
        e.note_on(100.0);
        e.note_on(200.0);
        clock.advance(0.03);
        e.poll();
        assert_eq!(e.releasing[0].phase(), VoicePhase::Release);
        assert_eq!(e.phase_of(200.0), Some(VoicePhase::Sustain));
    }

    #[test]
    fn stop_all_releases_everything() {
        let (mut e, clock) = engine(8);
        for f in [220.0, 330.0, 440.0] {
            e.note_on(f);
        }
        e.stop_all();
        assert_eq!(e.live_count(), 0);
        assert_eq!(e.releasing_count(), 3);
        clock.advance(1.0);
        e.poll();
        assert!(e.is_silent());
    }

    #[test]
    fn waveform_applies_to_new_voices_only() {
        let (mut e, _) = engine(8);
        e.note_on(440.0);
        e.set_waveform(Waveform::Square);
        e.note_on(550.0);
        assert_eq!(e.live[0].waveform(), Waveform::Sine);
        assert_eq!(e.live[1].waveform(), Waveform::Square);
        assert_eq!(e.waveform(), Waveform::Square);
    }

    #[test]
    fn lowering_max_voices_steals_oldest() {
        let (mut e, _) = engine(4);
        for f in [1.0, 2.0, 3.0, 4.0] {
            e.note_on(f);
        }
        e.set_max_voices(2);
        assert_eq!(e.live_frequencies(), vec![3.0, 4.0]);
        assert_eq!(e.releasing_count(), 2);
    }

    #[test]
    fn render_produces_bounded_sound() {
        let mut e = VoiceEngine::new(EngineConfig::default()).unwrap();
        for f in [261.63, 329.63, 392.0, 440.0, 523.25, 659.25, 783.99, 880.0] {
            e.note_on(f);
        }
        let mut out = vec![0.0f32; 4410];
        e.render(&mut out);
        assert!(out.iter().any(|s| s.abs() > 0.01), "should be audible");
        assert!(out.iter().all(|s| s.abs() <= 1.0));
        assert!((e.now() - 0.1).abs() < 1e-9);
        assert_eq!(e.phase_of(440.0), Some(VoicePhase::Sustain));
    }

    #[test]
    fn render_goes_silent_after_release() {
        let mut e = VoiceEngine::new(EngineConfig::default()).unwrap();
        e.note_on(440.0);
        let mut block = vec![0.0f32; 2205];
        e.render(&mut block);
        e.note_off(440.0);
        // 50 ms release + 10 ms buffer
        e.render(&mut block);
        e.render(&mut block);
        assert!(e.is_silent());
        e.render(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn invalid_config_rejected() {
        let config = EngineConfig {
            sample_rate: 0.0,
            ..EngineConfig::default()
        };
        assert!(VoiceEngine::new(config).is_err());
    }
}
