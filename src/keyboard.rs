//! Keyboard: the owned state behind one microtonal keyboard.
//!
//! Holds the configuration, the derived pitch-class table, the layout table
//! and the voice engine, and routes key, MIDI and pointer input to notes.
//! Reconfiguration is all-or-nothing: every new value is validated and
//! every derived table rebuilt before anything is replaced.

use std::collections::HashSet;

use crate::config::KeyboardConfig;
use crate::dsp::clock::{AudioClock, SampleClock};
use crate::dsp::engine::VoiceEngine;
use crate::dsp::oscillator::Waveform;
use crate::error::KeyboardError;
use crate::hit::{click_tolerance, nearest};
use crate::input::{InputMapper, Layout, MidiMessage, fold_key};
use crate::numeric::{FrequencyKey, next_perfect_square_root};
use crate::tuning::{PitchClass, Position, TuningSystem, pitch_classes, positions};

/// Key that silences everything.
const STOP_ALL_KEY: &str = " ";

pub struct Keyboard<C: AudioClock = SampleClock> {
    config: KeyboardConfig,
    notes: Vec<PitchClass>,
    /// Clickable label positions, just outside the circle.
    label_ring: Vec<Position>,
    mapper: InputMapper,
    engine: VoiceEngine<C>,
    held_keys: HashSet<String>,
}

struct Tables {
    notes: Vec<PitchClass>,
    label_ring: Vec<Position>,
    mapper: InputMapper,
}

fn build_tables(config: &KeyboardConfig) -> Result<Tables, KeyboardError> {
    config.validate()?;
    let notes = pitch_classes(
        config.subdivisions,
        &config.tuning,
        config.base_frequency,
        config.start_angle,
    )?;
    let label_ring = positions(
        config.subdivisions,
        config.radius + config.label_offset,
        config.start_angle,
    );
    let mapper = InputMapper::new(config.layout.alphabet(), config.subdivisions)?;
    Ok(Tables {
        notes,
        label_ring,
        mapper,
    })
}

impl Keyboard<SampleClock> {
    pub fn new(config: KeyboardConfig) -> Result<Self, KeyboardError> {
        let clock = SampleClock::new(config.engine.sample_rate);
        Keyboard::with_clock(config, clock)
    }
}

impl<C: AudioClock> Keyboard<C> {
    pub fn with_clock(config: KeyboardConfig, clock: C) -> Result<Self, KeyboardError> {
        let tables = build_tables(&config)?;
        let engine = VoiceEngine::with_clock(config.engine.clone(), clock)?;
        Ok(Keyboard {
            config,
            notes: tables.notes,
            label_ring: tables.label_ring,
            mapper: tables.mapper,
            engine,
            held_keys: HashSet::new(),
        })
    }

    fn apply(&mut self, next: KeyboardConfig) -> Result<(), KeyboardError> {
        let tables = build_tables(&next)?;
        // Old frequencies are meaningless under the new table.
        self.engine.stop_all();
        self.notes = tables.notes;
        self.label_ring = tables.label_ring;
        self.mapper = tables.mapper;
        self.config = next;
        Ok(())
    }

    /// Retune. Sounding notes are released; on error nothing changes.
    pub fn set_tuning(
        &mut self,
        subdivisions: usize,
        tuning: TuningSystem,
        base_frequency: f64,
    ) -> Result<(), KeyboardError> {
        let mut next = self.config.clone();
        next.subdivisions = subdivisions;
        next.tuning = tuning;
        next.base_frequency = base_frequency;
        self.apply(next)?;
        log::debug!(
            "tuning set: {} subdivisions, {:?}, base {} Hz",
            subdivisions,
            self.config.tuning.effective(subdivisions),
            base_frequency
        );
        Ok(())
    }

    pub fn set_subdivisions(&mut self, subdivisions: usize) -> Result<(), KeyboardError> {
        let tuning = self.config.tuning.clone();
        self.set_tuning(subdivisions, tuning, self.config.base_frequency)
    }

    pub fn set_base_frequency(&mut self, base_frequency: f64) -> Result<(), KeyboardError> {
        let tuning = self.config.tuning.clone();
        self.set_tuning(self.config.subdivisions, tuning, base_frequency)
    }

    pub fn set_tuning_system(&mut self, tuning: TuningSystem) -> Result<(), KeyboardError> {
        self.set_tuning(self.config.subdivisions, tuning, self.config.base_frequency)
    }

    /// Swap the symbol layout. Sounding notes keep playing.
    pub fn set_layout(&mut self, layout: Layout) -> Result<(), KeyboardError> {
        self.mapper
            .rebuild_layout(layout.alphabet(), self.config.subdivisions)?;
        self.config.layout = layout;
        Ok(())
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.config.engine.waveform = waveform;
        self.engine.set_waveform(waveform);
    }

    pub fn set_max_voices(&mut self, max_voices: usize) {
        self.config.engine.max_voices = max_voices;
        self.engine.set_max_voices(max_voices);
    }

    pub fn frequency_of(&self, index: usize) -> Option<f64> {
        self.notes.get(index).map(|n| n.frequency)
    }

    pub fn index_of(&self, frequency: f64) -> Option<usize> {
        let key = FrequencyKey::new(frequency)?;
        self.notes
            .iter()
            .position(|n| FrequencyKey::new(n.frequency) == Some(key))
    }

    pub fn note_on(&mut self, frequency: f64) {
        self.engine.note_on(frequency);
    }

    pub fn note_off(&mut self, frequency: f64) {
        self.engine.note_off(frequency);
    }

    pub fn stop_all(&mut self) {
        self.engine.stop_all();
    }

    pub fn note_on_index(&mut self, index: usize) {
        if let Some(f) = self.frequency_of(index) {
            self.engine.note_on(f);
        }
    }

    pub fn note_off_index(&mut self, index: usize) {
        if let Some(f) = self.frequency_of(index) {
            self.engine.note_off(f);
        }
    }

    /// Start the note if it is silent, release it if it sounds.
    /// Returns whether the note is live afterwards.
    pub fn toggle_index(&mut self, index: usize) -> bool {
        let Some(f) = self.frequency_of(index) else {
            return false;
        };
        if self.engine.is_live(f) {
            self.engine.note_off(f);
        } else {
            self.engine.note_on(f);
        }
        self.engine.is_live(f)
    }

    /// Key press as reported by the host. Auto-repeat of a held key is
    /// ignored, whatever its case. The space bar releases every note unless
    /// the layout assigns it a pitch class.
    pub fn key_down(&mut self, key: &str) {
        if !self.held_keys.insert(fold_key(key)) {
            return;
        }
        match self.mapper.resolve_key(key) {
            Some(index) => self.note_on_index(index),
            None if key == STOP_ALL_KEY => self.engine.stop_all(),
            None => {}
        }
    }

    pub fn key_up(&mut self, key: &str) {
        self.held_keys.remove(&fold_key(key));
        if let Some(index) = self.mapper.resolve_key(key) {
            self.note_off_index(index);
        }
    }

    /// Raw MIDI channel message from an input device.
    pub fn midi_message(&mut self, status: u8, note: u8, velocity: u8) {
        let (note, on) = match MidiMessage::parse(status, note, velocity) {
            MidiMessage::NoteOn { note, .. } => (note, true),
            MidiMessage::NoteOff { note } => (note, false),
            MidiMessage::Other => return,
        };
        let Some(index) = self
            .mapper
            .resolve_midi_note(note, self.config.midi_base_offset)
        else {
            return;
        };
        if on {
            self.note_on_index(index);
        } else {
            self.note_off_index(index);
        }
    }

    /// Pointer click at `(x, y)` in circle coordinates (origin at the
    /// center, display scale already removed). Toggles the nearest label
    /// within reach and returns its index.
    pub fn pointer_toggle(&mut self, x: f64, y: f64) -> Option<usize> {
        let tolerance = click_tolerance(self.config.subdivisions, self.config.scale_factor);
        let index = nearest(x, y, &self.label_ring, tolerance)?;
        self.toggle_index(index);
        Some(index)
    }

    pub fn render(&mut self, out: &mut [f32]) {
        self.engine.render(out);
    }

    pub fn config(&self) -> &KeyboardConfig {
        &self.config
    }

    pub fn engine(&self) -> &VoiceEngine<C> {
        &self.engine
    }

    /// The current pitch-class table.
    pub fn pitch_classes(&self) -> &[PitchClass] {
        &self.notes
    }

    /// Points on the circle itself, for drawing.
    pub fn positions(&self) -> Vec<Position> {
        positions(self.config.subdivisions, self.config.radius, self.config.start_angle)
    }

    pub fn live_frequencies(&self) -> Vec<f64> {
        self.engine.live_frequencies()
    }

    /// Indices of sounding pitch classes, ascending.
    pub fn live_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .engine
            .live_frequencies()
            .into_iter()
            .filter_map(|f| self.index_of(f))
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Key label for a pitch class, if the layout alphabet reaches it.
    pub fn label_for(&self, index: usize) -> Option<char> {
        if index >= self.config.subdivisions {
            return None;
        }
        self.mapper.symbol_for(index)
    }

    /// Side length of the square table holding every pitch class.
    pub fn grid_size(&self) -> usize {
        next_perfect_square_root(self.config.subdivisions)
    }
}
