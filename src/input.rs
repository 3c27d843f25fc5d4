//! Input mapping: keyboard symbols and MIDI notes to pitch-class indices.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::KeyboardError;
use crate::tuning::check_subdivisions;

const AZERTY: &str = "AZERTYUIOPQSDFGHJKLMWXCVBN123456789";
const QWERTY: &str = "QWERTYUIOPASDFGHJKLZXCVBNM123456789";

/// MIDI note that lands on the first alphabet symbol (A3).
pub const DEFAULT_MIDI_BASE_OFFSET: u8 = 57;

/// Keyboard layout the symbol alphabet is taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Azerty,
    Qwerty,
    /// Any ordered alphabet, one symbol per pitch class.
    Custom(String),
}

impl Layout {
    pub fn alphabet(&self) -> &str {
        match self {
            Layout::Azerty => AZERTY,
            Layout::Qwerty => QWERTY,
            Layout::Custom(alphabet) => alphabet,
        }
    }
}

/// Upper-cases single-character letters; everything else is left alone.
fn fold_case(symbol: char) -> char {
    let mut upper = symbol.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => symbol,
    }
}

/// Case-folded form of a key name, matching how symbols are resolved.
pub fn fold_key(key: &str) -> String {
    key.chars().map(fold_case).collect()
}

/// Maps input symbols to pitch-class indices.
///
/// The table is rebuilt from an ordered alphabet and the subdivision count;
/// a symbol's index is its position modulo the subdivision count, so one
/// alphabet can address layouts of any size. When a symbol appears twice
/// the later position wins.
#[derive(Debug, Clone)]
pub struct InputMapper {
    alphabet: Vec<char>,
    subdivisions: usize,
    table: HashMap<char, usize>,
}

impl InputMapper {
    pub fn new(alphabet: &str, subdivisions: usize) -> Result<InputMapper, KeyboardError> {
        let mut mapper = InputMapper {
            alphabet: Vec::new(),
            subdivisions: 1,
            table: HashMap::new(),
        };
        mapper.rebuild_layout(alphabet, subdivisions)?;
        Ok(mapper)
    }

    /// Rebuild the symbol table. On error the previous table is kept.
    pub fn rebuild_layout(
        &mut self,
        alphabet: &str,
        subdivisions: usize,
    ) -> Result<(), KeyboardError> {
        check_subdivisions(subdivisions)?;

        let symbols: Vec<char> = alphabet.chars().map(fold_case).collect();
        let mut table = HashMap::with_capacity(symbols.len());
        for (position, &symbol) in symbols.iter().enumerate() {
            table.insert(symbol, position % subdivisions);
        }

        log::debug!(
            "layout rebuilt: {} symbols over {} subdivisions",
            symbols.len(),
            subdivisions
        );
        self.alphabet = symbols;
        self.subdivisions = subdivisions;
        self.table = table;
        Ok(())
    }

    /// Pitch-class index for `symbol`, matching letters case-insensitively.
    pub fn resolve(&self, symbol: char) -> Option<usize> {
        self.table.get(&fold_case(symbol)).copied()
    }

    /// Like [`resolve`](Self::resolve) for key names as delivered by a
    /// browser. Only single-character keys can name a note.
    pub fn resolve_key(&self, key: &str) -> Option<usize> {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(symbol), None) => self.resolve(symbol),
            _ => None,
        }
    }

    /// Pitch-class index for a MIDI note.
    ///
    /// `note - base_offset` picks an alphabet symbol (modulo the subdivision
    /// count) which is then resolved. Notes below `base_offset` are absent,
    /// as are positions past the end of the alphabet.
    pub fn resolve_midi_note(&self, note: u8, base_offset: u8) -> Option<usize> {
        let key = note.checked_sub(base_offset)? as usize;
        let symbol = self.alphabet.get(key % self.subdivisions)?;
        self.resolve(*symbol)
    }

    /// The symbol labelling `index`, if the alphabet is long enough.
    pub fn symbol_for(&self, index: usize) -> Option<char> {
        self.alphabet.get(index % self.subdivisions).copied()
    }

    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }
}

/// A decoded three-byte MIDI channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    Other,
}

impl MidiMessage {
    /// Decode a raw `(status, note, velocity)` triple on any channel.
    /// A Note-On with velocity 0 is a Note-Off.
    pub fn parse(status: u8, note: u8, velocity: u8) -> MidiMessage {
        match status {
            0x90..=0x9F if velocity > 0 => MidiMessage::NoteOn { note, velocity },
            0x90..=0x9F | 0x80..=0x8F => MidiMessage::NoteOff { note },
            _ => MidiMessage::Other,
        }
    }
}
