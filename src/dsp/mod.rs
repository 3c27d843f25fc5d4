//! DSP engine: polyphonic synthesis for the keyboard.
//!
//! Voices are oscillators shaped by gain curves scheduled against an audio
//! clock. The same engine renders blocks for an AudioWorklet (via WASM) and
//! for tests driven by a manual clock.

pub mod clock;
pub mod engine;
pub mod envelope;
pub mod mixer;
pub mod oscillator;
pub mod scheduler;
pub mod voice;
