pub mod config;
pub mod dsp;
pub mod error;
pub mod hit;
pub mod input;
pub mod keyboard;
pub mod numeric;
pub mod tuning;

use std::str::FromStr;

use crate::config::KeyboardConfig;
use crate::dsp::oscillator::Waveform;
use crate::input::Layout;
use crate::keyboard::Keyboard;
use crate::tuning::TuningSystem;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed: return the microtone-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: frequencies of an equal-division or named tuning.
/// `system` is `"equal"`, `"just"` or `"pythagorean"`.
#[wasm_bindgen]
pub fn note_frequencies(
    subdivisions: usize,
    system: &str,
    base_frequency: f64,
) -> Result<Vec<f64>, JsValue> {
    let system = named_tuning(system)?;
    tuning::frequencies(subdivisions, &system, base_frequency).map_err(js_error)
}

/// WASM-exposed: `{x, y, angle}` points for drawing the pitch circle.
#[wasm_bindgen]
pub fn note_positions(
    subdivisions: usize,
    radius: f64,
    start_angle: f64,
) -> Result<JsValue, JsValue> {
    let points = tuning::positions(subdivisions, radius, start_angle);
    serde_wasm_bindgen::to_value(&points).map_err(js_error)
}

fn named_tuning(name: &str) -> Result<TuningSystem, JsValue> {
    match name {
        "equal" | "" => Ok(TuningSystem::EqualDivision),
        "just" => Ok(TuningSystem::just_intonation()),
        "pythagorean" => Ok(TuningSystem::pythagorean()),
        other => Err(JsValue::from_str(&format!("unknown tuning system '{other}'"))),
    }
}

fn named_layout(name: &str) -> Layout {
    match name.to_ascii_lowercase().as_str() {
        "azerty" => Layout::Azerty,
        "qwerty" => Layout::Qwerty,
        _ => Layout::Custom(name.to_string()),
    }
}

/// WASM-exposed keyboard: owns the tuning, the input tables and the voice
/// engine. The host forwards input events and pulls audio blocks with
/// [`render`](WebKeyboard::render) from its AudioWorklet.
#[wasm_bindgen]
pub struct WebKeyboard {
    inner: Keyboard,
}

#[wasm_bindgen]
impl WebKeyboard {
    /// Build from a config object; `undefined` or `null` gives the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WebKeyboard, JsValue> {
        let config: KeyboardConfig = if config.is_undefined() || config.is_null() {
            KeyboardConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(js_error)?
        };
        let inner = Keyboard::new(config).map_err(js_error)?;
        Ok(WebKeyboard { inner })
    }

    /// Build from a JSON config document.
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(json: &str) -> Result<WebKeyboard, JsValue> {
        let config = KeyboardConfig::from_json(json).map_err(js_error)?;
        let inner = Keyboard::new(config).map_err(js_error)?;
        Ok(WebKeyboard { inner })
    }

    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, key: &str) {
        self.inner.key_down(key);
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&mut self, key: &str) {
        self.inner.key_up(key);
    }

    #[wasm_bindgen(js_name = midiMessage)]
    pub fn midi_message(&mut self, status: u8, note: u8, velocity: u8) {
        self.inner.midi_message(status, note, velocity);
    }

    /// Toggle the label nearest `(x, y)`; returns its index or `undefined`.
    #[wasm_bindgen(js_name = pointerToggle)]
    pub fn pointer_toggle(&mut self, x: f64, y: f64) -> Option<usize> {
        self.inner.pointer_toggle(x, y)
    }

    #[wasm_bindgen(js_name = toggleIndex)]
    pub fn toggle_index(&mut self, index: usize) -> bool {
        self.inner.toggle_index(index)
    }

    #[wasm_bindgen(js_name = stopAll)]
    pub fn stop_all(&mut self) {
        self.inner.stop_all();
    }

    #[wasm_bindgen(js_name = setWaveform)]
    pub fn set_waveform(&mut self, name: &str) -> Result<(), JsValue> {
        let waveform = Waveform::from_str(name).map_err(js_error)?;
        self.inner.set_waveform(waveform);
        Ok(())
    }

    #[wasm_bindgen(js_name = setTuning)]
    pub fn set_tuning(
        &mut self,
        subdivisions: usize,
        system: &str,
        base_frequency: f64,
    ) -> Result<(), JsValue> {
        let system = named_tuning(system)?;
        self.inner
            .set_tuning(subdivisions, system, base_frequency)
            .map_err(js_error)
    }

    /// `"azerty"`, `"qwerty"`, or any other string as a custom alphabet.
    #[wasm_bindgen(js_name = setLayout)]
    pub fn set_layout(&mut self, layout: &str) -> Result<(), JsValue> {
        self.inner.set_layout(named_layout(layout)).map_err(js_error)
    }

    #[wasm_bindgen(js_name = setMaxVoices)]
    pub fn set_max_voices(&mut self, max_voices: usize) {
        self.inner.set_max_voices(max_voices);
    }

    #[wasm_bindgen(js_name = liveFrequencies)]
    pub fn live_frequencies(&self) -> Vec<f64> {
        self.inner.live_frequencies()
    }

    #[wasm_bindgen(js_name = liveIndices)]
    pub fn live_indices(&self) -> Vec<usize> {
        self.inner.live_indices()
    }

    #[wasm_bindgen(js_name = pitchClasses)]
    pub fn pitch_classes(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.inner.pitch_classes()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = labelFor)]
    pub fn label_for(&self, index: usize) -> Option<String> {
        self.inner.label_for(index).map(String::from)
    }

    #[wasm_bindgen(js_name = gridSize)]
    pub fn grid_size(&self) -> usize {
        self.inner.grid_size()
    }

    /// Render the next `frames` mono samples.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frames];
        self.inner.render(&mut out);
        out
    }
}
