//! Mixer: sums voice outputs into a block, then applies master gain and
//! soft clipping.

#[derive(Debug, Clone)]
pub struct Mixer {
    pub master_gain: f64,
    buffer: Vec<f64>,
}

impl Mixer {
    pub fn new(master_gain: f64) -> Self {
        Mixer {
            master_gain,
            buffer: Vec::new(),
        }
    }

    /// Prepare a zeroed block of `num_samples`.
    pub fn clear(&mut self, num_samples: usize) {
        self.buffer.clear();
        self.buffer.resize(num_samples, 0.0);
    }

    pub fn add(&mut self, index: usize, sample: f64) {
        if let Some(slot) = self.buffer.get_mut(index) {
            *slot += sample;
        }
    }

    /// Write the mixed block into `out`, gained and soft clipped.
    pub fn write_to(&self, out: &mut [f32]) {
        for (o, &s) in out.iter_mut().zip(&self.buffer) {
            *o = soft_clip(s * self.master_gain) as f32;
        }
    }
}

/// tanh soft clipper; keeps many stacked voices inside [-1, 1].
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}
