//! Zero-phase band-pass filtering for GPR traces.
//!
//! Two RBJ biquads (high-pass, then low-pass) run forward and backward over an
//! odd extension of the signal, with each section started from its steady state.

use super::PipelineError;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// One second-order section in transposed direct form II, normalized so `a0 == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    fn low_pass(cutoff: f64, sample_rate: f64) -> Self {
        let (cos, alpha) = Self::prewarp(cutoff, sample_rate);
        let b = [(1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0];
        Self::normalized(b, alpha, cos)
    }

    fn high_pass(cutoff: f64, sample_rate: f64) -> Self {
        let (cos, alpha) = Self::prewarp(cutoff, sample_rate);
        let b = [(1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0];
        Self::normalized(b, alpha, cos)
    }

    fn prewarp(cutoff: f64, sample_rate: f64) -> (f64, f64) {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        (w0.cos(), w0.sin() / (2.0 * FRAC_1_SQRT_2))
    }

    fn normalized(b: [f64; 3], alpha: f64, cos: f64) -> Self {
        let a0 = 1.0 + alpha;
        Self { b: b.map(|c| c / a0), a: [-2.0 * cos / a0, (1.0 - alpha) / a0] }
    }

    fn dc_gain(&self) -> f64 { self.b.iter().sum::<f64>() / (1.0 + self.a[0] + self.a[1]) }

    /// Filter state after an infinitely long unit step.
    fn step_state(&self) -> [f64; 2] {
        let gain = self.dc_gain();
        let z1 = self.b[2] - self.a[1] * gain;
        [self.b[1] - self.a[0] * gain + z1, z1]
    }

    fn run(&self, data: &mut [f64], mut z: [f64; 2]) {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        for v in data.iter_mut() {
            let x = *v;
            let y = b0 * x + z[0];
            z[0] = b1 * x - a1 * y + z[1];
            z[1] = b2 * x - a2 * y;
            *v = y;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandPass {
    sections: [Biquad; 2],
}

impl BandPass {
    /// Samples of odd extension added on each side. Shorter traces are not filtered.
    pub const PAD_LEN: usize = 21;

    pub const GPR_LOW_CUT: f64 = 100.0;
    pub const GPR_HIGH_CUT: f64 = 1000.0;
    pub const GPR_SAMPLE_RATE: f64 = 4000.0;

    /// Designs a band-pass for the given corner frequencies in Hz.
    ///
    /// # Errors
    /// [`PipelineError::InvalidFilter`] unless `0 < low_cut < high_cut < sample_rate / 2`.
    pub fn new(low_cut: f64, high_cut: f64, sample_rate: f64) -> Result<Self, PipelineError> {
        let valid = low_cut > 0.0 && low_cut < high_cut && high_cut < sample_rate / 2.0;
        if !valid {
            return Err(PipelineError::InvalidFilter { low_cut, high_cut, sample_rate });
        }
        Ok(Self::design(low_cut, high_cut, sample_rate))
    }

    /// The 100-1000 Hz band used for GPR traces sampled at 4 kHz.
    pub fn gpr() -> Self { Self::design(Self::GPR_LOW_CUT, Self::GPR_HIGH_CUT, Self::GPR_SAMPLE_RATE) }

    fn design(low_cut: f64, high_cut: f64, sample_rate: f64) -> Self {
        Self {
            sections: [
                Biquad::high_pass(low_cut, sample_rate),
                Biquad::low_pass(high_cut, sample_rate),
            ],
        }
    }

    /// Filters `samples` forward and backward. Traces of at most
    /// [`PAD_LEN`](Self::PAD_LEN) samples are returned unchanged.
    pub fn apply(&self, samples: &[f64]) -> Vec<f64> {
        let n = samples.len();
        let pad = Self::PAD_LEN;
        if n <= pad {
            return samples.to_vec();
        }

        let (first, last) = (samples[0], samples[n - 1]);
        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - samples[i]));
        ext.extend_from_slice(samples);
        ext.extend((1..=pad).map(|i| 2.0 * last - samples[n - 1 - i]));

        self.cascade(&mut ext);
        ext.reverse();
        self.cascade(&mut ext);
        ext.reverse();
        ext.drain(pad..pad + n).collect()
    }

    fn cascade(&self, data: &mut [f64]) {
        let mut level = data[0];
        for section in &self.sections {
            section.run(data, section.step_state().map(|z| z * level));
            level *= section.dc_gain();
        }
    }
}
