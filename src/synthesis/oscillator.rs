//! Sideband oscillators
//!
//! Both algorithms are block based: every input is a full buffer so any of
//! them can be modulated per sample. The running sample position persists
//! across blocks, so a sustained note has no discontinuity at block edges.
//!
//! The ModFM form is
//!
//! ```text
//! out = exp(R·K·cos(ωm·t)) · cos(ωc·t + S·K·sin(ωm·t)) / exp(K)
//! ```
//!
//! where `ωc = 2π·f·C` and `ωm = ωc·M`. Dividing by `exp(K)` keeps the peak
//! at or below one for `0 ≤ R ≤ 1`.

use std::f64::consts::TAU;

use crate::dsp::{self, Buffer, DcBlock, Integrator};
use crate::patch::OscType;

/// Per-sample oscillator inputs for one block
#[derive(Clone, Debug)]
pub struct OscParams {
    pub note_freq: Buffer,
    pub c: Buffer,
    pub m: Buffer,
    pub r: Buffer,
    pub s: Buffer,
    pub k: Buffer,
}

impl OscParams {
    pub fn new(frames: usize) -> Self {
        Self {
            note_freq: vec![0.0; frames],
            c: vec![0.0; frames],
            m: vec![0.0; frames],
            r: vec![0.0; frames],
            s: vec![0.0; frames],
            k: vec![0.0; frames],
        }
    }

    /// Inputs held constant over the block
    pub fn constant(frames: usize, note_freq: f64, c: f64, m: f64, r: f64, s: f64, k: f64) -> Self {
        Self {
            note_freq: vec![note_freq; frames],
            c: vec![c; frames],
            m: vec![m; frames],
            r: vec![r; frames],
            s: vec![s; frames],
            k: vec![k; frames],
        }
    }

    pub fn frames(&self) -> usize {
        self.note_freq.len()
    }

    /// Resizes every input buffer, keeping allocations between blocks.
    pub fn resize(&mut self, frames: usize) {
        for buf in [
            &mut self.note_freq,
            &mut self.c,
            &mut self.m,
            &mut self.r,
            &mut self.s,
            &mut self.k,
        ] {
            buf.resize(frames, 0.0);
        }
    }
}

/// Carrier and modulator phase angles for the block starting at `position`.
fn angles(sample_rate: f64, position: f64, params: &OscParams) -> (Buffer, Buffer) {
    let t: Buffer = (0..params.frames())
        .map(|i| (position + i as f64) / sample_rate)
        .collect();

    let mut omega_c = dsp::mul_scalar(&params.note_freq, TAU);
    dsp::mul_inplace(&mut omega_c, &params.c);
    let mut omega_m = dsp::mul(&omega_c, &params.m);

    dsp::mul_inplace(&mut omega_c, &t);
    dsp::mul_inplace(&mut omega_m, &t);
    (omega_c, omega_m)
}

#[derive(Clone, Debug, Default)]
pub struct ModFm {
    position: f64,
}

impl ModFm {
    pub fn perform(&mut self, sample_rate: f64, out: &mut [f64], params: &OscParams) {
        debug_assert_eq!(out.len(), params.frames());
        let (omega_c, omega_m) = angles(sample_rate, self.position, params);
        self.position += out.len() as f64;

        // Amplitude sidebands
        let mut amplitude = dsp::mul(&params.r, &params.k);
        dsp::mul_inplace(&mut amplitude, &dsp::cos(&omega_m));
        dsp::exp_inplace(&mut amplitude);

        // Phase sidebands
        let mut carrier = dsp::mul(&params.s, &params.k);
        dsp::mul_inplace(&mut carrier, &dsp::sin(&omega_m));
        dsp::add_inplace(&mut carrier, &omega_c);
        dsp::cos_inplace(&mut carrier);

        dsp::mul_inplace(&mut amplitude, &carrier);
        dsp::div_inplace(&mut amplitude, &dsp::exp(&params.k));
        out.copy_from_slice(&amplitude);
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
    }
}

/// Pulse train from an exponential ModFM variant, integrated and DC
/// blocked into saw and square-like shapes. `M = 1` gives a saw, `M = 2` a
/// square.
#[derive(Clone, Debug, Default)]
pub struct Analog {
    position: f64,
    integrator: Integrator,
    dc_block: DcBlock,
}

impl Analog {
    pub fn perform(&mut self, sample_rate: f64, out: &mut [f64], params: &OscParams) {
        debug_assert_eq!(out.len(), params.frames());
        let (omega_c, omega_m) = angles(sample_rate, self.position, params);
        self.position += out.len() as f64;

        // Modulation index sets the pulse width
        let k = dsp::mul_scalar(&params.k, 10.0);
        let mut pulse = dsp::mul(&k, &dsp::cos(&omega_m));
        dsp::sub_inplace(&mut pulse, &k);
        dsp::exp_inplace(&mut pulse);
        dsp::mul_inplace(&mut pulse, &dsp::cos(&omega_c));

        self.integrator.filter(&mut pulse);
        self.dc_block.filter(&mut pulse);
        out.copy_from_slice(&pulse);
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
        self.integrator.reset();
        self.dc_block.reset();
    }
}

#[derive(Clone, Debug)]
pub enum Oscillator {
    ModFm(ModFm),
    Analog(Analog),
}

impl Oscillator {
    pub fn new(osc_type: OscType) -> Self {
        match osc_type {
            OscType::ModFm => Oscillator::ModFm(ModFm::default()),
            OscType::Analog => Oscillator::Analog(Analog::default()),
        }
    }

    pub fn osc_type(&self) -> OscType {
        match self {
            Oscillator::ModFm(_) => OscType::ModFm,
            Oscillator::Analog(_) => OscType::Analog,
        }
    }

    pub fn perform(&mut self, sample_rate: f64, out: &mut [f64], params: &OscParams) {
        match self {
            Oscillator::ModFm(osc) => osc.perform(sample_rate, out, params),
            Oscillator::Analog(osc) => osc.perform(sample_rate, out, params),
        }
    }

    /// Rewinds the running position and clears filter state.
    pub fn reset(&mut self) {
        match self {
            Oscillator::ModFm(osc) => osc.reset(),
            Oscillator::Analog(osc) => osc.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 48000.0;

    #[test]
    fn test_pure_carrier_without_index() {
        let mut osc = ModFm::default();
        let params = OscParams::constant(64, 440.0, 1.0, 4.0, 1.0, 0.0, 0.0);
        let mut out = vec![0.0; 64];
        osc.perform(SR, &mut out, &params);
        for (i, &v) in out.iter().enumerate() {
            let expected = (TAU * 440.0 * i as f64 / SR).cos();
            assert!((v - expected).abs() < 1e-9, "sample {}: {} vs {}", i, v, expected);
        }
    }

    #[test]
    fn test_position_persists_across_blocks() {
        let params = OscParams::constant(32, 220.0, 1.0, 2.0, 1.0, 0.3, 2.0);
        let long = OscParams::constant(64, 220.0, 1.0, 2.0, 1.0, 0.3, 2.0);

        let mut split = ModFm::default();
        let mut a = vec![0.0; 32];
        let mut b = vec![0.0; 32];
        split.perform(SR, &mut a, &params);
        split.perform(SR, &mut b, &params);

        let mut whole = ModFm::default();
        let mut c = vec![0.0; 64];
        whole.perform(SR, &mut c, &long);

        a.extend_from_slice(&b);
        for (x, y) in a.iter().zip(&c) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reset_rewinds() {
        let params = OscParams::constant(16, 330.0, 1.5, 3.0, 0.5, 0.0, 1.0);
        let mut osc = Oscillator::new(OscType::ModFm);
        let mut first = vec![0.0; 16];
        osc.perform(SR, &mut first, &params);
        let mut again = vec![0.0; 16];
        osc.reset();
        osc.perform(SR, &mut again, &params);
        assert_eq!(first, again);
    }

    #[test]
    fn test_analog_output_is_finite() {
        let params = OscParams::constant(256, 110.0, 1.0, 1.0, 1.0, 0.0, 0.5);
        let mut osc = Oscillator::new(OscType::Analog);
        assert_eq!(osc.osc_type(), OscType::Analog);
        let mut out = vec![0.0; 256];
        for _ in 0..20 {
            osc.perform(SR, &mut out, &params);
            assert!(out.iter().all(|v| v.is_finite()));
        }
    }
}
