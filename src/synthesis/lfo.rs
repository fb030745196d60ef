//! Low frequency oscillator modulation source
//!
//! A free-running sine or cosine. There is no release phase: a note off
//! stops it and rewinds the phase.

use std::f64::consts::TAU;

use crate::patch::{LfoParams, LfoType};

#[derive(Clone, Debug)]
pub struct Lfo {
    sample_rate: f64,
    params: LfoParams,
    phase: f64,
    playing: bool,
    velocity: f64,
}

impl Lfo {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            params: LfoParams::default(),
            phase: 0.0,
            playing: false,
            velocity: 1.0,
        }
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn on(&mut self, params: &LfoParams, velocity: f64) {
        self.params = *params;
        self.velocity = velocity;
        self.phase = 0.0;
        self.playing = true;
    }

    pub fn release(&mut self) {
        self.reset();
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.playing = false;
    }

    /// Picks up parameter automation while the LFO runs.
    pub fn update(&mut self, params: &LfoParams) {
        self.params = *params;
    }

    /// Fills `out` with the scaled waveform, advancing the phase.
    pub fn perform(&mut self, out: &mut [f64]) {
        let p = &self.params;
        let increment = TAU * p.frequency / self.sample_rate;
        let velocity_scale = p.velocity_sensitivity * self.velocity + (1.0 - p.velocity_sensitivity);
        let amplitude = p.amplitude * velocity_scale;

        for sample in out.iter_mut() {
            self.phase += increment;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
            let wave = match p.lfo_type {
                LfoType::Sin => self.phase.sin(),
                LfoType::Cos => self.phase.cos(),
            };
            *sample = wave * amplitude;
        }
    }
}
