//! Seven-stage envelope generator
//!
//! Hold, attack, two decays, sustain and two releases. Every ramp is
//! exponential: the level is multiplied each sample by a per-stage
//! coefficient, so a stage traces a straight line in dB. The coefficient is
//! computed when a stage is entered, from the level actually reached at that
//! moment, which keeps the output continuous across transitions and on
//! release.

use crate::patch::EnvelopeParams;

/// Floor for every envelope level; keeps `ln` finite.
pub const MIN_LEVEL: f64 = 1e-4;

/// Envelope stages, in the order they are visited
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Off,
    Hold,
    Attack,
    Decay1,
    Decay2,
    Sustain,
    Release1,
    Release2,
}

impl Stage {
    /// Stage entered after this one finishes
    fn next(self) -> Stage {
        match self {
            Stage::Off => Stage::Off,
            Stage::Hold => Stage::Attack,
            Stage::Attack => Stage::Decay1,
            Stage::Decay1 => Stage::Decay2,
            Stage::Decay2 => Stage::Sustain,
            Stage::Sustain => Stage::Sustain,
            Stage::Release1 => Stage::Release2,
            Stage::Release2 => Stage::Off,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Off => "off",
            Stage::Hold => "hold",
            Stage::Attack => "attack",
            Stage::Decay1 => "decay1",
            Stage::Decay2 => "decay2",
            Stage::Sustain => "sustain",
            Stage::Release1 => "release1",
            Stage::Release2 => "release2",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Envelope {
    sample_rate: f64,
    params: EnvelopeParams,
    stage: Stage,
    level: f64,
    coefficient: f64,
    /// Stage length in samples; `None` for stages without an end
    duration: Option<u64>,
    counter: u64,
    velocity_scale: f64,
}

impl Envelope {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            params: EnvelopeParams::default(),
            stage: Stage::Off,
            level: MIN_LEVEL,
            coefficient: 1.0,
            duration: None,
            counter: 0,
            velocity_scale: 1.0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Unscaled level of the next sample
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn playing(&self) -> bool {
        self.stage != Stage::Off
    }

    /// Triggers the envelope from silence with the parameters current at
    /// note on.
    pub fn on(&mut self, params: &EnvelopeParams, velocity: f64) {
        self.params = *params;
        let vs = params.velocity_sensitivity;
        self.velocity_scale = vs * velocity + (1.0 - vs);
        self.level = MIN_LEVEL;
        self.enter(Stage::Hold);
    }

    /// Starts the release from the current level, whatever the stage.
    pub fn release(&mut self) {
        if self.stage != Stage::Off {
            self.enter(Stage::Release1);
        }
    }

    /// Silences the envelope immediately.
    pub fn reset(&mut self) {
        self.stage = Stage::Off;
        self.level = MIN_LEVEL;
        self.coefficient = 1.0;
        self.duration = None;
        self.counter = 0;
    }

    /// Fills `out` with the velocity-scaled envelope.
    pub fn perform(&mut self, out: &mut [f64]) {
        for sample in out.iter_mut() {
            while self.duration.is_some_and(|d| self.counter >= d) {
                self.enter(self.stage.next());
            }
            *sample = self.level * self.velocity_scale;
            self.level = (self.level * self.coefficient).max(MIN_LEVEL);
            self.counter += 1;
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.counter = 0;

        let p = &self.params;
        let (target, seconds) = match stage {
            Stage::Off => {
                self.level = MIN_LEVEL;
                self.coefficient = 1.0;
                self.duration = None;
                return;
            }
            Stage::Sustain => {
                self.coefficient = 1.0;
                self.duration = None;
                return;
            }
            Stage::Hold => (self.level, p.hold_time),
            Stage::Attack => (p.attack_level, p.attack_time),
            Stage::Decay1 => (p.decay1_level, p.decay1_time),
            Stage::Decay2 => (p.sustain_level, p.decay2_time),
            // Never rise on release
            Stage::Release1 => (p.release1_level.min(self.level), p.release1_time),
            Stage::Release2 => (MIN_LEVEL, p.release2_time),
        };

        let target = target.max(MIN_LEVEL);
        let samples = (seconds.max(0.0) * self.sample_rate).round() as u64;
        if samples == 0 {
            self.level = target;
            self.coefficient = 1.0;
        } else {
            let start = self.level.max(MIN_LEVEL);
            self.coefficient = (1.0 + (target.ln() - start.ln()) / samples as f64).max(0.0);
        }
        self.duration = Some(samples);
    }
}
