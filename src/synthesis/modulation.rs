//! Modulation sources
//!
//! Every modulatable oscillator input may be driven by one source. The set
//! of kinds is closed, so sources are an enum and dispatch happens once per
//! block.

use super::envelope::{Envelope, Stage};
use super::lfo::Lfo;
use crate::patch::{ModParams, ModType};

#[derive(Clone, Debug)]
pub enum ModulationSource {
    Envelope(Envelope),
    Lfo(Lfo),
}

impl ModulationSource {
    /// Builds an idle source of the given kind; `ModType::None` has none.
    pub fn for_type(mod_type: ModType, sample_rate: f64) -> Option<Self> {
        match mod_type {
            ModType::None => None,
            ModType::Envelope => Some(ModulationSource::Envelope(Envelope::new(sample_rate))),
            ModType::Lfo => Some(ModulationSource::Lfo(Lfo::new(sample_rate))),
        }
    }

    pub fn mod_type(&self) -> ModType {
        match self {
            ModulationSource::Envelope(_) => ModType::Envelope,
            ModulationSource::Lfo(_) => ModType::Lfo,
        }
    }

    pub fn on(&mut self, params: &ModParams, velocity: f64) {
        match self {
            ModulationSource::Envelope(env) => env.on(&params.envelope, velocity),
            ModulationSource::Lfo(lfo) => lfo.on(&params.lfo, velocity),
        }
    }

    pub fn release(&mut self) {
        match self {
            ModulationSource::Envelope(env) => env.release(),
            ModulationSource::Lfo(lfo) => lfo.release(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            ModulationSource::Envelope(env) => env.reset(),
            ModulationSource::Lfo(lfo) => lfo.reset(),
        }
    }

    pub fn playing(&self) -> bool {
        match self {
            ModulationSource::Envelope(env) => env.playing(),
            ModulationSource::Lfo(lfo) => lfo.playing(),
        }
    }

    /// Current envelope stage, if this is an envelope
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ModulationSource::Envelope(env) => Some(env.stage()),
            ModulationSource::Lfo(_) => None,
        }
    }

    /// Fills `out` with the next block of modulation values.
    pub fn perform(&mut self, params: &ModParams, out: &mut [f64]) {
        match self {
            ModulationSource::Envelope(env) => env.perform(out),
            ModulationSource::Lfo(lfo) => {
                lfo.update(&params.lfo);
                lfo.perform(out);
            }
        }
    }
}
