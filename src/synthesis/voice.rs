//! A sounding note: one generator per patch slot

use log::trace;
use rayon::prelude::*;

use super::envelope::Stage;
use super::generator::Generator;
use crate::patch::GeneratorSnapshot;
use crate::tags::Target;
use crate::NUM_GENERATORS;

/// Base frequency of a note number. Note 69 is A4 at 440 Hz.
#[inline]
pub fn note_frequency(note: i32) -> f64 {
    440.0 / 32.0 * 2f64.powf((note - 9) as f64 / 12.0)
}

#[derive(Clone, Debug)]
pub struct Voice {
    note_id: Option<i32>,
    pitch: i32,
    timestamp: u64,
    velocity: f64,
    base_freq: f64,
    generators: Vec<Generator>,
}

impl Voice {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            note_id: None,
            pitch: 0,
            timestamp: 0,
            velocity: 0.0,
            base_freq: 0.0,
            generators: (0..NUM_GENERATORS)
                .map(|i| Generator::new(i, sample_rate))
                .collect(),
        }
    }

    /// Note id this slot was last triggered with
    pub fn note_id(&self) -> Option<i32> {
        self.note_id
    }

    pub fn pitch(&self) -> i32 {
        self.pitch
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn base_freq(&self) -> f64 {
        self.base_freq
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn playing(&self) -> bool {
        self.generators.iter().any(|g| g.playing())
    }

    /// Triggers every enabled generator.
    pub fn note_on(
        &mut self,
        patches: &[GeneratorSnapshot],
        note_id: i32,
        pitch: i32,
        velocity: f64,
        timestamp: u64,
    ) {
        self.note_id = Some(note_id);
        self.pitch = pitch;
        self.velocity = velocity;
        self.timestamp = timestamp;
        self.base_freq = note_frequency(pitch);
        trace!(
            "Voice note on: id={} pitch={} freq={:.2} vel={:.2}",
            note_id,
            pitch,
            self.base_freq,
            velocity
        );

        for (generator, patch) in self.generators.iter_mut().zip(patches) {
            if patch.on {
                generator.note_on(patch, velocity);
            }
        }
    }

    /// Releases every generator that is still sounding.
    pub fn note_off(&mut self) {
        for generator in self.generators.iter_mut().filter(|g| g.playing()) {
            generator.note_off();
        }
    }

    /// Silences every generator, as when the voice is stolen.
    pub fn reset(&mut self) {
        for generator in &mut self.generators {
            generator.reset();
        }
    }

    /// Renders one block per sounding, enabled generator. The buffers are
    /// returned unsummed; an idle voice returns none. Generators switched off
    /// while sounding are silenced.
    pub fn perform(&mut self, patches: &[GeneratorSnapshot], frames: usize) -> Vec<&[f64]> {
        for (generator, patch) in self.generators.iter_mut().zip(patches) {
            if !patch.on && generator.playing() {
                trace!("Generator {} disabled while sounding", generator.index());
                generator.reset();
            }
        }
        if !self.playing() {
            return Vec::new();
        }
        let base_freq = self.base_freq;
        self.generators
            .par_iter_mut()
            .zip(patches)
            .filter(|(generator, patch)| patch.on && generator.playing())
            .map(|(generator, patch)| generator.render(patch, base_freq, frames))
            .collect()
    }

    /// Envelope stages entered since the last call, per generator.
    pub fn take_stage_changes(&mut self, mut report: impl FnMut(usize, Target, Stage)) {
        for generator in &mut self.generators {
            let index = generator.index();
            generator.take_stage_changes(|target, stage| report(index, target, stage));
        }
    }
}
