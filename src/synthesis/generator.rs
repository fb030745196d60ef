//! One oscillator with its modulation sources
//!
//! Each block, every modulatable input gets a buffer filled with its patch
//! value, multiplied by the output of the source assigned to that input.
//! Those buffers drive the oscillator and the `A` buffer scales the result.

use log::trace;

use super::envelope::Stage;
use super::modulation::ModulationSource;
use super::oscillator::{OscParams, Oscillator};
use crate::dsp::{self, Buffer};
use crate::patch::{GeneratorSnapshot, ModParams, ModType};
use crate::tags::{Target, MODULATION_TARGETS};

const A_INDEX: usize = 1;

/// Source kind actually used for a target. Amplitude always has one.
fn effective_mod_type(index: usize, mod_type: ModType) -> ModType {
    if index == A_INDEX && mod_type == ModType::None {
        ModType::Envelope
    } else {
        mod_type
    }
}

/// Fills `buf` with `base` scaled by the output of the source bound to the
/// target. The source kind is fixed at note on; a `mod_type` edit while the
/// note sounds takes effect on the next trigger.
fn produce(
    source: Option<&mut ModulationSource>,
    params: &ModParams,
    base: f64,
    scratch: &mut Buffer,
    buf: &mut Buffer,
) {
    let frames = buf.len();
    buf.fill(base);
    if let Some(source) = source {
        scratch.resize(frames, 0.0);
        source.perform(params, scratch);
        dsp::mul_inplace(buf, scratch);
    }
}

#[derive(Clone, Debug)]
pub struct Generator {
    index: usize,
    sample_rate: f64,
    oscillator: Oscillator,
    /// Indexed like [`MODULATION_TARGETS`]
    modulators: [Option<ModulationSource>; 6],
    velocity: f64,
    params: OscParams,
    amplitude: Buffer,
    scratch: Buffer,
    out: Buffer,
    reported_stages: [Option<Stage>; 6],
}

impl Generator {
    pub fn new(index: usize, sample_rate: f64) -> Self {
        Self {
            index,
            sample_rate,
            oscillator: Oscillator::new(Default::default()),
            modulators: Default::default(),
            velocity: 0.0,
            params: OscParams::new(0),
            amplitude: Buffer::new(),
            scratch: Buffer::new(),
            out: Buffer::new(),
            reported_stages: [None; 6],
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Audible while the amplitude source plays.
    pub fn playing(&self) -> bool {
        self.modulators[A_INDEX]
            .as_ref()
            .is_some_and(|source| source.playing())
    }

    /// Source currently bound to a target
    pub fn modulator(&self, target: Target) -> Option<&ModulationSource> {
        self.modulators[target.mod_index()?].as_ref()
    }

    /// Rebuilds the sources whose kind no longer matches the patch. A
    /// rebuilt source starts idle.
    fn configure(&mut self, patch: &GeneratorSnapshot) {
        for (i, slot) in self.modulators.iter_mut().enumerate() {
            let wanted = effective_mod_type(i, patch.modulation[i].mod_type);
            let current = slot.as_ref().map(|s| s.mod_type()).unwrap_or(ModType::None);
            if wanted != current {
                trace!(
                    "Generator {} target {}: {:?} -> {:?}",
                    self.index,
                    MODULATION_TARGETS[i].name(),
                    current,
                    wanted
                );
                *slot = ModulationSource::for_type(wanted, self.sample_rate);
            }
        }
    }

    pub fn note_on(&mut self, patch: &GeneratorSnapshot, velocity: f64) {
        let was_playing = self.playing();
        self.configure(patch);
        if self.oscillator.osc_type() != patch.osc_type {
            self.oscillator = Oscillator::new(patch.osc_type);
        } else if !was_playing {
            self.oscillator.reset();
        }

        self.velocity = velocity;
        for (source, params) in self.modulators.iter_mut().zip(&patch.modulation) {
            if let Some(source) = source {
                source.on(params, velocity);
            }
        }
    }

    pub fn note_off(&mut self) {
        for source in self.modulators.iter_mut().flatten() {
            source.release();
        }
    }

    /// Silences every source and rewinds the oscillator.
    pub fn reset(&mut self) {
        for source in self.modulators.iter_mut().flatten() {
            source.reset();
        }
        self.oscillator.reset();
    }

    /// Renders one block into `out`.
    pub fn perform(&mut self, patch: &GeneratorSnapshot, base_freq: f64, out: &mut [f64]) {
        let frames = out.len();
        self.params.resize(frames);
        self.amplitude.resize(frames, 0.0);
        self.params.note_freq.fill(base_freq);

        let [c, a, m, k, r, s] = &mut self.modulators;
        let inputs = [
            (c, &mut self.params.c),
            (a, &mut self.amplitude),
            (m, &mut self.params.m),
            (k, &mut self.params.k),
            (r, &mut self.params.r),
            (s, &mut self.params.s),
        ];
        for (i, (source, buf)) in inputs.into_iter().enumerate() {
            let target = MODULATION_TARGETS[i];
            produce(
                source.as_mut(),
                &patch.modulation[i],
                patch.base_value(target),
                &mut self.scratch,
                buf,
            );
        }

        self.oscillator.perform(self.sample_rate, out, &self.params);
        dsp::mul_inplace(out, &self.amplitude);
    }

    /// Renders one block into the generator's own buffer.
    pub fn render(&mut self, patch: &GeneratorSnapshot, base_freq: f64, frames: usize) -> &[f64] {
        let mut out = std::mem::take(&mut self.out);
        out.resize(frames, 0.0);
        self.perform(patch, base_freq, &mut out);
        self.out = out;
        &self.out
    }

    /// Envelope stages entered since the last call.
    pub fn take_stage_changes(&mut self, mut report: impl FnMut(Target, Stage)) {
        for (i, source) in self.modulators.iter().enumerate() {
            let stage = source.as_ref().and_then(|s| s.stage());
            if stage != self.reported_stages[i] {
                self.reported_stages[i] = stage;
                if let Some(stage) = stage {
                    report(MODULATION_TARGETS[i], stage);
                }
            }
        }
    }

    /// Unmodulated render of a patch, for analysis displays. Does not touch
    /// any running note state.
    pub fn synthesize(sample_rate: f64, patch: &GeneratorSnapshot, base_freq: f64, out: &mut [f64]) {
        let params = OscParams::constant(
            out.len(),
            base_freq,
            patch.c,
            patch.m,
            patch.r,
            patch.s,
            patch.k,
        );
        Oscillator::new(patch.osc_type).perform(sample_rate, out, &params);
    }
}
