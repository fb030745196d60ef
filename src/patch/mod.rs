//! Patch store
//!
//! A [`Patch`] owns one [`GeneratorPatch`] per generator slot. Each generator
//! keeps its whole parameter table behind a single reader/writer lock, so the
//! control thread can automate one generator while the audio thread snapshots
//! another. Renders never hold a lock: they take a [`GeneratorSnapshot`] once
//! per chunk and work from that copy.

pub mod sample_accurate;
pub mod state;

use log::{trace, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::tags::{ParamId, ParamTag, Target, MODULATION_TARGETS};
use crate::NUM_GENERATORS;

pub use sample_accurate::{Breakpoint, SampleAccurateValue, ValueQueue};

/// Modulation source driving one oscillator input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModType {
    #[default]
    None,
    Envelope,
    Lfo,
}

impl ModType {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => ModType::None,
            1 => ModType::Envelope,
            _ => ModType::Lfo,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// LFO waveform
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LfoType {
    #[default]
    Sin,
    Cos,
}

impl LfoType {
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            LfoType::Sin
        } else {
            LfoType::Cos
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Oscillator algorithm
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OscType {
    /// Modified FM with skewable amplitude and phase sidebands
    #[default]
    ModFm,
    /// Exponential pulse train, integrated into analog-style shapes
    Analog,
}

impl OscType {
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            OscType::ModFm
        } else {
            OscType::Analog
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Plain range and default of one parameter
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamInfo {
    pub min: f64,
    pub max: f64,
    pub default: f64,
    /// Control-rate parameter with integral steps
    pub discrete: bool,
}

impl ParamInfo {
    const fn continuous(min: f64, max: f64, default: f64) -> Self {
        Self {
            min,
            max,
            default,
            discrete: false,
        }
    }

    const fn steps(max: f64, default: f64) -> Self {
        Self {
            min: 0.0,
            max,
            default,
            discrete: true,
        }
    }

    /// Range and default for a parameter of generator `generator`, if the
    /// kind/target combination exists.
    pub fn lookup(generator: usize, tag: ParamTag, target: Target) -> Option<Self> {
        let modulated = target.mod_index().is_some();
        match tag {
            ParamTag::GeneratorToggle if target == Target::Na => {
                Some(Self::steps(1.0, if generator == 0 { 1.0 } else { 0.0 }))
            }
            ParamTag::Osc if target == Target::OscType => Some(Self::steps(1.0, 0.0)),
            ParamTag::Osc if modulated || target == Target::Portamento => {
                Some(osc_info(generator, target))
            }
            ParamTag::ModType if modulated => {
                let default = match target {
                    Target::A | Target::K => ModType::Envelope,
                    _ => ModType::None,
                };
                Some(Self::steps(2.0, default.index() as f64))
            }
            ParamTag::LfoType if modulated => Some(Self::steps(1.0, 0.0)),
            ParamTag::LfoFreq | ParamTag::LfoAmp | ParamTag::LfoVs if modulated => {
                Some(lfo_info(tag))
            }
            _ if modulated && envelope_index(tag).is_some() => Some(envelope_info(tag)),
            _ => None,
        }
    }

    /// Maps a plain value into `0..=1`.
    pub fn normalize(&self, plain: f64) -> f64 {
        ((plain - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    /// Maps a normalized value into the plain range, snapping discrete
    /// parameters to the nearest step.
    pub fn plain(&self, normalized: f64) -> f64 {
        let plain = self.min + normalized.clamp(0.0, 1.0) * (self.max - self.min);
        if self.discrete {
            plain.round()
        } else {
            plain
        }
    }
}

fn osc_info(generator: usize, target: Target) -> ParamInfo {
    match target {
        Target::C => ParamInfo::continuous(0.0, 8.0, 1.0 + generator as f64),
        Target::A => ParamInfo::continuous(0.0, 1.0, 0.5),
        Target::M => ParamInfo::continuous(0.0, 8.0, 4.0),
        Target::K => ParamInfo::continuous(0.0, 10.0, 1.0),
        Target::R => ParamInfo::continuous(0.0, 1.0, 1.0),
        Target::S => ParamInfo::continuous(-1.0, 1.0, 0.0),
        _ => ParamInfo::continuous(0.0, 1.0, 0.0),
    }
}

fn envelope_index(tag: ParamTag) -> Option<usize> {
    ParamTag::ENVELOPE.iter().position(|&t| t == tag)
}

fn envelope_info(tag: ParamTag) -> ParamInfo {
    let default = match tag {
        ParamTag::EnvHt => 0.0,
        ParamTag::EnvAr => 0.19,
        ParamTag::EnvAl => 0.9,
        ParamTag::EnvDr1 => 0.2,
        ParamTag::EnvDl1 => 0.5,
        ParamTag::EnvDr2 => 0.5,
        ParamTag::EnvSl => 0.3,
        ParamTag::EnvRr1 => 0.6,
        ParamTag::EnvRl1 => 0.1,
        ParamTag::EnvRr2 => 0.15,
        _ => 1.0,
    };
    ParamInfo::continuous(0.0, 1.0, default)
}

fn lfo_index(tag: ParamTag) -> Option<usize> {
    match tag {
        ParamTag::LfoFreq => Some(0),
        ParamTag::LfoAmp => Some(1),
        ParamTag::LfoVs => Some(2),
        _ => None,
    }
}

fn lfo_info(tag: ParamTag) -> ParamInfo {
    match tag {
        ParamTag::LfoFreq => ParamInfo::continuous(0.0, 20.0, 10.0),
        ParamTag::LfoAmp => ParamInfo::continuous(0.0, 1.0, 0.5),
        _ => ParamInfo::continuous(0.0, 1.0, 1.0),
    }
}

fn value_from(info: ParamInfo) -> SampleAccurateValue {
    SampleAccurateValue::new(info.default, info.min, info.max)
}

/// Envelope settings captured for one target
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeParams {
    pub hold_time: f64,
    pub attack_time: f64,
    pub attack_level: f64,
    pub decay1_time: f64,
    pub decay1_level: f64,
    pub decay2_time: f64,
    pub sustain_level: f64,
    pub release1_time: f64,
    pub release1_level: f64,
    pub release2_time: f64,
    pub velocity_sensitivity: f64,
}

impl EnvelopeParams {
    fn from_values(values: &[SampleAccurateValue; 11]) -> Self {
        Self {
            hold_time: values[0].value(),
            attack_time: values[1].value(),
            attack_level: values[2].value(),
            decay1_time: values[3].value(),
            decay1_level: values[4].value(),
            decay2_time: values[5].value(),
            sustain_level: values[6].value(),
            release1_time: values[7].value(),
            release1_level: values[8].value(),
            release2_time: values[9].value(),
            velocity_sensitivity: values[10].value(),
        }
    }
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        let d = |tag| envelope_info(tag).default;
        Self {
            hold_time: d(ParamTag::EnvHt),
            attack_time: d(ParamTag::EnvAr),
            attack_level: d(ParamTag::EnvAl),
            decay1_time: d(ParamTag::EnvDr1),
            decay1_level: d(ParamTag::EnvDl1),
            decay2_time: d(ParamTag::EnvDr2),
            sustain_level: d(ParamTag::EnvSl),
            release1_time: d(ParamTag::EnvRr1),
            release1_level: d(ParamTag::EnvRl1),
            release2_time: d(ParamTag::EnvRr2),
            velocity_sensitivity: d(ParamTag::EnvVs),
        }
    }
}

/// LFO settings captured for one target
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LfoParams {
    pub lfo_type: LfoType,
    pub frequency: f64,
    pub amplitude: f64,
    pub velocity_sensitivity: f64,
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            lfo_type: LfoType::Sin,
            frequency: 10.0,
            amplitude: 0.5,
            velocity_sensitivity: 1.0,
        }
    }
}

/// Modulation settings of one target
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModParams {
    pub mod_type: ModType,
    pub envelope: EnvelopeParams,
    pub lfo: LfoParams,
}

/// Everything a generator render reads, copied under one read lock
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeneratorSnapshot {
    pub on: bool,
    pub osc_type: OscType,
    pub c: f64,
    pub a: f64,
    pub m: f64,
    pub k: f64,
    pub r: f64,
    pub s: f64,
    pub portamento: f64,
    /// Indexed like [`MODULATION_TARGETS`]
    pub modulation: [ModParams; 6],
}

impl GeneratorSnapshot {
    /// Base (unmodulated) value of a modulation target
    pub fn base_value(&self, target: Target) -> f64 {
        match target {
            Target::C => self.c,
            Target::A => self.a,
            Target::M => self.m,
            Target::K => self.k,
            Target::R => self.r,
            Target::S => self.s,
            Target::Portamento => self.portamento,
            _ => 0.0,
        }
    }
}

/// Modulation parameter table of one target
#[derive(Clone, Debug)]
struct TargetParams {
    mod_type: ModType,
    lfo_type: LfoType,
    envelope: [SampleAccurateValue; 11],
    /// Frequency, amplitude, velocity sensitivity
    lfo: [SampleAccurateValue; 3],
}

impl TargetParams {
    fn new(target: Target) -> Self {
        let mod_type = match target {
            Target::A | Target::K => ModType::Envelope,
            _ => ModType::None,
        };
        Self {
            mod_type,
            lfo_type: LfoType::Sin,
            envelope: ParamTag::ENVELOPE.map(|tag| value_from(envelope_info(tag))),
            lfo: [ParamTag::LfoFreq, ParamTag::LfoAmp, ParamTag::LfoVs]
                .map(|tag| value_from(lfo_info(tag))),
        }
    }

    fn values_mut(&mut self) -> impl Iterator<Item = &mut SampleAccurateValue> {
        self.envelope.iter_mut().chain(self.lfo.iter_mut())
    }

    fn params(&self) -> ModParams {
        ModParams {
            mod_type: self.mod_type,
            envelope: EnvelopeParams::from_values(&self.envelope),
            lfo: LfoParams {
                lfo_type: self.lfo_type,
                frequency: self.lfo[0].value(),
                amplitude: self.lfo[1].value(),
                velocity_sensitivity: self.lfo[2].value(),
            },
        }
    }
}

/// Parameter table of one generator
#[derive(Clone, Debug)]
struct GeneratorParams {
    on: bool,
    osc_type: OscType,
    /// C, A, M, K, R, S, portamento
    osc: [SampleAccurateValue; 7],
    targets: [TargetParams; 6],
}

const OSC_TARGETS: [Target; 7] = [
    Target::C,
    Target::A,
    Target::M,
    Target::K,
    Target::R,
    Target::S,
    Target::Portamento,
];

impl GeneratorParams {
    fn new(generator: usize) -> Self {
        Self {
            on: generator == 0,
            osc_type: OscType::ModFm,
            osc: OSC_TARGETS.map(|target| value_from(osc_info(generator, target))),
            targets: MODULATION_TARGETS.map(TargetParams::new),
        }
    }

    fn values_mut(&mut self) -> impl Iterator<Item = &mut SampleAccurateValue> {
        self.osc
            .iter_mut()
            .chain(self.targets.iter_mut().flat_map(|t| t.values_mut()))
    }

    fn osc_slot(target: Target) -> Option<usize> {
        OSC_TARGETS.iter().position(|&t| t == target)
    }

    fn value(&self, tag: ParamTag, target: Target) -> Option<&SampleAccurateValue> {
        match tag {
            ParamTag::Osc => Self::osc_slot(target).map(|i| &self.osc[i]),
            _ => {
                let t = &self.targets[target.mod_index()?];
                match (envelope_index(tag), lfo_index(tag)) {
                    (Some(i), _) => Some(&t.envelope[i]),
                    (_, Some(i)) => Some(&t.lfo[i]),
                    _ => None,
                }
            }
        }
    }

    fn value_mut(&mut self, tag: ParamTag, target: Target) -> Option<&mut SampleAccurateValue> {
        match tag {
            ParamTag::Osc => match Self::osc_slot(target) {
                Some(i) => Some(&mut self.osc[i]),
                None => None,
            },
            _ => {
                let t = &mut self.targets[target.mod_index()?];
                match (envelope_index(tag), lfo_index(tag)) {
                    (Some(i), _) => Some(&mut t.envelope[i]),
                    (_, Some(i)) => Some(&mut t.lfo[i]),
                    _ => None,
                }
            }
        }
    }

    /// Step index of a discrete parameter
    fn discrete(&self, tag: ParamTag, target: Target) -> Option<usize> {
        match (tag, target) {
            (ParamTag::GeneratorToggle, Target::Na) => Some(self.on as usize),
            (ParamTag::Osc, Target::OscType) => Some(self.osc_type.index()),
            (ParamTag::ModType, t) => Some(self.targets[t.mod_index()?].mod_type.index()),
            (ParamTag::LfoType, t) => Some(self.targets[t.mod_index()?].lfo_type.index()),
            _ => None,
        }
    }

    fn set_discrete(&mut self, tag: ParamTag, target: Target, step: usize) -> bool {
        match (tag, target) {
            (ParamTag::GeneratorToggle, Target::Na) => self.on = step != 0,
            (ParamTag::Osc, Target::OscType) => self.osc_type = OscType::from_index(step),
            (ParamTag::ModType, t) => match t.mod_index() {
                Some(i) => self.targets[i].mod_type = ModType::from_index(step),
                None => return false,
            },
            (ParamTag::LfoType, t) => match t.mod_index() {
                Some(i) => self.targets[i].lfo_type = LfoType::from_index(step),
                None => return false,
            },
            _ => return false,
        }
        true
    }

    fn snapshot(&self) -> GeneratorSnapshot {
        GeneratorSnapshot {
            on: self.on,
            osc_type: self.osc_type,
            c: self.osc[0].value(),
            a: self.osc[1].value(),
            m: self.osc[2].value(),
            k: self.osc[3].value(),
            r: self.osc[4].value(),
            s: self.osc[5].value(),
            portamento: self.osc[6].value(),
            modulation: std::array::from_fn(|i| self.targets[i].params()),
        }
    }
}

/// Parameters of one generator slot
pub struct GeneratorPatch {
    index: usize,
    params: RwLock<GeneratorParams>,
}

impl GeneratorPatch {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            params: RwLock::new(GeneratorParams::new(index)),
        }
    }

    /// Slot number of this generator
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn on(&self) -> bool {
        self.params.read().on
    }

    pub fn c(&self) -> f64 {
        self.params.read().osc[0].value()
    }

    pub fn a(&self) -> f64 {
        self.params.read().osc[1].value()
    }

    pub fn m(&self) -> f64 {
        self.params.read().osc[2].value()
    }

    pub fn k(&self) -> f64 {
        self.params.read().osc[3].value()
    }

    pub fn r(&self) -> f64 {
        self.params.read().osc[4].value()
    }

    pub fn s(&self) -> f64 {
        self.params.read().osc[5].value()
    }

    pub fn portamento(&self) -> f64 {
        self.params.read().osc[6].value()
    }

    pub fn osc_type(&self) -> OscType {
        self.params.read().osc_type
    }

    /// Modulation settings of a target; `None` for non-modulatable targets.
    pub fn modulation_params(&self, target: Target) -> Option<ModParams> {
        let i = target.mod_index()?;
        Some(self.params.read().targets[i].params())
    }

    /// Selected modulation source of a target
    pub fn mod_type_for(&self, target: Target) -> ModType {
        target
            .mod_index()
            .map(|i| self.params.read().targets[i].mod_type)
            .unwrap_or(ModType::None)
    }

    /// Copies every value a render needs.
    pub fn snapshot(&self) -> GeneratorSnapshot {
        self.params.read().snapshot()
    }

    /// All parameter ids owned by this generator
    pub fn parameter_ids(&self) -> Vec<ParamId> {
        let gen = self.index as u8;
        let mut ids = vec![ParamId::new(gen, ParamTag::GeneratorToggle, Target::Na)];
        ids.extend(
            OSC_TARGETS
                .iter()
                .chain(std::iter::once(&Target::OscType))
                .map(|&target| ParamId::new(gen, ParamTag::Osc, target)),
        );
        for target in MODULATION_TARGETS {
            ids.push(ParamId::new(gen, ParamTag::ModType, target));
            ids.extend(
                ParamTag::ENVELOPE
                    .iter()
                    .chain(ParamTag::LFO.iter())
                    .map(|&tag| ParamId::new(gen, tag, target)),
            );
        }
        ids
    }

    fn begin_change<Q: ValueQueue + ?Sized>(&self, tag: ParamTag, target: Target, queue: &Q) -> bool {
        let mut params = self.params.write();
        if let Some(value) = params.value_mut(tag, target) {
            return value.begin_changes(queue);
        }
        let Some(info) = ParamInfo::lookup(self.index, tag, target) else {
            return false;
        };
        // Control-rate parameters take their final value right away
        match queue.last_point().filter(|p| p.value.is_finite()) {
            Some(point) => params.set_discrete(tag, target, info.plain(point.value) as usize),
            None => false,
        }
    }

    fn advance(&self, num_samples: usize) {
        let mut params = self.params.write();
        params.values_mut().for_each(|v| v.advance(num_samples));
    }

    fn end_changes(&self) {
        let mut params = self.params.write();
        params.values_mut().for_each(|v| v.end_changes());
    }

    fn normalized(&self, tag: ParamTag, target: Target) -> Option<f64> {
        let info = ParamInfo::lookup(self.index, tag, target)?;
        let params = self.params.read();
        match params.value(tag, target) {
            Some(value) => Some(value.normalized()),
            None => params
                .discrete(tag, target)
                .map(|step| info.normalize(step as f64)),
        }
    }

    fn set_plain(&self, tag: ParamTag, target: Target, plain: f64) -> bool {
        let mut params = self.params.write();
        if let Some(value) = params.value_mut(tag, target) {
            value.set_value(plain);
            return true;
        }
        if ParamInfo::lookup(self.index, tag, target).is_none() {
            return false;
        }
        params.set_discrete(tag, target, plain.round().max(0.0) as usize)
    }
}

/// The complete set of generator parameters for one instrument
pub struct Patch {
    generators: [GeneratorPatch; NUM_GENERATORS],
}

impl Patch {
    pub fn new() -> Self {
        Self {
            generators: std::array::from_fn(GeneratorPatch::new),
        }
    }

    pub fn generators(&self) -> &[GeneratorPatch] {
        &self.generators
    }

    pub fn generator(&self, index: usize) -> Option<&GeneratorPatch> {
        self.generators.get(index)
    }

    /// Decodes a parameter id into its generator, kind and target.
    fn resolve(&self, id: ParamId) -> Option<(&GeneratorPatch, ParamTag, Target)> {
        if !id.valid() {
            return None;
        }
        let (tag, target) = (id.tag()?, id.target()?);
        ParamInfo::lookup(id.generator(), tag, target)?;
        Some((&self.generators[id.generator()], tag, target))
    }

    /// Routes a breakpoint queue for the upcoming block to the parameter
    /// named by `id`. Unknown ids are logged and dropped.
    pub fn begin_parameter_change<Q: ValueQueue + ?Sized>(&self, id: ParamId, queue: &Q) -> bool {
        let Some((generator, tag, target)) = self.resolve(id) else {
            warn!("Ignoring change for invalid parameter {} ({:#010x})", id, id.0);
            return false;
        };
        if queue.is_empty() {
            return false;
        }
        let installed = generator.begin_change(tag, target, queue);
        if !installed {
            trace!("Parameter {} already has changes queued", id);
        }
        installed
    }

    /// Advances every parameter of every generator by `num_samples`.
    pub fn advance_parameter_changes(&self, num_samples: usize) {
        for generator in &self.generators {
            generator.advance(num_samples);
        }
    }

    /// Flushes all pending automation at the end of a host block.
    pub fn end_parameter_changes(&self) {
        for generator in &self.generators {
            generator.end_changes();
        }
    }

    /// Every parameter id of every generator, in a stable order
    pub fn parameter_ids(&self) -> Vec<ParamId> {
        self.generators
            .iter()
            .flat_map(|g| g.parameter_ids())
            .collect()
    }

    /// Range and default of a parameter
    pub fn param_info(&self, id: ParamId) -> Option<ParamInfo> {
        if !id.valid() {
            return None;
        }
        ParamInfo::lookup(id.generator(), id.tag()?, id.target()?)
    }

    /// Current value of a parameter mapped into `0..=1`
    pub fn normalized(&self, id: ParamId) -> Option<f64> {
        let (generator, tag, target) = self.resolve(id)?;
        generator.normalized(tag, target)
    }

    /// Sets a parameter from a normalized value, dropping queued changes.
    pub fn set_normalized(&self, id: ParamId, normalized: f64) -> bool {
        if !normalized.is_finite() {
            warn!("Ignoring non-finite value for parameter {}", id);
            return false;
        }
        match (self.resolve(id), self.param_info(id)) {
            (Some((generator, tag, target)), Some(info)) => {
                generator.set_plain(tag, target, info.plain(normalized))
            }
            _ => false,
        }
    }

    /// Sets a parameter from a plain value. Discrete parameters take their
    /// step index.
    pub fn set_value(&self, id: ParamId, plain: f64) -> bool {
        if !plain.is_finite() {
            warn!("Ignoring non-finite value for parameter {}", id);
            return false;
        }
        match self.resolve(id) {
            Some((generator, tag, target)) => generator.set_plain(tag, target, plain),
            None => {
                warn!("Ignoring value for invalid parameter {}", id);
                false
            }
        }
    }
}

impl Default for Patch {
    fn default() -> Self {
        Self::new()
    }
}
