//! Parameter identifiers
//!
//! A parameter id packs the generator index, the modulation target and the
//! parameter kind into one `u32`: `generator << 24 | target << 8 | kind`.
//! The host/controller layer owns the naming of these ids; the patch store
//! only decodes them.

use std::fmt;

use crate::NUM_GENERATORS;

/// Kind of a patch parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParamTag {
    /// Generator on/off gate
    GeneratorToggle = 1,
    /// Oscillator parameter; the target selects which one
    Osc = 2,
    /// Envelope hold time
    EnvHt = 3,
    /// Envelope attack time
    EnvAr = 4,
    /// Envelope attack level
    EnvAl = 5,
    /// Envelope first decay time
    EnvDr1 = 6,
    /// Envelope first decay level
    EnvDl1 = 7,
    /// Envelope second decay time
    EnvDr2 = 8,
    /// Envelope sustain level
    EnvSl = 9,
    /// Envelope first release time
    EnvRr1 = 10,
    /// Envelope first release level
    EnvRl1 = 11,
    /// Envelope second release time
    EnvRr2 = 12,
    /// Envelope velocity sensitivity
    EnvVs = 13,
    /// LFO frequency
    LfoFreq = 14,
    /// LFO amplitude
    LfoAmp = 15,
    /// LFO velocity sensitivity
    LfoVs = 16,
    /// LFO waveform
    LfoType = 17,
    /// Modulation source selection for a target
    ModType = 18,
}

impl ParamTag {
    /// Every envelope parameter kind, in stage order
    pub const ENVELOPE: [ParamTag; 11] = [
        ParamTag::EnvHt,
        ParamTag::EnvAr,
        ParamTag::EnvAl,
        ParamTag::EnvDr1,
        ParamTag::EnvDl1,
        ParamTag::EnvDr2,
        ParamTag::EnvSl,
        ParamTag::EnvRr1,
        ParamTag::EnvRl1,
        ParamTag::EnvRr2,
        ParamTag::EnvVs,
    ];

    /// Every LFO parameter kind
    pub const LFO: [ParamTag; 4] = [
        ParamTag::LfoFreq,
        ParamTag::LfoAmp,
        ParamTag::LfoVs,
        ParamTag::LfoType,
    ];

    /// Short display name
    pub fn name(self) -> &'static str {
        match self {
            ParamTag::GeneratorToggle => "ON",
            ParamTag::Osc => "OSC",
            ParamTag::EnvHt => "ENV_HT",
            ParamTag::EnvAr => "ENV_AR",
            ParamTag::EnvAl => "ENV_AL",
            ParamTag::EnvDr1 => "ENV_DR1",
            ParamTag::EnvDl1 => "ENV_DL1",
            ParamTag::EnvDr2 => "ENV_DR2",
            ParamTag::EnvSl => "ENV_SL",
            ParamTag::EnvRr1 => "ENV_RR1",
            ParamTag::EnvRl1 => "ENV_RL1",
            ParamTag::EnvRr2 => "ENV_RR2",
            ParamTag::EnvVs => "ENV_VS",
            ParamTag::LfoFreq => "LFO_FREQ",
            ParamTag::LfoAmp => "LFO_AMP",
            ParamTag::LfoVs => "LFO_VS",
            ParamTag::LfoType => "LFO_TYPE",
            ParamTag::ModType => "MOD_TYPE",
        }
    }
}

impl TryFrom<u8> for ParamTag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => ParamTag::GeneratorToggle,
            2 => ParamTag::Osc,
            3 => ParamTag::EnvHt,
            4 => ParamTag::EnvAr,
            5 => ParamTag::EnvAl,
            6 => ParamTag::EnvDr1,
            7 => ParamTag::EnvDl1,
            8 => ParamTag::EnvDr2,
            9 => ParamTag::EnvSl,
            10 => ParamTag::EnvRr1,
            11 => ParamTag::EnvRl1,
            12 => ParamTag::EnvRr2,
            13 => ParamTag::EnvVs,
            14 => ParamTag::LfoFreq,
            15 => ParamTag::LfoAmp,
            16 => ParamTag::LfoVs,
            17 => ParamTag::LfoType,
            18 => ParamTag::ModType,
            other => return Err(other),
        })
    }
}

/// Oscillator input a parameter applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Target {
    /// Not target specific
    Na = 0,
    /// Carrier ratio
    C = 1,
    /// Output amplitude
    A = 2,
    /// Modulator ratio
    M = 3,
    /// Modulation index
    K = 4,
    /// Amplitude modulation skew
    R = 5,
    /// Phase modulation skew
    S = 6,
    /// Portamento time
    Portamento = 7,
    /// Oscillator algorithm
    OscType = 8,
}

/// The six modulatable oscillator inputs
pub const MODULATION_TARGETS: [Target; 6] = [
    Target::C,
    Target::A,
    Target::M,
    Target::K,
    Target::R,
    Target::S,
];

impl Target {
    /// Slot of this target in per-target arrays, if it is modulatable
    #[inline]
    pub fn mod_index(self) -> Option<usize> {
        match self {
            Target::C => Some(0),
            Target::A => Some(1),
            Target::M => Some(2),
            Target::K => Some(3),
            Target::R => Some(4),
            Target::S => Some(5),
            _ => None,
        }
    }

    /// Short display name
    pub fn name(self) -> &'static str {
        match self {
            Target::Na => "NONE",
            Target::C => "C",
            Target::A => "A",
            Target::M => "M",
            Target::K => "K",
            Target::R => "R",
            Target::S => "S",
            Target::Portamento => "PORTAMENTO",
            Target::OscType => "OSC_TYPE",
        }
    }
}

impl TryFrom<u16> for Target {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Target::Na,
            1 => Target::C,
            2 => Target::A,
            3 => Target::M,
            4 => Target::K,
            5 => Target::R,
            6 => Target::S,
            7 => Target::Portamento,
            8 => Target::OscType,
            other => return Err(other),
        })
    }
}

/// Opaque parameter id as delivered by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub u32);

impl ParamId {
    /// Packs generator, kind and target into an id
    pub fn new(generator: u8, tag: ParamTag, target: Target) -> Self {
        ParamId((generator as u32) << 24 | (target as u32) << 8 | tag as u32)
    }

    /// Generator index (may be out of range for foreign ids)
    #[inline]
    pub fn generator(self) -> usize {
        (self.0 >> 24) as usize
    }

    /// Parameter kind, if the low byte names one
    #[inline]
    pub fn tag(self) -> Option<ParamTag> {
        ParamTag::try_from((self.0 & 0xff) as u8).ok()
    }

    /// Target, if the middle bits name one
    #[inline]
    pub fn target(self) -> Option<Target> {
        Target::try_from(((self.0 & 0x00ff_ff00) >> 8) as u16).ok()
    }

    /// Whether the id addresses an existing generator with a known kind and target
    pub fn valid(self) -> bool {
        self.generator() < NUM_GENERATORS && self.tag().is_some() && self.target().is_some()
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}/", self.generator())?;
        match self.tag() {
            Some(tag) => write!(f, "{}", tag.name())?,
            None => write!(f, "?{:#x}", self.0 & 0xff)?,
        }
        match self.target() {
            Some(Target::Na) => Ok(()),
            Some(target) => write!(f, "/{}", target.name()),
            None => write!(f, "/?{:#x}", (self.0 >> 8) & 0xffff),
        }
    }
}
