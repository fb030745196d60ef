//! Real-time core of a polyphonic sideband FM synthesizer.
//!
//! Each voice runs eight generators. A generator is a ModFM (or analog
//! style) oscillator whose carrier ratio, amplitude, modulator ratio,
//! modulation index and sideband skews can each be driven by an envelope or
//! an LFO. Patch parameters accept sample-accurate automation from the host.
//!
//! ```no_run
//! use sidebands::{Synth, SynthConfig};
//!
//! let mut synth = Synth::new(SynthConfig::default()).unwrap();
//! synth.note_on(1, 1.0, 69);
//! let mut block = vec![0.0f32; 256];
//! synth.process(&mut block);
//! ```

pub mod config;
pub mod dsp;
pub mod patch;
pub mod synth;
pub mod synthesis;
pub mod tags;
pub mod wav;

/// Number of generators per voice
pub const NUM_GENERATORS: usize = 8;

/// Default polyphony
pub const NUM_VOICES: usize = 8;

/// Default number of samples rendered between parameter updates
pub const SAMPLE_ACCURATE_CHUNK_SIZE: usize = 32;

/// Smallest allowed sub-chunk
pub const MIN_CHUNK_SIZE: usize = 8;

pub use config::SynthConfig;
pub use patch::{Breakpoint, GeneratorPatch, ModType, OscType, Patch, ValueQueue};
pub use synth::Synth;
pub use synthesis::PlayerEvent;
pub use tags::{ParamId, ParamTag, Target};
