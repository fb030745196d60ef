//! Note rendering: modulation sources, oscillators, generators, voices and
//! the voice pool.

pub mod envelope;
pub mod generator;
pub mod lfo;
pub mod modulation;
pub mod oscillator;
pub mod player;
pub mod voice;

pub use envelope::{Envelope, Stage};
pub use generator::Generator;
pub use lfo::Lfo;
pub use modulation::ModulationSource;
pub use oscillator::{OscParams, Oscillator};
pub use player::{Player, PlayerEvent, VoiceInfo};
pub use voice::{note_frequency, Voice};
