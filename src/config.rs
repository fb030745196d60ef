//! Engine configuration
//!
//! ```toml
//! sample_rate = 48000.0
//! chunk_size = 32
//! polyphony = 8
//! ```
//!
//! Missing keys take their defaults.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{MIN_CHUNK_SIZE, NUM_VOICES, SAMPLE_ACCURATE_CHUNK_SIZE};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Output sample rate in Hz
    pub sample_rate: f64,
    /// Samples rendered between parameter updates
    pub chunk_size: usize,
    /// Number of voices; a power of two
    pub polyphony: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            chunk_size: SAMPLE_ACCURATE_CHUNK_SIZE,
            polyphony: NUM_VOICES,
        }
    }
}

impl SynthConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SynthConfig = toml::from_str(s).context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("In config '{}'", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(anyhow!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(anyhow!(
                "Chunk size must be at least {} (got {})",
                MIN_CHUNK_SIZE,
                self.chunk_size
            ));
        }
        if !self.polyphony.is_power_of_two() {
            return Err(anyhow!(
                "Polyphony must be a non-zero power of two (got {})",
                self.polyphony
            ));
        }
        Ok(())
    }
}
