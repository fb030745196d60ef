//! Patch state persistence
//!
//! Little-endian layout:
//!
//! ```text
//! u32 generator_count
//! per generator:
//!     u32 generator_number
//!     u32 param_count
//!     param_count x (u32 param_id, f64 normalized_value)
//! ```
//!
//! Only parameter values are stored. Envelope stages, LFO phases and
//! oscillator phases always start from idle.

use std::io::{Read, Write};

use anyhow::{anyhow, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};

use super::Patch;
use crate::tags::ParamId;
use crate::NUM_GENERATORS;

impl Patch {
    /// Writes every parameter value to `writer`.
    pub fn save_state<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(NUM_GENERATORS as u32)?;
        for generator in self.generators() {
            let ids = generator.parameter_ids();
            writer.write_u32::<LittleEndian>(generator.index() as u32)?;
            writer.write_u32::<LittleEndian>(ids.len() as u32)?;
            for id in ids {
                let value = self
                    .normalized(id)
                    .ok_or_else(|| anyhow!("Parameter {} has no value", id))?;
                writer.write_u32::<LittleEndian>(id.0)?;
                writer.write_f64::<LittleEndian>(value)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Restores parameter values from `reader`.
    ///
    /// The whole stream is read before anything is applied, so a malformed
    /// stream leaves the patch untouched. Unknown parameter ids are skipped.
    pub fn load_state<R: Read>(&self, reader: &mut R) -> Result<()> {
        let count = reader
            .read_u32::<LittleEndian>()
            .context("Failed to read generator count")?;
        if count as usize != NUM_GENERATORS {
            return Err(anyhow!(
                "Expected {} generators in patch state, found {}",
                NUM_GENERATORS,
                count
            ));
        }

        let mut values = Vec::new();
        for expected in 0..NUM_GENERATORS {
            let gennum = reader
                .read_u32::<LittleEndian>()
                .with_context(|| format!("Failed to read header of generator {}", expected))?;
            if gennum as usize != expected {
                return Err(anyhow!(
                    "Generator number mismatch: expected {}, found {}",
                    expected,
                    gennum
                ));
            }

            let param_count = reader
                .read_u32::<LittleEndian>()
                .with_context(|| format!("Failed to read parameter count of generator {}", expected))?;
            for n in 0..param_count {
                let id = reader
                    .read_u32::<LittleEndian>()
                    .with_context(|| format!("Truncated parameter {} of generator {}", n, expected))?;
                let value = reader
                    .read_f64::<LittleEndian>()
                    .with_context(|| format!("Truncated parameter {} of generator {}", n, expected))?;
                if !value.is_finite() {
                    return Err(anyhow!(
                        "Non-finite value {} for parameter {} of generator {}",
                        value,
                        ParamId(id),
                        expected
                    ));
                }
                values.push((ParamId(id), value));
            }
        }

        let mut applied = 0;
        for (id, value) in values {
            if id.generator() < NUM_GENERATORS && self.set_normalized(id, value) {
                applied += 1;
            } else {
                warn!("Skipping unknown parameter {} in patch state", id);
            }
        }
        debug!("Restored {} parameters", applied);
        Ok(())
    }
}
