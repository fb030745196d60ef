use std::io::{Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hound::{WavSpec, WavWriter};

fn spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

/// Writes mono 32-bit float samples as a WAV stream.
pub fn write_wav<W: Write + Seek>(writer: W, samples: &[f32], sample_rate: u32) -> Result<()> {
    let mut wav_writer = WavWriter::new(writer, spec(sample_rate))?;
    for &sample in samples {
        wav_writer.write_sample(sample)?;
    }
    wav_writer.finalize()?;
    Ok(())
}

/// Encodes mono samples into an in-memory WAV file.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let mut wav = vec![];
    write_wav(std::io::Cursor::new(&mut wav), samples, sample_rate)?;
    Ok(wav)
}

pub fn save_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Unable to create '{}'", path.display()))?;
    write_wav(std::io::BufWriter::new(file), samples, sample_rate)
        .with_context(|| format!("Unable to write '{}'", path.display()))
}

/// Scales the buffer so its peak sits at `headroom`, if it is louder.
pub fn normalize(samples: &mut [f32], headroom: f32) {
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if peak > headroom {
        let factor = headroom / peak;
        for sample in samples.iter_mut() {
            *sample *= factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_round_trip() {
        let samples = [0.0f32, 0.5, -0.25, 1.0];
        let bytes = encode_wav(&samples, 48000).unwrap();

        let mut reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 48000);
        assert_eq!(reader.spec().channels, 1);
        let decoded: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_normalize() {
        let mut samples = [0.0f32, 2.0, -1.0];
        normalize(&mut samples, 0.5);
        assert_eq!(samples, [0.0, 0.5, -0.25]);

        let mut quiet = [0.1f32, -0.2];
        normalize(&mut quiet, 0.5);
        assert_eq!(quiet, [0.1, -0.2]);
    }
}
