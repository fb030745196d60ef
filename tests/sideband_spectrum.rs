use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use sidebands::synthesis::oscillator::{ModFm, OscParams};
use sidebands::{ParamId, ParamTag, Patch, Synth, SynthConfig, Target};

const SR: f64 = 48000.0;
/// 0.1 s, so every partial below lands exactly on a 10 Hz bin
const N: usize = 4800;
const BIN_HZ: f64 = SR / N as f64;

// Modified Bessel functions of the first kind at 1
const I0: f64 = 1.266_065_877_752_008;
const I1: f64 = 0.565_159_103_992_485;
const I2: f64 = 0.135_747_669_767_038;
// Bessel functions of the first kind at 1
const J0: f64 = 0.765_197_686_557_967;
const J1: f64 = 0.440_050_585_744_934;
const J2: f64 = 0.114_903_484_931_901;

fn magnitudes(signal: &[f64]) -> Vec<f64> {
    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&s| Complex::new(s, 0.0)).collect();
    FftPlanner::new().plan_fft_forward(buffer.len()).process(&mut buffer);
    buffer[..N / 2].iter().map(|c| c.norm() * 2.0 / N as f64).collect()
}

fn bin(hz: f64) -> usize {
    (hz / BIN_HZ).round() as usize
}

fn render_modfm(r: f64, s: f64) -> Vec<f64> {
    let params = OscParams::constant(N, 1000.0, 1.0, 0.25, r, s, 1.0);
    let mut out = vec![0.0; N];
    ModFm::default().perform(SR, &mut out, &params);
    out
}

/// Checks sideband pairs around 1000 Hz spaced 250 Hz apart against the
/// expected ratios to the carrier.
fn assert_sidebands(spectrum: &[f64], ratios: [f64; 2]) {
    let carrier = spectrum[bin(1000.0)];
    for (n, expected) in ratios.iter().enumerate() {
        let offset = 250.0 * (n + 1) as f64;
        let upper = spectrum[bin(1000.0 + offset)] / carrier;
        let lower = spectrum[bin(1000.0 - offset)] / carrier;
        println!(
            "sideband {}: upper {:.5} lower {:.5} expected {:.5}",
            n + 1,
            upper,
            lower,
            expected
        );
        assert!((upper - expected).abs() < 1e-3, "upper sideband {}", n + 1);
        assert!((lower - expected).abs() < 1e-3, "lower sideband {}", n + 1);
    }

    // Nothing between the sideband lines
    for (i, m) in spectrum.iter().enumerate() {
        let hz = i as f64 * BIN_HZ;
        if (hz % 250.0).abs() > 1e-9 {
            assert!(*m < 1e-6 * carrier, "energy at {} Hz: {:e}", hz, m);
        }
    }
}

#[test]
fn test_amplitude_sidebands_follow_modified_bessel() {
    let _ = env_logger::try_init();
    let spectrum = magnitudes(&render_modfm(1.0, 0.0));
    assert_sidebands(&spectrum, [I1 / I0, I2 / I0]);
}

#[test]
fn test_phase_sidebands_follow_bessel() {
    let _ = env_logger::try_init();
    let spectrum = magnitudes(&render_modfm(0.0, 1.0));
    assert_sidebands(&spectrum, [J1 / J0, J2 / J0]);
}

#[test]
fn test_zero_index_is_a_pure_carrier() {
    let params = OscParams::constant(N, 1000.0, 1.0, 0.25, 1.0, 1.0, 0.0);
    let mut out = vec![0.0; N];
    ModFm::default().perform(SR, &mut out, &params);

    let spectrum = magnitudes(&out);
    let carrier = bin(1000.0);
    assert!((spectrum[carrier] - 1.0).abs() < 1e-9);
    for (i, m) in spectrum.iter().enumerate() {
        if i != carrier {
            assert!(*m < 1e-9, "bin {} = {:e}", i, m);
        }
    }
}

#[test]
fn test_analysis_buffer_matches_generator_settings() {
    let _ = env_logger::try_init();

    let patch = Patch::new();
    for (target, value) in [
        (Target::C, 1.0),
        (Target::M, 0.25),
        (Target::R, 1.0),
        (Target::S, 0.0),
        (Target::K, 1.0),
    ] {
        assert!(patch.set_value(ParamId::new(0, ParamTag::Osc, target), value));
    }

    let config = SynthConfig {
        sample_rate: SR,
        ..SynthConfig::default()
    };
    let synth = Synth::with_patch(config, patch.into()).unwrap();
    let buffer = synth.analysis_buffer(Some(0), 1000.0, N).unwrap();
    assert_sidebands(&magnitudes(&buffer), [I1 / I0, I2 / I0]);
}
