use sidebands::patch::{Breakpoint, ModType};
use sidebands::{ParamId, ParamTag, Patch, Synth, SynthConfig, Target};

fn set(patch: &Patch, tag: ParamTag, target: Target, value: f64) {
    assert!(patch.set_value(ParamId::new(0, tag, target), value), "{:?}/{:?}", tag, target);
}

/// Generator 0 as a plain enveloped sine: K unmodulated at zero, full
/// amplitude, 10 ms attack to full level.
fn attack_patch() -> Patch {
    let patch = Patch::new();
    set(&patch, ParamTag::Osc, Target::C, 1.0);
    set(&patch, ParamTag::Osc, Target::A, 1.0);
    set(&patch, ParamTag::Osc, Target::K, 0.0);
    set(&patch, ParamTag::ModType, Target::K, ModType::None.index() as f64);

    set(&patch, ParamTag::EnvHt, Target::A, 0.0);
    set(&patch, ParamTag::EnvAr, Target::A, 0.01);
    set(&patch, ParamTag::EnvAl, Target::A, 1.0);
    set(&patch, ParamTag::EnvDr1, Target::A, 0.1);
    set(&patch, ParamTag::EnvDl1, Target::A, 0.5);
    set(&patch, ParamTag::EnvSl, Target::A, 0.5);
    set(&patch, ParamTag::EnvRr1, Target::A, 0.1);
    patch
}

#[test]
fn test_attack_scenario() {
    let _ = env_logger::try_init();

    let config = SynthConfig::default();
    let sample_rate = config.sample_rate;
    let mut synth = Synth::with_patch(config, attack_patch().into()).unwrap();
    synth.note_on(1, 1.0, 69);

    let mut block = vec![0.0f32; 64];
    synth.process(&mut block);

    let rms = (block[..10].iter().map(|s| s * s).sum::<f32>() / 10.0).sqrt();
    println!("RMS of first 10 samples: {:e}", rms);
    assert!(rms < 1e-3);

    let mut rest = vec![0.0f32; 1024 - 64];
    synth.process(&mut rest);
    block.extend_from_slice(&rest);

    let (peak_index, peak) = block
        .iter()
        .enumerate()
        .map(|(i, s)| (i, s.abs()))
        .fold((0, 0.0f32), |best, cur| if cur.1 > best.1 { cur } else { best });
    let attack_end = (0.01 * sample_rate) as usize;
    println!("peak {:.4} at sample {} (attack ends at {})", peak, peak_index, attack_end);

    assert!(peak > 0.85 && peak <= 1.0);
    assert!(peak_index + 60 >= attack_end && peak_index <= attack_end + 120);

    // Well before the end of the attack the level is still low
    assert!(block[..300].iter().all(|s| s.abs() < 0.2));
}

#[test]
fn test_mid_block_automation_lands_within_one_chunk() {
    let _ = env_logger::try_init();

    let config = SynthConfig::default();
    let chunk = config.chunk_size;
    let k = ParamId::new(0, ParamTag::Osc, Target::K);
    let (old, new) = (0.1, 0.6);

    let render = |setup: &dyn Fn(&Synth)| {
        let patch = Patch::new();
        // Instant attack, K taken straight from the patch
        set(&patch, ParamTag::EnvAr, Target::A, 0.0);
        set(&patch, ParamTag::ModType, Target::K, ModType::None.index() as f64);
        let mut synth = Synth::with_patch(config.clone(), patch.into()).unwrap();
        synth.note_on(1, 1.0, 60);
        setup(&synth);
        let mut out = vec![0.0f32; 4 * chunk];
        synth.process(&mut out);
        out
    };

    let automated = render(&|synth: &Synth| {
        assert!(synth.begin_parameter_change(
            k,
            &[Breakpoint::new(0, old), Breakpoint::new(2 * chunk as u32 - 1, old), Breakpoint::new(2 * chunk as u32, new)]
        ));
    });
    let before = render(&|synth: &Synth| {
        synth.patch().set_normalized(k, old);
    });
    let after = render(&|synth: &Synth| {
        synth.patch().set_normalized(k, new);
    });

    for i in 0..chunk {
        assert!((automated[i] - before[i]).abs() < 1e-6, "sample {}", i);
    }
    for i in 2 * chunk..4 * chunk {
        assert!((automated[i] - after[i]).abs() < 1e-6, "sample {}", i);
    }
    assert!((2 * chunk..4 * chunk).any(|i| (automated[i] - before[i]).abs() > 1e-3));
}

#[test]
fn test_invalid_parameter_change_is_ignored() {
    let _ = env_logger::try_init();

    let mut reference = Synth::new(SynthConfig::default()).unwrap();
    let mut synth = Synth::new(SynthConfig::default()).unwrap();

    assert!(!synth.begin_parameter_change(ParamId(0x0900_0402), &[Breakpoint::new(0, 1.0)]));
    assert!(!synth.begin_parameter_change(ParamId(0x0000_00fe), &[Breakpoint::new(0, 1.0)]));

    reference.note_on(1, 1.0, 60);
    synth.note_on(1, 1.0, 60);
    let mut a = vec![0.0f32; 256];
    let mut b = vec![0.0f32; 256];
    reference.process(&mut a);
    synth.process(&mut b);
    assert_eq!(a, b);
}

#[test]
fn test_unmatched_note_off_is_dropped() {
    let mut synth = Synth::new(SynthConfig::default()).unwrap();
    synth.note_on(5, 1.0, 60);
    synth.note_off(6, 61);
    assert_eq!(synth.active_voices(), 1);
}
