use sidebands::patch::EnvelopeParams;
use sidebands::synthesis::envelope::{Envelope, Stage, MIN_LEVEL};

const SR: f64 = 44100.0;

fn test_params() -> EnvelopeParams {
    EnvelopeParams {
        hold_time: 0.005,
        attack_time: 0.05,
        attack_level: 1.0,
        decay1_time: 0.05,
        decay1_level: 0.6,
        decay2_time: 0.1,
        sustain_level: 0.4,
        release1_time: 0.05,
        release1_level: 0.1,
        release2_time: 0.1,
        velocity_sensitivity: 0.0,
    }
}

/// Renders sample by sample, recording the stage each sample belongs to.
fn trace(env: &mut Envelope, n: usize) -> Vec<(Stage, f64)> {
    let mut out = [0.0];
    (0..n)
        .map(|_| {
            env.perform(&mut out);
            (env.stage(), out[0])
        })
        .collect()
}

fn values_in(trace: &[(Stage, f64)], stage: Stage) -> Vec<f64> {
    trace
        .iter()
        .filter(|(s, _)| *s == stage)
        .map(|&(_, v)| v)
        .collect()
}

#[test]
fn test_stage_monotonicity() {
    let _ = env_logger::try_init();

    let mut env = Envelope::new(SR);
    env.on(&test_params(), 1.0);
    let samples = trace(&mut env, (0.4 * SR) as usize);

    let hold = values_in(&samples, Stage::Hold);
    let attack = values_in(&samples, Stage::Attack);
    let decay1 = values_in(&samples, Stage::Decay1);
    let decay2 = values_in(&samples, Stage::Decay2);
    let sustain = values_in(&samples, Stage::Sustain);

    println!(
        "hold={} attack={} decay1={} decay2={} sustain={}",
        hold.len(),
        attack.len(),
        decay1.len(),
        decay2.len(),
        sustain.len()
    );
    assert!(!hold.is_empty() && hold.iter().all(|&v| v == MIN_LEVEL));
    assert!(!attack.is_empty() && !decay1.is_empty() && !decay2.is_empty() && !sustain.is_empty());

    assert!(attack.windows(2).all(|w| w[1] >= w[0]), "attack not rising");
    assert!(*attack.last().unwrap() <= 1.0 + 1e-9);
    println!("attack peak {:.4}", attack.last().unwrap());

    assert!(decay1.windows(2).all(|w| w[1] <= w[0]), "decay1 not falling");
    assert!(decay2.windows(2).all(|w| w[1] <= w[0]), "decay2 not falling");
    assert!(*decay2.last().unwrap() >= 0.4 - 1e-2);

    assert!(sustain.windows(2).all(|w| w[1] == w[0]), "sustain not constant");
    println!("sustain level {:.4}", sustain[0]);
}

#[test]
fn test_release_continuity_from_every_stage() {
    let _ = env_logger::try_init();

    // Offsets land in hold, attack, decay1, decay2 and sustain
    for offset in [100, 1000, 3000, 6000, 12000] {
        let mut env = Envelope::new(SR);
        env.on(&test_params(), 1.0);
        let before = trace(&mut env, offset);
        let stage = before.last().unwrap().0;

        let held = env.level();
        env.release();
        assert_eq!(env.stage(), Stage::Release1);

        let after = trace(&mut env, (0.2 * SR) as usize);
        println!(
            "release from {:?} at {}: held {:.5}, first {:.5}",
            stage, offset, held, after[0].1
        );
        assert_eq!(after[0].1, held, "release from {:?} jumped", stage);

        let values: Vec<f64> = after.iter().map(|&(_, v)| v).collect();
        assert!(
            values.windows(2).all(|w| w[1] <= w[0]),
            "release from {:?} rose",
            stage
        );
        assert_eq!(env.stage(), Stage::Off);
        assert!(!env.playing());
    }
}

#[test]
fn test_repeated_release_stays_continuous() {
    let mut env = Envelope::new(SR);
    env.on(&test_params(), 1.0);
    trace(&mut env, 10000);

    env.release();
    let first = trace(&mut env, 500);
    let held = env.level();
    env.release();
    assert_eq!(env.stage(), Stage::Release1);
    let second = trace(&mut env, 500);

    assert!(second[0].1 <= first.last().unwrap().1);
    assert_eq!(second[0].1, held);
}

#[test]
fn test_velocity_sensitivity_scales_output() {
    let params = EnvelopeParams {
        velocity_sensitivity: 1.0,
        ..test_params()
    };
    let mut loud = Envelope::new(SR);
    let mut soft = Envelope::new(SR);
    loud.on(&params, 1.0);
    soft.on(&params, 0.25);

    let loud = trace(&mut loud, 4000);
    let soft = trace(&mut soft, 4000);
    for ((_, l), (_, s)) in loud.iter().zip(&soft) {
        assert!((l * 0.25 - s).abs() < 1e-12);
    }
}
