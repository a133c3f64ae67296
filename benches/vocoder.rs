#![feature(test)]

use lpcvoc::{
    Condition, ControlSnapshot, Engine,
    analysis::{LpcAnalyzer, PitchDetector},
    constants::BLOCK_SIZE,
    controls,
};
use test::Bencher;

extern crate test;

fn voice(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / 48000.0;
            0.4 * (2.0 * std::f32::consts::PI * 140.0 * t).sin()
                + 0.1 * (2.0 * std::f32::consts::PI * 710.0 * t).sin()
        })
        .collect()
}

#[bench]
fn one_second(bencher: &mut Bencher) {
    let (_, reader) = controls(ControlSnapshot::default());
    let mut engine = Engine::new(&Condition::default(), reader).unwrap();
    let input = voice(375 * BLOCK_SIZE);
    let mut output = vec![0.0f32; input.len()];

    bencher.iter(|| {
        engine.process(&input, &mut output).unwrap();
    });
}

#[bench]
fn one_second_transformed(bencher: &mut Bencher) {
    let (_, reader) = controls(ControlSnapshot {
        quantization_enabled: true,
        quantization_bits: 4,
        resampling_factor: 0.7,
        ..Default::default()
    });
    let mut engine = Engine::new(&Condition::default(), reader).unwrap();
    let input = voice(375 * BLOCK_SIZE);
    let mut output = vec![0.0f32; input.len()];

    bencher.iter(|| {
        engine.process(&input, &mut output).unwrap();
    });
}

#[bench]
fn lpc_frame(bencher: &mut Bencher) {
    let frame = voice(1024);
    let mut analyzer = LpcAnalyzer::new();
    bencher.iter(|| analyzer.analyze(&frame));
}

#[bench]
fn pitch_frame(bencher: &mut Bencher) {
    let frame = voice(1024);
    let detector = PitchDetector::new(48000);
    bencher.iter(|| detector.detect(&frame));
}
