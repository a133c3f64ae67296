//! Experimental modifications of the vocal tract model before resynthesis.

mod resample;

pub use resample::{Biquad, Resampler};

use crate::{
    analysis::LpcModel,
    constants::{MAX_QUANTIZATION_BITS, MIN_QUANTIZATION_BITS},
};

/// Uniformly quantize a reflection coefficient in `[-1, 1]` to `2^bits - 1` steps.
pub fn quantize_reflection(k: f64, bits: u32) -> f64 {
    let bits = bits.clamp(MIN_QUANTIZATION_BITS, MAX_QUANTIZATION_BITS);
    let steps = ((1u32 << bits) - 1) as f64;
    let q = ((k.clamp(-1.0, 1.0) + 1.0) / 2.0 * steps).round() / steps;
    q * 2.0 - 1.0
}

/// Quantize every reflection coefficient and rebuild `a` from them.
pub fn quantize(model: &LpcModel, bits: u32) -> LpcModel {
    let k = model.k().map(|k| quantize_reflection(k, bits));
    LpcModel::from_reflection(k)
}

/// Reverse the order of the reflection coefficients and rebuild `a`.
pub fn reverse(model: &LpcModel) -> LpcModel {
    let mut k = *model.k();
    k.reverse();
    LpcModel::from_reflection(k)
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use super::{quantize, quantize_reflection, reverse};
    use crate::{analysis::LpcAnalyzer, analysis::LpcModel, constants::LPC_ORDER};

    fn speech_like_model() -> LpcModel {
        // noise through a single resonance
        let mut rng = Pcg32::seed_from_u64(11);
        let mut frame = vec![0.0f64; 1024];
        for i in 2..frame.len() {
            let e = rng.random::<f64>() - 0.5;
            frame[i] = e + 1.3 * frame[i - 1] - 0.6 * frame[i - 2];
        }
        LpcAnalyzer::new().analyze(&frame)
    }

    #[test]
    fn quantizer_levels() {
        assert_eq!(quantize_reflection(-1.0, 2), -1.0);
        assert_eq!(quantize_reflection(1.0, 2), 1.0);
        approx::assert_abs_diff_eq!(quantize_reflection(0.2, 2), 1.0 / 3.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(quantize_reflection(-0.4, 2), -1.0 / 3.0, epsilon = 1e-12);
        assert_eq!(quantize_reflection(3.0, 4), 1.0);
        assert_eq!(quantize_reflection(0.3, 0), quantize_reflection(0.3, 1));
    }

    #[test]
    fn sixteen_bits_round_trip() {
        let model = speech_like_model();
        let quantized = quantize(&model, 16);
        for (a, q) in model.a().iter().zip(quantized.a()) {
            approx::assert_abs_diff_eq!(a, q, epsilon = 1e-3);
        }
    }

    #[test]
    fn one_bit_collapses() {
        let quantized = quantize(&speech_like_model(), 1);
        for &k in quantized.k() {
            assert!(k == -1.0 || k == 1.0, "{k}");
        }
    }

    #[test]
    fn error_within_half_step() {
        let model = speech_like_model();
        for bits in [2, 4, 8, 12] {
            let half_step = 1.0 / ((1u32 << bits) - 1) as f64;
            let q = quantize(&model, bits);
            for (k, kq) in model.k().iter().zip(q.k()) {
                assert!((k - kq).abs() <= half_step + 1e-12, "{bits} bits: {k} -> {kq}");
            }
        }
    }

    #[test]
    fn reversal_is_involution() {
        let model = speech_like_model();
        let once = reverse(&model);
        let mut expected = *model.k();
        expected.reverse();
        assert_eq!(*once.k(), expected);

        let twice = reverse(&once);
        assert_eq!(twice.k(), model.k());
        for (a, b) in model.a().iter().zip(twice.a()) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn identity_survives() {
        let identity = LpcModel::identity();
        assert!(reverse(&identity).is_identity());
        // 0 sits between two levels
        let q = quantize(&identity, 16);
        assert!(q.k().iter().all(|k| k.abs() < 1.0 / 65535.0 + 1e-12));
        assert_eq!(q.a().len(), LPC_ORDER + 1);
    }
}
