use serde::Serialize;

use crate::constants::{LPC_ORDER, SILENCE_ENERGY};

use super::autocorrelation;

/// All-pole model of one frame.
///
/// `a` is the synthesis denominator (`a[0] == 1`), `k` the reflection coefficients
/// of the same model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LpcModel {
    a: [f64; LPC_ORDER + 1],
    k: [f64; LPC_ORDER],
}

impl Default for LpcModel {
    fn default() -> Self {
        Self::identity()
    }
}

impl LpcModel {
    /// `a = [1, 0, ..., 0]`: the filter passes its input through.
    pub fn identity() -> Self {
        let mut a = [0.0; LPC_ORDER + 1];
        a[0] = 1.0;
        Self {
            a,
            k: [0.0; LPC_ORDER],
        }
    }

    /// Rebuild the direct-form coefficients from reflection coefficients (step-up recursion).
    pub fn from_reflection(k: [f64; LPC_ORDER]) -> Self {
        let mut a = [0.0; LPC_ORDER + 1];
        a[0] = 1.0;
        for m in 0..LPC_ORDER {
            let prev = a;
            for i in 1..=m + 1 {
                a[i] = prev[i] + k[m] * prev[m + 1 - i];
            }
        }
        Self { a, k }
    }

    pub fn a(&self) -> &[f64; LPC_ORDER + 1] {
        &self.a
    }

    pub fn k(&self) -> &[f64; LPC_ORDER] {
        &self.k
    }

    pub fn is_identity(&self) -> bool {
        self.a[1..].iter().all(|&x| x == 0.0)
    }
}

/// Levinson-Durbin recursion on autocorrelation values `phi[0..=LPC_ORDER]`.
///
/// A silent frame (`phi[0]` at or below [`SILENCE_ENERGY`]) yields the identity model.
/// When the prediction error stops being positive the recursion ends early and the
/// remaining reflection coefficients stay 0, which leaves a valid lower-order model.
///
/// Based on T. Dutoit, "Unusual teaching short-cuts to the Levinson and lattice
/// algorithms", ICASSP 2004.
pub fn levinson(phi: &[f64; LPC_ORDER + 1]) -> LpcModel {
    let mut model = LpcModel::identity();
    if !phi[0].is_finite() || phi[0] <= SILENCE_ENERGY {
        return model;
    }

    let k = -phi[1] / phi[0];
    if !k.is_finite() {
        return model;
    }
    model.a[1] = k;
    model.k[0] = k;

    for m in 1..LPC_ORDER {
        let mut mu = 0.0;
        let mut alpha = 0.0;
        for i in 0..=m {
            mu += model.a[i] * phi[m + 1 - i];
            alpha += model.a[i] * phi[i];
        }
        if !alpha.is_finite() || alpha <= 0.0 {
            break;
        }
        let k = -mu / alpha;
        if !k.is_finite() {
            break;
        }

        let prev = model.a;
        for i in 1..=m + 1 {
            model.a[i] = prev[i] + prev[m + 1 - i] * k;
        }
        model.k[m] = k;
    }

    model
}

/// Autocorrelation method LPC analysis with preallocated scratch.
#[derive(Debug, Clone)]
pub struct LpcAnalyzer {
    phi: [f64; LPC_ORDER + 1],
}

impl Default for LpcAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LpcAnalyzer {
    pub fn new() -> Self {
        Self {
            phi: [0.0; LPC_ORDER + 1],
        }
    }

    /// Single rectangular window, no pre-emphasis.
    pub fn analyze<T: Copy + Into<f64>>(&mut self, frame: &[T]) -> LpcModel {
        for (lag, phi) in self.phi.iter_mut().enumerate() {
            *phi = autocorrelation(frame, lag);
        }
        levinson(&self.phi)
    }

    /// Autocorrelation values of the last analyzed frame.
    pub fn autocorrelation(&self) -> &[f64; LPC_ORDER + 1] {
        &self.phi
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use super::{LpcAnalyzer, LpcModel, levinson};
    use crate::constants::LPC_ORDER;

    fn ar2(len: usize) -> Vec<f64> {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut x = vec![0.0; len];
        for i in 0..len {
            let e: f64 = rng.random::<f64>() - 0.5;
            let y1 = if i >= 1 { x[i - 1] } else { 0.0 };
            let y2 = if i >= 2 { x[i - 2] } else { 0.0 };
            x[i] = e + 1.6 * y1 - 0.8 * y2;
        }
        x
    }

    #[test]
    fn silent_frame() {
        let model = LpcAnalyzer::new().analyze(&[0.0f32; 1024]);
        assert_eq!(model, LpcModel::identity());
        assert!(model.is_identity());
        assert!(model.k().iter().all(|&k| k == 0.0));
    }

    #[test]
    fn constant_frame_is_finite() {
        let model = LpcAnalyzer::new().analyze(&[0.3f32; 1024]);
        assert!(model.a().iter().all(|a| a.is_finite()));
        assert!(model.k().iter().all(|k| k.is_finite() && k.abs() < 1.0 + 1e-9));
        assert!(model.k()[0] < -0.99);
    }

    #[test]
    fn first_order() {
        // autocorrelation of an AR(1) process with pole 0.5
        let mut phi = [0.0; LPC_ORDER + 1];
        for (l, p) in phi.iter_mut().enumerate() {
            *p = 2.0 * 0.5f64.powi(l as i32);
        }
        let model = levinson(&phi);
        assert_eq!(model.a()[0], 1.0);
        approx::assert_abs_diff_eq!(model.a()[1], -0.5, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(model.k()[0], -0.5, epsilon = 1e-12);
        for (&a, &k) in model.a()[2..].iter().zip(&model.k()[1..]) {
            approx::assert_abs_diff_eq!(a, 0.0, epsilon = 1e-12);
            approx::assert_abs_diff_eq!(k, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn solves_normal_equations() {
        let mut phi = [0.0; LPC_ORDER + 1];
        phi[0] = 2.0;
        phi[1] = 1.0;
        let model = levinson(&phi);
        approx::assert_abs_diff_eq!(model.a()[1], -12.0 / 13.0, epsilon = 1e-12);
        for i in 1..=LPC_ORDER {
            let sum: f64 = (0..=LPC_ORDER)
                .map(|j| model.a()[j] * phi[i.abs_diff(j)])
                .sum();
            approx::assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn recovers_ar2_process() {
        let x = ar2(8192);
        let mut analyzer = LpcAnalyzer::new();
        let model = analyzer.analyze(&x);
        let a = model.a();
        approx::assert_abs_diff_eq!(a[1], -1.6, epsilon = 0.05);
        approx::assert_abs_diff_eq!(a[2], 0.8, epsilon = 0.05);
        assert!(model.k().iter().all(|k| k.abs() < 1.0));

        // higher orders only fit estimation noise, so check the solve itself
        let phi = analyzer.autocorrelation();
        for i in 1..=LPC_ORDER {
            let sum: f64 = (0..=LPC_ORDER).map(|j| a[j] * phi[i.abs_diff(j)]).sum();
            approx::assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-9 * phi[0]);
        }
    }

    #[test]
    fn step_up_matches_levinson() {
        let x = ar2(1024);
        let model = LpcAnalyzer::new().analyze(&x);
        let rebuilt = LpcModel::from_reflection(*model.k());
        for (a, b) in model.a().iter().zip(rebuilt.a()) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn non_finite_energy() {
        let mut phi = [0.0; LPC_ORDER + 1];
        phi[0] = f64::INFINITY;
        assert!(levinson(&phi).is_identity());
    }
}
