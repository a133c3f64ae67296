use crate::constants::{LPC_ORDER, OUTPUT_CEILING};

/// All-pole synthesis filter `y[n] = x[n] - Σ a[j]·y[n-j]`.
///
/// The filter starts from zero state on every frame; continuity between frames comes
/// from the overlap-add. Output samples are saturated at [`OUTPUT_CEILING`] and
/// non-finite samples are replaced by 0, so an unstable model cannot diverge.
#[derive(Debug, Clone, Default)]
pub struct SynthesisFilter {
    history: History,
    clipped: usize,
}

impl SynthesisFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of saturated samples of this frame.
    pub fn run(
        &mut self,
        a: &[f64; LPC_ORDER + 1],
        excitation: &[f64],
        output: &mut [f32],
    ) -> usize {
        self.history.reset();
        self.clipped = 0;
        for (x, y) in excitation.iter().zip(output.iter_mut()) {
            let mut acc = *x;
            for (j, aj) in a.iter().enumerate().skip(1) {
                acc -= aj * self.history.get(j);
            }
            if !acc.is_finite() {
                acc = 0.0;
                self.clipped += 1;
            } else if acc.abs() > OUTPUT_CEILING {
                acc = acc.clamp(-OUTPUT_CEILING, OUTPUT_CEILING);
                self.clipped += 1;
            }
            self.history.push(acc);
            *y = acc as f32;
        }
        self.clipped
    }

    /// Saturated samples of the last frame.
    pub fn clipped(&self) -> usize {
        self.clipped
    }
}

/// Last `LPC_ORDER` outputs.
#[derive(Debug, Clone, Default)]
struct History {
    buffer: [f64; LPC_ORDER],
    index: usize,
}

impl History {
    fn reset(&mut self) {
        self.buffer = [0.0; LPC_ORDER];
        self.index = 0;
    }

    /// `y[n - delay]`, 1 <= delay <= LPC_ORDER
    #[inline(always)]
    fn get(&self, delay: usize) -> f64 {
        self.buffer[(self.index + LPC_ORDER - delay) % LPC_ORDER]
    }

    #[inline(always)]
    fn push(&mut self, y: f64) {
        self.buffer[self.index] = y;
        self.index = (self.index + 1) % LPC_ORDER;
    }
}

#[cfg(test)]
mod tests {
    use super::SynthesisFilter;
    use crate::{
        analysis::LpcModel,
        constants::{LPC_ORDER, OUTPUT_CEILING},
    };

    fn impulse(len: usize) -> Vec<f64> {
        let mut x = vec![0.0; len];
        x[0] = 1.0;
        x
    }

    #[test]
    fn identity_passes_through() {
        let x: Vec<f64> = (0..256).map(|i| ((i % 17) as f64 - 8.0) / 10.0).collect();
        let mut y = vec![0.0f32; 256];
        let clipped = SynthesisFilter::new().run(LpcModel::identity().a(), &x, &mut y);
        assert_eq!(clipped, 0);
        for (x, y) in x.iter().zip(&y) {
            assert_eq!(*x as f32, *y);
        }
    }

    #[test]
    fn first_order_impulse_response() {
        let mut a = [0.0; LPC_ORDER + 1];
        a[0] = 1.0;
        a[1] = -0.5;
        let mut y = vec![0.0f32; 32];
        SynthesisFilter::new().run(&a, &impulse(32), &mut y);
        for (n, y) in y.iter().enumerate() {
            approx::assert_abs_diff_eq!(*y as f64, 0.5f64.powi(n as i32), epsilon = 1e-7);
        }
    }

    #[test]
    fn uses_every_delay() {
        let mut a = [0.0; LPC_ORDER + 1];
        a[0] = 1.0;
        a[LPC_ORDER] = -0.5;
        let mut y = vec![0.0f32; 3 * LPC_ORDER + 1];
        SynthesisFilter::new().run(&a, &impulse(y.len()), &mut y);
        assert_eq!(y[0], 1.0);
        assert_eq!(y[LPC_ORDER], 0.5);
        assert_eq!(y[2 * LPC_ORDER], 0.25);
        assert_eq!(y[1], 0.0);
    }

    #[test]
    fn unstable_model_is_bounded() {
        // pole at 1.5
        let mut a = [0.0; LPC_ORDER + 1];
        a[0] = 1.0;
        a[1] = -1.5;
        let mut y = vec![0.0f32; 2048];
        let mut filter = SynthesisFilter::new();
        let clipped = filter.run(&a, &impulse(2048), &mut y);
        assert!(clipped > 0);
        assert_eq!(filter.clipped(), clipped);
        assert!(y.iter().all(|y| y.is_finite() && (*y as f64).abs() <= OUTPUT_CEILING));
    }

    #[test]
    fn state_is_reset_every_frame() {
        let mut a = [0.0; LPC_ORDER + 1];
        a[0] = 1.0;
        a[1] = -0.9;
        let mut filter = SynthesisFilter::new();
        let mut first = vec![0.0f32; 64];
        filter.run(&a, &impulse(64), &mut first);
        let mut second = vec![0.0f32; 64];
        filter.run(&a, &vec![0.0; 64], &mut second);
        assert!(second.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn non_finite_excitation() {
        let x = [1.0, f64::NAN, f64::INFINITY, 0.5];
        let mut y = [0.0f32; 4];
        let clipped = SynthesisFilter::new().run(LpcModel::identity().a(), &x, &mut y);
        assert_eq!(y, [1.0, 0.0, 0.0, 0.5]);
        assert_eq!(clipped, 2);
    }
}
