//! Per-frame LPC analysis and resynthesis.

use serde::Serialize;

use crate::{
    analysis::{LpcAnalyzer, LpcModel, PitchDetector},
    buffer::rms,
    condition::FrameLayout,
    constants::LPC_ORDER,
    control::ControlSnapshot,
    transform::{self, Resampler},
};

pub use self::excitation::{Excitation, ExcitationKind};
pub use self::synthesis::SynthesisFilter;

mod excitation;
mod synthesis;

/// Parameters of the last processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameReport {
    /// Model used for synthesis, after quantization and reversal
    pub model: LpcModel,
    /// Excitation period in samples, after pitch scaling
    pub period: usize,
    pub confidence: f64,
    pub voiced: bool,
    pub residual_rms: f64,
    pub fundamental_hz: f64,
    /// Resampling factor the model was analyzed with
    pub tract_stretch: f64,
    /// Saturated output samples
    pub clipped: usize,
}

impl Default for FrameReport {
    fn default() -> Self {
        Self {
            model: LpcModel::identity(),
            period: 0,
            confidence: 0.0,
            voiced: false,
            residual_rms: 0.0,
            fundamental_hz: 0.0,
            tract_stretch: 1.0,
            clipped: 0,
        }
    }
}

/// Analysis, transform, excitation and synthesis of one frame. All scratch is
/// allocated up front; [`Vocoder::process`] does not allocate.
#[derive(Debug, Clone)]
pub struct Vocoder {
    sample_rate: usize,
    analyzer: LpcAnalyzer,
    detector: PitchDetector,
    resampler: Resampler,
    excitation: Excitation,
    synthesis: SynthesisFilter,
    residual: Vec<f64>,
    report: FrameReport,
}

impl Vocoder {
    pub fn new(layout: &FrameLayout, seed: u64) -> Self {
        let frame_size = layout.frame_size();
        Self {
            sample_rate: layout.sample_rate(),
            analyzer: LpcAnalyzer::new(),
            detector: PitchDetector::new(layout.sample_rate()),
            resampler: Resampler::new(frame_size),
            excitation: Excitation::new(frame_size, seed),
            synthesis: SynthesisFilter::new(),
            residual: vec![0.0; frame_size],
            report: FrameReport::default(),
        }
    }

    /// Resynthesize `frame` into `output` (same length).
    pub fn process(
        &mut self,
        frame: &[f32],
        output: &mut [f32],
        controls: &ControlSnapshot,
    ) -> &FrameReport {
        let controls = controls.clamped();

        self.resampler.set_factor(controls.resampling_factor as f64);
        let mut model = if self.resampler.factor() != 1.0 {
            self.analyzer.analyze(self.resampler.process(frame))
        } else {
            self.analyzer.analyze(frame)
        };
        if controls.quantization_enabled {
            model = transform::quantize(&model, controls.quantization_bits);
        }
        if controls.reflection_reversal_enabled {
            model = transform::reverse(&model);
        }

        let residual_rms = residual_rms(frame, model.a(), &mut self.residual);

        let pitch = self.detector.detect(frame);
        let period = ((controls.pitch_period_scale_factor as f64 * pitch.period as f64).round()
            as usize)
            .max(1);
        let voiced = pitch.is_voiced(controls.voiced_confidence_threshold as f64);
        let excitation = if voiced {
            self.excitation.voiced(period, residual_rms)
        } else {
            self.excitation.unvoiced(residual_rms)
        };

        let clipped = self.synthesis.run(model.a(), excitation, output);

        self.report = FrameReport {
            model,
            period,
            confidence: pitch.confidence,
            voiced,
            residual_rms,
            fundamental_hz: self.sample_rate as f64 / period as f64,
            tract_stretch: self.resampler.factor(),
            clipped,
        };
        &self.report
    }

    pub fn report(&self) -> &FrameReport {
        &self.report
    }

    /// Excitation of the last processed frame.
    pub fn excitation(&self) -> &Excitation {
        &self.excitation
    }

    pub fn resampler(&self) -> &Resampler {
        &self.resampler
    }
}

/// RMS of the prediction residual `e[i] = Σ a[j]·x[(i + j) mod N]`.
///
/// Indices past the end of the frame wrap around to its start instead of reading zeros.
fn residual_rms(frame: &[f32], a: &[f64; LPC_ORDER + 1], residual: &mut [f64]) -> f64 {
    let n = frame.len().min(residual.len());
    if n == 0 {
        return 0.0;
    }
    for (i, e) in residual[..n].iter_mut().enumerate() {
        *e = a
            .iter()
            .enumerate()
            .map(|(j, aj)| aj * frame[(i + j) % n] as f64)
            .sum();
    }
    let value = rms(&residual[..n]);
    if value.is_finite() { value } else { 0.0 }
}
