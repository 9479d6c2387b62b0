//! Arbitrary-ratio resampler: polyphase interpolation plus a linear blend
//!
//! The input is interpolated onto a grid `phases` times finer by a polyphase
//! bank. Each output lands at fine-grid time `pos + mu` and blends the two
//! neighbouring branch outputs `s(pos)` and `s(pos + 1)` linearly. The time
//! cursor is an integer plus a fraction so the arithmetic never depends on
//! where chunk boundaries fall.

use crate::config::QualitySpec;
use crate::design::design_lowpass;
use crate::error::{ResampleError, Result};
use crate::history::History;
use crate::polyphase::PolyphaseBank;
use crate::resampler::{Resampler, StreamState};
use crate::sample::Sample;
use std::sync::Arc;

/// Largest fine-grid step, keeps the cursor exact in f64
const MAX_STEP: f64 = (1u64 << 52) as f64;

/// Streaming resampler for ratios that are not small fractions, e.g.
/// drifting clocks or ratios known only as floats.
#[derive(Debug, Clone)]
pub struct FractionalResampler<T: Sample> {
    ratio: f64,
    bank: Arc<PolyphaseBank>,
    history: History<T>,
    step_whole: i64,
    step_frac: f64,
    /// Fine-grid index of the next output, relative to the next chunk
    pos: i64,
    mu: f64,
    consumed: u64,
    produced: u64,
    state: StreamState,
}

impl<T: Sample> FractionalResampler<T> {
    /// Construct for `ratio` = output rate / input rate.
    pub fn new(ratio: f64, phases: u32, spec: &QualitySpec) -> Result<Self> {
        validate_ratio(ratio, phases)?;

        // Downsampling moves the band edge to the output Nyquist
        let band_edge = ratio.min(1.0) / phases as f64;
        let design = design_lowpass(band_edge, phases as usize, spec)?;
        let bank = PolyphaseBank::new(&design.taps, phases as usize, spec.precision)?;

        Self::with_bank(ratio, Arc::new(bank))
    }

    /// Construct around an existing interpolation bank.
    pub fn with_bank(ratio: f64, bank: Arc<PolyphaseBank>) -> Result<Self> {
        let phases = u32::try_from(bank.phases())
            .map_err(|_| ResampleError::InvalidRatio(format!("{} phases", bank.phases())))?;
        validate_ratio(ratio, phases)?;

        let step = phases as f64 / ratio;
        if step >= MAX_STEP {
            return Err(ResampleError::InvalidRatio(format!(
                "ratio {} is too small for {} phases",
                ratio, phases
            )));
        }

        log::debug!(
            "Fractional resampler {:.6}: {} phases, {} taps, step {:.6}",
            ratio,
            phases,
            bank.prototype_len(),
            step
        );

        Ok(Self {
            ratio,
            // One extra sample: the blend may reach back into the last chunk
            history: History::new(bank.taps_per_phase()),
            bank,
            step_whole: step.floor() as i64,
            step_frac: step - step.floor(),
            pos: 0,
            mu: 0.0,
            consumed: 0,
            produced: 0,
            state: StreamState::Streaming,
        })
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn phases(&self) -> usize {
        self.bank.phases()
    }

    pub fn bank(&self) -> &Arc<PolyphaseBank> {
        &self.bank
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Group delay in output samples
    pub fn latency(&self) -> f64 {
        let fine_delay = (self.bank.prototype_len() - 1) as f64 / 2.0;
        fine_delay * self.ratio / self.bank.phases() as f64
    }

    pub fn process(&mut self, input: &[T]) -> Result<Vec<T>> {
        let mut output = Vec::with_capacity((input.len() as f64 * self.ratio) as usize + 2);
        self.process_into(input, &mut output)?;
        Ok(output)
    }

    pub fn process_into(&mut self, input: &[T], output: &mut Vec<T>) -> Result<usize> {
        self.ensure_streaming("process")?;
        Ok(self.run(input, i64::MAX, output))
    }

    pub fn flush(&mut self) -> Result<Vec<T>> {
        let mut output = Vec::new();
        self.flush_into(&mut output)?;
        Ok(output)
    }

    pub fn flush_into(&mut self, output: &mut Vec<T>) -> Result<usize> {
        self.ensure_streaming("flush")?;

        let emitted = if self.consumed > 0 {
            let phases = self.bank.phases() as i64;
            // Last fine-grid index touched by real input, relative to the
            // start of the zero padding
            let last = self.bank.prototype_len() as i64 - 1 - phases;
            let zeros = vec![T::default(); self.bank.taps_per_phase() + 1];
            let consumed = self.consumed;
            let emitted = self.run(&zeros, last, output);
            self.consumed = consumed;
            emitted
        } else {
            0
        };

        log::debug!("Flushed {} tail samples after {} in", emitted, self.consumed);
        self.state = StreamState::Finished;
        Ok(emitted)
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.pos = 0;
        self.mu = 0.0;
        self.consumed = 0;
        self.produced = 0;
        self.state = StreamState::Streaming;
    }

    fn ensure_streaming(&self, operation: &str) -> Result<()> {
        match self.state {
            StreamState::Streaming => Ok(()),
            StreamState::Finished => Err(ResampleError::InvalidState(format!(
                "{} called after flush; reset the resampler first",
                operation
            ))),
        }
    }

    /// Fine-grid sample `q` (relative to the current chunk)
    #[inline]
    fn branch(&self, q: i64) -> T::Acc {
        let phases = self.bank.phases() as i64;
        let newest = q.div_euclid(phases) as isize;
        let phase = q.rem_euclid(phases) as usize;
        let window = self.history.window(newest, self.bank.taps_per_phase());
        self.bank.dot(phase, window)
    }

    /// Emit outputs while both neighbours are available and `pos <= last`.
    fn run(&mut self, input: &[T], last: i64, output: &mut Vec<T>) -> usize {
        let phases = self.bank.phases() as i64;
        let len = input.len() as i64;

        self.history.append(input);

        let mut emitted = 0usize;
        while (self.pos + 1).div_euclid(phases) < len && self.pos <= last {
            let s0 = self.branch(self.pos);
            let s1 = self.branch(self.pos + 1);
            let blended = T::scale(s0, 1.0 - self.mu) + T::scale(s1, self.mu);
            output.push(T::from_acc(blended));
            emitted += 1;

            self.mu += self.step_frac;
            if self.mu >= 1.0 {
                self.mu -= 1.0;
                self.pos += 1;
            }
            self.pos += self.step_whole;
        }

        self.pos -= len * phases;
        self.history.commit();
        self.consumed += input.len() as u64;
        self.produced += emitted as u64;
        emitted
    }
}

fn validate_ratio(ratio: f64, phases: u32) -> Result<()> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(ResampleError::InvalidRatio(format!(
            "ratio must be finite and positive, got {}",
            ratio
        )));
    }
    if phases == 0 {
        return Err(ResampleError::InvalidRatio("phases must be positive".to_string()));
    }
    Ok(())
}

impl<T: Sample> Resampler for FractionalResampler<T> {
    type Item = T;

    fn process_into(&mut self, input: &[T], output: &mut Vec<T>) -> Result<usize> {
        FractionalResampler::process_into(self, input, output)
    }

    fn flush_into(&mut self, output: &mut Vec<T>) -> Result<usize> {
        FractionalResampler::flush_into(self, output)
    }

    fn reset(&mut self) {
        FractionalResampler::reset(self)
    }

    fn state(&self) -> StreamState {
        self.state
    }

    fn latency(&self) -> f64 {
        FractionalResampler::latency(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn tone(len: usize, freq: f64) -> Vec<f64> {
        (0..len).map(|n| (2.0 * PI * freq * n as f64).sin()).collect()
    }

    fn run_chunked(r: &mut FractionalResampler<f64>, input: &[f64], chunk: usize) -> Vec<f64> {
        let mut output = Vec::new();
        for piece in input.chunks(chunk) {
            r.process_into(piece, &mut output).unwrap();
        }
        r.flush_into(&mut output).unwrap();
        output
    }

    #[test]
    fn test_chunk_invariance() {
        let input = tone(1500, 0.013);
        for &ratio in &[1.0884353741496599, 0.7311, 2.5, 0.1] {
            let mut r = FractionalResampler::<f64>::new(ratio, 16, &QualitySpec::draft()).unwrap();
            let whole = run_chunked(&mut r, &input, input.len());
            for &chunk in &[1usize, 7, 64, 333] {
                r.reset();
                assert_eq!(run_chunked(&mut r, &input, chunk), whole, "ratio {} chunk {}", ratio, chunk);
            }
        }
    }

    #[test]
    fn test_output_length_tracks_ratio() {
        let input = vec![0.0f64; 10_000];
        for &ratio in &[1.0884353741496599, 0.7311, 3.3] {
            let mut r = FractionalResampler::<f64>::new(ratio, 32, &QualitySpec::draft()).unwrap();
            let mut total = 0usize;
            for piece in input.chunks(7) {
                total += r.process(piece).unwrap().len();
            }
            let expected = 10_000.0 * ratio;
            assert!((total as f64 - expected).abs() <= 2.0, "ratio {}: {} vs {}", ratio, total, expected);
        }
    }

    #[test]
    fn test_tone_survives_resampling() {
        // 0.02 cycles/input sample becomes 0.02 / ratio at the output
        let ratio = 1.37;
        let input = tone(8000, 0.02);
        let mut r = FractionalResampler::<f64>::new(ratio, 64, &QualitySpec::default()).unwrap();
        let output = r.process(&input).unwrap();

        let delay = r.latency();
        let freq = 0.02 / ratio;
        for k in 2000..4000 {
            let expected = (2.0 * PI * freq * (k as f64 - delay)).sin();
            assert!((output[k] - expected).abs() < 2e-3, "sample {}: {} vs {}", k, output[k], expected);
        }
    }

    #[test]
    fn test_downsampling_rejects_alias() {
        // 0.4 cycles/input sample is above the output Nyquist for ratio 0.5
        let input = tone(8000, 0.4);
        let mut r = FractionalResampler::<f64>::new(0.5, 32, &QualitySpec::default()).unwrap();
        let output = r.process(&input).unwrap();
        let peak = output[1000..3000].iter().fold(0.0f64, |m, &x| m.max(x.abs()));
        assert!(peak < 1e-3, "alias amplitude {}", peak);
    }

    #[test]
    fn test_constant_input_stays_constant() {
        let input = vec![0.5f64; 2000];
        let mut r = FractionalResampler::<f64>::new(0.9, 32, &QualitySpec::default()).unwrap();
        let output = r.process(&input).unwrap();
        for &y in &output[200..1500] {
            assert_relative_eq!(y, 0.5, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut r = FractionalResampler::<f32>::new(1.5, 8, &QualitySpec::draft()).unwrap();
        assert!(r.flush().unwrap().is_empty());
        assert!(matches!(r.process(&[1.0]), Err(ResampleError::InvalidState(_))));
        r.reset();
        assert!(r.process(&[]).unwrap().is_empty());
        r.process(&[1.0; 20]).unwrap();
        assert!(!r.flush().unwrap().is_empty());
        assert!(matches!(r.flush(), Err(ResampleError::InvalidState(_))));
    }

    #[test]
    fn test_invalid_ratio() {
        let spec = QualitySpec::draft();
        assert!(matches!(
            FractionalResampler::<f32>::new(f64::NAN, 8, &spec),
            Err(ResampleError::InvalidRatio(_))
        ));
        assert!(matches!(
            FractionalResampler::<f32>::new(-1.0, 8, &spec),
            Err(ResampleError::InvalidRatio(_))
        ));
        assert!(matches!(
            FractionalResampler::<f32>::new(1.0, 0, &spec),
            Err(ResampleError::InvalidRatio(_))
        ));
    }
}
