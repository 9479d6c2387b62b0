//! Streaming rational-ratio resampler
//!
//! Conceptually the input is zero-stuffed by `L`, low-pass filtered and
//! decimated by `M`. Output `k` sits at upsampled index `t = k * M`; it is
//! the dot product of sub-filter `t mod L` with the inputs ending at
//! `floor(t / L)`. The zero-stuffed signal is never built.

use crate::config::QualitySpec;
use crate::design::design_for_ratio;
use crate::error::{ResampleError, Result};
use crate::history::History;
use crate::polyphase::PolyphaseBank;
use crate::ratio::Ratio;
use crate::resampler::{Resampler, StreamState};
use crate::sample::Sample;
use std::sync::Arc;


/// Polyphase `L/M` resampler with seamless chunk boundaries.
///
/// Feeding a stream in any chunking yields bit-identical output. After `n`
/// input samples exactly `ceil(n * L / M)` outputs have been produced;
/// `flush` then emits the remaining filter tail.
#[derive(Debug, Clone)]
pub struct RationalResampler<T: Sample> {
    ratio: Ratio,
    bank: Arc<PolyphaseBank>,
    history: History<T>,
    /// Sub-filter of the next output, in `[0, L)`
    phase: usize,
    /// Newest input the next output needs, relative to the next chunk
    next_input: usize,
    consumed: u64,
    produced: u64,
    state: StreamState,
}

impl<T: Sample> RationalResampler<T> {
    /// Construct for `up / down` (output rate / input rate).
    pub fn new(up: i64, down: i64, spec: &QualitySpec) -> Result<Self> {
        Self::from_ratio(Ratio::new(up, down)?, spec)
    }

    pub fn from_ratio(ratio: Ratio, spec: &QualitySpec) -> Result<Self> {
        let design = design_for_ratio(ratio, spec)?;
        let bank = PolyphaseBank::new(&design.taps, ratio.up() as usize, spec.precision)?;
        Self::with_bank(ratio, Arc::new(bank))
    }

    /// Construct around an existing bank, e.g. one shared between channels.
    pub fn with_bank(ratio: Ratio, bank: Arc<PolyphaseBank>) -> Result<Self> {
        if bank.phases() != ratio.up() as usize {
            return Err(ResampleError::InvalidSpec(format!(
                "bank has {} phases, ratio {} needs {}",
                bank.phases(),
                ratio,
                ratio.up()
            )));
        }

        log::debug!(
            "Rational resampler {}: {} taps, {} per phase",
            ratio,
            bank.prototype_len(),
            bank.taps_per_phase()
        );

        Ok(Self {
            ratio,
            history: History::new(bank.taps_per_phase() - 1),
            bank,
            phase: 0,
            next_input: 0,
            consumed: 0,
            produced: 0,
            state: StreamState::Streaming,
        })
    }

    pub fn ratio(&self) -> Ratio {
        self.ratio
    }

    pub fn bank(&self) -> &Arc<PolyphaseBank> {
        &self.bank
    }

    /// Prototype filter length
    pub fn filter_len(&self) -> usize {
        self.bank.prototype_len()
    }

    /// Input samples consumed since construction or reset
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Output samples produced since construction or reset
    pub fn produced(&self) -> u64 {
        self.produced
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Outputs available from `process` after `total_input` samples
    pub fn output_len(&self, total_input: u64) -> u64 {
        let up = self.ratio.up() as u128;
        let down = self.ratio.down() as u128;
        ((total_input as u128 * up).div_ceil(down)) as u64
    }

    /// Total outputs after `flush`, given `total_input` samples
    pub fn flushed_len(&self, total_input: u64) -> u64 {
        if total_input == 0 {
            return 0;
        }
        let up = self.ratio.up() as u128;
        let down = self.ratio.down() as u128;
        let last = (total_input as u128 - 1) * up + self.filter_len() as u128 - 1;
        (last / down + 1) as u64
    }

    /// Group delay in output samples
    pub fn latency(&self) -> f64 {
        (self.filter_len() - 1) as f64 / 2.0 / self.ratio.down() as f64
    }

    pub fn process(&mut self, input: &[T]) -> Result<Vec<T>> {
        let mut output = Vec::with_capacity(self.output_len(input.len() as u64) as usize + 1);
        self.process_into(input, &mut output)?;
        Ok(output)
    }

    pub fn process_into(&mut self, input: &[T], output: &mut Vec<T>) -> Result<usize> {
        self.ensure_streaming("process")?;
        Ok(self.run(input, u64::MAX, output))
    }

    pub fn flush(&mut self) -> Result<Vec<T>> {
        let mut output = Vec::new();
        self.flush_into(&mut output)?;
        Ok(output)
    }

    pub fn flush_into(&mut self, output: &mut Vec<T>) -> Result<usize> {
        self.ensure_streaming("flush")?;

        let consumed = self.consumed;
        let remaining = self.flushed_len(consumed).saturating_sub(self.produced);
        let emitted = if remaining > 0 {
            // Enough implicit zeros to reach every output touching real input
            let zeros = vec![T::default(); self.bank.taps_per_phase()];
            self.run(&zeros, remaining, output)
        } else {
            0
        };
        self.consumed = consumed;

        log::debug!(
            "Flushed {} tail samples after {} in / {} out",
            emitted,
            self.consumed,
            self.produced
        );
        self.state = StreamState::Finished;
        Ok(emitted)
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.phase = 0;
        self.next_input = 0;
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

    /// Run the phase recurrence over `input`, emitting at most `limit`
    /// samples. Infallible, so callers validate before calling.
    fn run(&mut self, input: &[T], limit: u64, output: &mut Vec<T>) -> usize {
        let up = self.ratio.up() as usize;
        let down = self.ratio.down() as usize;
        let width = self.bank.taps_per_phase();
        let len = input.len();

        self.history.append(input);

        let mut emitted = 0usize;
        while self.next_input < len && (emitted as u64) < limit {
            let window = self.history.window(self.next_input as isize, width);
            output.push(T::from_acc(self.bank.dot(self.phase, window)));
            emitted += 1;

            self.phase += down;
            self.next_input += self.phase / up;
            self.phase %= up;
        }

        // Only flush stops on the limit, and the stream ends there
        self.next_input = self.next_input.saturating_sub(len);
        self.history.commit();
        self.consumed += len as u64;
        self.produced += emitted as u64;
        emitted
    }
}

impl<T: Sample> Resampler for RationalResampler<T> {
    type Item = T;

    fn process_into(&mut self, input: &[T], output: &mut Vec<T>) -> Result<usize> {
        RationalResampler::process_into(self, input, output)
    }

    fn flush_into(&mut self, output: &mut Vec<T>) -> Result<usize> {
        RationalResampler::flush_into(self, output)
    }

    fn reset(&mut self) {
        RationalResampler::reset(self)
    }

    fn state(&self) -> StreamState {
        self.state
    }

    fn latency(&self) -> f64 {
        RationalResampler::latency(self)
    }
}
