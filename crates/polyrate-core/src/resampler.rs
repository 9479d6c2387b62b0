//! Common streaming interface of the resamplers

use crate::error::Result;
use crate::sample::Sample;

/// Lifecycle of a streaming resampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Accepting input
    Streaming,
    /// `flush` has run; only `reset` is allowed
    Finished,
}

/// A stateful sample-rate converter fed chunk by chunk.
///
/// Calls must be serialised per instance; independent instances may run on
/// different threads.
pub trait Resampler: Send {
    type Item: Sample;

    /// Resample `input`, appending to `output`. Returns the number of
    /// samples appended.
    fn process_into(&mut self, input: &[Self::Item], output: &mut Vec<Self::Item>) -> Result<usize>;

    /// Drain the filter tail, appending to `output`, and finish the stream.
    fn flush_into(&mut self, output: &mut Vec<Self::Item>) -> Result<usize>;

    /// Return to the freshly constructed state, keeping the filter.
    fn reset(&mut self);

    fn state(&self) -> StreamState;

    /// Group delay of the filter, in output samples
    fn latency(&self) -> f64;

    fn is_finished(&self) -> bool {
        self.state() == StreamState::Finished
    }

    fn process(&mut self, input: &[Self::Item]) -> Result<Vec<Self::Item>> {
        let mut output = Vec::new();
        self.process_into(input, &mut output)?;
        Ok(output)
    }

    fn flush(&mut self) -> Result<Vec<Self::Item>> {
        let mut output = Vec::new();
        self.flush_into(&mut output)?;
        Ok(output)
    }
}
