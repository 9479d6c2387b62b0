//! One resampler per channel, run in parallel
//!
//! Channels never share mutable state, so each `process` call fans out
//! over rayon's pool. Built from a prototype, all channels share its
//! filter bank through the `Arc`.

use crate::error::{ResampleError, Result};
use crate::resampler::Resampler;
use rayon::prelude::*;

pub struct MultiChannel<R: Resampler> {
    channels: Vec<R>,
}

impl<R: Resampler + Clone> MultiChannel<R> {
    /// `channels` fresh copies of `prototype`
    pub fn from_prototype(mut prototype: R, channels: usize) -> Result<Self> {
        prototype.reset();
        Self::new(vec![prototype; channels])
    }
}

impl<R: Resampler> MultiChannel<R> {
    pub fn new(channels: Vec<R>) -> Result<Self> {
        if channels.is_empty() {
            return Err(ResampleError::InvalidSpec("at least one channel is required".to_string()));
        }
        Ok(Self { channels })
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&R> {
        self.channels.get(index)
    }

    /// Resample one buffer per channel.
    pub fn process_planar(&mut self, inputs: &[&[R::Item]]) -> Result<Vec<Vec<R::Item>>> {
        if inputs.len() != self.channels.len() {
            return Err(ResampleError::ChannelCount {
                expected: self.channels.len(),
                got: inputs.len(),
            });
        }
        self.ensure_streaming()?;

        self.channels
            .par_iter_mut()
            .zip(inputs.par_iter())
            .map(|(resampler, input)| resampler.process(input))
            .collect()
    }

    /// Resample frame-interleaved samples (`c0 c1 .. c0 c1 ..`).
    pub fn process_interleaved(&mut self, input: &[R::Item]) -> Result<Vec<R::Item>> {
        let channels = self.channels.len();
        if input.len() % channels != 0 {
            return Err(ResampleError::ChannelLayout {
                channels,
                len: input.len(),
            });
        }

        let planar = deinterleave(input, channels);
        let views: Vec<&[R::Item]> = planar.iter().map(Vec::as_slice).collect();
        let outputs = self.process_planar(&views)?;
        Ok(interleave(&outputs))
    }

    pub fn flush_planar(&mut self) -> Result<Vec<Vec<R::Item>>> {
        self.ensure_streaming()?;
        self.channels.par_iter_mut().map(|resampler| resampler.flush()).collect()
    }

    pub fn flush_interleaved(&mut self) -> Result<Vec<R::Item>> {
        let outputs = self.flush_planar()?;
        Ok(interleave(&outputs))
    }

    pub fn reset(&mut self) {
        for resampler in &mut self.channels {
            resampler.reset();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.channels.iter().any(|r| r.is_finished())
    }

    // Checked up front so a failure touches no channel
    fn ensure_streaming(&self) -> Result<()> {
        if self.is_finished() {
            return Err(ResampleError::InvalidState(
                "channels were flushed; reset before processing".to_string(),
            ));
        }
        Ok(())
    }
}

fn deinterleave<T: Copy>(input: &[T], channels: usize) -> Vec<Vec<T>> {
    let frames = input.len() / channels;
    let mut planar: Vec<Vec<T>> = (0..channels).map(|_| Vec::with_capacity(frames)).collect();
    for frame in input.chunks_exact(channels) {
        for (channel, &sample) in planar.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    planar
}

/// Interleave equal-length channels; a ragged tail is cut to the shortest.
fn interleave<T: Copy>(planar: &[Vec<T>]) -> Vec<T> {
    let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
    let mut output = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for channel in planar {
            output.push(channel[i]);
        }
    }
    output
}
