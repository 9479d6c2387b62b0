//! FFT overlap-add block convolution
//!
//! Filters a real stream in place with an arbitrary FIR. Each block is
//! zero-padded to a power-of-two FFT length of at least
//! `block_size + taps - 1`, multiplied by the filter spectrum and
//! transformed back; the `taps - 1` samples that spill past the block are
//! carried into the next one.

use crate::error::{ResampleError, Result};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

pub struct BlockConvolver {
    block_size: usize,
    taps_len: usize,
    /// Filter spectrum, pre-scaled by 1 / fft_len
    spectrum: Vec<Complex<f64>>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    work: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    overlap: Vec<f64>,
    finished: bool,
}

impl BlockConvolver {
    pub fn new(taps: &[f64], block_size: usize) -> Result<Self> {
        if taps.is_empty() {
            return Err(ResampleError::InvalidSpec("convolver needs at least one tap".to_string()));
        }
        if block_size == 0 {
            return Err(ResampleError::InvalidSpec("block size must be > 0".to_string()));
        }

        let fft_len = (block_size + taps.len() - 1).next_power_of_two();

        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        let scale = 1.0 / fft_len as f64;
        let mut spectrum: Vec<Complex<f64>> = taps
            .iter()
            .map(|&t| Complex::new(t * scale, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(fft_len)
            .collect();
        forward.process(&mut spectrum);

        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        log::debug!(
            "Block convolver: {} taps, block {}, fft {}",
            taps.len(),
            block_size,
            fft_len
        );

        Ok(Self {
            block_size,
            taps_len: taps.len(),
            spectrum,
            forward,
            inverse,
            work: vec![Complex::new(0.0, 0.0); fft_len],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            overlap: vec![0.0; taps.len() - 1],
            finished: false,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn fft_len(&self) -> usize {
        self.work.len()
    }

    pub fn taps_len(&self) -> usize {
        self.taps_len
    }

    /// Filter `samples` in place. Any length is accepted; long buffers are
    /// split into `block_size` pieces.
    pub fn process(&mut self, samples: &mut [f32]) -> Result<()> {
        if self.finished {
            return Err(ResampleError::InvalidState(
                "process called after tail; reset the convolver first".to_string(),
            ));
        }
        for block in samples.chunks_mut(self.block_size) {
            self.process_block(block);
        }
        Ok(())
    }

    /// The `taps - 1` samples still owed after the last input; ends the
    /// stream.
    pub fn tail(&mut self) -> Result<Vec<f32>> {
        if self.finished {
            return Err(ResampleError::InvalidState("tail already taken".to_string()));
        }
        self.finished = true;
        Ok(self.overlap.iter().map(|&x| x as f32).collect())
    }

    pub fn reset(&mut self) {
        self.overlap.iter_mut().for_each(|x| *x = 0.0);
        self.finished = false;
    }

    fn process_block(&mut self, block: &mut [f32]) {
        let n = block.len();

        for (slot, &x) in self.work.iter_mut().zip(block.iter()) {
            *slot = Complex::new(x as f64, 0.0);
        }
        for slot in &mut self.work[n..] {
            *slot = Complex::new(0.0, 0.0);
        }

        self.forward.process_with_scratch(&mut self.work, &mut self.scratch);
        for (bin, &h) in self.work.iter_mut().zip(self.spectrum.iter()) {
            *bin *= h;
        }
        self.inverse.process_with_scratch(&mut self.work, &mut self.scratch);

        let spill = self.overlap.len();
        for (i, out) in block.iter_mut().enumerate() {
            let carried = if i < spill { self.overlap[i] } else { 0.0 };
            *out = (self.work[i].re + carried) as f32;
        }

        // Ascending is safe: index j reads overlap[n + j], never yet written
        for j in 0..spill {
            let carried = if n + j < spill { self.overlap[n + j] } else { 0.0 };
            self.overlap[j] = self.work[n + j].re + carried;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convolve(taps: &[f64], input: &[f32]) -> Vec<f64> {
        let mut out = vec![0.0; input.len() + taps.len() - 1];
        for (i, &x) in input.iter().enumerate() {
            for (j, &h) in taps.iter().enumerate() {
                out[i + j] += x as f64 * h;
            }
        }
        out
    }

    #[test]
    fn test_moving_sum() {
        let mut conv = BlockConvolver::new(&[1.0; 5], 32).unwrap();
        assert_eq!(conv.fft_len(), 64);

        let mut block = vec![1.0f32; 32];
        conv.process(&mut block).unwrap();
        let expected: Vec<f32> = (0..32).map(|i| (i + 1).min(5) as f32).collect();
        for (got, want) in block.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-5);
        }

        // Zeros flush out the 4-sample spill
        let mut block = vec![0.0f32; 32];
        conv.process(&mut block).unwrap();
        assert!((block[0] - 4.0).abs() < 1e-5);
        assert!((block[3] - 1.0).abs() < 1e-5);
        assert!(block[4].abs() < 1e-5);
    }

    #[test]
    fn test_matches_direct_convolution_any_chunking() {
        let taps: Vec<f64> = (0..37).map(|i| ((i as f64) * 0.3).sin() / (i as f64 + 1.0)).collect();
        let input: Vec<f32> = (0..500).map(|n| ((n as f32) * 0.11).cos()).collect();
        let expected = convolve(&taps, &input);

        let mut conv = BlockConvolver::new(&taps, 64).unwrap();
        let mut output = Vec::new();
        let mut start = 0;
        for &len in [1usize, 63, 64, 65, 200, 0, 107].iter() {
            let mut chunk = input[start..start + len].to_vec();
            conv.process(&mut chunk).unwrap();
            output.extend(chunk);
            start += len;
        }
        assert_eq!(start, input.len());
        output.extend(conv.tail().unwrap());

        assert_eq!(output.len(), expected.len());
        for (k, (&got, &want)) in output.iter().zip(expected.iter()).enumerate() {
            assert!((got as f64 - want).abs() < 1e-5, "sample {}: {} vs {}", k, got, want);
        }
    }

    #[test]
    fn test_tail_ends_stream() {
        let mut conv = BlockConvolver::new(&[0.5, 0.5], 8).unwrap();
        let mut block = [2.0f32; 3];
        conv.process(&mut block).unwrap();
        assert_eq!(conv.tail().unwrap().len(), 1);
        assert!(matches!(conv.process(&mut block), Err(ResampleError::InvalidState(_))));
        assert!(conv.tail().is_err());

        conv.reset();
        let mut block = [2.0f32; 1];
        conv.process(&mut block).unwrap();
        assert!((block[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_setup() {
        assert!(BlockConvolver::new(&[], 8).is_err());
        assert!(BlockConvolver::new(&[1.0], 0).is_err());
    }
}
