//! Polyphase decomposition of a prototype filter
//!
//! Sub-filter `p` holds prototype taps `p, p + L, p + 2L, ...`, zero-padded
//! to a common length. All sub-filters live in one flat buffer with a fixed
//! stride so a branch is a plain slice.

use crate::config::CoefficientPrecision;
use crate::error::{ResampleError, Result};
use crate::sample::Sample;

#[derive(Debug, Clone, PartialEq)]
enum Coefficients {
    Double(Vec<f64>),
    Single(Vec<f32>),
}

/// Immutable bank of `L` interleaved sub-filters.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyphaseBank {
    coefficients: Coefficients,
    phases: usize,
    taps_per_phase: usize,
    prototype_len: usize,
}

impl PolyphaseBank {
    /// Split `taps` into `phases` sub-filters.
    pub fn new(taps: &[f64], phases: usize, precision: CoefficientPrecision) -> Result<Self> {
        if phases == 0 {
            return Err(ResampleError::InvalidRatio(
                "polyphase bank needs at least one phase".to_string(),
            ));
        }
        if taps.is_empty() {
            return Err(ResampleError::InvalidSpec("prototype filter is empty".to_string()));
        }

        let taps_per_phase = taps.len().div_ceil(phases);
        let mut flat = vec![0.0f64; phases * taps_per_phase];

        for (n, &tap) in taps.iter().enumerate() {
            let phase = n % phases;
            let index = n / phases;
            flat[phase * taps_per_phase + index] = tap;
        }

        let coefficients = match precision {
            CoefficientPrecision::Double => Coefficients::Double(flat),
            CoefficientPrecision::Single => {
                Coefficients::Single(flat.into_iter().map(|t| t as f32).collect())
            }
        };

        Ok(Self {
            coefficients,
            phases,
            taps_per_phase,
            prototype_len: taps.len(),
        })
    }

    /// Number of sub-filters (`L`)
    pub fn phases(&self) -> usize {
        self.phases
    }

    /// Length of every sub-filter, `ceil(N / L)`
    pub fn taps_per_phase(&self) -> usize {
        self.taps_per_phase
    }

    /// Length of the prototype filter the bank was built from
    pub fn prototype_len(&self) -> usize {
        self.prototype_len
    }

    pub fn precision(&self) -> CoefficientPrecision {
        match self.coefficients {
            Coefficients::Double(_) => CoefficientPrecision::Double,
            Coefficients::Single(_) => CoefficientPrecision::Single,
        }
    }

    /// Coefficients of sub-filter `phase`, widened to f64
    pub fn sub_filter(&self, phase: usize) -> Vec<f64> {
        let range = self.range(phase);
        match &self.coefficients {
            Coefficients::Double(c) => c[range].to_vec(),
            Coefficients::Single(c) => c[range].iter().map(|&t| t as f64).collect(),
        }
    }

    /// Dot product of sub-filter `phase` with `window`.
    ///
    /// `window` holds exactly `taps_per_phase` samples, oldest first, so
    /// tap 0 meets the newest sample.
    #[inline]
    pub fn dot<T: Sample>(&self, phase: usize, window: &[T]) -> T::Acc {
        debug_assert_eq!(window.len(), self.taps_per_phase);
        let range = self.range(phase);
        match &self.coefficients {
            Coefficients::Double(c) => c[range]
                .iter()
                .zip(window.iter().rev())
                .fold(T::Acc::default(), |acc, (&tap, &x)| acc + x.mul_tap(tap)),
            Coefficients::Single(c) => c[range]
                .iter()
                .zip(window.iter().rev())
                .fold(T::Acc::default(), |acc, (&tap, &x)| acc + x.mul_tap(tap as f64)),
        }
    }

    #[inline]
    fn range(&self, phase: usize) -> std::ops::Range<usize> {
        assert!(phase < self.phases, "phase {} out of {}", phase, self.phases);
        let start = phase * self.taps_per_phase;
        start..start + self.taps_per_phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_split() {
        let taps: Vec<f64> = (0..7).map(|n| n as f64).collect();
        let bank = PolyphaseBank::new(&taps, 3, CoefficientPrecision::Double).unwrap();

        assert_eq!(bank.phases(), 3);
        assert_eq!(bank.taps_per_phase(), 3);
        assert_eq!(bank.prototype_len(), 7);
        assert_eq!(bank.sub_filter(0), vec![0.0, 3.0, 6.0]);
        assert_eq!(bank.sub_filter(1), vec![1.0, 4.0, 0.0]);
        assert_eq!(bank.sub_filter(2), vec![2.0, 5.0, 0.0]);
    }

    #[test]
    fn test_dot_pairs_tap_zero_with_newest() {
        let bank = PolyphaseBank::new(&[1.0, 10.0, 100.0], 1, CoefficientPrecision::Double).unwrap();
        // oldest .. newest
        let window = [3.0f64, 2.0, 1.0];
        assert_eq!(bank.dot(0, &window), 1.0 * 1.0 + 10.0 * 2.0 + 100.0 * 3.0);
    }

    #[test]
    fn test_single_precision_storage() {
        let taps = [0.1f64, 0.2, 0.3, 0.4];
        let bank = PolyphaseBank::new(&taps, 2, CoefficientPrecision::Single).unwrap();
        assert_eq!(bank.precision(), CoefficientPrecision::Single);
        assert_eq!(bank.sub_filter(1), vec![0.2f32 as f64, 0.4f32 as f64]);
    }

    #[test]
    fn test_rejects_zero_phases() {
        assert!(matches!(
            PolyphaseBank::new(&[1.0], 0, CoefficientPrecision::Double),
            Err(ResampleError::InvalidRatio(_))
        ));
    }
}
