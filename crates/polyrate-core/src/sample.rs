//! Sample types accepted by the resamplers
//!
//! Every sample type names a wide accumulator so that dot products over
//! long filters never accumulate in less than f64 precision.

use rustfft::num_complex::Complex;
use std::fmt::Debug;
use std::ops::Add;

/// A numeric sample that can be filtered and interpolated.
pub trait Sample: Copy + Default + Debug + Send + Sync + 'static {
    /// Wide accumulator used for filter dot products
    type Acc: Copy + Default + Add<Output = Self::Acc>;

    /// Multiply by a filter coefficient, widening to the accumulator
    fn mul_tap(self, tap: f64) -> Self::Acc;

    /// Scale an accumulator (linear interpolation weights)
    fn scale(acc: Self::Acc, weight: f64) -> Self::Acc;

    /// Narrow an accumulator back to the sample type
    fn from_acc(acc: Self::Acc) -> Self;
}

impl Sample for f32 {
    type Acc = f64;

    #[inline]
    fn mul_tap(self, tap: f64) -> f64 {
        self as f64 * tap
    }

    #[inline]
    fn scale(acc: f64, weight: f64) -> f64 {
        acc * weight
    }

    #[inline]
    fn from_acc(acc: f64) -> Self {
        acc as f32
    }
}

impl Sample for f64 {
    type Acc = f64;

    #[inline]
    fn mul_tap(self, tap: f64) -> f64 {
        self * tap
    }

    #[inline]
    fn scale(acc: f64, weight: f64) -> f64 {
        acc * weight
    }

    #[inline]
    fn from_acc(acc: f64) -> Self {
        acc
    }
}

impl Sample for Complex<f32> {
    type Acc = Complex<f64>;

    #[inline]
    fn mul_tap(self, tap: f64) -> Complex<f64> {
        Complex::new(self.re as f64 * tap, self.im as f64 * tap)
    }

    #[inline]
    fn scale(acc: Complex<f64>, weight: f64) -> Complex<f64> {
        acc * weight
    }

    #[inline]
    fn from_acc(acc: Complex<f64>) -> Self {
        Complex::new(acc.re as f32, acc.im as f32)
    }
}

impl Sample for Complex<f64> {
    type Acc = Complex<f64>;

    #[inline]
    fn mul_tap(self, tap: f64) -> Complex<f64> {
        self * tap
    }

    #[inline]
    fn scale(acc: Complex<f64>, weight: f64) -> Complex<f64> {
        acc * weight
    }

    #[inline]
    fn from_acc(acc: Complex<f64>) -> Self {
        acc
    }
}
