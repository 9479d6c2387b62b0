//! Rational resampling ratios

use crate::error::{ResampleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest factor accepted on either side of a ratio
pub const MAX_FACTOR: u32 = 1 << 20;

/// Output rate / input rate as a reduced fraction `up / down`.
///
/// Deserialized values go through [`Ratio::new`], so a `Ratio` is always
/// positive, reduced and within [`MAX_FACTOR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRatio")]
pub struct Ratio {
    up: u32,
    down: u32,
}

#[derive(Deserialize)]
struct RawRatio {
    up: i64,
    down: i64,
}

impl TryFrom<RawRatio> for Ratio {
    type Error = ResampleError;

    fn try_from(raw: RawRatio) -> Result<Self> {
        Ratio::new(raw.up, raw.down)
    }
}

impl Ratio {
    /// Build a ratio from signed factors, reducing to lowest terms.
    pub fn new(up: i64, down: i64) -> Result<Self> {
        if up <= 0 || down <= 0 {
            return Err(ResampleError::InvalidRatio(format!(
                "factors must be positive, got {}/{}",
                up, down
            )));
        }

        let g = gcd(up as u64, down as u64) as i64;
        let (up, down) = (up / g, down / g);

        if up > MAX_FACTOR as i64 || down > MAX_FACTOR as i64 {
            return Err(ResampleError::InvalidRatio(format!(
                "reduced ratio {}/{} exceeds the factor limit {}",
                up, down, MAX_FACTOR
            )));
        }

        Ok(Self {
            up: up as u32,
            down: down as u32,
        })
    }

    /// Ratio between two sample rates (`to_rate / from_rate`)
    pub fn from_rates(from_rate: u32, to_rate: u32) -> Result<Self> {
        Self::new(to_rate as i64, from_rate as i64)
    }

    /// Best rational approximation of `value` with denominator at most
    /// `max_down`, found by continued fraction expansion.
    pub fn approximate(value: f64, max_down: u32) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ResampleError::InvalidRatio(format!(
                "ratio must be finite and positive, got {}",
                value
            )));
        }
        if value > MAX_FACTOR as f64 {
            return Err(ResampleError::InvalidRatio(format!(
                "ratio {} exceeds the factor limit {}",
                value, MAX_FACTOR
            )));
        }
        if max_down == 0 {
            return Err(ResampleError::InvalidRatio(
                "denominator bound must be positive".to_string(),
            ));
        }

        let max_down = max_down.min(MAX_FACTOR);

        // Convergents h/k of the continued fraction of `value`
        let (mut h_prev, mut h) = (1u64, value.floor() as u64);
        let (mut k_prev, mut k) = (0u64, 1u64);
        let mut x = value - value.floor();

        while x > 1e-12 {
            x = 1.0 / x;
            let a = x.floor() as u64;
            let k_next = a.saturating_mul(k).saturating_add(k_prev);
            let h_next = a.saturating_mul(h).saturating_add(h_prev);
            if k_next > max_down as u64 || h_next > MAX_FACTOR as u64 {
                break;
            }
            (h_prev, h) = (h, h_next);
            (k_prev, k) = (k, k_next);
            x -= a as f64;
        }

        if h == 0 {
            // value below 1/max_down rounds to zero; take the smallest step
            h = 1;
            k = max_down as u64;
        }

        Self::new(h as i64, k as i64)
    }

    /// Up-sampling factor `L`
    pub fn up(&self) -> u32 {
        self.up
    }

    /// Down-sampling factor `M`
    pub fn down(&self) -> u32 {
        self.down
    }

    pub fn is_identity(&self) -> bool {
        self.up == self.down
    }

    pub fn as_f64(&self) -> f64 {
        self.up as f64 / self.down as f64
    }

    /// `max(L, M)`, the factor that sets the anti-aliasing band edge
    pub fn band_divisor(&self) -> u32 {
        self.up.max(self.down)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.up, self.down)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduces_to_lowest_terms() {
        let ratio = Ratio::new(48000, 44100).unwrap();
        assert_eq!(ratio.up(), 160);
        assert_eq!(ratio.down(), 147);
        assert_eq!(ratio.to_string(), "160/147");
    }

    #[test]
    fn test_rejects_non_positive_factors() {
        assert!(matches!(Ratio::new(0, 2), Err(ResampleError::InvalidRatio(_))));
        assert!(matches!(Ratio::new(3, -2), Err(ResampleError::InvalidRatio(_))));
    }

    #[test]
    fn test_rejects_huge_factors() {
        assert!(Ratio::new(MAX_FACTOR as i64 + 1, 1).is_err());
        // Reduction brings it back in range
        assert!(Ratio::new(2 * (MAX_FACTOR as i64 + 1), 2 * (MAX_FACTOR as i64 + 1)).is_ok());
    }

    #[test]
    fn test_from_rates() {
        let ratio = Ratio::from_rates(16000, 8000).unwrap();
        assert_eq!((ratio.up(), ratio.down()), (1, 2));
        assert!(Ratio::from_rates(0, 8000).is_err());
    }

    #[test]
    fn test_approximate() {
        let ratio = Ratio::approximate(1.5, 100).unwrap();
        assert_eq!((ratio.up(), ratio.down()), (3, 2));

        let ratio = Ratio::approximate(48000.0 / 44100.0, 1000).unwrap();
        assert_eq!((ratio.up(), ratio.down()), (160, 147));

        let ratio = Ratio::approximate(std::f64::consts::PI, 10).unwrap();
        assert_eq!((ratio.up(), ratio.down()), (22, 7));
    }

    #[test]
    fn test_approximate_stays_within_factor_limit() {
        let err = Ratio::approximate(1e300, 10).unwrap_err();
        assert!(matches!(err, ResampleError::InvalidRatio(ref msg) if msg.contains("factor limit")));

        // 2000001/2 would exceed the limit, so the coarser convergent wins
        let ratio = Ratio::approximate(1_000_000.5, 10).unwrap();
        assert_eq!((ratio.up(), ratio.down()), (1_000_000, 1));
    }

    #[test]
    fn test_deserialize_validates() {
        let ratio: Ratio = serde_json::from_str(r#"{"up":6,"down":4}"#).unwrap();
        assert_eq!((ratio.up(), ratio.down()), (3, 2));

        assert!(serde_json::from_str::<Ratio>(r#"{"up":1,"down":0}"#).is_err());
        assert!(serde_json::from_str::<Ratio>(r#"{"up":-3,"down":2}"#).is_err());
        assert!(toml::from_str::<Ratio>("up = 0\ndown = 1").is_err());
    }

    #[test]
    fn test_approximate_rejects_bad_values() {
        assert!(Ratio::approximate(f64::NAN, 10).is_err());
        assert!(Ratio::approximate(-1.0, 10).is_err());
        assert!(Ratio::approximate(0.0, 10).is_err());
        assert!(Ratio::approximate(1.0, 0).is_err());
    }
}
