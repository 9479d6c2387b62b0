//! Kaiser-windowed sinc low-pass design
//!
//! Frequencies here are relative to the Nyquist frequency of the rate the
//! filter runs at (1.0 = Nyquist). For a ratio `L/M` that is the upsampled
//! rate `L * fs_in`, and the stopband starts at `1 / max(L, M)`.

use crate::config::QualitySpec;
use crate::error::{ResampleError, Result};
use crate::ratio::Ratio;
use serde::Serialize;
use std::f64::consts::PI;

/// Ceiling on the prototype length whatever the per-branch cap allows
pub const MAX_PROTOTYPE_TAPS: usize = 1 << 22;

/// A designed FIR low-pass filter
#[derive(Debug, Clone, Serialize)]
pub struct FilterDesign {
    /// Impulse response, odd length, symmetric
    pub taps: Vec<f64>,
    /// Kaiser shape parameter
    pub beta: f64,
    /// -6 dB cutoff (Nyquist-relative)
    pub cutoff: f64,
    /// Start of the stopband (Nyquist-relative)
    pub band_edge: f64,
    /// DC gain the taps were normalised to
    pub gain: f64,
}

impl FilterDesign {
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Constant group delay in samples at the design rate
    pub fn group_delay(&self) -> f64 {
        (self.taps.len() - 1) as f64 / 2.0
    }

    fn identity() -> Self {
        Self {
            taps: vec![1.0],
            beta: 0.0,
            cutoff: 1.0,
            band_edge: 1.0,
            gain: 1.0,
        }
    }
}

/// Design the anti-aliasing filter for an `L/M` resampler.
///
/// Ratio `1/1` needs no band limiting and yields the one-tap identity.
pub fn design_for_ratio(ratio: Ratio, spec: &QualitySpec) -> Result<FilterDesign> {
    spec.validate()?;

    if ratio.is_identity() {
        log::debug!("Ratio {} is identity, using single-tap filter", ratio);
        return Ok(FilterDesign::identity());
    }

    let band_edge = 1.0 / ratio.band_divisor() as f64;
    let design = design_lowpass(band_edge, ratio.up() as usize, spec)?;

    log::debug!(
        "Designed {} taps for ratio {} (beta {:.3}, cutoff {:.5})",
        design.len(),
        ratio,
        design.beta,
        design.cutoff
    );

    Ok(design)
}

/// Design a low-pass prototype for a bank of `phases` polyphase branches,
/// with its stopband starting at `band_edge`.
///
/// The transition band spans `band_edge * transition_width` below the
/// edge. The taps are scaled to a DC gain of `phases` so every branch has
/// unity gain. `spec.max_taps` bounds the taps per branch, the work done
/// per output sample. A plain filter is `phases = 1`.
pub fn design_lowpass(band_edge: f64, phases: usize, spec: &QualitySpec) -> Result<FilterDesign> {
    spec.validate()?;

    if !(band_edge > 0.0 && band_edge <= 1.0) {
        return Err(ResampleError::InvalidSpec(format!(
            "band edge {} outside (0, 1]",
            band_edge
        )));
    }
    if phases == 0 {
        return Err(ResampleError::InvalidSpec("phases must be positive".to_string()));
    }
    let gain = phases as f64;

    let transition = band_edge * spec.transition_width;
    let cutoff = band_edge - transition / 2.0;
    let num_taps = kaiser_length(spec.attenuation_db, transition);

    let taps_per_phase = num_taps.div_ceil(phases);
    if taps_per_phase > spec.max_taps {
        return Err(ResampleError::InvalidSpec(format!(
            "{} dB with transition {:.6} needs {} taps per phase, cap is {}",
            spec.attenuation_db, transition, taps_per_phase, spec.max_taps
        )));
    }
    if num_taps > MAX_PROTOTYPE_TAPS {
        return Err(ResampleError::InvalidSpec(format!(
            "{} dB with transition {:.6} needs {} taps, limit is {}",
            spec.attenuation_db, transition, num_taps, MAX_PROTOTYPE_TAPS
        )));
    }

    let beta = kaiser_beta(spec.attenuation_db);
    let center = (num_taps - 1) as f64 / 2.0;

    let mut taps: Vec<f64> = (0..num_taps)
        .map(|i| {
            let n = i as f64 - center;
            cutoff * sinc(cutoff * n) * kaiser_window(i, num_taps, beta)
        })
        .collect();

    let sum: f64 = taps.iter().sum();
    for tap in taps.iter_mut() {
        *tap *= gain / sum;
    }

    Ok(FilterDesign {
        taps,
        beta,
        cutoff,
        band_edge,
        gain,
    })
}

/// Kaiser's shape parameter for a stopband attenuation in dB
pub fn kaiser_beta(attenuation_db: f64) -> f64 {
    if attenuation_db > 50.0 {
        0.1102 * (attenuation_db - 8.7)
    } else if attenuation_db >= 21.0 {
        0.5842 * (attenuation_db - 21.0).powf(0.4) + 0.07886 * (attenuation_db - 21.0)
    } else {
        0.0
    }
}

/// Kaiser's length estimate, rounded up to the next odd number.
///
/// `transition` is Nyquist-relative.
pub fn kaiser_length(attenuation_db: f64, transition: f64) -> usize {
    let delta_omega = PI * transition;
    let estimate = ((attenuation_db - 8.0) / (2.285 * delta_omega)).ceil();
    let n = if estimate.is_finite() && estimate > 0.0 {
        (estimate as usize).saturating_add(1)
    } else {
        1
    };
    n | 1
}

#[inline]
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (x * PI).sin() / (x * PI)
    }
}

/// Kaiser window value at position `n` of `length`
fn kaiser_window(n: usize, length: usize, beta: f64) -> f64 {
    if length == 1 {
        return 1.0;
    }
    let m = length as f64 - 1.0;
    let x = 2.0 * n as f64 / m - 1.0;
    let arg = beta * (1.0 - x * x).max(0.0).sqrt();
    bessel_i0(arg) / bessel_i0(beta)
}

/// Zeroth-order modified Bessel function of the first kind, I0(x).
///
/// Power series; converges quickly for the betas Kaiser designs use.
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0f64;
    let mut term = 1.0f64;
    let x_half = x / 2.0;

    for k in 1..=64 {
        term *= (x_half / k as f64) * (x_half / k as f64);
        sum += term;
        if term < 1e-20 * sum {
            break;
        }
    }

    sum
}
