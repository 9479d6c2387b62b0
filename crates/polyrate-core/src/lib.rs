//! polyrate core - streaming polyphase sample-rate conversion
//!
//! Kaiser-windowed sinc anti-aliasing filters, polyphase decomposition and
//! chunk-invariant streaming resamplers for rational (`L/M`) and arbitrary
//! floating ratios, plus an FFT block convolver.

pub mod blockconv;
pub mod config;
pub mod design;
pub mod error;
pub mod fractional;
mod history;
pub mod multichannel;
pub mod polyphase;
pub mod ratio;
pub mod rational;
pub mod resampler;
pub mod sample;

pub use blockconv::BlockConvolver;
pub use config::{CoefficientPrecision, QualitySpec, ResamplerConfig};
pub use design::{design_for_ratio, design_lowpass, FilterDesign};
pub use error::{ResampleError, Result};
pub use fractional::FractionalResampler;
pub use multichannel::MultiChannel;
pub use polyphase::PolyphaseBank;
pub use ratio::Ratio;
pub use rational::RationalResampler;
pub use resampler::{Resampler, StreamState};
pub use sample::Sample;

/// Resample a complete mono buffer by `up / down` with the default quality,
/// including the filter tail.
pub fn resample(samples: &[f32], up: i64, down: i64) -> Result<Vec<f32>> {
    let mut resampler = RationalResampler::new(up, down, &QualitySpec::default())?;
    let mut output = resampler.process(samples)?;
    resampler.flush_into(&mut output)?;
    Ok(output)
}
