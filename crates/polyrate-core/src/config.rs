//! Filter quality and stream configuration
//!
//! `QualitySpec` drives the filter designer. `ResamplerConfig` is the
//! TOML-backed configuration used by the command line tool.

use crate::error::{ResampleError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lowest stopband attenuation accepted (dB)
pub const MIN_ATTENUATION_DB: f64 = 20.0;
/// Highest stopband attenuation accepted (dB)
pub const MAX_ATTENUATION_DB: f64 = 200.0;
/// Absolute ceiling on `max_taps`
pub const TAP_LIMIT: usize = 1 << 20;

/// Storage type of the polyphase coefficients.
///
/// Accumulation is always done in f64; `Single` only narrows the stored
/// coefficients and must be requested explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoefficientPrecision {
    #[default]
    Double,
    Single,
}

/// Anti-aliasing filter requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySpec {
    /// Stopband attenuation target in dB
    #[serde(default = "default_attenuation_db")]
    pub attenuation_db: f64,
    /// Transition band width as a fraction of the band edge, in (0, 1)
    #[serde(default = "default_transition_width")]
    pub transition_width: f64,
    /// Maximum taps per polyphase branch (the prototype for `L = 1`)
    #[serde(default = "default_max_taps")]
    pub max_taps: usize,
    #[serde(default)]
    pub precision: CoefficientPrecision,
}

impl Default for QualitySpec {
    fn default() -> Self {
        Self {
            attenuation_db: default_attenuation_db(),
            transition_width: default_transition_width(),
            max_taps: default_max_taps(),
            precision: CoefficientPrecision::default(),
        }
    }
}

fn default_attenuation_db() -> f64 {
    80.0
}
fn default_transition_width() -> f64 {
    0.2
}
fn default_max_taps() -> usize {
    16383
}

impl QualitySpec {
    /// Short filters for previews and tests (50 dB, wide transition)
    pub fn draft() -> Self {
        Self {
            attenuation_db: 50.0,
            transition_width: 0.4,
            ..Self::default()
        }
    }

    /// Long filters for mastering-grade conversion (120 dB)
    pub fn high() -> Self {
        Self {
            attenuation_db: 120.0,
            transition_width: 0.1,
            max_taps: 65535,
            ..Self::default()
        }
    }

    /// Check ranges. Length feasibility is checked by the designer.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ATTENUATION_DB..=MAX_ATTENUATION_DB).contains(&self.attenuation_db) {
            return Err(ResampleError::InvalidSpec(format!(
                "attenuation {} dB outside [{}, {}]",
                self.attenuation_db, MIN_ATTENUATION_DB, MAX_ATTENUATION_DB
            )));
        }
        if !(self.transition_width > 0.0 && self.transition_width < 1.0) {
            return Err(ResampleError::InvalidSpec(format!(
                "transition width {} outside (0, 1)",
                self.transition_width
            )));
        }
        if self.max_taps == 0 || self.max_taps > TAP_LIMIT {
            return Err(ResampleError::InvalidSpec(format!(
                "max_taps {} outside [1, {}]",
                self.max_taps, TAP_LIMIT
            )));
        }
        Ok(())
    }
}

/// Streaming parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Samples per channel handed to each `process` call
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    4096
}

/// Fractional-rate resampler parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FractionalConfig {
    /// Number of polyphase branches between adjacent input samples
    #[serde(default = "default_phases")]
    pub phases: u32,
}

impl Default for FractionalConfig {
    fn default() -> Self {
        Self {
            phases: default_phases(),
        }
    }
}

fn default_phases() -> u32 {
    32
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResamplerConfig {
    #[serde(default)]
    pub quality: QualitySpec,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub fractional: FractionalConfig,
}

impl ResamplerConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: ResamplerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        self.quality.validate()?;
        if self.stream.chunk_size == 0 {
            anyhow::bail!("chunk_size must be > 0");
        }
        if self.fractional.phases == 0 {
            anyhow::bail!("phases must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ResamplerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.quality.attenuation_db, 80.0);
        assert_eq!(config.stream.chunk_size, 4096);
        assert_eq!(config.fractional.phases, 32);
    }

    #[test]
    fn test_quality_presets_are_valid() {
        assert!(QualitySpec::draft().validate().is_ok());
        assert!(QualitySpec::high().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_quality() {
        let mut spec = QualitySpec::default();
        spec.attenuation_db = 10.0;
        assert!(matches!(spec.validate(), Err(ResampleError::InvalidSpec(_))));

        let mut spec = QualitySpec::default();
        spec.transition_width = 1.0;
        assert!(matches!(spec.validate(), Err(ResampleError::InvalidSpec(_))));

        let mut spec = QualitySpec::default();
        spec.max_taps = 0;
        assert!(matches!(spec.validate(), Err(ResampleError::InvalidSpec(_))));
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [quality]
            attenuation_db = 100.0
            precision = "single"

            [stream]
            chunk_size = 512
        "#;

        let config: ResamplerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.quality.attenuation_db, 100.0);
        assert_eq!(config.quality.transition_width, 0.2);
        assert_eq!(config.quality.precision, CoefficientPrecision::Single);
        assert_eq!(config.stream.chunk_size, 512);
        assert_eq!(config.fractional.phases, 32);
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let toml_str = r#"
            [stream]
            chunk_size = 0
        "#;

        let config: ResamplerConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }
}
