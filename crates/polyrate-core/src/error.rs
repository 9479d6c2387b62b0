//! Error taxonomy for the resampling core

use thiserror::Error;

/// Errors returned by resampler construction and streaming calls.
///
/// A call that returns an error leaves the resampler exactly as it was
/// before the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResampleError {
    /// Up/down factors (or a floating ratio) are non-positive or not finite
    #[error("invalid resampling ratio: {0}")]
    InvalidRatio(String),

    /// Quality specification out of range, or the filter it requires
    /// exceeds the length cap
    #[error("invalid filter specification: {0}")]
    InvalidSpec(String),

    /// Lifecycle violation, e.g. `process` after `flush` without `reset`
    #[error("invalid resampler state: {0}")]
    InvalidState(String),

    /// Interleaved buffer length is not a multiple of the channel count
    #[error("buffer of {len} samples does not divide into {channels} channels")]
    ChannelLayout { channels: usize, len: usize },

    /// Planar input holds a different number of buffers than channels
    #[error("expected {expected} channel buffers, got {got}")]
    ChannelCount { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, ResampleError>;
