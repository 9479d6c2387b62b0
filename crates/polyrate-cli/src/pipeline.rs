//! Chunked processing of interleaved audio through the core

use crate::wav::AudioData;
use anyhow::{Context, Result};
use polyrate_core::{BlockConvolver, MultiChannel, Resampler};

/// Counters gathered while streaming a file
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub chunks: usize,
    pub frames_in: usize,
    pub frames_out: usize,
    pub tail_frames: usize,
}

/// Push `audio` through one copy of `prototype` per channel, `chunk_size`
/// frames at a time, then flush.
pub fn resample_audio<R>(
    prototype: R,
    audio: &AudioData,
    chunk_size: usize,
    output_rate: u32,
) -> Result<(AudioData, StreamStats)>
where
    R: Resampler<Item = f32> + Clone,
{
    anyhow::ensure!(chunk_size > 0, "chunk_size must be > 0");

    let channels = audio.channels as usize;
    let mut bank = MultiChannel::from_prototype(prototype, channels)?;
    let mut samples = Vec::new();
    let mut stats = StreamStats {
        frames_in: audio.frames(),
        ..StreamStats::default()
    };

    for (index, chunk) in audio.samples.chunks(chunk_size * channels).enumerate() {
        let out = bank
            .process_interleaved(chunk)
            .with_context(|| format!("Failed to resample chunk {}", index))?;
        log::debug!("Chunk {}: {} -> {} samples", index, chunk.len(), out.len());
        samples.extend(out);
        stats.chunks += 1;
    }

    let tail = bank.flush_interleaved()?;
    stats.tail_frames = tail.len() / channels;
    samples.extend(tail);
    stats.frames_out = samples.len() / channels;

    Ok((
        AudioData {
            samples,
            sample_rate: output_rate,
            channels: audio.channels,
        },
        stats,
    ))
}

/// Run every channel of `audio` through its own block convolver, keeping
/// the filter tail.
pub fn convolve_audio(taps: &[f64], audio: &AudioData, block_size: usize) -> Result<AudioData> {
    let channels = audio.channels as usize;
    let frames = audio.frames();

    let mut planar: Vec<Vec<f32>> = (0..channels)
        .map(|c| audio.samples.iter().skip(c).step_by(channels).copied().collect())
        .collect();

    for channel in planar.iter_mut() {
        let mut convolver = BlockConvolver::new(taps, block_size)?;
        convolver.process(channel)?;
        channel.extend(convolver.tail()?);
    }

    let out_frames = frames + taps.len() - 1;
    let mut samples = Vec::with_capacity(out_frames * channels);
    for i in 0..out_frames {
        for channel in &planar {
            samples.push(channel[i]);
        }
    }

    Ok(AudioData {
        samples,
        sample_rate: audio.sample_rate,
        channels: audio.channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyrate_core::{FractionalResampler, QualitySpec, RationalResampler};

    fn stereo_tone(frames: usize, rate: u32) -> AudioData {
        AudioData {
            samples: (0..frames)
                .flat_map(|n| {
                    let t = n as f32 / rate as f32;
                    [(2.0 * std::f32::consts::PI * 440.0 * t).sin(), 0.25]
                })
                .collect(),
            sample_rate: rate,
            channels: 2,
        }
    }

    #[test]
    fn test_chunk_size_does_not_change_output() {
        let audio = stereo_tone(1000, 8000);
        let proto = RationalResampler::<f32>::new(3, 2, &QualitySpec::draft()).unwrap();

        let (small, small_stats) = resample_audio(proto.clone(), &audio, 17, 12000).unwrap();
        let (large, large_stats) = resample_audio(proto.clone(), &audio, 4096, 12000).unwrap();

        assert_eq!(small.samples, large.samples);
        assert_eq!(small_stats.frames_out, large_stats.frames_out);
        assert_eq!(small_stats.chunks, 59);
        assert_eq!(large_stats.chunks, 1);
        assert_eq!(small.sample_rate, 12000);
        assert_eq!(small_stats.frames_out as u64, proto.flushed_len(1000));
    }

    #[test]
    fn test_zero_chunk_size_is_an_error() {
        let audio = stereo_tone(10, 8000);
        let proto = RationalResampler::<f32>::new(2, 1, &QualitySpec::draft()).unwrap();
        let err = resample_audio(proto, &audio, 0, 16000).unwrap_err();
        assert!(err.to_string().contains("chunk_size"));

        assert!(convolve_audio(&[1.0], &audio, 0).is_err());
    }

    #[test]
    fn test_fractional_pipeline() {
        let audio = stereo_tone(2000, 8000);
        let proto = FractionalResampler::<f32>::new(0.75, 16, &QualitySpec::draft()).unwrap();
        let (out, stats) = resample_audio(proto, &audio, 256, 6000).unwrap();
        assert_eq!(out.channels, 2);
        assert!((stats.frames_out as f64 - 1500.0).abs() < 100.0);
    }

    #[test]
    fn test_convolve_keeps_tail() {
        let audio = stereo_tone(100, 8000);
        let out = convolve_audio(&[0.5, 0.5, 0.0], &audio, 32).unwrap();
        assert_eq!(out.frames(), 102);
        // DC channel settles at 0.25 after the first frame
        assert!((out.samples[2 * 10 + 1] - 0.25).abs() < 1e-6);
    }
}
