use anyhow::{Context, Result, anyhow};
use hound::{SampleFormat, WavReader};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::Path;

use super::{ENGINE_CHANNELS, TrackSource};

/// Decode a WAV file into a TrackSource at the engine sample rate.
///
/// All decoding happens here, at load time; once the TrackSource exists the
/// audio path only ever reads already-buffered memory. Decode errors surface
/// once, from this function, never per read.
pub fn decode_track<P: AsRef<Path>>(path: P, engine_rate: u32) -> Result<TrackSource> {
    let path = path.as_ref();
    let mut reader = WavReader::open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let spec = reader.spec();

    // Read samples as f32 in interleaved order
    let raw: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("corrupt samples in {}", path.display()))?,
        SampleFormat::Int => {
            let max_value = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value))
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("corrupt samples in {}", path.display()))?
        }
    };

    if raw.is_empty() {
        return Err(anyhow!("{} contains no audio", path.display()));
    }

    // Normalize channel layout: mono is duplicated to both sides, wider
    // layouts keep their first two channels.
    let file_channels = spec.channels as usize;
    let stereo: Vec<f32> = match file_channels {
        0 => return Err(anyhow!("{} reports zero channels", path.display())),
        1 => raw.iter().flat_map(|&s| [s, s]).collect(),
        2 => raw,
        n => raw
            .chunks(n)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    };

    let samples = if spec.sample_rate == engine_rate {
        stereo
    } else {
        resample_stereo(&stereo, spec.sample_rate, engine_rate)
            .with_context(|| format!("resampling {} failed", path.display()))?
    };

    tracing::debug!(
        path = %path.display(),
        file_rate = spec.sample_rate,
        engine_rate,
        frames = samples.len() / ENGINE_CHANNELS,
        "decoded track"
    );

    Ok(TrackSource::new(samples, engine_rate))
}

fn resample_stereo(interleaved: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    let frames = interleaved.len() / ENGINE_CHANNELS;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in interleaved.chunks(ENGINE_CHANNELS) {
        left.push(frame[0]);
        right.push(frame[1]);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        2.0, // Max ratio
        params,
        frames,
        ENGINE_CHANNELS,
    )?;

    let output = resampler.process(&[left, right], None)?;

    let out_frames = output[0].len().min(output[1].len());
    let mut samples = Vec::with_capacity(out_frames * ENGINE_CHANNELS);
    for i in 0..out_frames {
        samples.push(output[0][i]);
        samples.push(output[1][i]);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[f32]) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &sample in frames {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_stereo_at_engine_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, 44100, &[0.1, -0.1, 0.2, -0.2, 0.3, -0.3]);

        let source = decode_track(&path, 44100).unwrap();
        assert_eq!(source.frames(), 3);
        assert_eq!(source.sample_rate(), 44100);
        let mut out = vec![0.0; 3 * ENGINE_CHANNELS];
        source.read_wrapped(0, &mut out);
        for (got, want) in out.iter().zip([0.1, -0.1, 0.2, -0.2, 0.3, -0.3]) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn mono_is_duplicated_to_both_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, 44100, &[0.5, -0.5]);

        let source = decode_track(&path, 44100).unwrap();
        assert_eq!(source.frames(), 2);
        let mut out = vec![0.0; 2 * ENGINE_CHANNELS];
        source.read_wrapped(0, &mut out);
        assert_eq!(out[0], out[1]);
        assert_eq!(out[2], out[3]);
    }

    #[test]
    fn int_samples_are_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("int16.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(i16::MAX).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        let source = decode_track(&path, 44100).unwrap();
        let mut out = vec![0.0; 2 * ENGINE_CHANNELS];
        source.read_wrapped(0, &mut out);
        assert!((out[0] - 1.0).abs() < 1e-3);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn mismatched_rate_is_resampled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rate.wav");
        let frames: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.01).sin() * 0.4).collect();
        write_wav(&path, 1, 48000, &frames);

        let source = decode_track(&path, 44100).unwrap();
        assert_eq!(source.sample_rate(), 44100);
        // 0.1s of audio stays roughly 0.1s after resampling.
        let expected = 4800.0 * 44100.0 / 48000.0;
        assert!((source.frames() as f64 - expected).abs() < 64.0);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(decode_track("/no/such/file.wav", 44100).is_err());
    }
}
