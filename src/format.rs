//! Audio format description and unit conversions

use crate::error::{FloraMixError, Result};

/// Size of one encoded sample on the wire (f32 little-endian).
pub const BYTES_PER_SAMPLE: usize = 4;

/// Interleaved floating-point PCM format: sample rate plus channel count.
///
/// Immutable once a mixer is constructed. Two rendered buffers may only be
/// composed when their formats match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    sample_rate: f32,
    channels: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: f32, channels: u16) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Sample rate must be positive, got {sample_rate}"
            )));
        }
        if channels == 0 || channels > 2 {
            return Err(FloraMixError::Configuration(format!(
                "Channel count must be 1 or 2, got {channels}"
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn mono(sample_rate: f32) -> Result<Self> {
        Self::new(sample_rate, 1)
    }

    pub fn stereo(sample_rate: f32) -> Result<Self> {
        Self::new(sample_rate, 2)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Whole frames covering `millis` of audio, rounded up.
    pub fn millis_to_frame_count(&self, millis: f32) -> usize {
        (millis * self.sample_rate / 1000.0).ceil() as usize
    }

    pub fn millis_to_sample_count(&self, millis: f32) -> usize {
        self.millis_to_frame_count(millis) * self.channels as usize
    }

    pub fn millis_to_byte_count(&self, millis: f32) -> usize {
        self.millis_to_sample_count(millis) * BYTES_PER_SAMPLE
    }

    pub fn sample_count_to_millis(&self, sample_count: usize) -> f32 {
        (sample_count / self.channels as usize) as f32 * 1000.0 / self.sample_rate
    }

    pub fn byte_count_to_millis(&self, byte_count: usize) -> f32 {
        self.sample_count_to_millis(byte_count / BYTES_PER_SAMPLE)
    }

    pub fn sample_count_to_byte_count(&self, sample_count: usize) -> usize {
        sample_count * BYTES_PER_SAMPLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_parameters() {
        assert!(AudioFormat::new(0.0, 2).is_err());
        assert!(AudioFormat::new(-48000.0, 2).is_err());
        assert!(AudioFormat::new(f32::NAN, 2).is_err());
        assert!(AudioFormat::new(48000.0, 0).is_err());
        assert!(AudioFormat::new(48000.0, 3).is_err());
        assert!(AudioFormat::stereo(48000.0).is_ok());
    }

    #[test]
    fn millis_conversion_rounds_up_to_whole_frames() {
        let format = AudioFormat::stereo(48000.0).unwrap();
        assert_eq!(format.millis_to_frame_count(10.0), 480);
        assert_eq!(format.millis_to_sample_count(10.0), 960);
        // 0.01 ms is less than one frame at 48 kHz, still rounds up to one
        assert_eq!(format.millis_to_frame_count(0.01), 1);
        assert_eq!(format.millis_to_byte_count(10.0), 960 * BYTES_PER_SAMPLE);
    }

    #[test]
    fn sample_count_round_trips_through_millis() {
        let format = AudioFormat::mono(44100.0).unwrap();
        let millis = format.sample_count_to_millis(44100);
        assert!((millis - 1000.0).abs() < 1e-3);
    }
}
