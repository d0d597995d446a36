//! PCM sources: where samples come from
//!
//! A PCM source hands out samples at a caller-chosen fractional rate. Static
//! sources wrap a finite, seekable sample array; push sources consume an
//! externally fed queue of chunks; pull sources keep a push source topped up
//! from an upstream stream via a background reader thread.

mod mono;
mod pull;
mod stereo;

pub use mono::{MonoPullSource, MonoPushSource, MonoStaticSource};
pub use stereo::{StereoPullSource, StereoPushSource, StereoStaticSource};

pub const DEFAULT_TARGET_BUFFER_MILLIS: f32 = 1000.0;

/// A mono sample stream consumed one fractional step at a time.
pub trait MonoPcmSource: Send {
    /// Returns the sample at the current position, then advances the read
    /// cursor by `increment` samples.
    fn consume_sample(&mut self, increment: f32) -> f32;

    /// Bulk variant for an increment of exactly 1.0. Returns the number of
    /// samples written; the remainder of `buffer` is left untouched.
    fn consume_samples(&mut self, buffer: &mut [f32]) -> usize {
        let mut written = 0;
        while written < buffer.len() && !self.has_reached_end() {
            buffer[written] = self.consume_sample(1.0);
            written += 1;
        }
        written
    }

    fn has_reached_end(&self) -> bool;
}

/// A stereo sample stream; one consume step yields a left/right frame.
pub trait StereoPcmSource: Send {
    fn consume_frame(&mut self, increment: f32) -> [f32; 2];

    /// Bulk variant for an increment of exactly 1.0 into an interleaved
    /// buffer. Returns the number of samples (not frames) written.
    fn consume_samples(&mut self, buffer: &mut [f32]) -> usize {
        let mut written = 0;
        while written + 1 < buffer.len() && !self.has_reached_end() {
            let frame = self.consume_frame(1.0);
            buffer[written] = frame[0];
            buffer[written + 1] = frame[1];
            written += 2;
        }
        written
    }

    fn has_reached_end(&self) -> bool;
}

/// Upstream decoder interface feeding a pull source.
///
/// Implementations deliver interleaved floating-point PCM frames at a fixed
/// format. `read` returning `Ok(0)` signals end of stream; I/O errors are
/// treated as end of stream by the pull reader rather than propagated into
/// the mix graph.
pub trait SampleStream: Send {
    fn sample_rate(&self) -> f32;

    fn channels(&self) -> u16;

    /// Fills `buffer` with up to `buffer.len()` samples (whole frames) and
    /// returns the number of samples read.
    fn read(&mut self, buffer: &mut [f32]) -> std::io::Result<usize>;
}
