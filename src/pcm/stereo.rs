use crate::error::{FloraMixError, Result};
use crate::interpolate::Interpolator;
use crate::pcm::pull::PullReader;
use crate::pcm::{SampleStream, StereoPcmSource};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

fn validate_interleaved(samples: &[f32]) -> Result<()> {
    if samples.is_empty() {
        return Err(FloraMixError::Configuration(
            "Samples must not be empty".into(),
        ));
    }
    if samples.len() % 2 != 0 {
        return Err(FloraMixError::Configuration(
            "Stereo sample count must be a multiple of 2".into(),
        ));
    }
    Ok(())
}

/// Finite, seekable source over an owned interleaved stereo sample array.
/// The read cursor counts frames, not samples.
pub struct StereoStaticSource {
    samples: Vec<f32>,
    frame_count: usize,
    interpolator: Interpolator,
    position: f64,
}

impl StereoStaticSource {
    pub fn new(samples: Vec<f32>) -> Result<Self> {
        Self::with_interpolator(samples, Interpolator::default())
    }

    pub fn with_interpolator(samples: Vec<f32>, interpolator: Interpolator) -> Result<Self> {
        validate_interleaved(&samples)?;
        let frame_count = samples.len() / 2;
        Ok(Self {
            samples,
            frame_count,
            interpolator,
            position: 0.0,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn set_position(&mut self, position: f64) -> Result<()> {
        if !(0.0..=self.frame_count as f64).contains(&position) {
            return Err(FloraMixError::Configuration(format!(
                "Position must be between 0 and {}",
                self.frame_count
            )));
        }
        self.position = position;
        Ok(())
    }

    pub fn progress(&self) -> f32 {
        (self.position / self.frame_count as f64) as f32
    }

    pub fn set_progress(&mut self, progress: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&progress) {
            return Err(FloraMixError::Configuration(
                "Progress must be between 0 and 1".into(),
            ));
        }
        self.position = progress as f64 * self.frame_count as f64;
        Ok(())
    }
}

impl StereoPcmSource for StereoStaticSource {
    fn consume_frame(&mut self, increment: f32) -> [f32; 2] {
        if self.has_reached_end() {
            return [0.0, 0.0];
        }
        let left = self
            .interpolator
            .interpolate(&self.samples, self.position, 0, 2);
        let right = self
            .interpolator
            .interpolate(&self.samples, self.position, 1, 2);
        self.position += increment as f64;
        [left, right]
    }

    fn consume_samples(&mut self, buffer: &mut [f32]) -> usize {
        let start_frame = self.position as usize;
        let frames = (buffer.len() / 2).min(self.frame_count.saturating_sub(start_frame));
        let start = start_frame * 2;
        buffer[..frames * 2].copy_from_slice(&self.samples[start..start + frames * 2]);
        self.position += frames as f64;
        frames * 2
    }

    fn has_reached_end(&self) -> bool {
        self.position as usize >= self.frame_count
    }
}

struct StereoPushState {
    queue: VecDeque<Vec<f32>>,
    position: f64,
    finished: bool,
}

/// Externally fed queue of interleaved stereo chunks; the stereo counterpart
/// of [`MonoPushSource`](crate::pcm::MonoPushSource).
#[derive(Clone)]
pub struct StereoPushSource {
    state: Arc<Mutex<StereoPushState>>,
    interpolator: Interpolator,
}

impl StereoPushSource {
    pub fn new() -> Self {
        Self::with_interpolator(Interpolator::default())
    }

    pub fn with_interpolator(interpolator: Interpolator) -> Self {
        Self {
            state: Arc::new(Mutex::new(StereoPushState {
                queue: VecDeque::new(),
                position: 0.0,
                finished: false,
            })),
            interpolator,
        }
    }

    pub fn enqueue_samples(&self, samples: Vec<f32>) -> Result<()> {
        validate_interleaved(&samples)?;
        self.lock_state().queue.push_back(samples);
        Ok(())
    }

    pub fn mark_finished(&self) {
        self.lock_state().finished = true;
    }

    pub fn flush_queue(&self) {
        let mut state = self.lock_state();
        state.queue.clear();
        state.position = 0.0;
    }

    pub fn queued_chunk_count(&self) -> usize {
        self.lock_state().queue.len()
    }

    pub fn queued_frame_count(&self) -> usize {
        let state = self.lock_state();
        let total: usize = state.queue.iter().map(|chunk| chunk.len() / 2).sum();
        total.saturating_sub(state.position as usize)
    }

    pub fn queued_millis(&self, sample_rate: f32) -> f32 {
        self.queued_frame_count() as f32 * 1000.0 / sample_rate
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, StereoPushState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StereoPushSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StereoPcmSource for StereoPushSource {
    fn consume_frame(&mut self, increment: f32) -> [f32; 2] {
        let mut state = self.lock_state();
        loop {
            let Some(chunk) = state.queue.front() else {
                return [0.0, 0.0];
            };
            if state.position as usize * 2 >= chunk.len() {
                state.queue.pop_front();
                state.position = 0.0;
                continue;
            }
            let left = self.interpolator.interpolate(chunk, state.position, 0, 2);
            let right = self.interpolator.interpolate(chunk, state.position, 1, 2);
            state.position += increment as f64;
            return [left, right];
        }
    }

    fn has_reached_end(&self) -> bool {
        let state = self.lock_state();
        let total: usize = state.queue.iter().map(|chunk| chunk.len() / 2).sum();
        state.finished && total.saturating_sub(state.position as usize) == 0
    }
}

impl crate::pcm::pull::PullTarget for StereoPushSource {
    fn enqueue(&self, samples: Vec<f32>) -> Result<()> {
        self.enqueue_samples(samples)
    }

    fn queued_millis(&self, sample_rate: f32) -> f32 {
        StereoPushSource::queued_millis(self, sample_rate)
    }

    fn mark_finished(&self) {
        StereoPushSource::mark_finished(self);
    }
}

/// Stereo push source kept topped up from an upstream [`SampleStream`] by a
/// background reader thread.
pub struct StereoPullSource {
    source: StereoPushSource,
    reader: PullReader,
}

impl StereoPullSource {
    pub fn new(stream: Box<dyn SampleStream>) -> Result<Self> {
        Self::with_target_buffer(stream, super::DEFAULT_TARGET_BUFFER_MILLIS)
    }

    pub fn with_target_buffer(
        stream: Box<dyn SampleStream>,
        target_buffer_millis: f32,
    ) -> Result<Self> {
        Self::with_interpolator(stream, target_buffer_millis, Interpolator::default())
    }

    pub fn with_interpolator(
        stream: Box<dyn SampleStream>,
        target_buffer_millis: f32,
        interpolator: Interpolator,
    ) -> Result<Self> {
        if stream.channels() != 2 {
            return Err(FloraMixError::AudioFormat(format!(
                "Stereo pull source requires a stereo stream, got {} channels",
                stream.channels()
            )));
        }
        let source = StereoPushSource::with_interpolator(interpolator);
        let reader = PullReader::spawn(stream, source.clone(), target_buffer_millis)?;
        Ok(Self { source, reader })
    }

    pub fn close(&mut self) {
        self.reader.close();
        self.source.mark_finished();
    }

    pub fn queued_millis(&self, sample_rate: f32) -> f32 {
        self.source.queued_millis(sample_rate)
    }
}

impl StereoPcmSource for StereoPullSource {
    fn consume_frame(&mut self, increment: f32) -> [f32; 2] {
        self.source.consume_frame(increment)
    }

    fn has_reached_end(&self) -> bool {
        self.source.has_reached_end()
    }
}

impl Drop for StereoPullSource {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_source_rejects_odd_sample_counts() {
        assert!(StereoStaticSource::new(vec![0.1, 0.2, 0.3]).is_err());
        assert!(StereoStaticSource::new(Vec::new()).is_err());
    }

    #[test]
    fn static_source_consumes_frames() {
        let mut source = StereoStaticSource::new(vec![0.1, -0.1, 0.2, -0.2]).unwrap();
        assert_eq!(source.consume_frame(1.0), [0.1, -0.1]);
        assert_eq!(source.consume_frame(1.0), [0.2, -0.2]);
        assert!(source.has_reached_end());
    }

    #[test]
    fn static_source_bulk_copy_matches_input() {
        let samples = vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let mut source = StereoStaticSource::new(samples.clone()).unwrap();
        let mut buffer = vec![0.0; 8];
        let written = source.consume_samples(&mut buffer);
        assert_eq!(written, 6);
        assert_eq!(&buffer[..6], &samples[..]);
    }

    #[test]
    fn push_source_tracks_queued_frames() {
        let source = StereoPushSource::new();
        source.enqueue_samples(vec![0.0; 200]).unwrap();
        source.enqueue_samples(vec![0.0; 100]).unwrap();
        assert_eq!(source.queued_frame_count(), 150);

        let mut consumer = source.clone();
        for _ in 0..120 {
            consumer.consume_frame(1.0);
        }
        assert_eq!(source.queued_chunk_count(), 1);
        assert_eq!(source.queued_frame_count(), 30);
    }

    #[test]
    fn push_source_silence_when_starved() {
        let mut source = StereoPushSource::new();
        assert_eq!(source.consume_frame(1.0), [0.0, 0.0]);
        assert!(!source.has_reached_end());
        source.mark_finished();
        assert!(source.has_reached_end());
    }
}
