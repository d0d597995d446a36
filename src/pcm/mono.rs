use crate::error::{FloraMixError, Result};
use crate::interpolate::Interpolator;
use crate::pcm::pull::PullReader;
use crate::pcm::{MonoPcmSource, SampleStream};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Finite, seekable source over an owned sample array.
pub struct MonoStaticSource {
    samples: Vec<f32>,
    interpolator: Interpolator,
    position: f64,
}

impl MonoStaticSource {
    pub fn new(samples: Vec<f32>) -> Result<Self> {
        Self::with_interpolator(samples, Interpolator::default())
    }

    pub fn with_interpolator(samples: Vec<f32>, interpolator: Interpolator) -> Result<Self> {
        if samples.is_empty() {
            return Err(FloraMixError::Configuration(
                "Samples must not be empty".into(),
            ));
        }
        Ok(Self {
            samples,
            interpolator,
            position: 0.0,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn set_position(&mut self, position: f64) -> Result<()> {
        if !(0.0..=self.samples.len() as f64).contains(&position) {
            return Err(FloraMixError::Configuration(format!(
                "Position must be between 0 and {}",
                self.samples.len()
            )));
        }
        self.position = position;
        Ok(())
    }

    /// Normalized playback progress in [0, 1].
    pub fn progress(&self) -> f32 {
        (self.position / self.samples.len() as f64) as f32
    }

    pub fn set_progress(&mut self, progress: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&progress) {
            return Err(FloraMixError::Configuration(
                "Progress must be between 0 and 1".into(),
            ));
        }
        self.position = progress as f64 * self.samples.len() as f64;
        Ok(())
    }
}

impl MonoPcmSource for MonoStaticSource {
    fn consume_sample(&mut self, increment: f32) -> f32 {
        if self.has_reached_end() {
            return 0.0;
        }
        let sample = self
            .interpolator
            .interpolate(&self.samples, self.position, 0, 1);
        self.position += increment as f64;
        sample
    }

    fn consume_samples(&mut self, buffer: &mut [f32]) -> usize {
        // Straight copy, no interpolation needed at unity pitch.
        let start = self.position as usize;
        let count = buffer.len().min(self.samples.len().saturating_sub(start));
        buffer[..count].copy_from_slice(&self.samples[start..start + count]);
        self.position += count as f64;
        count
    }

    fn has_reached_end(&self) -> bool {
        self.position as usize >= self.samples.len()
    }
}

pub(crate) struct PushState {
    queue: VecDeque<Vec<f32>>,
    position: f64,
    finished: bool,
}

/// Externally fed queue of mono sample chunks.
///
/// Cloning yields another handle to the same queue, so a producer thread can
/// keep enqueueing while the mixing thread consumes. An empty queue yields
/// silence without reporting end of stream; the source only ends once
/// [`mark_finished`](Self::mark_finished) has been called and the queue has
/// drained.
#[derive(Clone)]
pub struct MonoPushSource {
    state: Arc<Mutex<PushState>>,
    interpolator: Interpolator,
}

impl MonoPushSource {
    pub fn new() -> Self {
        Self::with_interpolator(Interpolator::default())
    }

    pub fn with_interpolator(interpolator: Interpolator) -> Self {
        Self {
            state: Arc::new(Mutex::new(PushState {
                queue: VecDeque::new(),
                position: 0.0,
                finished: false,
            })),
            interpolator,
        }
    }

    pub fn enqueue_samples(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Err(FloraMixError::Configuration(
                "Samples must not be empty".into(),
            ));
        }
        self.lock_state().queue.push_back(samples);
        Ok(())
    }

    /// Marks the producer side as done; the source reports end of stream
    /// once the remaining queued samples have been consumed.
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

    pub fn queued_sample_count(&self) -> usize {
        let state = self.lock_state();
        let total: usize = state.queue.iter().map(|chunk| chunk.len()).sum();
        total.saturating_sub(state.position as usize)
    }

    pub fn queued_millis(&self, sample_rate: f32) -> f32 {
        self.queued_sample_count() as f32 * 1000.0 / sample_rate
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PushState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MonoPushSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoPcmSource for MonoPushSource {
    fn consume_sample(&mut self, increment: f32) -> f32 {
        let mut state = self.lock_state();
        loop {
            let Some(chunk) = state.queue.front() else {
                return 0.0;
            };
            if state.position as usize >= chunk.len() {
                state.queue.pop_front();
                state.position = 0.0;
                continue;
            }
            let sample = self
                .interpolator
                .interpolate(chunk, state.position, 0, 1);
            state.position += increment as f64;
            return sample;
        }
    }

    fn has_reached_end(&self) -> bool {
        let state = self.lock_state();
        let remaining: usize = state.queue.iter().map(|chunk| chunk.len()).sum();
        state.finished && remaining.saturating_sub(state.position as usize) == 0
    }
}

impl crate::pcm::pull::PullTarget for MonoPushSource {
    fn enqueue(&self, samples: Vec<f32>) -> Result<()> {
        self.enqueue_samples(samples)
    }

    fn queued_millis(&self, sample_rate: f32) -> f32 {
        MonoPushSource::queued_millis(self, sample_rate)
    }

    fn mark_finished(&self) {
        MonoPushSource::mark_finished(self);
    }
}

/// Push source kept topped up from an upstream [`SampleStream`] by a
/// dedicated reader thread, targeting a buffered duration rather than a
/// sample count so that buffering behaves the same across sample rates.
pub struct MonoPullSource {
    source: MonoPushSource,
    reader: PullReader,
}

impl MonoPullSource {
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
        if stream.channels() != 1 {
            return Err(FloraMixError::AudioFormat(format!(
                "Mono pull source requires a mono stream, got {} channels",
                stream.channels()
            )));
        }
        let source = MonoPushSource::with_interpolator(interpolator);
        let reader = PullReader::spawn(stream, source.clone(), target_buffer_millis)?;
        Ok(Self { source, reader })
    }

    /// Stops the reader thread and joins it. Queued samples remain
    /// drainable; the source then reports end of stream.
    pub fn close(&mut self) {
        self.reader.close();
        self.source.mark_finished();
    }

    pub fn queued_millis(&self, sample_rate: f32) -> f32 {
        self.source.queued_millis(sample_rate)
    }
}

impl MonoPcmSource for MonoPullSource {
    fn consume_sample(&mut self, increment: f32) -> f32 {
        self.source.consume_sample(increment)
    }

    fn has_reached_end(&self) -> bool {
        self.source.has_reached_end()
    }
}

impl Drop for MonoPullSource {
    fn drop(&mut self) {
        self.close();
    }
}
