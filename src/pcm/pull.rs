use crate::error::{FloraMixError, Result};
use crate::pcm::SampleStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Queue side of a push source, as seen by the pull reader thread.
pub(crate) trait PullTarget: Send + 'static {
    fn enqueue(&self, samples: Vec<f32>) -> Result<()>;
    fn queued_millis(&self, sample_rate: f32) -> f32;
    fn mark_finished(&self);
}

/// Background thread draining a [`SampleStream`] into a push source,
/// targeting a buffered duration. Upstream exhaustion or I/O failure marks
/// the target finished; the error never crosses into the mix graph.
pub(crate) struct PullReader {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PullReader {
    pub(crate) fn spawn<T: PullTarget>(
        mut stream: Box<dyn SampleStream>,
        target: T,
        target_buffer_millis: f32,
    ) -> Result<Self> {
        if !(target_buffer_millis.is_finite() && target_buffer_millis > 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Target buffer duration must be positive, got {target_buffer_millis}"
            )));
        }

        let sample_rate = stream.sample_rate();
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(FloraMixError::AudioFormat(format!(
                "Stream sample rate must be positive, got {sample_rate}"
            )));
        }
        let channels = stream.channels() as usize;

        // Top the queue up a quarter of the target at a time.
        let chunk_frames = ((target_buffer_millis / 4.0 * sample_rate / 1000.0) as usize).max(256);
        let chunk_samples = chunk_frames * channels;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = std::thread::Builder::new()
            .name("floramix-pull-reader".into())
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    if target.queued_millis(sample_rate) >= target_buffer_millis {
                        std::thread::sleep(IDLE_SLEEP);
                        continue;
                    }

                    let mut chunk = vec![0.0f32; chunk_samples];
                    match stream.read(&mut chunk) {
                        Ok(0) => {
                            target.mark_finished();
                            break;
                        }
                        Ok(read) => {
                            chunk.truncate(read - read % channels);
                            if chunk.is_empty() || target.enqueue(chunk).is_err() {
                                target.mark_finished();
                                break;
                            }
                        }
                        Err(err) => {
                            // A failing upstream degrades to end of stream
                            log::warn!("Pull source stream error, treating as end: {err}");
                            target.mark_finished();
                            break;
                        }
                    }
                }
            })
            .map_err(FloraMixError::Io)?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub(crate) fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Pull reader thread panicked");
            }
        }
    }
}

impl Drop for PullReader {
    fn drop(&mut self) {
        self.close();
    }
}
