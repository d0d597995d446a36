//! Streaming mixer: renders fixed slices on a scheduler thread and feeds
//! them to an output sink through the sink writer

use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::mixer::AudioMixer;
use crate::modifier::{
    ModifierChain, NormalizationModifier, SharedModifier, VolumeModifier,
};
use crate::sink::{AudioSink, SinkWriter};
use crate::sound::SharedSound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// What to do when a freshly mixed slice does not fit into the output
/// ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrunPolicy {
    /// Skip mixing the slice entirely; playing sounds pause until room
    /// frees up. Keeps the scheduler on time and is the default.
    #[default]
    Skip,
    /// Throw away everything still buffered, then write the new slice.
    /// Minimizes latency after a stall at the cost of a glitch.
    Flush,
    /// Wait for space. Audio is gapless but the scheduler drifts behind
    /// real time while the sink is saturated.
    Block,
}

/// Tuning for a [`StreamingAudioMixer`].
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    slice_millis: f32,
    buffer_millis: f32,
    max_sounds: usize,
    normalization_decay_millis: f32,
    overrun_policy: OverrunPolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            slice_millis: 20.0,
            buffer_millis: 100.0,
            max_sounds: crate::sound::DEFAULT_MAX_SOUNDS,
            normalization_decay_millis: 4000.0,
            overrun_policy: OverrunPolicy::default(),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration of one mixed slice.
    pub fn slice_millis(mut self, millis: f32) -> Self {
        self.slice_millis = millis;
        self
    }

    /// Capacity of the ring between mixer and sink.
    pub fn buffer_millis(mut self, millis: f32) -> Self {
        self.buffer_millis = millis;
        self
    }

    pub fn max_sounds(mut self, max_sounds: usize) -> Self {
        self.max_sounds = max_sounds;
        self
    }

    pub fn normalization_decay_millis(mut self, millis: f32) -> Self {
        self.normalization_decay_millis = millis;
        self
    }

    pub fn overrun_policy(mut self, policy: OverrunPolicy) -> Self {
        self.overrun_policy = policy;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.slice_millis.is_finite() && self.slice_millis > 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Slice duration must be greater than 0, got {}",
                self.slice_millis
            )));
        }
        if !(self.buffer_millis.is_finite() && self.buffer_millis >= self.slice_millis) {
            return Err(FloraMixError::Configuration(format!(
                "Buffer duration {} must cover at least one slice of {}",
                self.buffer_millis, self.slice_millis
            )));
        }
        Ok(())
    }
}

struct StreamShared {
    mixer: AudioMixer,
    writer: SinkWriter,
    normalization: Arc<Mutex<NormalizationModifier>>,
    master_volume: Arc<Mutex<VolumeModifier>>,
    slice_frames: usize,
    overrun_policy: OverrunPolicy,
    running: AtomicBool,
}

/// Real-time front end over an [`AudioMixer`].
///
/// A scheduler thread renders one slice per period and hands it to the
/// [`SinkWriter`]; the master chain always ends in peak normalization
/// followed by a volume stage, so the master volume scales what actually
/// reaches the sink and the bytes stay inside [-1, 1]. Slices can also be
/// driven manually with
/// [`mix_slice`](Self::mix_slice) while the scheduler is stopped.
pub struct StreamingAudioMixer {
    shared: Arc<StreamShared>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl StreamingAudioMixer {
    pub fn new(format: AudioFormat, sink: Box<dyn AudioSink>, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let mixer = AudioMixer::with_capacity(format, config.max_sounds)?;

        let normalization = Arc::new(Mutex::new(NormalizationModifier::with_decay(
            config.normalization_decay_millis,
        )?));
        let master_volume = Arc::new(Mutex::new(VolumeModifier::new(1.0)?));
        let normalization_stage: SharedModifier = normalization.clone();
        let volume_stage: SharedModifier = master_volume.clone();
        mixer.modifiers().append(normalization_stage);
        mixer.modifiers().append(volume_stage);

        let writer = SinkWriter::new(sink, format.millis_to_byte_count(config.buffer_millis))?;

        Ok(Self {
            shared: Arc::new(StreamShared {
                mixer,
                writer,
                normalization,
                master_volume,
                slice_frames: format.millis_to_frame_count(config.slice_millis),
                overrun_policy: config.overrun_policy,
                running: AtomicBool::new(false),
            }),
            scheduler: Mutex::new(None),
        })
    }

    pub fn format(&self) -> &AudioFormat {
        self.shared.mixer.format()
    }

    pub fn play_sound(&self, sound: SharedSound) {
        self.shared.mixer.play_sound(sound);
    }

    pub fn stop_sound(&self, sound: &SharedSound) -> bool {
        self.shared.mixer.stop_sound(sound)
    }

    /// Stops everything and forgets the normalization peak, so the next
    /// playback does not start attenuated by the old mix's loudness.
    pub fn stop_all_sounds(&self) {
        self.shared.mixer.stop_all_sounds();
        self.shared
            .normalization
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }

    /// Master chain, running before the built-in normalization and volume
    /// stages.
    pub fn modifiers(&self) -> &ModifierChain {
        self.shared.mixer.modifiers()
    }

    pub fn master_volume(&self) -> f32 {
        self.shared
            .master_volume
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .volume()
    }

    pub fn set_master_volume(&self, volume: f32) -> Result<()> {
        self.shared
            .master_volume
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_volume(volume)
    }

    pub fn active_sounds(&self) -> usize {
        self.shared.mixer.active_sounds()
    }

    pub fn mixed_sounds(&self) -> usize {
        self.shared.mixer.mixed_sounds()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.shared.writer.buffered_bytes()
    }

    /// Renders one slice and hands it to the writer, honoring the overrun
    /// policy.
    pub fn mix_slice(&self) -> Result<()> {
        mix_slice(&self.shared)
    }

    /// Spawns the scheduler thread. Does nothing if already running.
    pub fn start(&self) -> Result<()> {
        if self.shared.running.swap(true, Ordering::Relaxed) {
            return Ok(());
        }

        let format = *self.shared.mixer.format();
        let period = Duration::from_secs_f64(
            self.shared.slice_frames as f64 / format.sample_rate() as f64,
        );
        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("floramix-stream-scheduler".into())
            .spawn(move || {
                let mut deadline = Instant::now();
                while shared.running.load(Ordering::Relaxed) {
                    if let Err(err) = mix_slice(&shared) {
                        log::error!("Slice mix failed: {err}");
                    }
                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        std::thread::sleep(deadline - now);
                    } else {
                        // Fell behind; rebase instead of bursting to catch up
                        deadline = now;
                    }
                }
            })
            .map_err(FloraMixError::Io)?;

        *self
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Stops the scheduler thread. Buffered audio keeps draining to the
    /// sink.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
        let handle = self
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Stream scheduler thread panicked");
            }
        }
    }

    /// Stops the scheduler and shuts the writer and sink down. Buffered
    /// audio is dropped. The writer goes down first so a scheduler blocked
    /// on ring space is released before the join.
    pub fn close(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
        self.shared.writer.close();
        self.stop();
    }
}

impl Drop for StreamingAudioMixer {
    fn drop(&mut self) {
        self.close();
    }
}

fn mix_slice(shared: &StreamShared) -> Result<()> {
    let slice_samples = shared.slice_frames * shared.mixer.format().channels() as usize;
    match shared.overrun_policy {
        OverrunPolicy::Skip => {
            // Not mixing at all pauses the graph instead of losing audio
            if !shared.writer.can_write_without_blocking(slice_samples) {
                log::debug!("Output ring full, skipping one slice");
                return Ok(());
            }
        }
        OverrunPolicy::Flush => {
            if !shared.writer.can_write_without_blocking(slice_samples) {
                shared.writer.flush();
            }
        }
        OverrunPolicy::Block => {}
    }
    shared.writer.write(&shared.mixer.mix(shared.slice_frames))
}
