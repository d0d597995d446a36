//! Output sink abstraction and the background writer feeding it

use crate::error::{FloraMixError, Result};
use crate::format::BYTES_PER_SAMPLE;
use crate::ring::CircularBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

const WRITER_SLEEP: Duration = Duration::from_millis(1);

/// A byte-oriented audio output device.
///
/// Samples are delivered as f32 little-endian. `write` takes as many bytes
/// as the device can accept right now and returns how many it consumed;
/// the writer thread never hands it more than `available()` reports.
pub trait AudioSink: Send {
    /// Bytes the device can accept without blocking.
    fn available(&self) -> usize;

    /// Size of the device's internal buffer in bytes.
    fn buffer_capacity(&self) -> usize;

    fn write(&mut self, data: &[u8]) -> usize;

    fn start(&mut self);

    fn stop(&mut self);

    /// Discards whatever the device has buffered but not yet played.
    fn flush(&mut self);

    fn is_active(&self) -> bool;
}

struct WriterShared {
    sink: Mutex<Box<dyn AudioSink>>,
    ring: Mutex<CircularBuffer<u8>>,
    running: AtomicBool,
}

/// Background thread that drains a byte ring into an [`AudioSink`].
///
/// The sink is started lazily once enough is buffered to fill its device
/// buffer, and stopped again once both the ring and the device have fully
/// drained, so an idle mixer does not keep the device running on silence.
pub struct SinkWriter {
    shared: Arc<WriterShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SinkWriter {
    pub fn new(sink: Box<dyn AudioSink>, ring_capacity_bytes: usize) -> Result<Self> {
        let shared = Arc::new(WriterShared {
            sink: Mutex::new(sink),
            ring: Mutex::new(CircularBuffer::new(ring_capacity_bytes)?),
            running: AtomicBool::new(true),
        });

        let thread_shared = shared.clone();
        let handle = std::thread::Builder::new()
            .name("floramix-sink-writer".into())
            .spawn(move || writer_loop(&thread_shared))
            .map_err(FloraMixError::Io)?;

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Encodes `samples` and appends them to the ring, blocking while the
    /// ring lacks space. A block larger than the whole ring is rejected;
    /// writes after [`close`](Self::close) are silently dropped.
    pub fn write(&self, samples: &[f32]) -> Result<()> {
        let byte_count = samples.len() * BYTES_PER_SAMPLE;
        {
            let ring = self.lock_ring();
            if byte_count > ring.capacity() {
                return Err(FloraMixError::RingBuffer(format!(
                    "Block of {byte_count} bytes exceeds the ring capacity {}",
                    ring.capacity()
                )));
            }
        }

        let mut bytes = Vec::with_capacity(byte_count);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }

        loop {
            if !self.shared.running.load(Ordering::Relaxed) {
                return Ok(());
            }
            {
                let mut ring = self.lock_ring();
                if ring.has_space_for(bytes.len()) {
                    return ring.write_all(&bytes);
                }
            }
            std::thread::sleep(WRITER_SLEEP);
        }
    }

    /// Whether a write of `sample_count` samples would return without
    /// waiting for the writer thread.
    pub fn can_write_without_blocking(&self, sample_count: usize) -> bool {
        self.lock_ring().has_space_for(sample_count * BYTES_PER_SAMPLE)
    }

    pub fn buffered_bytes(&self) -> usize {
        self.lock_ring().len()
    }

    pub fn ring_capacity(&self) -> usize {
        self.lock_ring().capacity()
    }

    /// Drops everything buffered but not yet played, in the ring and in
    /// the device. The device is stopped; it starts again once fresh
    /// audio has accumulated.
    pub fn flush(&self) {
        self.lock_ring().clear();
        let mut sink = self.lock_sink();
        sink.stop();
        sink.flush();
    }

    /// Stops the writer thread and the device. Buffered audio is dropped.
    pub fn close(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Sink writer thread panicked");
            }
        }
        let mut sink = self.lock_sink();
        sink.flush();
        sink.stop();
    }

    fn lock_ring(&self) -> std::sync::MutexGuard<'_, CircularBuffer<u8>> {
        self.shared.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_sink(&self) -> std::sync::MutexGuard<'_, Box<dyn AudioSink>> {
        self.shared.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SinkWriter {
    fn drop(&mut self) {
        self.close();
    }
}

fn writer_loop(shared: &WriterShared) {
    while shared.running.load(Ordering::Relaxed) {
        let wrote = {
            let mut sink = shared.sink.lock().unwrap_or_else(PoisonError::into_inner);
            let mut ring = shared.ring.lock().unwrap_or_else(PoisonError::into_inner);

            // The ring alone must hold a full device buffer before the
            // device starts; nothing is written while it is stopped.
            if !sink.is_active() && ring.len() >= sink.buffer_capacity() {
                sink.start();
            }
            if !sink.is_active() {
                false
            } else if ring.is_empty() {
                // Idle: once the device has played out everything, stop it
                if sink.available() >= sink.buffer_capacity() {
                    sink.stop();
                }
                false
            } else {
                let writable = sink.available().min(ring.len());
                if writable > 0 {
                    let mut chunk = vec![0u8; writable];
                    ring.read_into(&mut chunk);
                    sink.write(&chunk);
                    true
                } else {
                    false
                }
            }
        };
        if !wrote {
            std::thread::sleep(WRITER_SLEEP);
        }
    }
}
