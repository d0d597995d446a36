use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::modifier::ModifierChain;
use crate::sound::{MixBus, SharedSound, Sound};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

struct RenderRequest {
    format: AudioFormat,
    len: usize,
}

struct Worker {
    bus: MixBus,
    request_tx: Option<Sender<RenderRequest>>,
    result_rx: Receiver<Vec<f32>>,
    handle: Option<JoinHandle<()>>,
}

/// A mix bus that renders its children on a pool of worker threads.
///
/// Sounds are spread round-robin over per-worker partitions, each a plain
/// [`MixBus`]. A render runs in two phases: every worker is handed the
/// block request, then the partial mixes are collected and summed on the
/// calling thread before the bus modifier chain runs. Workers shut down
/// when their request channel disconnects, so dropping the bus never
/// leaves threads behind.
pub struct ThreadedMixBus {
    workers: Vec<Worker>,
    next_worker: AtomicUsize,
    modifiers: ModifierChain,
}

impl ThreadedMixBus {
    pub fn new(threads: usize, max_sounds: usize) -> Result<Self> {
        if threads == 0 {
            return Err(FloraMixError::Configuration(
                "Thread count must be at least 1".into(),
            ));
        }
        if max_sounds < threads {
            return Err(FloraMixError::Configuration(format!(
                "Capacity {max_sounds} is below the thread count {threads}"
            )));
        }

        let per_worker = max_sounds.div_ceil(threads);
        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let bus = MixBus::new(per_worker)?;
            let (request_tx, request_rx) = bounded::<RenderRequest>(1);
            let (result_tx, result_rx) = bounded::<Vec<f32>>(1);

            let worker_bus = bus.clone();
            let handle = std::thread::Builder::new()
                .name(format!("floramix-mix-worker-{index}"))
                .spawn(move || {
                    for request in request_rx {
                        let mut partial = vec![0.0f32; request.len];
                        worker_bus.render_into(&request.format, &mut partial);
                        if result_tx.send(partial).is_err() {
                            break;
                        }
                    }
                })
                .map_err(FloraMixError::Io)?;

            workers.push(Worker {
                bus,
                request_tx: Some(request_tx),
                result_rx,
                handle: Some(handle),
            });
        }

        Ok(Self {
            workers,
            next_worker: AtomicUsize::new(0),
            modifiers: ModifierChain::new(),
        })
    }

    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Adds a sound to the next partition in round-robin order.
    pub fn play_sound(&self, sound: SharedSound) {
        let index = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.workers[index].bus.play_sound(sound);
    }

    pub fn stop_sound(&self, sound: &SharedSound) -> bool {
        self.workers.iter().any(|worker| worker.bus.stop_sound(sound))
    }

    pub fn stop_all_sounds(&self) {
        for worker in &self.workers {
            worker.bus.stop_all_sounds();
        }
    }

    pub fn active_sounds(&self) -> usize {
        self.workers.iter().map(|worker| worker.bus.active_sounds()).sum()
    }

    pub fn mixed_sounds(&self) -> usize {
        self.workers.iter().map(|worker| worker.bus.mixed_sounds()).sum()
    }

    /// Fans the block out to all workers, sums the partial mixes, then
    /// applies the bus modifier chain. A worker that has died contributes
    /// silence rather than stalling the render.
    pub fn render_into(&self, format: &AudioFormat, out: &mut [f32]) {
        for worker in &self.workers {
            if let Some(request_tx) = &worker.request_tx {
                let request = RenderRequest {
                    format: *format,
                    len: out.len(),
                };
                if request_tx.send(request).is_err() {
                    log::error!("Mix worker is gone, skipping its partition");
                }
            }
        }

        out.fill(0.0);
        for worker in &self.workers {
            let Ok(partial) = worker.result_rx.recv() else {
                continue;
            };
            for (acc, sample) in out.iter_mut().zip(partial.iter()) {
                *acc += *sample;
            }
        }

        self.modifiers.apply(format, out);
    }

    /// Disconnects the request channels and joins the workers.
    pub fn close(&mut self) {
        for worker in &mut self.workers {
            worker.request_tx.take();
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    log::error!("Mix worker thread panicked");
                }
            }
        }
    }
}

impl Sound for ThreadedMixBus {
    fn render(&mut self, format: &AudioFormat, out: &mut [f32]) {
        self.render_into(format, out);
    }

    fn is_finished(&self) -> bool {
        false
    }

    fn modifiers(&self) -> &ModifierChain {
        &self.modifiers
    }
}

impl Drop for ThreadedMixBus {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::MonoStaticSource;
    use crate::sound::{MonoSound, shared_sound};

    fn constant_sound(value: f32, len: usize) -> SharedSound {
        let source = MonoStaticSource::new(vec![value; len]).unwrap();
        shared_sound(MonoSound::new(Box::new(source)))
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(ThreadedMixBus::new(0, 8).is_err());
        assert!(ThreadedMixBus::new(4, 2).is_err());
    }

    #[test]
    fn parallel_render_matches_serial_sum() {
        let bus = ThreadedMixBus::new(3, 12).unwrap();
        for value in [0.1, 0.2, 0.3, 0.4] {
            bus.play_sound(constant_sound(value, 64));
        }

        let format = AudioFormat::mono(48000.0).unwrap();
        let mut out = [0.0f32; 16];
        bus.render_into(&format, &mut out);
        for sample in out {
            assert!((sample - 1.0).abs() < 1e-6);
        }
        assert_eq!(bus.mixed_sounds(), 4);
    }

    #[test]
    fn stop_sound_finds_its_partition() {
        let bus = ThreadedMixBus::new(2, 8).unwrap();
        let target = constant_sound(1.0, 64);
        bus.play_sound(constant_sound(0.5, 64));
        bus.play_sound(target.clone());
        assert!(bus.stop_sound(&target));
        assert_eq!(bus.active_sounds(), 1);
    }

    #[test]
    fn close_joins_workers() {
        let mut bus = ThreadedMixBus::new(2, 8).unwrap();
        bus.play_sound(constant_sound(0.5, 64));
        bus.close();
        // Rendering after close yields silence instead of hanging
        let format = AudioFormat::mono(48000.0).unwrap();
        let mut out = [1.0f32; 4];
        bus.render_into(&format, &mut out);
        assert_eq!(out, [0.0; 4]);
    }
}
