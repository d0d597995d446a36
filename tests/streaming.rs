//! End-to-end mixing and streaming behavior.

use floramix::format::{AudioFormat, BYTES_PER_SAMPLE};
use floramix::mixer::AudioMixer;
use floramix::pcm::MonoStaticSource;
use floramix::sink::AudioSink;
use floramix::sound::{MonoSound, shared_sound};
use floramix::stream::{OverrunPolicy, StreamConfig, StreamingAudioMixer};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct MockSink {
    written: Arc<Mutex<Vec<u8>>>,
    available: usize,
    buffer_capacity: usize,
    active: bool,
}

impl MockSink {
    fn new(available: usize) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                written: written.clone(),
                available,
                buffer_capacity: 256,
                active: false,
            },
            written,
        )
    }
}

impl AudioSink for MockSink {
    fn available(&self) -> usize {
        self.available
    }

    fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    fn write(&mut self, data: &[u8]) -> usize {
        self.written.lock().unwrap().extend_from_slice(data);
        data.len()
    }

    fn start(&mut self) {
        self.active = true;
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn flush(&mut self) {}

    fn is_active(&self) -> bool {
        self.active
    }
}

fn decode(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    panic!("condition not reached in time");
}

#[test]
fn one_second_source_plays_out_in_slices() {
    let format = AudioFormat::stereo(48000.0).unwrap();
    let mixer = AudioMixer::new(format);
    let source = MonoStaticSource::new(vec![0.25; 48000]).unwrap();
    mixer.play_sound(shared_sound(MonoSound::new(Box::new(source))));

    let mut frames = 0usize;
    for _ in 0..100 {
        let block = mixer.mix_millis(10.0);
        assert_eq!(block.len(), 960);
        frames += block.len() / 2;
    }
    assert_eq!(frames, 48000);
    // The source ran out exactly at the end and was pruned
    assert_eq!(mixer.active_sounds(), 0);

    // Further slices are pure silence
    assert!(mixer.mix_millis(10.0).iter().all(|&s| s == 0.0));
}

#[test]
fn concurrent_sources_sum_linearly() {
    let format = AudioFormat::mono(48000.0).unwrap();
    let mixer = AudioMixer::new(format);
    for _ in 0..2 {
        let source = MonoStaticSource::new(vec![0.5; 4800]).unwrap();
        mixer.play_sound(shared_sound(MonoSound::new(Box::new(source))));
    }

    let block = mixer.mix(480);
    assert!(block.iter().all(|&s| (s - 1.0).abs() < 1e-6));
    assert_eq!(mixer.mixed_sounds(), 2);
}

#[test]
fn double_pitch_halves_playback_length() {
    let format = AudioFormat::mono(48000.0).unwrap();
    let mixer = AudioMixer::new(format);
    let source = MonoStaticSource::new(vec![0.5; 9600]).unwrap();
    let sound = MonoSound::with_pitch(Box::new(source), 2.0).unwrap();
    mixer.play_sound(shared_sound(sound));

    let mut rendered = 0usize;
    while mixer.active_sounds() > 0 {
        rendered += mixer.mix(480).len();
        assert!(rendered <= 9600, "sound should have finished by now");
    }
    // 9600 samples at double speed last 4800 output frames
    assert_eq!(rendered, 4800);
}

#[test]
fn streamed_slices_reach_the_sink() {
    let format = AudioFormat::stereo(48000.0).unwrap();
    let (sink, written) = MockSink::new(1 << 20);
    let mixer = StreamingAudioMixer::new(format, Box::new(sink), StreamConfig::new()).unwrap();

    let source = MonoStaticSource::new(vec![0.25; 48000]).unwrap();
    mixer.play_sound(shared_sound(MonoSound::new(Box::new(source))));

    for _ in 0..5 {
        mixer.mix_slice().unwrap();
    }
    // 5 slices of 20 ms at 48 kHz stereo
    let expected_bytes = 5 * 960 * 2 * BYTES_PER_SAMPLE;
    wait_for(|| written.lock().unwrap().len() == expected_bytes);

    let samples = decode(&written.lock().unwrap());
    assert!(samples.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    mixer.close();
}

#[test]
fn scheduler_streams_without_manual_slices() {
    let format = AudioFormat::stereo(48000.0).unwrap();
    let (sink, written) = MockSink::new(1 << 20);
    let mixer = StreamingAudioMixer::new(
        format,
        Box::new(sink),
        StreamConfig::new().slice_millis(5.0),
    )
    .unwrap();

    let source = MonoStaticSource::new(vec![0.5; 48000]).unwrap();
    mixer.play_sound(shared_sound(MonoSound::new(Box::new(source))));

    mixer.start().unwrap();
    wait_for(|| !written.lock().unwrap().is_empty());
    mixer.close();

    assert!(decode(&written.lock().unwrap()).iter().any(|&s| s == 0.5));
}

#[test]
fn master_volume_scales_the_stream() {
    let format = AudioFormat::mono(48000.0).unwrap();
    let (sink, written) = MockSink::new(1 << 20);
    let mixer = StreamingAudioMixer::new(format, Box::new(sink), StreamConfig::new()).unwrap();
    mixer.set_master_volume(0.5).unwrap();
    assert_eq!(mixer.master_volume(), 0.5);

    let source = MonoStaticSource::new(vec![1.0; 48000]).unwrap();
    mixer.play_sound(shared_sound(MonoSound::new(Box::new(source))));
    mixer.mix_slice().unwrap();

    wait_for(|| !written.lock().unwrap().is_empty());
    mixer.close();
    let samples = decode(&written.lock().unwrap());
    assert!(samples.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn master_volume_attenuates_a_loud_normalized_mix() {
    let format = AudioFormat::mono(48000.0).unwrap();
    let (sink, written) = MockSink::new(1 << 20);
    let mixer = StreamingAudioMixer::new(format, Box::new(sink), StreamConfig::new()).unwrap();
    mixer.set_master_volume(0.5).unwrap();

    // Two full-scale sources sum to 2.0; normalization brings that back
    // to 1 and the master volume then halves what reaches the sink
    for _ in 0..2 {
        let source = MonoStaticSource::new(vec![1.0; 48000]).unwrap();
        mixer.play_sound(shared_sound(MonoSound::new(Box::new(source))));
    }
    mixer.mix_slice().unwrap();
    wait_for(|| !written.lock().unwrap().is_empty());
    mixer.close();

    let samples = decode(&written.lock().unwrap());
    assert!(samples.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn normalization_caps_the_mix_and_resets_on_stop_all() {
    let format = AudioFormat::mono(48000.0).unwrap();
    let (sink, written) = MockSink::new(1 << 20);
    let mixer = StreamingAudioMixer::new(format, Box::new(sink), StreamConfig::new()).unwrap();

    // Two full-scale sources sum to 2.0; normalization brings it back to 1
    for _ in 0..2 {
        let source = MonoStaticSource::new(vec![1.0; 48000]).unwrap();
        mixer.play_sound(shared_sound(MonoSound::new(Box::new(source))));
    }
    mixer.mix_slice().unwrap();
    let slice_bytes = 960 * BYTES_PER_SAMPLE;
    wait_for(|| written.lock().unwrap().len() == slice_bytes);
    {
        let samples = decode(&written.lock().unwrap());
        assert!(samples.iter().all(|&s| (s - 1.0).abs() < 1e-6));
    }

    // After stopping everything, a quiet source plays at its own level
    // instead of being attenuated by the remembered peak
    mixer.stop_all_sounds();
    assert_eq!(mixer.active_sounds(), 0);
    let source = MonoStaticSource::new(vec![0.5; 48000]).unwrap();
    mixer.play_sound(shared_sound(MonoSound::new(Box::new(source))));
    mixer.mix_slice().unwrap();
    wait_for(|| written.lock().unwrap().len() == 2 * slice_bytes);
    mixer.close();

    let samples = decode(&written.lock().unwrap());
    assert!(samples[960..].iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn skip_policy_drops_slices_when_the_ring_is_full() {
    let format = AudioFormat::mono(48000.0).unwrap();
    // A sink that never accepts anything keeps the ring from draining
    let (sink, _) = MockSink::new(0);
    let mixer = StreamingAudioMixer::new(
        format,
        Box::new(sink),
        StreamConfig::new()
            .slice_millis(20.0)
            .buffer_millis(20.0)
            .overrun_policy(OverrunPolicy::Skip),
    )
    .unwrap();

    mixer.mix_slice().unwrap();
    mixer.mix_slice().unwrap();
    // Only the first slice fit; the second was dropped
    assert_eq!(mixer.buffered_bytes(), 960 * BYTES_PER_SAMPLE);
    mixer.close();
}

#[test]
fn block_policy_stalls_the_producer_until_close() {
    let format = AudioFormat::mono(48000.0).unwrap();
    let (sink, _) = MockSink::new(0);
    let mixer = Arc::new(
        StreamingAudioMixer::new(
            format,
            Box::new(sink),
            StreamConfig::new()
                .slice_millis(20.0)
                .buffer_millis(20.0)
                .overrun_policy(OverrunPolicy::Block),
        )
        .unwrap(),
    );

    mixer.mix_slice().unwrap();
    let producer = Arc::clone(&mixer);
    let handle = std::thread::spawn(move || producer.mix_slice());

    // The ring holds exactly one slice, so the second write stays blocked
    std::thread::sleep(Duration::from_millis(30));
    assert!(!handle.is_finished());
    assert_eq!(mixer.buffered_bytes(), 960 * BYTES_PER_SAMPLE);

    // Closing releases the blocked producer instead of deadlocking
    mixer.close();
    handle.join().unwrap().unwrap();
}

#[test]
fn flush_policy_replaces_stale_audio() {
    let format = AudioFormat::mono(48000.0).unwrap();
    let (sink, _) = MockSink::new(0);
    let mixer = StreamingAudioMixer::new(
        format,
        Box::new(sink),
        StreamConfig::new()
            .slice_millis(20.0)
            .buffer_millis(20.0)
            .overrun_policy(OverrunPolicy::Flush),
    )
    .unwrap();

    mixer.mix_slice().unwrap();
    mixer.mix_slice().unwrap();
    // The stale slice was flushed and the new one took its place
    assert_eq!(mixer.buffered_bytes(), 960 * BYTES_PER_SAMPLE);
    mixer.close();
}
