mod common;

use common::ManualClock;
use std::sync::Arc;
use tutor_voice::audio::{AudioBuffer, PlaybackScheduler, PlaybackSink, WavSink};

fn tone(frames: usize, value: f32) -> AudioBuffer {
    AudioBuffer {
        samples: vec![value; frames],
        sample_rate: 24000,
        channels: 1,
    }
}

#[test]
fn test_wav_sink_persists_scheduled_audio_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assistant.wav");

    let sink = Arc::new(WavSink::create(&path, 24000, 1).unwrap());
    let scheduler = PlaybackScheduler::new(ManualClock::new(), sink.clone());

    scheduler.enqueue(&tone(100, 0.25));
    scheduler.enqueue(&tone(50, -0.5));

    // File-backed writes complete immediately
    assert_eq!(scheduler.active_count(), 0);

    sink.finalize().unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 24000);
    assert_eq!(reader.spec().channels, 1);

    let samples: Vec<i16> = reader.into_samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(samples.len(), 150);
    assert_eq!(samples[0], (0.25f32 * 32768.0) as i16);
    assert_eq!(samples[100], -16384);
}

#[test]
fn test_wav_sink_finalize_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assistant.wav");

    let sink = WavSink::create(&path, 24000, 1).unwrap();
    sink.schedule(0, &tone(10, 0.1), 0.0, Box::new(|| {}));

    sink.finalize().unwrap();
    sink.finalize().unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.len(), 10);
}

#[test]
fn test_wav_sink_creates_missing_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions").join("deep").join("a.wav");

    let sink = WavSink::create(&path, 24000, 1).unwrap();
    assert_eq!(sink.path(), path);
    sink.finalize().unwrap();

    assert!(path.exists());
}
