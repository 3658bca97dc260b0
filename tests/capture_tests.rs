use std::path::Path;
use tutor_voice::audio::{CaptureConfig, CaptureSource, WavFileSource};
use tutor_voice::error::SessionError;

fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

fn config(frame_samples: usize) -> CaptureConfig {
    CaptureConfig {
        sample_rate: 16000,
        channels: 1,
        frame_samples,
    }
}

#[tokio::test]
async fn test_frames_are_fixed_size_with_zero_padded_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.wav");
    write_wav(&path, 16000, 1, &vec![1000i16; 5000]);

    let mut source = WavFileSource::new(&path, config(4096)).unpaced();
    let mut rx = source.start().await.unwrap();

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].samples.len(), 4096);
    assert_eq!(frames[1].samples.len(), 4096);

    // 5000 - 4096 = 904 real samples in the tail, the rest is silence
    assert!(frames[1].samples[903] != 0.0);
    assert!(frames[1].samples[904..].iter().all(|&s| s == 0.0));

    source.stop().await.unwrap();
}

#[tokio::test]
async fn test_stereo_input_is_downmixed_and_decimated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");

    // 960 stereo frames at 48 kHz -> 960 mono samples -> 320 at 16 kHz
    let mut samples = Vec::with_capacity(960 * 2);
    for _ in 0..960 {
        samples.push(500i16);
        samples.push(300i16);
    }
    write_wav(&path, 48000, 2, &samples);

    let mut source = WavFileSource::new(&path, config(128)).unpaced();
    let mut rx = source.start().await.unwrap();

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    // 320 samples in frames of 128: two full frames and a padded one
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.samples.len() == 128));
    assert!(frames.iter().all(|f| f.sample_rate == 16000));

    // Channels are summed: 500 + 300 = 800
    let expected = 800.0 / 32768.0;
    assert!((frames[0].samples[0] - expected).abs() < 1e-6);
}

#[tokio::test]
async fn test_missing_input_is_a_permission_error() {
    let mut source = WavFileSource::new("/nonexistent/mic.wav", config(4096)).unpaced();

    let err = source.start().await.unwrap_err();
    assert!(matches!(err, SessionError::Permission(_)));
    assert!(!source.is_capturing());
}

#[tokio::test]
async fn test_timestamps_advance_by_frame_duration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.wav");
    write_wav(&path, 16000, 1, &vec![100i16; 4096 * 3]);

    let mut source = WavFileSource::new(&path, config(4096)).unpaced();
    let mut rx = source.start().await.unwrap();

    let mut timestamps = Vec::new();
    while let Some(frame) = rx.recv().await {
        timestamps.push(frame.timestamp_ms);
    }

    // 4096 samples at 16 kHz = 256 ms per frame
    assert_eq!(timestamps, vec![0, 256, 512]);
    source.stop().await.unwrap();
}
