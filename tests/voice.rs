//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use onit::voice::{
    EndpointState, RecognitionConfig, RecognitionError, RecognitionEvent, RecognitionEvents,
    RecognitionState, Recognizer, SAMPLE_RATE, UtteranceDetector, samples_to_wav,
};
use onit::{Prosody, SpeechInput, SpeechOutput, Synthesizer};

mod common;

use common::RecordingSynth;

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

#[test]
fn test_speech_then_silence_completes_utterance() {
    let mut detector = UtteranceDetector::new();

    assert_eq!(
        detector.process(&generate_silence(0.2)),
        EndpointState::Waiting
    );

    let speech = generate_sine_samples(440.0, 0.5, 0.3);
    assert_eq!(detector.process(&speech), EndpointState::Speaking);

    // short pause keeps the utterance open
    let pause = generate_silence(0.3);
    assert_eq!(detector.process(&pause), EndpointState::Speaking);

    let trailing = generate_silence(1.0);
    assert_eq!(detector.process(&trailing), EndpointState::Complete);

    let utterance = detector.take_utterance();
    assert_eq!(utterance.len(), speech.len() + pause.len() + trailing.len());
}

#[test]
fn test_noise_burst_is_discarded() {
    let mut detector = UtteranceDetector::new();

    detector.process(&generate_sine_samples(440.0, 0.05, 0.5));
    assert_eq!(detector.state(), EndpointState::Speaking);

    assert_eq!(
        detector.process(&generate_silence(1.0)),
        EndpointState::Waiting
    );
    assert!(detector.take_utterance().is_empty());
}

#[test]
fn test_silence_only_times_out() {
    let mut detector = UtteranceDetector::new();

    let mut state = EndpointState::Waiting;
    for _ in 0..70 {
        state = detector.process(&generate_silence(0.1));
        if state != EndpointState::Waiting {
            break;
        }
    }
    assert_eq!(state, EndpointState::TimedOut);
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    let reader = hound::WavReader::new(Cursor::new(wav_data)).unwrap();
    assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len() as usize, samples.len());
}

#[test]
fn test_later_speech_preempts_earlier() {
    let synth = Arc::new(RecordingSynth::with_voices(&[("Google US English", "en-US")]));
    let speech = SpeechOutput::new(
        Some(Arc::clone(&synth) as Arc<dyn Synthesizer>),
        Prosody::default(),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = speech.on_speak(move |text| sink.lock().unwrap().push(text.to_string()));

    speech.say("A");
    speech.say("B");

    assert_eq!(synth.playing(), ["B"]);
    assert_eq!(*seen.lock().unwrap(), ["A", "B"]);

    let last = synth.last().unwrap();
    assert_eq!(last.voice.unwrap().name, "Google US English");
    assert!((last.prosody.pitch - 1.1).abs() < f32::EPSILON);
}

#[test]
fn test_speech_without_synthesizer_still_notifies() {
    let speech = SpeechOutput::new(None, Prosody::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = speech.on_speak(move |text| sink.lock().unwrap().push(text.to_string()));

    speech.say("nobody hears this");

    assert!(!speech.is_supported());
    assert_eq!(*seen.lock().unwrap(), ["nobody hears this"]);
}

/// Recognizer that stays busy until aborted, then transcribes
#[derive(Default)]
struct BusyOnce {
    busy: Mutex<bool>,
    starts: Mutex<usize>,
}

impl Recognizer for BusyOnce {
    fn start(
        &self,
        _config: &RecognitionConfig,
        events: RecognitionEvents,
    ) -> Result<(), RecognitionError> {
        *self.starts.lock().unwrap() += 1;
        let mut busy = self.busy.lock().unwrap();
        if *busy {
            return Err(RecognitionError::InvalidState);
        }
        *busy = true;
        drop(busy);
        events(RecognitionEvent::Transcript("open google".to_string()));
        events(RecognitionEvent::End);
        Ok(())
    }

    fn abort(&self) {
        *self.busy.lock().unwrap() = false;
    }
}

#[tokio::test(start_paused = true)]
async fn test_busy_recognizer_retries_once() {
    let recognizer = Arc::new(BusyOnce {
        busy: Mutex::new(true),
        ..BusyOnce::default()
    });
    let input = SpeechInput::new(
        Some(Arc::clone(&recognizer) as Arc<dyn Recognizer>),
        RecognitionConfig::default(),
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let err_tx = tx.clone();
    input.start_listening(
        move |text| {
            let _ = tx.send(Ok(text));
        },
        move |e| {
            let _ = err_tx.send(Err(e));
        },
    );

    assert_eq!(*recognizer.starts.lock().unwrap(), 1);
    assert!(rx.try_recv().is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;
    let result = rx.recv().await.unwrap();

    assert_eq!(result, Ok("open google".to_string()));
    assert_eq!(*recognizer.starts.lock().unwrap(), 2);
    assert_eq!(input.state(), RecognitionState::Idle);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_unsupported_recognition_reports_synchronously() {
    let input = SpeechInput::new(None, RecognitionConfig::default());
    let got = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&got);

    input.start_listening(|_| panic!("no transcript expected"), move |e| {
        *slot.lock().unwrap() = Some(e);
    });

    assert_eq!(*got.lock().unwrap(), Some(RecognitionError::Unsupported));
    assert!(!input.is_supported());
}
