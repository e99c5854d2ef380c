//! Shared test fakes for the platform traits
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use onit::camera::{CameraError, MediaDevices, MediaStream, MediaTrack, VideoSink};
use onit::voice::{Utterance, Voice};
use onit::{
    CameraManager, CommandDispatcher, CommandRegistry, Navigator, Prosody, SpeechOutput,
    Synthesizer,
};

/// Synthesizer that records what reached playback
#[derive(Default)]
pub struct RecordingSynth {
    pub voices: Mutex<Vec<Voice>>,
    /// Utterances still "playing" (cleared by cancel)
    pub queue: Mutex<Vec<Utterance>>,
    /// Every utterance ever handed over
    pub spoken: Mutex<Vec<Utterance>>,
    pub cancels: AtomicUsize,
}

impl RecordingSynth {
    pub fn with_voices(voices: &[(&str, &str)]) -> Self {
        Self {
            voices: Mutex::new(voices.iter().map(|(n, l)| Voice::new(*n, *l)).collect()),
            ..Self::default()
        }
    }

    pub fn playing(&self) -> Vec<String> {
        self.queue.lock().unwrap().iter().map(|u| u.text.clone()).collect()
    }

    pub fn last(&self) -> Option<Utterance> {
        self.spoken.lock().unwrap().last().cloned()
    }
}

impl Synthesizer for RecordingSynth {
    fn voices(&self) -> Vec<Voice> {
        self.voices.lock().unwrap().clone()
    }

    fn speak(&self, utterance: Utterance) {
        self.spoken.lock().unwrap().push(utterance.clone());
        self.queue.lock().unwrap().push(utterance);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().unwrap().clear();
    }
}

/// Navigator that remembers every URL
#[derive(Default)]
pub struct RecordingNavigator {
    pub opened: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn urls(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn open(&self, url: &str) -> onit::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub struct FakeTrack {
    id: String,
    stopped: Arc<AtomicBool>,
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Media devices handing out single-track streams
#[derive(Default)]
pub struct FakeCamera {
    pub tracks: Mutex<Vec<Arc<AtomicBool>>>,
    pub deny: bool,
    /// Holds `open_video` until a permit is added
    pub gate: Option<Semaphore>,
}

impl FakeCamera {
    pub fn opened(&self) -> usize {
        self.tracks.lock().unwrap().len()
    }

    pub fn stopped(&self, index: usize) -> bool {
        self.tracks.lock().unwrap()[index].load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDevices for FakeCamera {
    async fn open_video(&self) -> Result<MediaStream, CameraError> {
        if self.deny {
            return Err(CameraError::PermissionDenied);
        }
        let stopped = Arc::new(AtomicBool::new(false));
        let n = {
            let mut tracks = self.tracks.lock().unwrap();
            tracks.push(Arc::clone(&stopped));
            tracks.len()
        };
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        Ok(MediaStream::new(
            format!("stream-{n}"),
            vec![Box::new(FakeTrack {
                id: format!("track-{n}"),
                stopped,
            })],
        ))
    }
}

#[derive(Default)]
pub struct FakeSink {
    pub attached: Mutex<Vec<String>>,
}

#[async_trait]
impl VideoSink for FakeSink {
    fn attach(&self, stream: &MediaStream) {
        self.attached.lock().unwrap().push(stream.id().to_string());
    }

    async fn play(&self) -> Result<(), CameraError> {
        Ok(())
    }
}

/// A dispatcher wired to recording fakes
pub struct Harness {
    pub dispatcher: CommandDispatcher,
    pub speech: Arc<SpeechOutput>,
    pub synth: Arc<RecordingSynth>,
    pub navigator: Arc<RecordingNavigator>,
    pub camera: Arc<CameraManager>,
    pub devices: Arc<FakeCamera>,
    pub sink: Arc<FakeSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_registry(CommandRegistry::with_builtins("OnIt"))
    }

    pub fn with_registry(registry: CommandRegistry) -> Self {
        Self::build(registry, FakeCamera::default())
    }

    /// Builtins with a camera whose `open_video` waits on `devices.gate`
    pub fn with_gated_camera() -> Self {
        Self::build(
            CommandRegistry::with_builtins("OnIt"),
            FakeCamera {
                gate: Some(Semaphore::new(0)),
                ..FakeCamera::default()
            },
        )
    }

    fn build(registry: CommandRegistry, devices: FakeCamera) -> Self {
        let synth = Arc::new(RecordingSynth::with_voices(&[("Google US English", "en-US")]));
        let speech = Arc::new(SpeechOutput::new(
            Some(Arc::clone(&synth) as Arc<dyn Synthesizer>),
            Prosody::default(),
        ));
        let navigator = Arc::new(RecordingNavigator::default());
        let devices = Arc::new(devices);
        let camera = Arc::new(CameraManager::new(Some(
            Arc::clone(&devices) as Arc<dyn MediaDevices>
        )));
        let sink = Arc::new(FakeSink::default());

        let dispatcher = CommandDispatcher::new(
            registry,
            Arc::clone(&speech),
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            Arc::clone(&camera),
        )
        .with_video_sink(Arc::clone(&sink) as Arc<dyn VideoSink>);

        Self {
            dispatcher,
            speech,
            synth,
            navigator,
            camera,
            devices,
            sink,
        }
    }

    /// Text of the most recent utterance
    pub fn last_said(&self) -> Option<String> {
        self.synth.last().map(|u| u.text)
    }
}
