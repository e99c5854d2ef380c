//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::{Error, Result};

/// Poll interval while waiting for playback to drain
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Decoded mono PCM
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.samples.len() as u64 * 1000 / u64::from(self.sample_rate))
    }
}

/// Plays audio to the default output device
pub struct AudioPlayback {
    device: Device,
    config: StreamConfig,
}

impl AudioPlayback {
    /// Whether any output device exists
    #[must_use]
    pub fn is_available() -> bool {
        cpal::default_host().default_output_device().is_some()
    }

    /// Open the default output device at the given rate
    ///
    /// # Errors
    ///
    /// Returns error if no output device supports the rate
    pub fn open(sample_rate: u32) -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
            c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        };

        let configs: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(|c| supports_rate(c))
            .collect();

        let supported = configs
            .iter()
            .find(|c| c.channels() == 1)
            .or_else(|| configs.iter().find(|c| c.channels() == 2))
            .cloned()
            .ok_or_else(|| Error::Audio(format!("no output config supports {sample_rate}Hz")))?;

        let config = supported.with_sample_rate(SampleRate(sample_rate)).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio playback opened"
        );

        Ok(Self { device, config })
    }

    /// Play decoded audio, blocking until it drains or `stop` is raised
    ///
    /// Returns `false` when playback was interrupted.
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built or started
    pub fn play(&self, audio: DecodedAudio, volume: f32, stop: &Arc<AtomicBool>) -> Result<bool> {
        if audio.samples.is_empty() {
            return Ok(true);
        }

        let timeout = audio.duration() + Duration::from_millis(500);
        let total = audio.samples.len();
        let samples = Arc::new(audio.samples);
        let position = Arc::new(AtomicUsize::new(0));
        let channels = usize::from(self.config.channels.max(1));
        let volume = volume.clamp(0.0, 1.0);

        let stream = {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let stop = Arc::clone(stop);
            self.device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let halted = stop.load(Ordering::Relaxed);
                        let mut pos = position.load(Ordering::Relaxed);
                        for frame in data.chunks_mut(channels) {
                            let sample = match samples.get(pos) {
                                Some(s) if !halted => {
                                    pos += 1;
                                    s * volume
                                }
                                _ => 0.0,
                            };
                            frame.fill(sample);
                        }
                        position.store(pos, Ordering::Relaxed);
                    },
                    |err| {
                        tracing::error!(error = %err, "audio playback error");
                    },
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let started = Instant::now();
        while position.load(Ordering::Relaxed) < total {
            if stop.load(Ordering::Relaxed) {
                tracing::debug!(played = position.load(Ordering::Relaxed), "playback interrupted");
                return Ok(false);
            }
            if started.elapsed() > timeout {
                tracing::warn!("playback timed out");
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        // let the device flush its last buffer
        std::thread::sleep(Duration::from_millis(100));
        drop(stream);

        tracing::debug!(samples = total, "playback complete");
        Ok(true)
    }
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error on malformed frames
pub fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut decoded = DecodedAudio::default();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if decoded.sample_rate == 0 {
                    decoded.sample_rate = u32::try_from(frame.sample_rate).unwrap_or_default();
                }

                let channels = frame.channels.max(1);
                decoded.samples.extend(frame.data.chunks(channels).map(|chunk| {
                    #[allow(clippy::cast_precision_loss)]
                    let sum: f32 = chunk.iter().map(|&s| f32::from(s) / 32768.0).sum::<f32>()
                        / chunk.len() as f32;
                    sum
                }));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(decoded)
}
