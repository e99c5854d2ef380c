//! Microphone capture for the desktop recognizer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Captures mono audio from the default input device
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    failed: Arc<AtomicBool>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Whether any input device exists
    #[must_use]
    pub fn is_available() -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    /// Open the default input device at [`SAMPLE_RATE`]
    ///
    /// Prefers a mono config; multi-channel devices are downmixed.
    ///
    /// # Errors
    ///
    /// Returns error if no input device or usable config exists
    pub fn open() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
            c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        };

        let configs: Vec<_> = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(|c| supports_rate(c))
            .collect();

        let supported = configs
            .iter()
            .find(|c| c.channels() == 1)
            .or_else(|| configs.first())
            .cloned()
            .ok_or_else(|| Error::Audio("no input config supports 16kHz".to_string()))?;

        let config = supported.with_sample_rate(SampleRate(SAMPLE_RATE)).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture opened"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            failed: Arc::new(AtomicBool::new(false)),
            stream: None,
        })
    }

    /// Start capturing; a no-op if already running
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let failed = Arc::clone(&self.failed);
        let channels = usize::from(self.config.channels.max(1));

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut buf = buffer.lock().unwrap_or_else(PoisonError::into_inner);
                    if channels == 1 {
                        buf.extend_from_slice(data);
                    } else {
                        #[allow(clippy::cast_precision_loss)]
                        buf.extend(
                            data.chunks(channels)
                                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                        );
                    }
                },
                move |err| {
                    tracing::error!(error = %err, "audio capture error");
                    failed.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing and release the stream
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("audio capture stopped");
        }
    }

    /// Take everything captured since the last drain
    #[must_use]
    pub fn drain(&self) -> Vec<f32> {
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Whether the device reported a stream error
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Encode f32 samples as 16-bit mono WAV for transcription
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
