//! Utterance endpointing
//!
//! Decides when a single-shot recognition session has heard a complete
//! utterance (speech followed by silence) or nothing at all.

use super::capture::SAMPLE_RATE;

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to accept (0.3 seconds)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Silence after speech that ends the utterance (0.8 seconds)
const END_SILENCE_SAMPLES: usize = 12_800;

/// Give up if no speech starts within 6 seconds
const NO_SPEECH_SAMPLES: usize = 6 * SAMPLE_RATE as usize;

/// Hard cap on utterance length (15 seconds)
const MAX_UTTERANCE_SAMPLES: usize = 15 * SAMPLE_RATE as usize;

/// Endpointing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// No speech yet
    Waiting,
    /// Speech started, accumulating
    Speaking,
    /// Speech followed by enough silence
    Complete,
    /// No speech before the timeout
    TimedOut,
}

/// Tracks speech energy across captured chunks
pub struct UtteranceDetector {
    state: EndpointState,
    utterance: Vec<f32>,
    waited: usize,
    speech: usize,
    silence: usize,
}

impl UtteranceDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: EndpointState::Waiting,
            utterance: Vec::new(),
            waited: 0,
            speech: 0,
            silence: 0,
        }
    }

    /// Feed the next chunk of samples and return the new state
    pub fn process(&mut self, samples: &[f32]) -> EndpointState {
        let is_speech = calculate_energy(samples) > ENERGY_THRESHOLD;

        match self.state {
            EndpointState::Waiting => {
                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.utterance.extend_from_slice(samples);
                    self.speech = samples.len();
                    self.silence = 0;
                    tracing::trace!("speech started");
                } else {
                    self.waited += samples.len();
                    if self.waited > NO_SPEECH_SAMPLES {
                        self.state = EndpointState::TimedOut;
                    }
                }
            }
            EndpointState::Speaking => {
                self.utterance.extend_from_slice(samples);

                if is_speech {
                    self.speech += samples.len();
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                if self.silence > END_SILENCE_SAMPLES && self.speech < MIN_SPEECH_SAMPLES {
                    // too short to be speech (click, cough)
                    tracing::trace!(samples = self.speech, "discarding noise burst");
                    self.waited += self.utterance.len();
                    self.utterance.clear();
                    self.speech = 0;
                    self.state = if self.waited > NO_SPEECH_SAMPLES {
                        EndpointState::TimedOut
                    } else {
                        EndpointState::Waiting
                    };
                } else if self.silence > END_SILENCE_SAMPLES
                    || self.utterance.len() > MAX_UTTERANCE_SAMPLES
                {
                    tracing::debug!(samples = self.utterance.len(), "utterance complete");
                    self.state = EndpointState::Complete;
                }
            }
            EndpointState::Complete | EndpointState::TimedOut => {}
        }

        self.state
    }

    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Take the captured utterance, leaving the detector empty
    pub fn take_utterance(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.utterance)
    }
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
