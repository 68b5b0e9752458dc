//! Audio playback for the time-up chime.

use rodio::source::{SineWave, Source, Zero};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to initialize audio output: {0}")]
    Stream(#[from] rodio::StreamError),
    #[error("Failed to play audio: {0}")]
    Play(#[from] rodio::PlayError),
}

/// A tone of the chime: frequency in Hz and length in milliseconds.
pub type Tone = (f32, u64);

/// Rising two-note chime played when focus time runs out.
pub const TIME_UP_CHIME: [Tone; 2] = [(880.0, 150), (1046.5, 200)];

/// Falling two-note alert played when a session could not be saved.
pub const SAVE_FAILED_ALERT: [Tone; 2] = [(440.0, 150), (330.0, 250)];

/// Gap between tones, in milliseconds.
const TONE_GAP_MS: u64 = 50;

pub struct AudioPlayer {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl AudioPlayer {
    /// Creates a new audio player.
    pub fn new() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    /// Plays the time-up chime in the background.
    pub fn play_chime(&self) {
        if let Err(e) = self.play_tones(&TIME_UP_CHIME) {
            tracing::warn!(target: "chessbar::audio", error = %e, "Failed to play chime");
        }
    }

    /// Plays the save-failed alert in the background.
    pub fn play_alert(&self) {
        if let Err(e) = self.play_tones(&SAVE_FAILED_ALERT) {
            tracing::warn!(target: "chessbar::audio", error = %e, "Failed to play alert");
        }
    }

    fn play_tones(&self, tones: &[Tone]) -> Result<(), AudioError> {
        let sink = Sink::try_new(&self.handle)?;

        for (i, &(freq, millis)) in tones.iter().enumerate() {
            if i > 0 {
                let silence =
                    Zero::<f32>::new(1, 44100).take_duration(Duration::from_millis(TONE_GAP_MS));
                sink.append(silence);
            }
            let tone = SineWave::new(freq)
                .take_duration(Duration::from_millis(millis))
                .amplify(0.3);
            sink.append(tone);
        }
        sink.detach(); // Play in background

        Ok(())
    }
}
