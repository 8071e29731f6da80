//! Sound cues synthesized on the fly; no assets. All playback is
//! fire-and-forget: a missing or failing output device never reaches gameplay.

use rodio::source::{SineWave, Source, TakeDuration};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::time::Duration;

pub struct Audio {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

/// A short pure tone with a fade-out so note boundaries don't click.
fn note(freq: f32, ms: u64) -> rodio::source::Amplify<TakeDuration<SineWave>> {
    let mut tone = SineWave::new(freq).take_duration(Duration::from_millis(ms));
    tone.set_filter_fadeout();
    tone.amplify(0.20)
}

impl Audio {
    pub fn new() -> Result<Self, rodio::StreamError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    fn sink(&self) -> Option<Sink> {
        Sink::try_new(&self.handle).ok()
    }

    /// Block landed.
    pub fn play_drop(&self) {
        if let Some(sink) = self.sink() {
            sink.append(note(220.0, 90));
            sink.detach();
        }
    }

    /// Block landed dead center.
    pub fn play_perfect(&self) {
        if let Some(sink) = self.sink() {
            sink.append(note(520.0, 110));
            sink.append(note(680.0, 140));
            sink.detach();
        }
    }

    /// Block missed the tower.
    pub fn play_miss(&self) {
        if let Some(sink) = self.sink() {
            sink.append(note(300.0, 160));
            sink.append(note(150.0, 320));
            sink.detach();
        }
    }
}
