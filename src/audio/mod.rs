// Sound cue sinks
//
// Playback is best-effort: the caller logs a failure at debug level and
// moves on. Rate limiting lives in the event scheduler, not here.

use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("sound cue rejected: {0}")]
    Rejected(#[from] io::Error),
}

pub trait SoundCue {
    fn play(&mut self) -> Result<(), AudioError>;
}

/// Rings the terminal bell (BEL) on the given writer
pub struct TerminalBell<W: Write> {
    out: W,
}

impl TerminalBell<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> SoundCue for TerminalBell<W> {
    fn play(&mut self) -> Result<(), AudioError> {
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }
}

/// No-op sink for muted sessions
pub struct Silent;

impl SoundCue for Silent {
    fn play(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Play a cue and swallow any failure
pub fn play_best_effort(sink: &mut dyn SoundCue) {
    if let Err(e) = sink.play() {
        tracing::debug!(error = %e, "Sound cue failed, ignoring");
    }
}
