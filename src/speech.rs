//! Fire-and-forget speech handoff.
//!
//! Evaluation results are pushed over a bounded channel to a detached
//! worker thread; the frame loop never waits on it.  A full queue or a
//! dead worker drops the utterance silently — speech is best-effort by
//! contract.

use crossbeam_channel::{bounded, Sender, TrySendError};
use tracing::{debug, info};

/// Queue depth before utterances are dropped.
const QUEUE_CAPACITY: usize = 8;

/// Consumer of utterances, run on the worker thread.  The embedding
/// process wires in the real synthesizer; the default sink just logs.
pub trait SpeechSink: Send + 'static {
    fn vocalize(&mut self, text: &str);
}

/// Default sink: log the utterance and move on.
pub struct LogSink;

impl SpeechSink for LogSink {
    fn vocalize(&mut self, text: &str) {
        info!(%text, "speech");
    }
}

/// Sink that swallows everything (`--mute`).
pub struct NullSink;

impl SpeechSink for NullSink {
    fn vocalize(&mut self, _text: &str) {}
}

/// Cloneable handle held by a session.  Dropping every handle ends the
/// worker thread.
#[derive(Clone)]
pub struct SpeechHandle {
    tx: Sender<String>,
}

impl SpeechHandle {
    /// Spawn a worker around the given sink.
    pub fn spawn<S: SpeechSink>(mut sink: S) -> Self {
        let (tx, rx) = bounded::<String>(QUEUE_CAPACITY);
        std::thread::spawn(move || {
            for text in rx.iter() {
                sink.vocalize(&text);
            }
            debug!("speech worker stopped");
        });
        Self { tx }
    }

    /// Queue an utterance.  Never blocks; drops on overflow or after the
    /// worker has gone away.
    pub fn say(&self, text: &str) {
        match self.tx.try_send(text.to_string()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!(%text, "speech queue full, dropped"),
            Err(TrySendError::Disconnected(_)) => debug!("speech worker gone, dropped"),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────
