//! Cue playback on a dedicated audio thread.
//!
//! The output stream is not `Send`, so it lives on its own thread and is
//! driven over a channel. Without the `sound` feature cues are only logged.

use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use log::debug;

use super::cue::Cue;

enum CueCommand {
    Play(Cue),
    Stop,
}

pub struct CuePlayer {
    tx: Arc<Mutex<Option<Sender<CueCommand>>>>,
}

impl Default for CuePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl CuePlayer {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether the audio thread has been spawned.
    pub fn is_started(&self) -> bool {
        self.tx.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    fn ensure_thread(&self) -> Result<Sender<CueCommand>, String> {
        let mut guard = self.tx.lock().map_err(|e| e.to_string())?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<CueCommand>();

        thread::Builder::new()
            .name("cue-player".to_string())
            .spawn(move || run_audio_thread(rx))
            .map_err(|e| e.to_string())?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    pub fn play(&self, cue: Cue) -> Result<(), String> {
        let tx = self.ensure_thread()?;
        tx.send(CueCommand::Play(cue)).map_err(|e| e.to_string())
    }

    pub fn stop(&self) {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(CueCommand::Stop);
        }
    }
}

impl Drop for CuePlayer {
    fn drop(&mut self) {
        // Dropping the sender ends the thread's receive loop.
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
    }
}

#[cfg(feature = "sound")]
fn run_audio_thread(rx: mpsc::Receiver<CueCommand>) {
    use rodio::{OutputStream, Sink};

    use super::cue::ToneSequence;

    let mut _stream: Option<OutputStream> = None;
    let mut sink: Option<Sink> = None;

    fn ensure_sink(
        stream: &mut Option<OutputStream>,
        sink: &mut Option<Sink>,
    ) -> Result<(), String> {
        if sink.is_none() {
            let (s, handle) = OutputStream::try_default()
                .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
            let new_sink =
                Sink::try_new(&handle).map_err(|e| format!("Failed to create audio sink: {}", e))?;
            *stream = Some(s);
            *sink = Some(new_sink);
        }
        Ok(())
    }

    while let Ok(cmd) = rx.recv() {
        match cmd {
            CueCommand::Play(cue) => {
                if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                    log::warn!("{err}");
                    continue;
                }
                if let Some(ref s) = sink {
                    s.append(ToneSequence::new(cue));
                }
            }
            CueCommand::Stop => {
                if let Some(s_old) = sink.take() {
                    s_old.stop();
                }
                _stream = None;
            }
        }
    }
    debug!("cue player thread exiting");
}

#[cfg(not(feature = "sound"))]
fn run_audio_thread(rx: mpsc::Receiver<CueCommand>) {
    while let Ok(cmd) = rx.recv() {
        if let CueCommand::Play(cue) = cmd {
            debug!("sound support not compiled in; skipping {cue:?} cue");
        }
    }
    debug!("cue player thread exiting");
}
