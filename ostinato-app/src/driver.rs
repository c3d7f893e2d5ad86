//! cpal-backed audio driver
//!
//! The output stream lives on its own thread (cpal streams are not `Send` on
//! every platform) and calls [`Engine::process`] once per device buffer.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender};
use ostinato_engine::{AudioDriver, Engine, ProcessOutcome};
use parking_lot::Mutex;
use tracing::{error, info};

/// How long to wait for the device to come up
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct CpalDriver {
    engine: Mutex<Weak<Engine>>,
    sample_rate: AtomicU32,
    shutdown: Arc<AtomicBool>,
    audio_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Default for CpalDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalDriver {
    pub fn new() -> Self {
        Self {
            engine: Mutex::new(Weak::new()),
            sample_rate: AtomicU32::new(0),
            shutdown: Arc::new(AtomicBool::new(false)),
            audio_thread: Mutex::new(None),
        }
    }

    /// Stop the stream and wait for the audio thread
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.audio_thread.lock().take() {
            let _ = handle.join();
            info!("audio stream closed");
        }
    }
}

impl AudioDriver for CpalDriver {
    fn initialize(&self) -> bool {
        let engine = self.engine.lock().clone();
        let shutdown = self.shutdown.clone();
        let (ready_tx, ready_rx) = bounded(1);

        let spawned = thread::Builder::new()
            .name("ostinato-audio".into())
            .spawn(move || run_audio_thread(engine, shutdown, ready_tx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                error!(%err, "failed to spawn audio thread");
                return false;
            }
        };

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(sample_rate)) => {
                self.sample_rate.store(sample_rate, Ordering::Release);
                *self.audio_thread.lock() = Some(handle);
                info!(sample_rate, "audio stream running");
                true
            }
            Ok(Err(message)) => {
                error!(%message, "audio device unavailable");
                let _ = handle.join();
                false
            }
            Err(_) => {
                error!("audio device did not start in time");
                self.shutdown.store(true, Ordering::SeqCst);
                false
            }
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Acquire)
    }

    fn set_engine(&self, engine: Weak<Engine>) {
        *self.engine.lock() = engine;
    }
}

fn run_audio_thread(
    engine: Weak<Engine>,
    shutdown: Arc<AtomicBool>,
    ready: Sender<Result<u32, String>>,
) {
    let host = cpal::default_host();
    let Some(device) = host.default_output_device() else {
        let _ = ready.send(Err("No audio output device found".into()));
        return;
    };

    let config = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready.send(Err(format!("Failed to get audio config: {}", e)));
            return;
        }
    };

    let sample_rate = config.sample_rate().0;
    let channels = config.channels().max(1) as usize;

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let nframes = (data.len() / channels) as u32;
            // Loops render into their own buffers; the device only hears silence
            let outcome = match engine.upgrade() {
                Some(engine) => engine.process(nframes),
                None => ProcessOutcome::Silence,
            };
            if outcome != ProcessOutcome::Skipped {
                data.fill(0.0);
            }
        },
        |err| {
            error!(%err, "audio stream error");
        },
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready.send(Err(format!("Failed to create audio stream: {}", e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(format!("Failed to start audio: {}", e)));
        return;
    }

    let _ = ready.send(Ok(sample_rate));

    // Keep the stream alive until asked to stop
    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(20));
    }
}
