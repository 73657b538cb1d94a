//! Microphone capture engine
//!
//! Exclusively owns the microphone while recording: one engine instance per
//! input device per process. The cpal stream is `!Send`, so it lives on a
//! dedicated thread that parks on a control channel; `stop()` releases the
//! device by unwinding that thread.

use crate::chunk::{f32_to_i16, AudioChunk, AudioChunker};
use crate::config::AudioConfig;
use crate::error::AudioError;
use crate::level::{AudioLevel, LevelMeter};
use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleFormat, SampleRate, StreamConfig};
use crossbeam_channel::{bounded, Sender};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Capture loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    Idle,
    Recording,
    Paused,
}

enum Control {
    Stop,
}

/// State shared with the device callback
struct CaptureShared {
    state: RwLock<CaptureState>,
    chunker: Mutex<AudioChunker>,
    session_buf: Mutex<Vec<i16>>,
    meter: LevelMeter,
    last_error: RwLock<Option<String>>,
}

impl CaptureShared {
    /// Device callback path: re-cut samples into chunks and publish.
    ///
    /// Must stay cheap; it runs on the audio driver thread. Slow broadcast
    /// subscribers lag and lose old chunks rather than blocking here.
    fn ingest(
        &self,
        samples: &[i16],
        chunk_tx: &broadcast::Sender<AudioChunk>,
        level_tx: &broadcast::Sender<AudioLevel>,
    ) {
        if *self.state.read() != CaptureState::Recording {
            return;
        }
        let chunks = self.chunker.lock().push(samples);
        if chunks.is_empty() {
            return;
        }
        let mut session_buf = self.session_buf.lock();
        for chunk in chunks {
            let level = self.meter.measure(&chunk.samples);
            session_buf.extend_from_slice(&chunk.samples);
            if chunk_tx.send(chunk).is_err() {
                debug!("No chunk subscribers, dropping chunk");
            }
            if level_tx.send(level).is_err() {
                debug!("No level subscribers, dropping level update");
            }
        }
    }
}

/// Microphone capture engine
pub struct AudioCaptureEngine {
    config: Arc<AudioConfig>,
    shared: Arc<CaptureShared>,
    chunk_tx: broadcast::Sender<AudioChunk>,
    level_tx: broadcast::Sender<AudioLevel>,
    control_tx: Mutex<Option<Sender<Control>>>,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl AudioCaptureEngine {
    /// Create a new capture engine. Does not touch the device until `start`.
    pub fn new(config: AudioConfig) -> Result<Self, AudioError> {
        config.validate().map_err(AudioError::Config)?;

        let (chunk_tx, _) = broadcast::channel(config.broadcast_capacity);
        let (level_tx, _) = broadcast::channel(config.broadcast_capacity);
        let shared = Arc::new(CaptureShared {
            state: RwLock::new(CaptureState::Idle),
            chunker: Mutex::new(AudioChunker::new(
                config.chunk_samples(),
                config.sample_rate,
            )),
            session_buf: Mutex::new(Vec::new()),
            meter: LevelMeter::new(config.levels.clone()),
            last_error: RwLock::new(None),
        });

        Ok(Self {
            config: Arc::new(config),
            shared,
            chunk_tx,
            level_tx,
            control_tx: Mutex::new(None),
            thread: Mutex::new(None),
        })
    }

    /// Acquire the microphone and start emitting chunks.
    ///
    /// Idempotent no-op if already running (recording or paused). Device
    /// acquisition failure is one-shot: the engine stays usable and `start`
    /// may be retried.
    pub fn start(&self) -> Result<(), AudioError> {
        {
            let mut state = self.shared.state.write();
            if *state != CaptureState::Idle {
                return Ok(());
            }
            *state = CaptureState::Recording;
        }

        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        let (control_tx, control_rx) = bounded::<Control>(1);
        let config = self.config.clone();
        let shared = self.shared.clone();
        let chunk_tx = self.chunk_tx.clone();
        let level_tx = self.level_tx.clone();

        let handle = std::thread::Builder::new()
            .name("guidelens-audio-capture".to_string())
            .spawn(move || {
                let stream = match build_input_stream(&config, &shared, chunk_tx, level_tx) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx
                        .send(Err(AudioError::Capture(format!("Failed to start stream: {}", e))));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Park here; the stream must stay alive on this thread.
                // A dropped sender unparks us too, so an engine dropped
                // without stop() still releases the device.
                let _: Result<Control, _> = control_rx.recv();
                drop(stream);
            })
            .map_err(|e| AudioError::Capture(format!("Failed to spawn capture thread: {}", e)))?;

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {
                *self.control_tx.lock() = Some(control_tx);
                *self.thread.lock() = Some(handle);
                info!("Audio capture started at {} Hz", self.config.sample_rate);
                Ok(())
            }
            Ok(Err(e)) => {
                *self.shared.state.write() = CaptureState::Idle;
                *self.shared.last_error.write() = Some(e.to_string());
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                *self.shared.state.write() = CaptureState::Idle;
                let _ = control_tx.send(Control::Stop);
                let e = AudioError::Device("Timed out opening input device".to_string());
                *self.shared.last_error.write() = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Release the microphone and return the accumulated session recording.
    ///
    /// The returned buffer always ends on a whole-chunk boundary; a trailing
    /// partial chunk is discarded. Returns None if nothing was recorded.
    /// Safe to call when not running.
    pub fn stop(&self) -> Option<Bytes> {
        *self.shared.state.write() = CaptureState::Idle;

        if let Some(control_tx) = self.control_tx.lock().take() {
            let _ = control_tx.send(Control::Stop);
        }
        if let Some(handle) = self.thread.lock().take() {
            if handle.join().is_err() {
                warn!("Audio capture thread panicked during shutdown");
            }
            info!("Audio capture stopped");
        }

        self.shared.chunker.lock().reset();
        let samples = std::mem::take(&mut *self.shared.session_buf.lock());
        if samples.is_empty() {
            return None;
        }
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for sample in &samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        Some(Bytes::from(bytes))
    }

    /// Suspend chunk emission without releasing the device
    pub fn pause(&self) {
        let mut state = self.shared.state.write();
        if *state == CaptureState::Recording {
            *state = CaptureState::Paused;
            debug!("Audio capture paused");
        }
    }

    /// Continue after `pause`. No-op without a prior pause.
    pub fn resume(&self) {
        let mut state = self.shared.state.write();
        if *state == CaptureState::Paused {
            *state = CaptureState::Recording;
            debug!("Audio capture resumed");
        }
    }

    /// Whether the engine currently feeds chunks downstream
    pub fn is_recording(&self) -> bool {
        *self.shared.state.read() == CaptureState::Recording
    }

    pub fn is_paused(&self) -> bool {
        *self.shared.state.read() == CaptureState::Paused
    }

    /// One-shot device error reported by the stream, cleared on read
    pub fn take_error(&self) -> Option<String> {
        self.shared.last_error.write().take()
    }

    pub fn subscribe_chunks(&self) -> broadcast::Receiver<AudioChunk> {
        self.chunk_tx.subscribe()
    }

    pub fn subscribe_levels(&self) -> broadcast::Receiver<AudioLevel> {
        self.level_tx.subscribe()
    }

    /// Available input devices on the default host
    pub fn list_devices() -> Result<Vec<String>, AudioError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| AudioError::Device(format!("Failed to enumerate devices: {}", e)))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    #[cfg(test)]
    fn ingest_for_test(&self, samples: &[i16]) {
        self.shared.ingest(samples, &self.chunk_tx, &self.level_tx);
    }

    #[cfg(test)]
    fn force_state_recording(&self) {
        *self.shared.state.write() = CaptureState::Recording;
    }
}

/// Open the configured device and wire its callback into `shared`
fn build_input_stream(
    config: &AudioConfig,
    shared: &Arc<CaptureShared>,
    chunk_tx: broadcast::Sender<AudioChunk>,
    level_tx: broadcast::Sender<AudioLevel>,
) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = find_device(&host, config.device_name.as_deref())?
        .ok_or_else(|| AudioError::Device("No input device available".to_string()))?;
    let sample_format = supported_format(&device)?;

    let stream_config = StreamConfig {
        channels: config.channels,
        sample_rate: SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(4096),
    };

    let err_shared = shared.clone();
    let err_fn = move |err: cpal::StreamError| {
        error!("Audio stream error: {}", err);
        *err_shared.state.write() = CaptureState::Idle;
        *err_shared.last_error.write() = Some(err.to_string());
    };

    let stream = match sample_format {
        SampleFormat::F32 => {
            let shared = shared.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples = f32_to_i16(data);
                    shared.ingest(&samples, &chunk_tx, &level_tx);
                },
                err_fn,
                None,
            )
        }
        SampleFormat::I16 => {
            let shared = shared.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    shared.ingest(data, &chunk_tx, &level_tx);
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(AudioError::Format(format!(
                "Unsupported sample format: {:?}",
                other
            )));
        }
    };

    stream.map_err(|e| AudioError::Device(format!("Failed to open input device: {}", e)))
}

/// Find device by name, or the default input device when name is None
fn find_device(host: &Host, name: Option<&str>) -> Result<Option<Device>, AudioError> {
    let Some(name) = name else {
        return Ok(host.default_input_device());
    };

    const MAX_DEVICES_TO_CHECK: usize = 100;
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::Device(format!("Failed to enumerate devices: {}", e)))?;

    for device in devices.take(MAX_DEVICES_TO_CHECK) {
        if let Ok(device_name) = device.name() {
            if device_name == name || device_name.contains(name) {
                return Ok(Some(device));
            }
        }
    }
    Ok(None)
}

/// Pick a supported sample format, preferring F32
fn supported_format(device: &Device) -> Result<SampleFormat, AudioError> {
    let configs = device
        .supported_input_configs()
        .map_err(|e| AudioError::Device(format!("Failed to get supported configs: {}", e)))?;

    for config in configs {
        if config.sample_format() == SampleFormat::F32 {
            return Ok(SampleFormat::F32);
        }
    }
    Ok(SampleFormat::I16)
}
