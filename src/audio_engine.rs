//! Audio transport backed by a cpal output stream.
//!
//! Files are decoded on a background thread; the result is announced through
//! the transport event channel. The output callback reads the decoded buffer
//! and advances a shared playhead, so the UI thread only ever touches atomics.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam::atomic::AtomicCell;
use crossbeam_channel::Sender;
use parking_lot::RwLock;

use crate::audio_import::{DecodedAudio, decode_file};
use crate::config::WaveformConfig;
use crate::constants::{MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE, WAVEFORM_PEAKS_PER_SECOND};
use crate::transport::{TransportEngine, TransportEvent, TransportFactory};
use crate::waveform::WaveformPeaks;

/// State shared between the UI thread, the decoder thread and the audio
/// callback.
struct PlaybackShared {
    playing: AtomicBool,
    /// Read position in source frames.
    position: AtomicCell<f64>,
    rate: AtomicCell<f64>,
    audio: RwLock<Option<Arc<DecodedAudio>>>,
    waveform: RwLock<Option<Arc<WaveformPeaks>>>,
    /// Bumped on every load and on destroy so late decoder results are dropped.
    generation: AtomicU64,
}

impl PlaybackShared {
    fn new() -> Self {
        Self {
            playing: AtomicBool::new(false),
            position: AtomicCell::new(0.0),
            rate: AtomicCell::new(1.0),
            audio: RwLock::new(None),
            waveform: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    fn frames(&self) -> usize {
        self.audio.read().as_ref().map(|a| a.samples.len()).unwrap_or(0)
    }

    fn sample_rate(&self) -> u32 {
        self.audio.read().as_ref().map(|a| a.sample_rate).unwrap_or(0)
    }
}

pub struct CpalTransport {
    shared: Arc<PlaybackShared>,
    events: Sender<TransportEvent>,
    stream: Option<cpal::Stream>,
    peaks_per_second: f32,
}

impl CpalTransport {
    pub fn new(config: &WaveformConfig, events: Sender<TransportEvent>) -> Self {
        Self {
            shared: Arc::new(PlaybackShared::new()),
            events,
            stream: None,
            peaks_per_second: config.samples_per_pixel.max(WAVEFORM_PEAKS_PER_SECOND),
        }
    }

    fn ensure_stream(&mut self) -> anyhow::Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No output device"))?;
        let supported = device.default_output_config()?;
        let device_rate = supported.sample_rate().0 as f64;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.config();

        let shared = self.shared.clone();
        let events = self.events.clone();

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                render_block(&shared, &events, data, channels, device_rate);
            },
            |err| log::error!("Output stream error: {}", err),
            None,
        )?;
        log::info!(
            "opened output stream: {} Hz, {} channels",
            device_rate,
            channels
        );
        self.stream = Some(stream);
        Ok(())
    }
}

/// Fill one output block from the decoded buffer.
fn render_block(
    shared: &PlaybackShared,
    events: &Sender<TransportEvent>,
    data: &mut [f32],
    channels: usize,
    device_rate: f64,
) {
    let guard = shared.audio.read();
    let audio = match guard.as_ref() {
        Some(audio) if shared.playing.load(Ordering::Relaxed) => audio,
        _ => {
            data.fill(0.0);
            return;
        }
    };

    let samples = &audio.samples;
    let step = audio.sample_rate as f64 / device_rate * shared.rate.load();
    let mut pos = shared.position.load();
    let mut reached_end = false;

    for frame in data.chunks_mut(channels.max(1)) {
        let idx = pos as usize;
        if idx + 1 >= samples.len() {
            reached_end = true;
            frame.fill(0.0);
            continue;
        }
        let frac = (pos - idx as f64) as f32;
        let value = samples[idx] + (samples[idx + 1] - samples[idx]) * frac;
        frame.fill(value);
        pos += step;
    }

    if reached_end {
        shared.position.store(samples.len() as f64);
        if shared.playing.swap(false, Ordering::Relaxed) {
            let _ = events.send(TransportEvent::Finish);
        }
    } else {
        shared.position.store(pos);
    }
}

impl TransportEngine for CpalTransport {
    fn load(&mut self, path: &Path) {
        self.shared.playing.store(false, Ordering::Relaxed);
        self.shared.position.store(0.0);
        *self.shared.audio.write() = None;
        *self.shared.waveform.write() = None;
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let shared = self.shared.clone();
        let events = self.events.clone();
        let path = path.to_path_buf();
        let peaks_per_second = self.peaks_per_second;

        std::thread::spawn(move || {
            let result = decode_file(&path);
            if shared.generation.load(Ordering::SeqCst) != generation {
                log::debug!("discarding stale decode of {}", path.display());
                return;
            }
            match result {
                Ok(audio) => {
                    let peaks =
                        WaveformPeaks::from_samples(&audio.samples, audio.sample_rate, peaks_per_second);
                    log::info!(
                        "decoded {} ({:.2}s at {} Hz)",
                        path.display(),
                        audio.duration(),
                        audio.sample_rate
                    );
                    *shared.waveform.write() = Some(Arc::new(peaks));
                    *shared.audio.write() = Some(Arc::new(audio));
                    let _ = events.send(TransportEvent::Ready);
                }
                Err(e) => {
                    log::warn!("failed to decode {}: {e}", path.display());
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                }
            }
        });
    }

    fn play(&mut self) {
        if self.shared.audio.read().is_none() {
            return;
        }
        if let Err(e) = self.ensure_stream() {
            log::warn!("cannot start playback: {e}");
            let _ = self.events.send(TransportEvent::Error(e.to_string()));
            return;
        }
        if self.shared.position.load() as usize + 1 >= self.shared.frames() {
            self.shared.position.store(0.0);
        }
        self.shared.playing.store(true, Ordering::Relaxed);
        if let Some(stream) = &self.stream
            && let Err(e) = stream.play()
        {
            log::warn!("failed to start output stream: {e}");
        }
    }

    fn pause(&mut self) {
        self.shared.playing.store(false, Ordering::Relaxed);
        if let Some(stream) = &self.stream
            && let Err(e) = stream.pause()
        {
            log::debug!("output stream pause: {e}");
        }
    }

    fn stop(&mut self) {
        self.pause();
        self.shared.position.store(0.0);
    }

    fn seek_to(&mut self, ratio: f64) {
        let frames = self.shared.frames() as f64;
        self.shared.position.store(ratio.clamp(0.0, 1.0) * frames);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.shared
            .rate
            .store(rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE));
    }

    fn current_time(&self) -> f64 {
        match self.shared.sample_rate() {
            0 => 0.0,
            rate => self.shared.position.load() / rate as f64,
        }
    }

    fn duration(&self) -> f64 {
        self.shared
            .audio
            .read()
            .as_ref()
            .map(|a| a.duration())
            .unwrap_or(0.0)
    }

    fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Relaxed)
    }

    fn waveform(&self) -> Option<Arc<WaveformPeaks>> {
        self.shared.waveform.read().clone()
    }

    fn destroy(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.playing.store(false, Ordering::Relaxed);
        self.stream = None;
        *self.shared.audio.write() = None;
        *self.shared.waveform.write() = None;
        self.shared.position.store(0.0);
    }
}

#[derive(Debug, Default)]
pub struct CpalTransportFactory;

impl TransportFactory for CpalTransportFactory {
    fn create(
        &mut self,
        config: &WaveformConfig,
        events: Sender<TransportEvent>,
    ) -> Box<dyn TransportEngine> {
        Box::new(CpalTransport::new(config, events))
    }
}
