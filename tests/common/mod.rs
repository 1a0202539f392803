//! Shared fakes for session tests: a hand-driven transport, a factory that
//! hands out transports sharing one state, and an engraver that records
//! every render.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crossbeam_channel::{Receiver, Sender};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use rollsync::config::{Config, WaveformConfig};
use rollsync::messages::SessionEvent;
use rollsync::notation::NotationEngraver;
use rollsync::session::EditorSession;
use rollsync::transport::{TransportEngine, TransportEvent, TransportFactory};

#[derive(Debug, Default)]
pub struct FakeState {
    pub time: f64,
    pub duration: f64,
    pub playing: bool,
    pub rate: f64,
    pub loaded: Vec<PathBuf>,
    pub seeks: Vec<f64>,
    pub created: usize,
    pub destroyed: usize,
    pub samples_per_pixel: Vec<f32>,
    pub events: Option<Sender<TransportEvent>>,
}

pub type Shared = Rc<RefCell<FakeState>>;

pub struct FakeTransport {
    state: Shared,
}

impl TransportEngine for FakeTransport {
    fn load(&mut self, path: &Path) {
        self.state.borrow_mut().loaded.push(path.to_path_buf());
    }
    fn play(&mut self) {
        self.state.borrow_mut().playing = true;
    }
    fn pause(&mut self) {
        self.state.borrow_mut().playing = false;
    }
    fn stop(&mut self) {
        let mut s = self.state.borrow_mut();
        s.playing = false;
        s.time = 0.0;
    }
    fn seek_to(&mut self, ratio: f64) {
        let mut s = self.state.borrow_mut();
        s.seeks.push(ratio);
        s.time = ratio * s.duration;
    }
    fn set_playback_rate(&mut self, rate: f64) {
        self.state.borrow_mut().rate = rate;
    }
    fn current_time(&self) -> f64 {
        self.state.borrow().time
    }
    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }
    fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }
    fn destroy(&mut self) {
        let mut s = self.state.borrow_mut();
        s.destroyed += 1;
        s.playing = false;
    }
}

pub struct FakeFactory {
    state: Shared,
}

impl TransportFactory for FakeFactory {
    fn create(
        &mut self,
        config: &WaveformConfig,
        events: Sender<TransportEvent>,
    ) -> Box<dyn TransportEngine> {
        {
            let mut s = self.state.borrow_mut();
            s.created += 1;
            s.samples_per_pixel.push(config.samples_per_pixel);
            s.events = Some(events);
        }
        Box::new(FakeTransport {
            state: self.state.clone(),
        })
    }
}

#[derive(Default)]
pub struct RecordingEngraver {
    pub renders: Rc<RefCell<Vec<BTreeSet<u8>>>>,
    pub clears: Rc<RefCell<usize>>,
}

impl NotationEngraver for RecordingEngraver {
    fn render(&mut self, pitches: &BTreeSet<u8>) {
        self.renders.borrow_mut().push(pitches.clone());
    }
    fn clear(&mut self) {
        *self.clears.borrow_mut() += 1;
    }
}

pub struct Harness {
    pub session: EditorSession,
    pub transport: Shared,
    pub events: Receiver<SessionEvent>,
    pub renders: Rc<RefCell<Vec<BTreeSet<u8>>>>,
    pub clears: Rc<RefCell<usize>>,
}

impl Harness {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut harness = Self::detached();
        harness.session.set_event_sender(Some(tx));
        harness.events = rx;
        harness
    }

    /// A session with no event listener attached.
    pub fn detached() -> Self {
        let transport: Shared = Rc::new(RefCell::new(FakeState::default()));
        let engraver = RecordingEngraver::default();
        let renders = engraver.renders.clone();
        let clears = engraver.clears.clone();
        let session = EditorSession::new(
            Config::default(),
            Box::new(FakeFactory {
                state: transport.clone(),
            }),
            Box::new(engraver),
        );
        let (_tx, events) = crossbeam_channel::unbounded();
        Self {
            session,
            transport,
            events,
            renders,
            clears,
        }
    }

    /// Load `duration` seconds of fake audio and report it ready.
    pub fn with_audio(mut self, duration: f64) -> Self {
        self.session.load_audio(Path::new("take.wav"));
        self.transport.borrow_mut().duration = duration;
        self.send_transport(TransportEvent::Ready);
        self.session.dispatch_transport_events();
        self
    }

    pub fn send_transport(&self, event: TransportEvent) {
        if let Some(tx) = &self.transport.borrow().events {
            tx.send(event).unwrap();
        }
    }

    pub fn set_time(&self, time: f64) {
        self.transport.borrow_mut().time = time;
    }

    pub fn drain(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }
}

/// Build a single-track SMF at 480 ticks per quarter from
/// `(pitch, start_tick, length_ticks)` triples.
pub fn midi_bytes(tempo_us: Option<u32>, notes: &[(u8, u32, u32)]) -> Vec<u8> {
    let mut timeline: Vec<(u32, TrackEventKind<'static>)> = Vec::new();
    if let Some(us) = tempo_us {
        timeline.push((0, TrackEventKind::Meta(MetaMessage::Tempo(us.into()))));
    }
    for &(pitch, start, len) in notes {
        timeline.push((
            start,
            TrackEventKind::Midi {
                channel: 0u8.into(),
                message: MidiMessage::NoteOn {
                    key: pitch.into(),
                    vel: 100u8.into(),
                },
            },
        ));
        timeline.push((
            start + len,
            TrackEventKind::Midi {
                channel: 0u8.into(),
                message: MidiMessage::NoteOff {
                    key: pitch.into(),
                    vel: 0u8.into(),
                },
            },
        ));
    }
    timeline.sort_by_key(|(tick, _)| *tick);

    let mut track = Vec::new();
    let mut last = 0;
    for (tick, kind) in timeline {
        track.push(TrackEvent {
            delta: (tick - last).into(),
            kind,
        });
        last = tick;
    }
    track.push(TrackEvent {
        delta: 0u32.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(Format::SingleTrack, Timing::Metrical(480u16.into())));
    smf.tracks.push(track);
    let mut bytes = Vec::new();
    smf.write_std(&mut bytes).unwrap();
    bytes
}
