//! Grand-staff engraving of the pitches currently sounding.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::constants::MIDDLE_C;

const STEP_NAMES: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];

/// Sharp spelling of a MIDI pitch: diatonic step, octave and accidental.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spelling {
    /// 0 = C .. 6 = B
    pub step: u8,
    pub octave: i32,
    pub sharp: bool,
}

impl Spelling {
    pub fn of(pitch: u8) -> Self {
        let (step, sharp) = match pitch % 12 {
            0 => (0, false),
            1 => (0, true),
            2 => (1, false),
            3 => (1, true),
            4 => (2, false),
            5 => (3, false),
            6 => (3, true),
            7 => (4, false),
            8 => (4, true),
            9 => (5, false),
            10 => (5, true),
            _ => (6, false),
        };
        Self {
            step,
            octave: pitch as i32 / 12 - 1,
            sharp,
        }
    }

    pub fn step_name(&self) -> char {
        STEP_NAMES[self.step as usize]
    }

    /// Position counted in diatonic steps from C0.
    pub fn diatonic_index(&self) -> i32 {
        self.octave * 7 + self.step as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clef {
    Treble,
    Bass,
}

impl Clef {
    pub fn for_pitch(pitch: u8) -> Self {
        if pitch >= MIDDLE_C {
            Clef::Treble
        } else {
            Clef::Bass
        }
    }

    /// Diatonic index of the pitch on the middle staff line (B4 / D3).
    fn middle_line(self) -> i32 {
        match self {
            Clef::Treble => 4 * 7 + 6,
            Clef::Bass => 3 * 7 + 1,
        }
    }
}

/// One notehead of the chord on a staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteHead {
    pub pitch: u8,
    /// Half-spaces above the middle line; lines sit on even steps, -4..=4
    /// being the five staff lines.
    pub staff_step: i32,
    pub sharp: bool,
}

impl NoteHead {
    pub fn new(pitch: u8, clef: Clef) -> Self {
        let spelling = Spelling::of(pitch);
        Self {
            pitch,
            staff_step: spelling.diatonic_index() - clef.middle_line(),
            sharp: spelling.sharp,
        }
    }

    /// Steps of the ledger lines this head needs, closest to the staff first.
    pub fn ledger_lines(&self) -> Vec<i32> {
        if self.staff_step > 4 {
            (6..=self.staff_step).step_by(2).collect()
        } else if self.staff_step < -4 {
            (6..=-self.staff_step).step_by(2).map(|s| -s).collect()
        } else {
            Vec::new()
        }
    }
}

/// Last rendered chord on each staff, lowest pitch first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Engraving {
    pub treble: Vec<NoteHead>,
    pub bass: Vec<NoteHead>,
}

impl Engraving {
    pub fn is_empty(&self) -> bool {
        self.treble.is_empty() && self.bass.is_empty()
    }
}

/// Draws the sounding pitches as one whole-note chord per staff.
pub trait NotationEngraver {
    /// Replace whatever was engraved before with `pitches`. An empty set
    /// leaves both staves blank.
    fn render(&mut self, pitches: &BTreeSet<u8>);
    fn clear(&mut self);
}

/// Engraver writing into an [`Engraving`] the staff panel paints from.
#[derive(Debug, Clone, Default)]
pub struct StaffEngraver {
    output: Rc<RefCell<Engraving>>,
}

impl StaffEngraver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the painter; sees every render.
    pub fn output(&self) -> Rc<RefCell<Engraving>> {
        self.output.clone()
    }
}

impl NotationEngraver for StaffEngraver {
    fn render(&mut self, pitches: &BTreeSet<u8>) {
        let mut out = self.output.borrow_mut();
        out.treble.clear();
        out.bass.clear();
        for &pitch in pitches {
            match Clef::for_pitch(pitch) {
                Clef::Treble => out.treble.push(NoteHead::new(pitch, Clef::Treble)),
                Clef::Bass => out.bass.push(NoteHead::new(pitch, Clef::Bass)),
            }
        }
    }

    fn clear(&mut self) {
        let mut out = self.output.borrow_mut();
        out.treble.clear();
        out.bass.clear();
    }
}
