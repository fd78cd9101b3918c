//! Pitch and clef model, and the clef-aware mapping from pitch to
//! staff-line location.
//!
//! Locations are signed integers with 0 on the middle staff line, one step
//! per diatonic degree, positive upward. Staff lines sit on even locations
//! (-4, -2, 0, 2, 4), spaces on odd ones.

use serde::{Deserialize, Serialize};

/// Diatonic pitch name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl PitchName {
    /// Diatonic index within the octave (C = 0 .. B = 6).
    pub fn diatonic(self) -> i32 {
        match self {
            PitchName::C => 0,
            PitchName::D => 1,
            PitchName::E => 2,
            PitchName::F => 3,
            PitchName::G => 4,
            PitchName::A => 5,
            PitchName::B => 6,
        }
    }
}

/// Written accidental kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccidKind {
    Sharp,
    Flat,
    Natural,
    DoubleSharp,
    DoubleFlat,
}

/// Pitch of a note: name + octave, with an optional written alteration.
/// Octaves follow scientific pitch notation (middle C = C4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    pub name: PitchName,
    pub octave: i32,
    /// Written accidental, if any. Unison detection ignores this.
    pub accid: Option<AccidKind>,
}

impl Pitch {
    pub fn new(name: PitchName, octave: i32) -> Self {
        Pitch { name, octave, accid: None }
    }

    pub fn with_accid(name: PitchName, octave: i32, accid: AccidKind) -> Self {
        Pitch { name, octave, accid: Some(accid) }
    }

    /// Absolute diatonic position (C0 = 0).
    pub fn diatonic(&self) -> i32 {
        self.octave * 7 + self.name.diatonic()
    }

    /// Same written pitch, ignoring the accidental.
    pub fn is_unison_with(&self, other: &Pitch) -> bool {
        self.name == other.name && self.octave == other.octave
    }
}

/// Clef shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClefShape {
    G,
    F,
    C,
}

/// Clef definition: shape, staff line (1 = bottom line), and octave
/// displacement (e.g. -1 for the guitar's octave-lower treble clef).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clef {
    pub shape: ClefShape,
    pub line: i32,
    pub octave_shift: i32,
}

impl Clef {
    pub fn new(shape: ClefShape, line: i32) -> Self {
        Clef { shape, line, octave_shift: 0 }
    }

    pub fn treble() -> Self {
        Clef::new(ClefShape::G, 2)
    }

    pub fn bass() -> Self {
        Clef::new(ClefShape::F, 4)
    }

    pub fn alto() -> Self {
        Clef::new(ClefShape::C, 3)
    }

    pub fn tenor() -> Self {
        Clef::new(ClefShape::C, 4)
    }

    /// Absolute diatonic position of the pitch sitting on the clef's line.
    fn reference_diatonic(&self) -> i32 {
        let base = match self.shape {
            ClefShape::G => 4 * 7 + PitchName::G.diatonic(), // G4
            ClefShape::F => 3 * 7 + PitchName::F.diatonic(), // F3
            ClefShape::C => 4 * 7 + PitchName::C.diatonic(), // C4
        };
        base + self.octave_shift * 7
    }

    /// Location of the clef glyph itself (the line it sits on).
    pub fn glyph_loc(&self) -> i32 {
        (self.line - 3) * 2
    }

    /// Absolute diatonic position of the middle staff line under this clef.
    pub fn middle_line_diatonic(&self) -> i32 {
        // Lines are two steps apart; the reference pitch sits on self.line.
        self.reference_diatonic() + (3 - self.line) * 2
    }
}

/// Staff-line location of a pitch under a clef: 0 = middle line, one step
/// per diatonic degree, positive up.
pub fn pitch_loc(pitch: &Pitch, clef: &Clef) -> i32 {
    pitch.diatonic() - clef.middle_line_diatonic()
}
