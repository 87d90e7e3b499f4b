// ============================================================
// Layer 3 — Token and MusicalEvent
// ============================================================
// A Token is the canonical text of one musical event, exactly
// as the upstream MIDI parser wrote it:
//
//   "Rest"        → a rest (older corpora use "R")
//   "C#4", "E-3"  → a single pitch (music21 spelling: '-' is flat)
//   "C4.E4.G4"    → a chord, pitches joined with '.'
//   "4.7.11"      → a chord given as pitch classes
//
// Tokens are what the vocabulary and the model see. Only the
// renderer cares about the musical meaning, so the string is
// parsed once into a MusicalEvent there and never re-inspected
// downstream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One musical event as produced by the upstream parser.
///
/// Ordering is plain string ordering, which is what the
/// vocabulary sorts by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the token text. Returns None for text that is
    /// neither a rest, a pitch, nor a chord of pitches.
    pub fn event(&self) -> Option<MusicalEvent> {
        MusicalEvent::parse(&self.0)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Pitch ────────────────────────────────────────────────────────────────────

/// A MIDI note number (0..=127, middle C = 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pitch(u8);

/// Octave assumed when a pitch name or pitch class has none.
const DEFAULT_OCTAVE: i32 = 4;

impl Pitch {
    pub fn from_midi(number: u8) -> Option<Self> {
        (number <= 127).then_some(Self(number))
    }

    pub fn midi(self) -> u8 {
        self.0
    }

    /// Parse a pitch name such as "C4", "F#3", "B-2", "Eb5" or "D".
    ///
    /// A bare integer is read as a pitch class (0 = C) in the
    /// default octave, matching how chord tokens built from a
    /// normal order are spelled.
    pub fn parse(text: &str) -> Option<Self> {
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            let class: i32 = text.parse().ok()?;
            if class > 11 {
                return None;
            }
            return Self::from_parts(class, DEFAULT_OCTAVE);
        }

        let mut chars = text.chars();
        let step = match chars.next()?.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };

        let rest = chars.as_str();
        let digits_at = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let (accidentals, octave) = rest.split_at(digits_at);

        let mut alter = 0;
        for c in accidentals.chars() {
            match c {
                '#' => alter += 1,
                '-' | 'b' => alter -= 1,
                _ => return None,
            }
        }

        let octave = if octave.is_empty() {
            DEFAULT_OCTAVE
        } else {
            octave.parse().ok()?
        };

        Self::from_parts(step + alter, octave)
    }

    fn from_parts(class: i32, octave: i32) -> Option<Self> {
        let number = (octave + 1) * 12 + class;
        u8::try_from(number).ok().and_then(Self::from_midi)
    }
}

// ─── MusicalEvent ─────────────────────────────────────────────────────────────

/// What a token means musically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicalEvent {
    Rest,
    Note(Pitch),
    Chord(Vec<Pitch>),
}

impl MusicalEvent {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("rest") || text == "R" {
            return Some(Self::Rest);
        }

        if text.contains('.') {
            let pitches = text
                .split('.')
                .map(Pitch::parse)
                .collect::<Option<Vec<_>>>()?;
            return Some(Self::Chord(pitches));
        }

        Pitch::parse(text).map(Self::Note)
    }

    /// Pitches that sound for this event (empty for a rest).
    pub fn pitches(&self) -> Vec<Pitch> {
        match self {
            Self::Rest => Vec::new(),
            Self::Note(p) => vec![*p],
            Self::Chord(ps) => ps.clone(),
        }
    }
}
