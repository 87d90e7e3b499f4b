// ============================================================
// Layer 6 — MIDI Writer
// ============================================================
// Turns a generated token sequence into a single-track Standard
// MIDI File for listening:
//
//   "Rest"      → silence for an eighth note
//   "E-4"       → one note, an eighth note long
//   "C4.E4.G4"  → all pitches struck together, a quarter note long
//
// Events follow one another with no overlap. Tokens that do not
// parse as a musical event are skipped with a warning.
//
// Tempo is fixed at 120 bpm, 480 ticks per quarter note.

use anyhow::{anyhow, Context, Result};
use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use std::path::Path;

use crate::domain::token::{MusicalEvent, Token};
use crate::infra::atomic::atomic_write;

const TICKS_PER_QUARTER: u16 = 480;
const TICKS_PER_EIGHTH: u32 = TICKS_PER_QUARTER as u32 / 2;
const TEMPO_BPM: u32 = 120;
const VELOCITY: u8 = 80;

/// What ended up in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    /// Tokens rendered as notes, chords or rests
    pub events: usize,
    /// Tokens that were not musical events
    pub skipped: usize,
    /// Length of the piece in ticks
    pub ticks: u32,
}

/// Render `tokens` and write the MIDI file to `path`.
pub fn write_midi(tokens: &[Token], path: &Path) -> Result<RenderSummary> {
    let (smf, summary) = tokens_to_smf(tokens);
    let mut buf = Vec::new();
    smf.write(&mut buf)
        .map_err(|e| anyhow!("Cannot encode MIDI: {e}"))?;
    atomic_write(path, &buf)
        .with_context(|| format!("Cannot write MIDI file '{}'", path.display()))?;

    tracing::info!(
        "Wrote {} events ({} skipped) to '{}'",
        summary.events,
        summary.skipped,
        path.display()
    );
    Ok(summary)
}

fn tokens_to_smf(tokens: &[Token]) -> (Smf<'static>, RenderSummary) {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let channel = u4::new(0);
    let mut track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(60_000_000 / TEMPO_BPM))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange { program: u7::new(0) },
            },
        },
    ];

    let mut summary = RenderSummary {
        events: 0,
        skipped: 0,
        ticks: 0,
    };
    // Silence accumulated since the last note-off
    let mut pending: u32 = 0;

    for token in tokens {
        let Some(event) = token.event() else {
            tracing::warn!("Skipping '{}': not a note, chord or rest", token);
            summary.skipped += 1;
            continue;
        };
        summary.events += 1;

        let length = match event {
            MusicalEvent::Chord(_) => TICKS_PER_QUARTER as u32,
            MusicalEvent::Note(_) | MusicalEvent::Rest => TICKS_PER_EIGHTH,
        };
        summary.ticks += length;

        let pitches = event.pitches();
        if pitches.is_empty() {
            pending += length;
            continue;
        }

        for (i, pitch) in pitches.iter().enumerate() {
            track.push(TrackEvent {
                delta: u28::new(if i == 0 { pending } else { 0 }),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn {
                        key: u7::new(pitch.midi()),
                        vel: u7::new(VELOCITY),
                    },
                },
            });
        }
        for (i, pitch) in pitches.iter().enumerate() {
            track.push(TrackEvent {
                delta: u28::new(if i == 0 { length } else { 0 }),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff {
                        key: u7::new(pitch.midi()),
                        vel: u7::new(0),
                    },
                },
            });
        }
        pending = 0;
    }

    track.push(TrackEvent {
        delta: u28::new(pending),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);

    (smf, summary)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(texts: &[&str]) -> Vec<Token> {
        texts.iter().map(|t| Token::from(*t)).collect()
    }

    fn note_ons(track: &Track) -> Vec<(u32, u8)> {
        track
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, .. },
                    ..
                } => Some((e.delta.as_int(), key.as_int())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_durations_per_event_kind() {
        let (_, summary) = tokens_to_smf(&tokens(&["C4", "Rest", "C4.E4.G4"]));
        assert_eq!(summary.events, 3);
        assert_eq!(summary.ticks, 240 + 240 + 480);
    }

    #[test]
    fn test_chord_pitches_start_together() {
        let (smf, _) = tokens_to_smf(&tokens(&["C4", "Rest", "C4.E4.G4"]));
        let ons = note_ons(&smf.tracks[0]);
        // C4 at 0; the chord waits for the C4 to end (its note-off
        // carries 240) plus the rest (240)
        assert_eq!(ons, vec![(0, 60), (240, 60), (0, 64), (0, 67)]);
    }

    #[test]
    fn test_unknown_tokens_are_skipped() {
        let (smf, summary) = tokens_to_smf(&tokens(&["C4", "xyz", "G4"]));
        assert_eq!(summary.events, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(note_ons(&smf.tracks[0]).len(), 2);
    }

    #[test]
    fn test_written_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/output.mid");

        let summary = write_midi(&tokens(&["E-4", "B-3.E-4", "Rest"]), &path).unwrap();
        assert_eq!(summary.events, 3);

        let bytes = std::fs::read(&path).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 1);
        assert_eq!(note_ons(&smf.tracks[0]).len(), 3);
    }
}
