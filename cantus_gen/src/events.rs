// Symbolic music events and their token encoding.
//
// A corpus is flattened into string tokens: a note event becomes its pitch
// name ("C4", "F#3"), a chord event becomes the dot-joined string of its
// pitch classes in sorted, deduplicated order ("0.4.7"). Rests appear in the
// event stream but produce no token. Equal strings are the same token.
//
// Decoding reverses this for rendering: a token containing the chord
// separator is split into pitch classes and pinned to the middle-C octave
// (class + 60); anything else is parsed as a pitch name. A token that is a
// bare number with no separator is ambiguous and refused — chord tokens
// carry no octave, so chord round-tripping is lossy by design.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between pitch classes in a chord token.
pub const CHORD_SEPARATOR: char = '.';

/// MIDI key a pitch class of 0 decodes to (middle C).
pub const CHORD_BASE_KEY: u8 = 60;

/// One symbolic event extracted from a MIDI file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MusicEvent {
    /// A single pitch, stored by name ("C4").
    Note { name: String },
    /// A chord reduced to its pitch classes, sorted and deduplicated.
    Chord { pitch_classes: Vec<u8> },
    /// Silence. Present in the event stream, absent from the token stream.
    Rest,
}

impl MusicEvent {
    /// Note event for a MIDI key.
    pub fn note(key: u8) -> Self {
        MusicEvent::Note {
            name: pitch_name(key),
        }
    }

    /// Chord event from MIDI keys, reduced to sorted dedup pitch classes.
    pub fn chord(keys: &[u8]) -> Self {
        let mut pitch_classes: Vec<u8> = keys.iter().map(|&k| k % 12).collect();
        pitch_classes.sort_unstable();
        pitch_classes.dedup();
        MusicEvent::Chord { pitch_classes }
    }

    /// Vocabulary token for this event, or `None` for a rest.
    pub fn to_token(&self) -> Option<String> {
        match self {
            MusicEvent::Note { name } => Some(name.clone()),
            MusicEvent::Chord { pitch_classes } => Some(
                pitch_classes
                    .iter()
                    .map(|pc| pc.to_string())
                    .collect::<Vec<_>>()
                    .join(&CHORD_SEPARATOR.to_string()),
            ),
            MusicEvent::Rest => None,
        }
    }
}

/// A decoded token, ready for MIDI rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Note { key: u8 },
    Chord { keys: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty token")]
    Empty,
    #[error("bare numeric token with no chord separator")]
    BareNumber,
    #[error("invalid pitch class '{0}' (expected an integer 0-11)")]
    InvalidPitchClass(String),
    #[error("unrecognized pitch name '{0}'")]
    InvalidPitchName(String),
}

/// Decode a generated token into a renderable event.
///
/// Tokens with a `.` are chords; pure numeric tokens without one are refused
/// (they cannot be told apart from malformed chords); everything else must
/// parse as a pitch name.
pub fn decode_token(token: &str) -> Result<RenderEvent, DecodeError> {
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }
    if token.contains(CHORD_SEPARATOR) {
        let mut keys = Vec::new();
        for piece in token.split(CHORD_SEPARATOR) {
            let class: u8 = piece
                .parse()
                .ok()
                .filter(|pc| *pc < 12)
                .ok_or_else(|| DecodeError::InvalidPitchClass(piece.to_string()))?;
            keys.push(CHORD_BASE_KEY + class);
        }
        return Ok(RenderEvent::Chord { keys });
    }
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::BareNumber);
    }
    match parse_pitch(token) {
        Some(key) => Ok(RenderEvent::Note { key }),
        None => Err(DecodeError::InvalidPitchName(token.to_string())),
    }
}

const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Compact note name for a MIDI key ("C4" for 60, "F#3" for 54).
pub fn pitch_name(key: u8) -> String {
    let octave = (key / 12) as i32 - 1;
    format!("{}{}", PITCH_CLASS_NAMES[(key % 12) as usize], octave)
}

/// Parse a pitch name back to a MIDI key. Accepts sharps (`#`) and both
/// flat spellings (`b` and `-`), and negative octaves down to C-1 (key 0).
pub fn parse_pitch(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let base: i32 = match chars.next()? {
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
    // A '-' is first read as the sign of a negative octave ("C-1" is key 0);
    // if that yields no valid key it is retried as a music21-style flat
    // ("B-4" == "Bb4").
    parse_tail(base, rest, false).or_else(|| parse_tail(base, rest, true))
}

fn parse_tail(base: i32, rest: &str, dash_is_flat: bool) -> Option<u8> {
    let mut accidental = 0i32;
    let mut octave_start = 0;
    for c in rest.chars() {
        match c {
            '#' => accidental += 1,
            'b' => accidental -= 1,
            '-' if dash_is_flat => accidental -= 1,
            _ => break,
        }
        octave_start += c.len_utf8();
    }
    let octave: i32 = rest[octave_start..].parse().ok()?;
    let key = (octave + 1) * 12 + base + accidental;
    u8::try_from(key).ok().filter(|k| *k < 128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_token_round_trip() {
        let event = MusicEvent::note(60);
        assert_eq!(event.to_token().as_deref(), Some("C4"));
        assert_eq!(
            decode_token("C4").unwrap(),
            RenderEvent::Note { key: 60 }
        );
    }

    #[test]
    fn test_chord_normalizes_to_sorted_dedup_pitch_classes() {
        // 62 and 50 are both pitch class 2.
        let event = MusicEvent::chord(&[67, 62, 50]);
        assert_eq!(
            event,
            MusicEvent::Chord {
                pitch_classes: vec![2, 7]
            }
        );
        assert_eq!(event.to_token().as_deref(), Some("2.7"));
    }

    #[test]
    fn test_rest_produces_no_token() {
        assert_eq!(MusicEvent::Rest.to_token(), None);
    }

    #[test]
    fn test_chord_decodes_to_middle_c_octave() {
        assert_eq!(
            decode_token("0.4.7").unwrap(),
            RenderEvent::Chord {
                keys: vec![60, 64, 67]
            }
        );
    }

    #[test]
    fn test_bare_number_is_refused() {
        assert_eq!(decode_token("5").unwrap_err(), DecodeError::BareNumber);
    }

    #[test]
    fn test_malformed_chord_piece_is_an_error() {
        assert_eq!(
            decode_token("1.x.3").unwrap_err(),
            DecodeError::InvalidPitchClass("x".to_string())
        );
        // Pitch classes above 11 never come out of encoding.
        assert_eq!(
            decode_token("0.15").unwrap_err(),
            DecodeError::InvalidPitchClass("15".to_string())
        );
    }

    #[test]
    fn test_unrecognized_pitch_name() {
        assert_eq!(
            decode_token("H4").unwrap_err(),
            DecodeError::InvalidPitchName("H4".to_string())
        );
        assert_eq!(decode_token("").unwrap_err(), DecodeError::Empty);
    }

    #[test]
    fn test_pitch_name_round_trip() {
        for key in [0u8, 21, 54, 60, 61, 70, 108, 127] {
            assert_eq!(parse_pitch(&pitch_name(key)), Some(key), "key {key}");
        }
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(54), "F#3");
        assert_eq!(pitch_name(0), "C-1");
    }

    #[test]
    fn test_parse_pitch_accepts_both_flat_spellings() {
        assert_eq!(parse_pitch("Bb4"), Some(70));
        assert_eq!(parse_pitch("B-4"), parse_pitch("Bb4"));
        assert_eq!(parse_pitch("C#4"), Some(61));
    }
}
