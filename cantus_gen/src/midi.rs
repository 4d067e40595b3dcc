// MIDI boundary: symbolic events in, rendered tokens out.
//
// Reading: note-on events from all tracks are merged by absolute tick. A
// tick with one key becomes a Note event, several keys a Chord event, and a
// silence between onsets longer than a quarter note becomes a Rest event
// (which the token encoding then drops). Timing, velocity, and duration are
// not tokenized — the corpus representation is onset order only.
//
// Writing: decoded tokens are laid out sequentially, one quarter note each,
// chord keys as simultaneous note-ons, in a single-track SMF at a fixed
// tempo. Tokens that fail to decode are skipped and reported; a bad token
// never aborts the render.

use crate::error::{RenderReport, SkippedToken};
use crate::events::{MusicEvent, RenderEvent, decode_token};
use midly::num::{u4, u7, u15, u24, u28};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

/// Output tempo meta event: 500_000 µs per quarter = 120 BPM.
const OUTPUT_TEMPO_MICROSECONDS: u32 = 500_000;

const OUTPUT_VELOCITY: u8 = 80;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed MIDI data: {0}")]
    Parse(#[from] midly::Error),
}

/// Parse one MIDI file into symbolic events.
pub fn load_events(path: &Path) -> Result<Vec<MusicEvent>, MidiError> {
    let data = std::fs::read(path)?;
    let smf = Smf::parse(&data)?;
    Ok(events_from_smf(&smf))
}

/// Extract the symbolic event sequence from a parsed SMF.
pub fn events_from_smf(smf: &Smf<'_>) -> Vec<MusicEvent> {
    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(t) => u64::from(t.as_int()),
        Timing::Timecode(..) => u64::from(TICKS_PER_QUARTER),
    };

    // Merge note-on events across all tracks by absolute tick.
    let mut onsets: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
    for track in &smf.tracks {
        let mut tick: u64 = 0;
        for event in track {
            tick += u64::from(event.delta.as_int());
            if let TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } = event.kind
            {
                // A note-on with velocity 0 is a note-off.
                if vel.as_int() > 0 {
                    onsets.entry(tick).or_default().push(key.as_int());
                }
            }
        }
    }

    let mut events = Vec::new();
    let mut last_onset: Option<u64> = None;
    for (&tick, keys) in &onsets {
        if let Some(prev) = last_onset {
            if tick - prev > ticks_per_quarter {
                events.push(MusicEvent::Rest);
            }
        }
        if keys.len() == 1 {
            events.push(MusicEvent::note(keys[0]));
        } else {
            events.push(MusicEvent::chord(keys));
        }
        last_onset = Some(tick);
    }
    events
}

/// Decode generated tokens into renderable events, collecting per-token
/// failures instead of aborting. Always returns both the decodable events
/// and the report of what was skipped.
pub fn decode_tokens(tokens: &[String]) -> (Vec<RenderEvent>, RenderReport) {
    let mut events = Vec::with_capacity(tokens.len());
    let mut skipped = Vec::new();
    for (position, token) in tokens.iter().enumerate() {
        match decode_token(token) {
            Ok(event) => events.push(event),
            Err(err) => {
                warn!(position, token = token.as_str(), reason = %err, "skipping undecodable token");
                skipped.push(SkippedToken {
                    position,
                    token: token.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    let report = RenderReport {
        rendered: events.len(),
        skipped,
    };
    (events, report)
}

/// Decode tokens and write the result as a MIDI file. Per-token decode
/// failures are reported, not fatal; only I/O failure is an error.
pub fn render_tokens(tokens: &[String], path: &Path) -> Result<RenderReport, MidiError> {
    let (events, report) = decode_tokens(tokens);
    write_midi(&events, path)?;
    Ok(report)
}

/// Write rendered events to a MIDI file.
pub fn write_midi(events: &[RenderEvent], path: &Path) -> Result<(), MidiError> {
    let smf = events_to_smf(events);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

/// Build an in-memory SMF: single track, fixed tempo, piano, one quarter
/// note per event, chords as simultaneous note-ons.
pub fn events_to_smf(events: &[RenderEvent]) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let mut track: Track<'static> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(OUTPUT_TEMPO_MICROSECONDS))),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::ProgramChange {
                program: u7::new(0), // acoustic grand piano
            },
        },
    });

    for event in events {
        let keys: &[u8] = match event {
            RenderEvent::Note { key } => std::slice::from_ref(key),
            RenderEvent::Chord { keys } => keys,
        };
        for &key in keys {
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Midi {
                    channel: u4::new(0),
                    message: MidiMessage::NoteOn {
                        key: u7::new(key),
                        vel: u7::new(OUTPUT_VELOCITY),
                    },
                },
            });
        }
        for (i, &key) in keys.iter().enumerate() {
            track.push(TrackEvent {
                delta: u28::new(if i == 0 { u32::from(TICKS_PER_QUARTER) } else { 0 }),
                kind: TrackEventKind::Midi {
                    channel: u4::new(0),
                    message: MidiMessage::NoteOff {
                        key: u7::new(key),
                        vel: u7::new(0),
                    },
                },
            });
        }
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    smf
}
