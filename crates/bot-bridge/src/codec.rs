//! Line codec for host <-> peer traffic
//!
//! Host → peer: one JSON object per line, internally tagged by `event`.
//! Peer → host: either a flat structured record or a whitespace shorthand:
//!
//! ```text
//! {"cmd": "forward", "distance": 100}
//! {cmd: turnLeft, angle: 30}
//! forward 100
//! rescan
//! ```
//!
//! The structured reader is a shallow splitter: top-level commas
//! separate pairs, the first colon separates key from value, and one layer of
//! double quotes is stripped. There is no nesting and no escaping, so a value
//! containing a comma does not survive decoding. Records in this protocol only
//! carry numbers and fixed keywords.

use bot_bridge_core::{CommandRecord, DecodeError, EventRecord};
use tracing::warn;

/// Encode an event as a single line (no trailing newline)
///
/// Every numeric field goes out in decimal notation; NaN and infinities are
/// sent as 0.
pub fn encode(event: &EventRecord) -> String {
    let name = event.name();
    let mut event = event.clone();
    for value in numeric_fields(&mut event) {
        if !value.is_finite() {
            warn!("Non-finite {} in {} event, sending 0", value, name);
            *value = 0.0;
        }
    }
    serde_json::to_string(&event)
        .unwrap_or_else(|_| format!("{{\"event\":\"{}\"}}", name))
}

fn numeric_fields(event: &mut EventRecord) -> Vec<&mut f64> {
    match event {
        EventRecord::Tick {
            energy,
            x,
            y,
            direction,
            gun_direction,
            radar_direction,
            gun_heat,
            speed,
            ..
        } => vec![energy, x, y, direction, gun_direction, radar_direction, gun_heat, speed],
        EventRecord::ScannedBot {
            distance,
            energy,
            x,
            y,
            direction,
            speed,
        } => vec![distance, energy, x, y, direction, speed],
        EventRecord::HitByBullet { damage, direction } => vec![damage, direction],
        EventRecord::BulletHitBot { damage, .. } => vec![damage],
        _ => Vec::new(),
    }
}

/// Split a structured record into its key/value pairs, in line order
///
/// Returns `None` if the line is not wrapped in `{` and `}`. Segments
/// without a colon are skipped.
pub fn split_record(line: &str) -> Option<Vec<(String, String)>> {
    let body = line.trim().strip_prefix('{')?.strip_suffix('}')?.trim();
    if body.is_empty() {
        return Some(Vec::new());
    }

    let pairs = body
        .split(',')
        .filter_map(|segment| {
            let (key, value) = segment.split_once(':')?;
            Some((strip_quotes(key.trim()).to_string(), strip_quotes(value.trim()).to_string()))
        })
        .collect();
    Some(pairs)
}

/// Decode one command line from the peer
///
/// The structured form is tried first; if it does not apply (not a record, or
/// no `cmd` key) the line is read as `<name> [parameter]`.
pub fn decode_command(line: &str) -> Result<CommandRecord, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DecodeError::Empty);
    }

    if let Some(pairs) = split_record(line) {
        if let Some(cmd) = lookup(&pairs, "cmd") {
            if cmd.is_empty() {
                return Err(DecodeError::MissingValue("cmd"));
            }
            return Ok(CommandRecord::structured(
                cmd,
                number(lookup(&pairs, "power")),
                number(lookup(&pairs, "distance")),
                number(lookup(&pairs, "angle")),
            ));
        }
    }

    decode_fallback(line)
}

fn decode_fallback(line: &str) -> Result<CommandRecord, DecodeError> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next().ok_or(DecodeError::Empty)?;
    Ok(CommandRecord::fallback(name, number(tokens.next())))
}

/// Last value for `key`; later duplicates win
fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Numeric parameter, 0 if absent or unparsable
fn number(value: Option<&str>) -> f64 {
    value.and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0)
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_bridge_core::{CommandKind, RecordForm};

    fn sample_events() -> Vec<EventRecord> {
        vec![
            EventRecord::Connected { round: 3 },
            EventRecord::Tick {
                turn: 57,
                energy: 87.6,
                x: 123.5,
                y: 456.0,
                direction: 270.0,
                gun_direction: 265.5,
                radar_direction: 10.0,
                gun_heat: 0.3,
                speed: -4.0,
            },
            EventRecord::ScannedBot {
                distance: 123.4,
                energy: 87.6,
                x: 300.0,
                y: 200.0,
                direction: 45.0,
                speed: 8.0,
            },
            EventRecord::HitByBullet {
                damage: 4.0,
                direction: 135.0,
            },
            EventRecord::BulletHitBot {
                damage: 16.0,
                victim_id: 4,
            },
            EventRecord::BotDeath { victim_id: 4 },
            EventRecord::RoundEnded { rank: Some(2) },
            EventRecord::WonRound { turn: 900 },
            EventRecord::SkippedTurn { turn: 58 },
            EventRecord::Death,
        ]
    }

    #[test]
    fn test_encoded_events_are_single_lines() {
        for event in sample_events() {
            let line = encode(&event);
            assert!(!line.contains('\n'), "embedded newline in {}", line);
            assert!(line.starts_with('{') && line.ends_with('}'));
        }
    }

    #[test]
    fn test_encoded_fields_resplit_to_same_values() {
        let tick = EventRecord::Tick {
            turn: 57,
            energy: 87.6,
            x: 123.5,
            y: 456.0,
            direction: 270.0,
            gun_direction: 265.5,
            radar_direction: 10.0,
            gun_heat: 0.3,
            speed: -4.0,
        };
        let pairs = split_record(&encode(&tick)).unwrap();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "event",
                "turn",
                "energy",
                "x",
                "y",
                "direction",
                "gunDirection",
                "radarDirection",
                "gunHeat",
                "speed"
            ]
        );
        assert_eq!(lookup(&pairs, "event"), Some("tick"));
        assert_eq!(number(lookup(&pairs, "turn")), 57.0);
        assert_eq!(number(lookup(&pairs, "energy")), 87.6);
        assert_eq!(number(lookup(&pairs, "gunDirection")), 265.5);
        assert_eq!(number(lookup(&pairs, "speed")), -4.0);

        // Every variant re-splits into its tag plus numeric fields
        for event in sample_events() {
            let pairs = split_record(&encode(&event)).unwrap();
            assert_eq!(pairs[0], ("event".to_string(), event.name().to_string()));
            for (key, value) in &pairs[1..] {
                assert!(value.parse::<f64>().is_ok(), "{}={} in {:?}", key, value, event);
            }
        }
    }

    #[test]
    fn test_scanned_record_values() {
        let event = EventRecord::ScannedBot {
            distance: 123.4,
            energy: 87.6,
            x: 300.0,
            y: 200.0,
            direction: 45.0,
            speed: 8.0,
        };
        let pairs = split_record(&encode(&event)).unwrap();
        assert_eq!(lookup(&pairs, "distance"), Some("123.4"));
        assert_eq!(lookup(&pairs, "energy"), Some("87.6"));
    }

    #[test]
    fn test_non_finite_values_encode_as_zero() {
        let line = encode(&EventRecord::HitByBullet {
            damage: f64::NAN,
            direction: f64::INFINITY,
        });
        assert_eq!(line, r#"{"event":"hitByBullet","damage":0.0,"direction":0.0}"#);

        let line = encode(&EventRecord::BulletHitBot {
            damage: f64::NEG_INFINITY,
            victim_id: 2,
        });
        assert!(!line.contains("null"));
        assert_eq!(lookup(&split_record(&line).unwrap(), "damage"), Some("0.0"));
    }

    #[test]
    fn test_structured_command() {
        let record = decode_command(r#"{"cmd":"forward","distance":150}"#).unwrap();
        assert_eq!(record.kind(), Some(CommandKind::Forward));
        assert_eq!(record.form, RecordForm::Structured);
        assert_eq!(record.distance, 150.0);
        assert_eq!(record.power, 0.0);
        assert_eq!(record.angle, 0.0);
    }

    #[test]
    fn test_structured_command_unquoted_and_spaced() {
        let record = decode_command("{ cmd: fire , power: 2.5 }").unwrap();
        assert_eq!(record.name, "fire");
        assert_eq!(record.power, 2.5);
    }

    #[test]
    fn test_structured_missing_and_bad_numbers_default_to_zero() {
        let record = decode_command(r#"{"cmd":"turnLeft","angle":"abc"}"#).unwrap();
        assert_eq!(record.kind(), Some(CommandKind::TurnLeft));
        assert_eq!(record.angle, 0.0);

        let record = decode_command(r#"{"cmd":"back"}"#).unwrap();
        assert_eq!(record.distance, 0.0);
    }

    #[test]
    fn test_structured_unknown_cmd_still_decodes() {
        let record = decode_command(r#"{"cmd":"dance","angle":10}"#).unwrap();
        assert_eq!(record.name, "dance");
        assert_eq!(record.kind(), None);
    }

    #[test]
    fn test_empty_cmd_value_is_rejected() {
        assert_eq!(
            decode_command("{cmd:}"),
            Err(DecodeError::MissingValue("cmd"))
        );
    }

    #[test]
    fn test_comma_in_value_breaks_structured_form() {
        // `{"cmd":"fire","power":"1,5"}` splits into a dangling `5"` segment
        let record = decode_command(r#"{"cmd":"fire","power":"1,5"}"#).unwrap();
        assert_eq!(record.kind(), Some(CommandKind::Fire));
        assert_eq!(record.power, 0.0);
    }

    #[test]
    fn test_fallback_commands() {
        let record = decode_command("forward 100").unwrap();
        assert_eq!(record.kind(), Some(CommandKind::Forward));
        assert_eq!(record.form, RecordForm::Fallback);
        assert_eq!(record.distance, 100.0);

        let record = decode_command("rescan").unwrap();
        assert_eq!(record.kind(), Some(CommandKind::Rescan));
        assert_eq!(record.power, 0.0);
        assert_eq!(record.distance, 0.0);
        assert_eq!(record.angle, 0.0);

        let record = decode_command("  turnRight   -37.5  ").unwrap();
        assert_eq!(record.angle, -37.5);

        let record = decode_command("fire lots").unwrap();
        assert_eq!(record.power, 0.0);
    }

    #[test]
    fn test_record_without_cmd_falls_back() {
        let record = decode_command(r#"{"power":3}"#).unwrap();
        assert_eq!(record.form, RecordForm::Fallback);
        assert_eq!(record.kind(), None);
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(decode_command(""), Err(DecodeError::Empty));
        assert_eq!(decode_command("   \t"), Err(DecodeError::Empty));
    }

    #[test]
    fn test_split_record_edges() {
        assert_eq!(split_record("forward 100"), None);
        assert_eq!(split_record("{}"), Some(Vec::new()));
        assert_eq!(
            split_record(r#"{"a":"1",junk,"b":2}"#),
            Some(vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ])
        );
    }
}
