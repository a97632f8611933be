//! Turn untrusted decision-service text into a directive
//!
//! The service is asked for JSON but may answer with code fences, prose, more
//! than one object, or bare `key: value` lines. The pipeline:
//! 1. strip code fences
//! 2. scan for balanced `{...}` objects (quote and escape aware) and decode
//!    each until one carries a recognised field
//! 3. otherwise extract known keys loosely from the raw text
//! 4. lowercase tokens and strip `zone_` prefixes
//!
//! Parsing only fails when no order token turns up anywhere.

use ahash::AHashMap;
use nom::branch::alt;
use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::{char, multispace0, one_of};
use nom::combinator::opt;
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::strategy::directive::StrategicDirective;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty response")]
    Empty,
    #[error("no order token found ({} candidate objects rejected)", .rejected.len())]
    NoOrder { rejected: Vec<String> },
}

/// Keys understood by the loose extractor. Longer keys first so
/// `real_target_zone` is never read as `target_zone`.
const LOOSE_KEYS: [&str; 12] = [
    "real_target_zone",
    "target_zone",
    "decoy_zone",
    "from_zone",
    "to_zone",
    "squad_size",
    "decoy_size",
    "real_size",
    "reasoning",
    "directive",
    "order",
    "count",
];

/// Parse raw service output into a normalised, unvalidated directive
pub fn parse_directive(raw: &str) -> Result<StrategicDirective, ParseError> {
    let text = strip_code_fences(raw);
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut rejected = Vec::new();
    let mut structured = None;
    for candidate in balanced_objects(&text) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => match directive_from_object(&map) {
                Some(directive) => {
                    structured = Some(directive);
                    break;
                }
                None => rejected.push("no recognised fields".to_string()),
            },
            Ok(_) => rejected.push("not an object".to_string()),
            Err(e) => rejected.push(e.to_string()),
        }
    }

    let mut directive = match structured {
        Some(mut directive) => {
            if directive.order.trim().is_empty() {
                fill_missing(&mut directive, loose_directive(&text));
            }
            directive
        }
        None => loose_directive(&text),
    };
    directive.normalize();

    if directive.order.is_empty() {
        tracing::debug!(rejected = rejected.len(), "no order token in service response");
        return Err(ParseError::NoOrder { rejected });
    }
    Ok(directive)
}

/// Remove ``` markers and the language tag that follows an opening fence
pub fn strip_code_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        let tag_len = rest.bytes().take_while(|b| b.is_ascii_alphanumeric()).count();
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out
}

/// Top-level balanced `{...}` substrings, left to right
pub fn balanced_objects(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        found.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    found
}

/// Decode a JSON object; `None` when it has no recognised field.
/// Accepts `{"directive": {...}}` wrappers.
fn directive_from_object(obj: &Map<String, Value>) -> Option<StrategicDirective> {
    if let Some(Value::Object(inner)) = obj.get("directive") {
        let mut directive = directive_from_object(inner)?;
        if directive.reasoning.is_empty() {
            directive.reasoning = string_field(obj, "reasoning").unwrap_or_default();
        }
        return Some(directive);
    }

    let directive = StrategicDirective {
        order: string_field(obj, "order")
            .or_else(|| string_field(obj, "directive"))
            .unwrap_or_default(),
        target_zone: string_field(obj, "target_zone"),
        from_zone: string_field(obj, "from_zone"),
        to_zone: string_field(obj, "to_zone"),
        decoy_zone: string_field(obj, "decoy_zone"),
        real_target_zone: string_field(obj, "real_target_zone"),
        squad_size: count_field(obj.get("squad_size")),
        count: count_field(obj.get("count")),
        decoy_size: count_field(obj.get("decoy_size")),
        real_size: count_field(obj.get("real_size")),
        reasoning: string_field(obj, "reasoning").unwrap_or_default(),
    };

    let recognised = LOOSE_KEYS
        .iter()
        .any(|key| obj.get(*key).is_some_and(|v| !v.is_null()));
    recognised.then_some(directive)
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numbers or numeric strings
fn count_field(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => parse_count(s),
        _ => None,
    }
}

fn parse_count(token: &str) -> Option<i64> {
    let token = token.trim();
    token
        .parse::<i64>()
        .ok()
        .or_else(|| token.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
}

/// Pull known `key: value` / `key = value` pairs straight out of text
fn loose_directive(text: &str) -> StrategicDirective {
    let fields = loose_fields(text);
    let get = |key: &str| fields.get(key).cloned();
    let count = |key: &str| fields.get(key).and_then(|v| parse_count(v));

    StrategicDirective {
        order: get("order").or_else(|| get("directive")).unwrap_or_default(),
        target_zone: get("target_zone"),
        from_zone: get("from_zone"),
        to_zone: get("to_zone"),
        decoy_zone: get("decoy_zone"),
        real_target_zone: get("real_target_zone"),
        squad_size: count("squad_size"),
        count: count("count"),
        decoy_size: count("decoy_size"),
        real_size: count("real_size"),
        reasoning: get("reasoning").unwrap_or_default(),
    }
}

/// First value found for each known key
fn loose_fields(text: &str) -> AHashMap<&'static str, String> {
    let lowered = text.to_ascii_lowercase();
    let mut fields = AHashMap::new();
    let mut prev: Option<char> = None;

    for (idx, c) in lowered.char_indices() {
        let at_boundary = prev.map_or(true, |p| !(p.is_alphanumeric() || p == '_'));
        prev = Some(c);
        if !at_boundary {
            continue;
        }
        for key in LOOSE_KEYS {
            if fields.contains_key(key) || !lowered[idx..].starts_with(key) {
                continue;
            }
            if let Ok((_, value)) = field_value(&text[idx + key.len()..]) {
                fields.insert(key, value.trim().to_string());
            }
            break;
        }
    }
    fields
}

/// `": value"`, `= 'value'`, `:"value"`: an optional closing quote on the
/// key, a separator, then a quoted or bare value
fn field_value(input: &str) -> IResult<&str, &str> {
    preceded(
        (opt(one_of("\"'")), multispace0, one_of(":="), multispace0),
        alt((quoted, bare)),
    )
    .parse(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    ))
    .parse(input)
}

fn bare(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')).parse(input)
}

fn fill_missing(directive: &mut StrategicDirective, other: StrategicDirective) {
    if directive.order.trim().is_empty() {
        directive.order = other.order;
    }
    directive.target_zone = directive.target_zone.take().or(other.target_zone);
    directive.from_zone = directive.from_zone.take().or(other.from_zone);
    directive.to_zone = directive.to_zone.take().or(other.to_zone);
    directive.decoy_zone = directive.decoy_zone.take().or(other.decoy_zone);
    directive.real_target_zone = directive.real_target_zone.take().or(other.real_target_zone);
    directive.squad_size = directive.squad_size.or(other.squad_size);
    directive.count = directive.count.or(other.count);
    directive.decoy_size = directive.decoy_size.or(other.decoy_size);
    directive.real_size = directive.real_size.or(other.real_size);
    if directive.reasoning.is_empty() {
        directive.reasoning = other.reasoning;
    }
}

/// System prompt for the strategist
pub const STRATEGIST_SYSTEM_PROMPT: &str = r#"You command an AI drone swarm defending three zones (alpha, bravo, charlie) against a single player.
You receive a JSON battlefield snapshot. Answer with ONE JSON object and nothing else.

ORDERS:
- reinforce: send a squad to a zone you own. Fields: target_zone, squad_size
- recapture: send a squad to retake a zone the player owns. Fields: target_zone, squad_size
- redistribute: move defender allocation between zones. Fields: from_zone, to_zone, count
- feint: two squads at once, a decoy and the real attack. Fields: decoy_zone, decoy_size, real_target_zone, real_size
- hold: do nothing this cycle

Squads are limited and share a cooldown; check ai_resources before dispatching.
Always include a short "reasoning" string; the player may intercept it.

Example:
{"order": "recapture", "target_zone": "alpha", "squad_size": 4, "reasoning": "Alpha has been quiet too long."}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_json() {
        let raw = r#"{"order":"Recapture","target_zone":"Zone_Alpha","squad_size":4,"reasoning":"Alpha is exposed"}"#;
        let d = parse_directive(raw).unwrap();
        assert_eq!(d.order, "recapture");
        assert_eq!(d.target_zone.as_deref(), Some("alpha"));
        assert_eq!(d.squad_size, Some(4));
        assert_eq!(d.reasoning, "Alpha is exposed");
    }

    #[test]
    fn test_code_fences() {
        let raw = "```json\n{\"order\": \"hold\", \"reasoning\": \"waiting\"}\n```";
        let d = parse_directive(raw).unwrap();
        assert_eq!(d.order, "hold");
        assert_eq!(d.reasoning, "waiting");
    }

    #[test]
    fn test_prose_with_embedded_object() {
        let raw = "Sure! My plan: {\"order\": \"reinforce\", \"target_zone\": \"bravo\", \"squad_size\": \"3\", \"reasoning\": \"keep {bravo} safe \\\"now\\\"\"} Good luck.";
        let d = parse_directive(raw).unwrap();
        assert_eq!(d.order, "reinforce");
        assert_eq!(d.target_zone.as_deref(), Some("bravo"));
        assert_eq!(d.squad_size, Some(3));
        assert_eq!(d.reasoning, "keep {bravo} safe \"now\"");
    }

    #[test]
    fn test_skips_unrecognised_and_broken_candidates() {
        let raw = r#"{"mood": "calm"} {broken json} {"order": "feint", "decoy_zone": "alpha", "decoy_size": 2, "real_target_zone": "charlie", "real_size": 5}"#;
        let d = parse_directive(raw).unwrap();
        assert_eq!(d.order, "feint");
        assert_eq!(d.decoy_zone.as_deref(), Some("alpha"));
        assert_eq!(d.real_target_zone.as_deref(), Some("charlie"));
        assert_eq!(d.real_size, Some(5));
    }

    #[test]
    fn test_nested_directive_object() {
        let raw = r#"{"directive": {"order": "redistribute", "from_zone": "ALPHA", "to_zone": "zone_bravo", "count": 2.0}, "reasoning": "shift weight"}"#;
        let d = parse_directive(raw).unwrap();
        assert_eq!(d.order, "redistribute");
        assert_eq!(d.from_zone.as_deref(), Some("alpha"));
        assert_eq!(d.to_zone.as_deref(), Some("bravo"));
        assert_eq!(d.count, Some(2));
        assert_eq!(d.reasoning, "shift weight");
    }

    #[test]
    fn test_directive_key_as_order() {
        let d = parse_directive(r#"{"directive": "HOLD"}"#).unwrap();
        assert_eq!(d.order, "hold");
    }

    #[test]
    fn test_loose_key_values() {
        let raw = "Order: recapture\ntarget_zone = Zone_Charlie\nsquad_size: 5\nreasoning: \"they left it open\"";
        let d = parse_directive(raw).unwrap();
        assert_eq!(d.order, "recapture");
        assert_eq!(d.target_zone.as_deref(), Some("charlie"));
        assert_eq!(d.squad_size, Some(5));
        assert_eq!(d.reasoning, "they left it open");
    }

    #[test]
    fn test_loose_prefers_longest_key() {
        let raw = "order=feint real_target_zone=bravo decoy_zone=alpha";
        let d = parse_directive(raw).unwrap();
        assert_eq!(d.real_target_zone.as_deref(), Some("bravo"));
        assert_eq!(d.target_zone, None);
    }

    #[test]
    fn test_malformed_object_falls_back_to_loose() {
        let raw = "{order: 'reinforce', target_zone: 'alpha', squad_size: 2}";
        let d = parse_directive(raw).unwrap();
        assert_eq!(d.order, "reinforce");
        assert_eq!(d.target_zone.as_deref(), Some("alpha"));
        assert_eq!(d.squad_size, Some(2));
    }

    #[test]
    fn test_no_recognisable_fields_fails() {
        assert!(matches!(
            parse_directive("I am not sure what to do."),
            Err(ParseError::NoOrder { .. })
        ));
        assert!(matches!(parse_directive(r#"{"mood": "calm"}"#), Err(ParseError::NoOrder { .. })));
        assert_eq!(parse_directive("  ```  ```  "), Err(ParseError::Empty));
    }

    #[test]
    fn test_balanced_scan_respects_strings() {
        let text = r#"x {"a": "}"} y {"b": {"c": 1}}"#;
        assert_eq!(balanced_objects(text), vec![r#"{"a": "}"}"#, r#"{"b": {"c": 1}}"#]);
    }
}
