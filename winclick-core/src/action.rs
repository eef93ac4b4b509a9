//! Scripted actions: what to locate on screen and how to click it.
//!
//! One [`Action`] is one entry in the configured sequence.  Actions are
//! immutable once deserialized; the sequence is read-only during a run
//! except for the sequencer's step cursor.

use std::time::Duration;

use serde::Deserialize;

/// How the action's `target` string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Literal window-local coordinates, `"x:y"`.
    Fixed,
    /// Substring to find among OCR-recognized text boxes.
    Text,
    /// Path to a template image to match against the capture.
    Template,
}

/// Mouse click variant to perform once the target is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickKind {
    #[default]
    Single,
    Double,
    Right,
}

/// One step of the automation sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct Action {
    /// Target interpretation.
    #[serde(alias = "type")]
    pub kind: TargetKind,
    /// Coordinate pair, query text, or template path depending on `kind`.
    pub target: String,
    /// Click variant; defaults to a single left click.
    #[serde(default)]
    pub click: ClickKind,
    /// Seconds to wait after a successful click before the next step.
    #[serde(default = "default_delay")]
    pub delay: f64,
    /// Directional offset token applied to the resolved point, e.g. `"R30"`.
    #[serde(default)]
    pub offset: String,
}

fn default_delay() -> f64 {
    1.0
}

impl Action {
    /// Post-click delay as a `Duration`; negative configured values are
    /// treated as zero.
    pub fn delay_duration(&self) -> Duration {
        Duration::from_secs_f64(self.delay.max(0.0))
    }

    /// Decoded pixel offset for this action.
    pub fn offset_delta(&self) -> (i32, i32) {
        decode_offset(&self.offset)
    }
}

/// Decode a directional offset token into a signed pixel delta.
///
/// `L50 -> (-50,0)`, `R30 -> (30,0)`, `U20 -> (0,-20)`, `D40 -> (0,40)`.
/// `"0"`, the empty string, and anything unparseable degrade to `(0,0)`;
/// malformed tokens additionally log a warning.  Lowercase is accepted.
pub fn decode_offset(token: &str) -> (i32, i32) {
    let token = token.trim();
    if token.is_empty() || token == "0" {
        return (0, 0);
    }

    let mut chars = token.chars();
    let direction = chars.next().map(|c| c.to_ascii_uppercase());
    let magnitude = chars.as_str().parse::<i32>().ok().filter(|n| *n >= 0);

    match (direction, magnitude) {
        (Some('L'), Some(n)) => (-n, 0),
        (Some('R'), Some(n)) => (n, 0),
        (Some('U'), Some(n)) => (0, -n),
        (Some('D'), Some(n)) => (0, n),
        _ => {
            log::warn!("unrecognized offset token {token:?}, using (0,0)");
            (0, 0)
        }
    }
}

/// Parse a fixed `"x:y"` target into window-local coordinates.
///
/// Returns `None` (with a warning) for non-integer or malformed input.
pub fn parse_fixed_target(target: &str) -> Option<(i32, i32)> {
    fn parse(target: &str) -> Option<(i32, i32)> {
        let mut parts = target.split(':');
        let x = parts.next()?.trim().parse::<i32>().ok()?;
        let y = parts.next()?.trim().parse::<i32>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some((x, y))
    }

    let parsed = parse(target);
    if parsed.is_none() {
        log::warn!("malformed fixed target {target:?}, expected \"x:y\"");
    }
    parsed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_offset_directions() {
        assert_eq!(decode_offset("L50"), (-50, 0));
        assert_eq!(decode_offset("R30"), (30, 0));
        assert_eq!(decode_offset("U20"), (0, -20));
        assert_eq!(decode_offset("D40"), (0, 40));
    }

    #[test]
    fn test_decode_offset_zero_and_empty() {
        assert_eq!(decode_offset("0"), (0, 0));
        assert_eq!(decode_offset(""), (0, 0));
        assert_eq!(decode_offset("   "), (0, 0));
    }

    #[test]
    fn test_decode_offset_lowercase() {
        assert_eq!(decode_offset("r15"), (15, 0));
        assert_eq!(decode_offset("d5"), (0, 5));
    }

    #[test]
    fn test_decode_offset_malformed_degrades() {
        assert_eq!(decode_offset("X50"), (0, 0));
        assert_eq!(decode_offset("L"), (0, 0));
        assert_eq!(decode_offset("Lfifty"), (0, 0));
        assert_eq!(decode_offset("50L"), (0, 0));
        assert_eq!(decode_offset("L-10"), (0, 0));
    }

    #[test]
    fn test_parse_fixed_target() {
        assert_eq!(parse_fixed_target("50:50"), Some((50, 50)));
        assert_eq!(parse_fixed_target(" 120 : 45 "), Some((120, 45)));
        assert_eq!(parse_fixed_target("-5:10"), Some((-5, 10)));
    }

    #[test]
    fn test_parse_fixed_target_malformed() {
        assert_eq!(parse_fixed_target("50"), None);
        assert_eq!(parse_fixed_target("a:b"), None);
        assert_eq!(parse_fixed_target("50;50"), None);
        assert_eq!(parse_fixed_target("1:2:3"), None);
        assert_eq!(parse_fixed_target(""), None);
    }

    #[test]
    fn test_action_deserialization_defaults() {
        let json = r#"{"kind": "text", "target": "确定"}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.kind, TargetKind::Text);
        assert_eq!(action.click, ClickKind::Single);
        assert_eq!(action.delay, 1.0);
        assert_eq!(action.offset_delta(), (0, 0));
    }

    #[test]
    fn test_action_deserialization_full() {
        let json = r#"{"type": "template", "target": "assets/start.png",
                       "click": "double", "delay": 0.5, "offset": "U12"}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.kind, TargetKind::Template);
        assert_eq!(action.click, ClickKind::Double);
        assert_eq!(action.delay_duration(), Duration::from_millis(500));
        assert_eq!(action.offset_delta(), (0, -12));
    }

    #[test]
    fn test_negative_delay_clamped() {
        let json = r#"{"kind": "fixed", "target": "1:1", "delay": -2.0}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.delay_duration(), Duration::ZERO);
    }
}
