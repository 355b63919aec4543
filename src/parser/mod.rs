//! # Line parser: raw log line → zero or more extracted values.
//!
//! [`LineParser`] is stateless after construction. Each rule is applied to every
//! line, always in the same order, and a line may match several rules at once:
//!
//! ```text
//! line ──► telemetry rule ──► Extracted::Telemetry   (altitude / velocity / fuel)
//!      ──► status rule    ──► Extracted::Status      (LEVEL component: message)
//!      ──► phase rule     ──► Extracted::Phase       (raw token for PhaseStateMachine)
//! ```
//!
//! ## Rules
//! - Parsing never fails: a field that does not convert is "no match" for that field.
//! - Only the first `max_line_len` bytes of a line are inspected (cut on a char boundary).
//! - Telemetry and status values are stamped with the capture time, not a time
//!   embedded in the line.

mod phase;
mod status;
mod telemetry;

use std::time::SystemTime;

use crate::events::{StatusMessage, TelemetrySample};

use self::{phase::PhaseRule, status::StatusRule, telemetry::TelemetryRule};

/// Default number of bytes inspected per line.
pub const DEFAULT_MAX_LINE_LEN: usize = 8 * 1024;

/// One value extracted from a line.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Telemetry(TelemetrySample),
    Status(StatusMessage),
    /// Raw phase token, resolved later by [`PhaseStateMachine`](crate::PhaseStateMachine).
    Phase {
        token: String,
        observed_at: SystemTime,
    },
}

/// Compiled rule set.
pub struct LineParser {
    telemetry: TelemetryRule,
    status: StatusRule,
    phase: PhaseRule,
    max_line_len: usize,
}

impl LineParser {
    /// Compiles the rule set with [`DEFAULT_MAX_LINE_LEN`].
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_max_line_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Compiles the rule set inspecting at most `max_line_len` bytes per line (min 1).
    pub fn with_max_line_len(max_line_len: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            telemetry: TelemetryRule::new()?,
            status: StatusRule::new()?,
            phase: PhaseRule::new()?,
            max_line_len: max_line_len.max(1),
        })
    }

    /// Parses `line`, stamping values with the current wall-clock time.
    pub fn parse(&self, line: &str) -> Vec<Extracted> {
        self.parse_at(line, SystemTime::now())
    }

    /// Parses `line`, stamping values with `observed_at`.
    pub fn parse_at(&self, line: &str, observed_at: SystemTime) -> Vec<Extracted> {
        let line = truncate(line.trim(), self.max_line_len);
        if line.is_empty() {
            return Vec::new();
        }

        let mut out = Vec::new();
        if let Some(sample) = self.telemetry.extract(line, observed_at) {
            out.push(Extracted::Telemetry(sample));
        }
        if let Some(status) = self.status.extract(line, observed_at) {
            out.push(Extracted::Status(status));
        }
        if let Some(token) = self.phase.extract(line) {
            out.push(Extracted::Phase {
                token: token.to_string(),
                observed_at,
            });
        }
        out
    }
}

/// Longest prefix of `s` not exceeding `max` bytes that ends on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Severity;

    fn parser() -> LineParser {
        LineParser::new().unwrap()
    }

    #[test]
    fn test_altitude_line_yields_single_sample() {
        let out = parser().parse("Altitude: 10523.4 m");
        assert_eq!(out.len(), 1);
        match &out[0] {
            Extracted::Telemetry(s) => {
                assert_eq!(s.altitude, Some(10523.4));
                assert!(s.velocity.is_none());
                assert!(s.fuel_remaining.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rules_apply_in_fixed_order_on_one_line() {
        let line = "[12:00:03.000] INFO  FCC         : phase: ascent Altitude: 800 m Fuel: 91%";
        let out = parser().parse(line);
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], Extracted::Telemetry(_)));
        match &out[1] {
            Extracted::Status(m) => {
                assert_eq!(m.component, "FCC");
                assert_eq!(m.severity, Severity::Info);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&out[2], Extracted::Phase { token, .. } if token == "ascent"));
    }

    #[test]
    fn test_phase_code_line() {
        let out = parser().parse("Mission phase changed to: 3");
        assert!(matches!(&out[..], [Extracted::Phase { token, .. }] if token == "3"));
    }

    #[test]
    fn test_unmatched_and_empty_lines() {
        let p = parser();
        assert!(p.parse("").is_empty());
        assert!(p.parse("   ").is_empty());
        assert!(p.parse("random chatter").is_empty());
    }

    #[test]
    fn test_non_ascii_and_oversized_input() {
        let p = LineParser::with_max_line_len(16).unwrap();
        let line = format!("Altitude: 5 m {}", "é".repeat(10_000));
        let out = p.parse(&line);
        assert_eq!(out.len(), 1);

        // Cut lands inside a two-byte char; must not panic.
        assert!(p.parse("ééééééééé Altitude: 5 m").is_empty());
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate("aé", 2), "a");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
