//! # Canonical mission phases.
//!
//! The simulator reports phases either by numeric code (`Mission phase changed to: 3`)
//! or by name (`phase: ascent`). [`Phase::lookup`] maps both into one enum.
//!
//! ## Code table
//! ```text
//! 0 PRE_LAUNCH     4 STAGE_SEPARATION
//! 1 IGNITION       5 ORBIT_INSERTION
//! 2 LIFTOFF        6 MISSION_COMPLETE
//! 3 ASCENT         7 ABORT
//! ```
//!
//! Unrecognised tokens are never rejected: numeric codes become `PHASE_<code>`,
//! names pass through uppercased, both as [`Phase::Other`].

use std::fmt;

use serde::Serialize;

/// Mission phase.
///
/// Declaration order of the progression variants is the expected forward order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    PreLaunch,
    Ignition,
    Liftoff,
    Ascent,
    StageSeparation,
    OrbitInsertion,
    MissionComplete,
    /// Reachable from any phase.
    Abort,
    /// No phase observed yet.
    #[default]
    Unknown,
    /// Token with no canonical entry (uppercased literal or `PHASE_<code>`).
    Other(String),
}

impl Phase {
    /// Maps a numeric phase code through the canonical table.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Phase::PreLaunch,
            1 => Phase::Ignition,
            2 => Phase::Liftoff,
            3 => Phase::Ascent,
            4 => Phase::StageSeparation,
            5 => Phase::OrbitInsertion,
            6 => Phase::MissionComplete,
            7 => Phase::Abort,
            n => Phase::Other(format!("PHASE_{n}")),
        }
    }

    /// Resolves a raw token (numeric code or name) to a phase.
    ///
    /// Names are matched case-insensitively with `-` and spaces treated as `_`.
    /// A digit-only token that does not fit `u32` passes through as a literal.
    pub fn lookup(token: &str) -> Self {
        let token = token.trim();
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(code) = token.parse::<u32>() {
                return Phase::from_code(code);
            }
        }

        let normalized: String = token
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "PRE_LAUNCH" | "PRELAUNCH" => Phase::PreLaunch,
            "IGNITION" => Phase::Ignition,
            "LIFTOFF" | "LIFT_OFF" => Phase::Liftoff,
            "ASCENT" => Phase::Ascent,
            "STAGE_SEPARATION" => Phase::StageSeparation,
            "ORBIT_INSERTION" => Phase::OrbitInsertion,
            "MISSION_COMPLETE" => Phase::MissionComplete,
            "ABORT" => Phase::Abort,
            "UNKNOWN" => Phase::Unknown,
            _ => Phase::Other(normalized),
        }
    }

    /// Position in the expected forward progression.
    ///
    /// `None` for `Abort`, `Unknown` and pass-through tokens.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Phase::PreLaunch => Some(0),
            Phase::Ignition => Some(1),
            Phase::Liftoff => Some(2),
            Phase::Ascent => Some(3),
            Phase::StageSeparation => Some(4),
            Phase::OrbitInsertion => Some(5),
            Phase::MissionComplete => Some(6),
            Phase::Abort | Phase::Unknown | Phase::Other(_) => None,
        }
    }

    /// Canonical display name.
    pub fn as_str(&self) -> &str {
        match self {
            Phase::PreLaunch => "PRE_LAUNCH",
            Phase::Ignition => "IGNITION",
            Phase::Liftoff => "LIFTOFF",
            Phase::Ascent => "ASCENT",
            Phase::StageSeparation => "STAGE_SEPARATION",
            Phase::OrbitInsertion => "ORBIT_INSERTION",
            Phase::MissionComplete => "MISSION_COMPLETE",
            Phase::Abort => "ABORT",
            Phase::Unknown => "UNKNOWN",
            Phase::Other(s) => s,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_through_table() {
        assert_eq!(Phase::from_code(0), Phase::PreLaunch);
        assert_eq!(Phase::from_code(3), Phase::Ascent);
        assert_eq!(Phase::from_code(7), Phase::Abort);
    }

    #[test]
    fn test_unknown_code_becomes_synthetic_token() {
        assert_eq!(Phase::from_code(12), Phase::Other("PHASE_12".into()));
        assert_eq!(Phase::lookup("12").as_str(), "PHASE_12");
    }

    #[test]
    fn test_names_are_normalized() {
        assert_eq!(Phase::lookup("ascent"), Phase::Ascent);
        assert_eq!(Phase::lookup("PRE-LAUNCH"), Phase::PreLaunch);
        assert_eq!(Phase::lookup("stage separation"), Phase::StageSeparation);
        assert_eq!(Phase::lookup(" Orbit_Insertion "), Phase::OrbitInsertion);
    }

    #[test]
    fn test_unrecognized_name_passes_through_uppercased() {
        assert_eq!(Phase::lookup("coast"), Phase::Other("COAST".into()));
    }

    #[test]
    fn test_oversized_code_is_kept_literal() {
        let p = Phase::lookup("99999999999999999999");
        assert_eq!(p, Phase::Other("99999999999999999999".into()));
    }

    #[test]
    fn test_rank_follows_progression() {
        assert!(Phase::PreLaunch.rank() < Phase::Ascent.rank());
        assert_eq!(Phase::Abort.rank(), None);
        assert_eq!(Phase::Other("X".into()).rank(), None);
    }
}
