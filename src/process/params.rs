//! Run parameters forwarded to the simulator as command-line flags.

use std::fmt;
use std::str::FromStr;

use crate::error::RuntimeError;

/// Longest accepted countdown (one day).
pub const MAX_COUNTDOWN_SECS: u32 = 86_400;

/// Mission clock override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissionTime {
    /// Let the simulator pick its own start time; no flag is forwarded.
    #[default]
    Auto,
    /// Start the clock `n` seconds before T-0 (`t-<n>`).
    Countdown(u32),
}

impl FromStr for MissionTime {
    type Err = RuntimeError;

    /// Accepts `auto` or `t-<n>` (case-insensitive, surrounding whitespace ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "auto" {
            return Ok(MissionTime::Auto);
        }
        let invalid = || RuntimeError::InvalidParameters {
            reason: format!("mission time {s:?} is not `auto` or `t-<seconds>`"),
        };

        let digits = s.strip_prefix("t-").ok_or_else(invalid)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let secs: u32 = digits.parse().map_err(|_| invalid())?;
        if secs > MAX_COUNTDOWN_SECS {
            return Err(RuntimeError::InvalidParameters {
                reason: format!("countdown of {secs}s exceeds {MAX_COUNTDOWN_SECS}s"),
            });
        }
        Ok(MissionTime::Countdown(secs))
    }
}

impl fmt::Display for MissionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionTime::Auto => f.write_str("auto"),
            MissionTime::Countdown(secs) => write!(f, "t-{secs}"),
        }
    }
}

/// Operator choices for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunParameters {
    pub mission_time: MissionTime,
    /// Forwards `--verbose`.
    pub verbose: bool,
}

impl RunParameters {
    /// Checks values that can be built without going through [`FromStr`].
    pub fn validate(&self) -> Result<(), RuntimeError> {
        match self.mission_time {
            MissionTime::Countdown(secs) if secs > MAX_COUNTDOWN_SECS => {
                Err(RuntimeError::InvalidParameters {
                    reason: format!("countdown of {secs}s exceeds {MAX_COUNTDOWN_SECS}s"),
                })
            }
            _ => Ok(()),
        }
    }

    /// Command-line flags, in a stable order.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let MissionTime::Countdown(_) = self.mission_time {
            args.push("--mission-time".to_string());
            args.push(self.mission_time.to_string());
        }
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mission_time() {
        assert_eq!("auto".parse::<MissionTime>().unwrap(), MissionTime::Auto);
        assert_eq!(" T-600 ".parse::<MissionTime>().unwrap(), MissionTime::Countdown(600));
        assert_eq!("t-0".parse::<MissionTime>().unwrap(), MissionTime::Countdown(0));
    }

    #[test]
    fn test_reject_bad_mission_time() {
        for bad in ["", "t-", "t-+5", "t-1.5", "600", "t-86401", "t-99999999999"] {
            let err = bad.parse::<MissionTime>().unwrap_err();
            assert_eq!(err.as_label(), "runtime_invalid_parameters", "{bad:?}");
        }
    }

    #[test]
    fn test_args_forwarding() {
        assert!(RunParameters::default().to_args().is_empty());

        let p = RunParameters {
            mission_time: MissionTime::Countdown(60),
            verbose: true,
        };
        assert_eq!(p.to_args(), vec!["--mission-time", "t-60", "--verbose"]);
    }

    #[test]
    fn test_validate_out_of_range_countdown() {
        let p = RunParameters {
            mission_time: MissionTime::Countdown(MAX_COUNTDOWN_SECS + 1),
            verbose: false,
        };
        assert!(p.validate().is_err());
    }
}
