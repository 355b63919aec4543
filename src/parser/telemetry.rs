//! Telemetry rule: altitude (`m`), velocity (`m/s`) and fuel (`%`) fields.
//!
//! Accepted forms (case-sensitive, whitespace-tolerant):
//! ```text
//! Altitude: 10523.4 m     Alt=1200m
//! Velocity: -3.5 m/s      Vel=85.2m/s
//! Fuel: 62.5%             Fuel Remaining: 62.5 %
//! ```

use std::time::SystemTime;

use regex::Regex;

use crate::events::TelemetrySample;

pub(super) struct TelemetryRule {
    altitude: Regex,
    velocity: Regex,
    fuel: Regex,
}

impl TelemetryRule {
    pub(super) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            // `m` must not be the start of `m/s`.
            altitude: Regex::new(r"\bAlt(?:itude)?\s*[:=]?\s*(-?\d+(?:\.\d*)?)\s*m(?:[^/\w]|$)")?,
            velocity: Regex::new(r"\bVel(?:ocity)?\s*[:=]?\s*(-?\d+(?:\.\d*)?)\s*m/s")?,
            fuel: Regex::new(r"\bFuel(?:\s+Remaining)?\s*[:=]?\s*(\d+(?:\.\d*)?)\s*%")?,
        })
    }

    pub(super) fn extract(&self, line: &str, observed_at: SystemTime) -> Option<TelemetrySample> {
        let sample = TelemetrySample {
            altitude: capture_f64(&self.altitude, line),
            velocity: capture_f64(&self.velocity, line),
            fuel_remaining: capture_f64(&self.fuel, line).filter(|v| (0.0..=100.0).contains(v)),
            observed_at,
        };
        (!sample.is_empty()).then_some(sample)
    }
}

/// First capture group of `re` as a finite float; anything else is "no match".
fn capture_f64(re: &Regex, line: &str) -> Option<f64> {
    let raw = re.captures(line)?.get(1)?.as_str();
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
