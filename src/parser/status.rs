//! Status rule: `LEVEL component: message` after a timestamp bracket or at line start.
//!
//! The simulator logger writes `[HH:MM:SS.mmm] INFO  MAIN        : text`, or the
//! same without the bracket when timestamps are off. A line that carries the
//! marker but no `component:` prefix is still reported, with an empty component.

use std::time::SystemTime;

use regex::Regex;

use crate::events::{Severity, StatusMessage};

pub(super) struct StatusRule {
    marker: Regex,
}

impl StatusRule {
    pub(super) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            marker: Regex::new(r"(?:^|\] )(INFO|WARN|ERROR|CRIT)\s+")?,
        })
    }

    pub(super) fn extract(&self, line: &str, observed_at: SystemTime) -> Option<StatusMessage> {
        let caps = self.marker.captures(line)?;
        let severity = Severity::from_marker(caps.get(1)?.as_str())?;
        let rest = &line[caps.get(0)?.end()..];

        let (component, message) = match rest.split_once(':') {
            Some((component, message)) if is_component(component.trim()) => {
                (component.trim().to_string(), message.trim().to_string())
            }
            _ => (String::new(), rest.trim().to_string()),
        };

        Some(StatusMessage {
            component,
            message,
            severity,
            observed_at,
        })
    }
}

/// A component is one non-empty word (the logger pads it, never splits it).
fn is_component(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace)
}
