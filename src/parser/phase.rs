//! Phase rule: numeric (`Mission phase changed to: 3`) or named (`phase: ascent`) reports.

use regex::Regex;

pub(super) struct PhaseRule {
    changed: Regex,
    named: Regex,
}

impl PhaseRule {
    pub(super) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            changed: Regex::new(r"(?i)phase changed to\s*:?\s*([A-Za-z0-9][\w-]*)")?,
            named: Regex::new(r"(?i)\bphase\s*[:=]\s*([A-Za-z0-9][\w-]*)")?,
        })
    }

    /// Raw phase token reported by the line, if any.
    pub(super) fn extract<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.changed
            .captures(line)
            .or_else(|| self.named.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}
