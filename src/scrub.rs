//! Keeps only the lines of a report that mapping needs.
//!
//! Everything else in a turn report (inventories, skill lists, clan
//! messages) is private to the player and is dropped before a report is
//! stored. Retained lines keep their relative order; a blank line separates
//! consecutive unit sections.
//!
//! Patterns accept a line both as the game printed it and after
//! normalization, which removes the blanks following `,` and `:`.

use regex::bytes::Regex;

use crate::models::UnitKind;
use crate::patterns::compile_bytes as compile;

/// What a retained line is. Status lines are not listed: recognizing one
/// depends on the section it appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Unit header naming the unit id.
    Section(&'a [u8]),
    Turn,
    TribeMovement,
    Follows,
    GoesTo,
    FleetMovement,
    Scout,
}

/// Compiled line patterns for [`Scrubber::scrub`].
#[derive(Debug, Clone)]
pub struct Scrubber {
    sections: Vec<Regex>,
    fleet_movement: Regex,
    scout: Regex,
}

impl Default for Scrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl Scrubber {
    pub fn new() -> Self {
        let sections = UnitKind::ALL
            .iter()
            .map(|kind| {
                let pattern = match kind.suffix() {
                    Some(letter) => format!(r"^{} (\d{{4}}{letter}\d) *,", kind.keyword()),
                    None => format!(r"^{} (\d{{4}}) *,", kind.keyword()),
                };
                compile(&pattern)
            })
            .collect();
        Self {
            sections,
            fleet_movement: compile(
                r"^(CALM|MILD|STRONG|GALE) (NE|SE|SW|NW|N|S) Fleet Movement: ?Move ",
            ),
            scout: compile(r"^Scout \d:Scout "),
        }
    }

    /// Classify one line, or `None` when it is not a mapping line.
    pub fn classify<'a>(&self, line: &'a [u8]) -> Option<LineKind<'a>> {
        if let Some(unit) = self
            .sections
            .iter()
            .find_map(|rx| rx.captures(line)?.get(1))
        {
            return Some(LineKind::Section(unit.as_bytes()));
        }
        let kind = if line.starts_with(b"Current Turn ") {
            LineKind::Turn
        } else if line.starts_with(b"Tribe Movement:") {
            LineKind::TribeMovement
        } else if line.starts_with(b"Tribe Follows ") {
            LineKind::Follows
        } else if line.starts_with(b"Tribe Goes to ") {
            LineKind::GoesTo
        } else if self.fleet_movement.is_match(line) {
            LineKind::FleetMovement
        } else if self.scout.is_match(line) {
            LineKind::Scout
        } else {
            return None;
        };
        Some(kind)
    }

    /// Filter `lines` down to the mapping-relevant subset.
    ///
    /// A status line is kept only when it names the unit of the most recent
    /// section header; before the first header none is recognized. Lines
    /// kept ahead of the first header are not followed by a separator.
    pub fn scrub<L: AsRef<[u8]>>(&self, lines: &[L]) -> Vec<Vec<u8>> {
        let mut kept: Vec<Vec<u8>> = Vec::new();
        let mut status_prefix: Option<Vec<u8>> = None;

        for line in lines {
            let line = line.as_ref();
            match self.classify(line) {
                Some(LineKind::Section(unit)) => {
                    // separator only between two sections
                    if status_prefix.is_some() {
                        kept.push(Vec::new());
                    }
                    status_prefix = Some(status_prefix_for(unit));
                    kept.push(line.to_vec());
                }
                Some(_) => kept.push(line.to_vec()),
                None => {
                    if status_prefix
                        .as_deref()
                        .is_some_and(|prefix| line.starts_with(prefix))
                    {
                        kept.push(line.to_vec());
                    }
                }
            }
        }

        kept
    }
}

/// `<unit> Status:`, the start of a unit's status line.
pub fn status_prefix_for(unit: &[u8]) -> Vec<u8> {
    [unit, &b" Status:"[..]].concat()
}
