//! Unit sections of a scrubbed report.
//!
//! A report is a run of unit sections, each opened by a unit header and
//! carrying at most one turn line, one line per movement kind, any number
//! of scout lines and the unit's status line. The dropbox `.scrubbed.txt`
//! variant is rebuilt from these sections with a comment preamble and
//! explicit markers where a mandatory line is missing.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::models::UploadFormat;
use crate::scrub::{status_prefix_for, LineKind, Scrubber};

/// One unit section. `id` counts from 1 in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSection {
    pub id: usize,
    pub unit: Option<String>,
    pub header: Option<Vec<u8>>,
    pub turn: Option<Vec<u8>>,
    pub movement: Option<Vec<u8>>,
    pub follows: Option<Vec<u8>>,
    pub goes_to: Option<Vec<u8>>,
    pub fleet: Option<Vec<u8>>,
    pub scouts: Vec<Vec<u8>>,
    pub status: Option<Vec<u8>>,
}

impl ReportSection {
    fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.header.is_none()
            && self.turn.is_none()
            && self.movement.is_none()
            && self.follows.is_none()
            && self.goes_to.is_none()
            && self.fleet.is_none()
            && self.scouts.is_empty()
            && self.status.is_none()
    }
}

/// Group a line stream into sections. Lines ahead of the first header form
/// a headerless section of their own. Only the first line of each single
/// slot is kept; unrecognized lines are ignored.
pub fn split_sections<L: AsRef<[u8]>>(scrubber: &Scrubber, lines: &[L]) -> Vec<ReportSection> {
    let mut sections = Vec::new();
    let mut current = ReportSection::new(1);
    let mut status_prefix: Option<Vec<u8>> = None;

    for line in lines {
        let line = line.as_ref();
        let slot = match scrubber.classify(line) {
            Some(LineKind::Section(unit)) => {
                if !current.is_blank() {
                    let next = ReportSection::new(current.id + 1);
                    sections.push(std::mem::replace(&mut current, next));
                }
                current.unit = Some(String::from_utf8_lossy(unit).into_owned());
                status_prefix = Some(status_prefix_for(unit));
                &mut current.header
            }
            Some(LineKind::Turn) => &mut current.turn,
            Some(LineKind::TribeMovement) => &mut current.movement,
            Some(LineKind::Follows) => &mut current.follows,
            Some(LineKind::GoesTo) => &mut current.goes_to,
            Some(LineKind::FleetMovement) => &mut current.fleet,
            Some(LineKind::Scout) => {
                current.scouts.push(line.to_vec());
                continue;
            }
            None => match &status_prefix {
                Some(prefix) if line.starts_with(prefix) => &mut current.status,
                _ => continue,
            },
        };
        slot.get_or_insert_with(|| line.to_vec());
    }

    if !current.is_blank() {
        sections.push(current);
    }
    sections
}

/// Preamble details for a rendered scrubbed file.
#[derive(Debug, Clone)]
pub struct ScrubbedMeta {
    /// Canonical upload name, e.g. `0901-04.0987.report.docx`.
    pub file_name: String,
    pub format: UploadFormat,
    pub submitted_by: String,
    /// Submission time in the submitter's own time zone.
    pub submitted_at: NaiveDateTime,
    pub version: String,
}

/// Render sections in the dropbox scrubbed-file layout.
pub fn render_scrubbed(sections: &[ReportSection], meta: &ScrubbedMeta) -> Vec<u8> {
    let mut out = Vec::new();
    let origin = match meta.format {
        UploadFormat::PlainText => "text",
        UploadFormat::WordPackage => "word",
    };
    push_line(&mut out, format!("// {origin} file {:?}", meta.file_name).as_bytes());
    push_line(
        &mut out,
        format!(
            "// submitted by user {} at {}",
            meta.submitted_by,
            meta.submitted_at.format("%Y-%m-%d %H:%M:%S")
        )
        .as_bytes(),
    );
    push_line(&mut out, format!("// intake v{}", meta.version).as_bytes());

    for section in sections {
        out.push(b'\n');
        push_line(&mut out, format!("// section {}", section.id).as_bytes());
        push_line(
            &mut out,
            section
                .header
                .as_deref()
                .unwrap_or(b"// missing element header"),
        );
        push_line(
            &mut out,
            section
                .turn
                .as_deref()
                .unwrap_or(b"// missing turn header"),
        );
        for line in [&section.movement, &section.follows, &section.goes_to, &section.fleet]
            .into_iter()
            .flatten()
        {
            push_line(&mut out, line);
        }
        for scout in &section.scouts {
            push_line(&mut out, scout);
        }
        push_line(
            &mut out,
            section
                .status
                .as_deref()
                .unwrap_or(b"// missing element status"),
        );
    }
    out
}

fn push_line(out: &mut Vec<u8>, line: &[u8]) {
    out.extend_from_slice(line);
    out.push(b'\n');
}

/// Distinct unit ids with a section in the report, sorted.
pub fn unit_ids<L: AsRef<[u8]>>(scrubber: &Scrubber, lines: &[L]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| match scrubber.classify(line.as_ref()) {
            Some(LineKind::Section(unit)) => Some(String::from_utf8_lossy(unit).into_owned()),
            _ => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
