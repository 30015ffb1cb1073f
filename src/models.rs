//! Core data models used throughout the intake pipeline.
//!
//! These types represent the uploads, unit and turn identities, and catalog
//! entries that flow between extraction, validation, scrubbing and the file
//! catalog. All of them are request-local values; nothing here is shared or
//! cached between calls.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// Declared format of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadFormat {
    /// Zip-based word-processor package (`.docx`).
    WordPackage,
    /// Newline-delimited text.
    PlainText,
}

impl UploadFormat {
    /// Pick the format from an uploaded file name. Anything that is not a
    /// `.docx` package is treated as text.
    pub fn from_file_name(name: &str) -> Self {
        if name.to_ascii_lowercase().ends_with(".docx") {
            UploadFormat::WordPackage
        } else {
            UploadFormat::PlainText
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadFormat::WordPackage => "word-package",
            UploadFormat::PlainText => "plain-text",
        }
    }
}

/// Opaque upload bytes plus their declared format. Lives for one request.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub bytes: Vec<u8>,
    pub format: UploadFormat,
}

impl RawUpload {
    pub fn new(bytes: impl Into<Vec<u8>>, format: UploadFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }
}

/// The kind of unit named in a section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Tribe,
    Courier,
    Element,
    Fleet,
    Garrison,
}

impl UnitKind {
    /// Fixed order in which header prefixes are tried.
    pub const ALL: [UnitKind; 5] = [
        UnitKind::Tribe,
        UnitKind::Courier,
        UnitKind::Element,
        UnitKind::Fleet,
        UnitKind::Garrison,
    ];

    /// Header keyword as it appears in a report.
    pub fn keyword(&self) -> &'static str {
        match self {
            UnitKind::Tribe => "Tribe",
            UnitKind::Courier => "Courier",
            UnitKind::Element => "Element",
            UnitKind::Fleet => "Fleet",
            UnitKind::Garrison => "Garrison",
        }
    }

    /// Sub-unit suffix letter; tribes have none.
    pub fn suffix(&self) -> Option<char> {
        match self {
            UnitKind::Tribe => None,
            UnitKind::Courier => Some('c'),
            UnitKind::Element => Some('e'),
            UnitKind::Fleet => Some('f'),
            UnitKind::Garrison => Some('g'),
        }
    }

    fn from_suffix(ch: char) -> Option<UnitKind> {
        match ch.to_ascii_lowercase() {
            'c' => Some(UnitKind::Courier),
            'e' => Some(UnitKind::Element),
            'f' => Some(UnitKind::Fleet),
            'g' => Some(UnitKind::Garrison),
            _ => None,
        }
    }
}

/// A tribe number with an optional sub-unit suffix, e.g. `0987` or `0987c1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitId {
    tribe: String,
    kind: UnitKind,
    seq: Option<u8>,
}

impl UnitId {
    /// Parse `NNNN` or `NNNN[cefg]D`. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<UnitId> {
        let s = s.trim();
        let (tribe, rest) = (s.get(..4)?, s.get(4..)?);
        if !tribe.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mut chars = rest.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (None, _, _) => Some(UnitId {
                tribe: tribe.to_string(),
                kind: UnitKind::Tribe,
                seq: None,
            }),
            (Some(letter), Some(digit), None) if digit.is_ascii_digit() => Some(UnitId {
                tribe: tribe.to_string(),
                kind: UnitKind::from_suffix(letter)?,
                seq: digit.to_digit(10).map(|d| d as u8),
            }),
            _ => None,
        }
    }

    /// The four-digit tribe number.
    pub fn tribe(&self) -> &str {
        &self.tribe
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Clan owning this unit: `0` plus the last three digits of the tribe
    /// number. `None` when that would be clan 0, which is out of range.
    pub fn clan_id(&self) -> Option<String> {
        let clan = format!("0{}", &self.tribe[1..]);
        match clan.parse::<u32>() {
            Ok(n) if (1..=999).contains(&n) => Some(clan),
            _ => None,
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tribe)?;
        if let (Some(letter), Some(seq)) = (self.kind.suffix(), self.seq) {
            write!(f, "{}{}", letter, seq)?;
        }
        Ok(())
    }
}

impl Serialize for UnitId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One game month. Ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnId {
    pub year: u32,
    pub month: u32,
}

impl TurnId {
    pub fn new(year: u32, month: u32) -> Self {
        Self { year, month }
    }

    /// Parse a `YEAR-MONTH` pair of digit groups without range checks.
    pub fn parse(s: &str) -> Option<TurnId> {
        let (year, month) = s.split_once('-')?;
        if year.is_empty()
            || month.is_empty()
            || !year.bytes().all(|b| b.is_ascii_digit())
            || !month.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        Some(TurnId::new(year.parse().ok()?, month.parse().ok()?))
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for TurnId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inclusive year range accepted at one call site.
///
/// The call sites disagree on the upper bound and are kept separate on
/// purpose: uploads accept up to 1234, report ids up to 1380, and catalog
/// scans only 899..=999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct YearBounds {
    pub min_year: u32,
    pub max_year: u32,
}

impl YearBounds {
    pub const UPLOAD: YearBounds = YearBounds {
        min_year: 899,
        max_year: 1234,
    };
    pub const REPORT_ID: YearBounds = YearBounds {
        min_year: 899,
        max_year: 1380,
    };
    pub const CATALOG: YearBounds = YearBounds {
        min_year: 899,
        max_year: 999,
    };

    pub fn contains(&self, year: u32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }
}

/// Kind of file tracked by the catalog. The declaration order is the display
/// order within a turn: reports, maps, error logs, logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    Report,
    Map,
    ErrorLog,
    Log,
}

impl FileKind {
    pub const ALL: [FileKind; 4] = [
        FileKind::Report,
        FileKind::Map,
        FileKind::ErrorLog,
        FileKind::Log,
    ];

    /// File name suffix after `YYYY-MM.CCCC`.
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Report => ".report.txt",
            FileKind::Map => ".wxx",
            FileKind::ErrorLog => ".err",
            FileKind::Log => ".log",
        }
    }

    /// Sub-directory of the clan data root holding this kind.
    pub fn directory(&self) -> &'static str {
        match self {
            FileKind::Report => "input",
            FileKind::Map => "output",
            FileKind::ErrorLog | FileKind::Log => "logs",
        }
    }

    /// Error and pass logs sort by file name after the clan.
    fn name_tiebreak(&self) -> bool {
        matches!(self, FileKind::ErrorLog | FileKind::Log)
    }
}

/// One file discovered by a catalog scan. Identity is the file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub turn: TurnId,
    pub clan: String,
    pub kind: FileKind,
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

impl CatalogEntry {
    /// Catalog order: year, month, clan id (zero-padded, so lexicographic is
    /// numeric), then file name for logs and error logs.
    pub fn catalog_cmp(&self, other: &CatalogEntry) -> Ordering {
        let order = self
            .turn
            .cmp(&other.turn)
            .then_with(|| self.clan.cmp(&other.clan));
        if self.kind.name_tiebreak() {
            order.then_with(|| self.name.cmp(&other.name))
        } else {
            order
        }
    }

    /// Presentation record with the timestamp rendered in `tz`.
    pub fn file_info<Tz>(&self, tz: &Tz) -> FileInfo
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let local = self.modified.with_timezone(tz);
        FileInfo {
            name: self.name.clone(),
            turn: self.turn.to_string(),
            clan: self.clan.clone(),
            kind: self.kind,
            date: local.format("%Y-%m-%d").to_string(),
            time: local.format("%H:%M:%S").to_string(),
            path: self.path.display().to_string(),
        }
    }
}

/// Displayable view of a [`CatalogEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub turn: String,
    pub clan: String,
    pub kind: FileKind,
    pub date: String,
    pub time: String,
    pub path: String,
}

/// The four independently sorted listings for one clan.
#[derive(Debug, Clone, Default)]
pub struct ClanFileCatalog {
    pub reports: Vec<CatalogEntry>,
    pub maps: Vec<CatalogEntry>,
    pub logs: Vec<CatalogEntry>,
    pub error_logs: Vec<CatalogEntry>,
}

impl ClanFileCatalog {
    pub fn entries(&self, kind: FileKind) -> &[CatalogEntry] {
        match kind {
            FileKind::Report => &self.reports,
            FileKind::Map => &self.maps,
            FileKind::Log => &self.logs,
            FileKind::ErrorLog => &self.error_logs,
        }
    }

    pub(crate) fn entries_mut(&mut self, kind: FileKind) -> &mut Vec<CatalogEntry> {
        match kind {
            FileKind::Report => &mut self.reports,
            FileKind::Map => &mut self.maps,
            FileKind::Log => &mut self.logs,
            FileKind::ErrorLog => &mut self.error_logs,
        }
    }

    /// All entries, list by list.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        FileKind::ALL
            .into_iter()
            .flat_map(move |kind| self.entries(kind).iter())
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.reports.len() + self.maps.len() + self.logs.len() + self.error_logs.len()
    }
}
