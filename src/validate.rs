//! Structural checks on the first two lines of a report, and on
//! dropbox-style upload names.
//!
//! A report must open with a unit header followed by the turn header:
//!
//! ```text
//! Tribe 0987, ,Current Hex = QQ 1234, (Previous Hex = QQ 1234)
//! Current Turn 899-12 (#0), Winter, FINE	Next Turn 900-01 (#1), 29/10/2023
//! ```
//!
//! Header errors carry the message shown to the uploader as-is, so they name
//! the expectation that failed and show what a good line looks like.

use regex::Regex;

use crate::models::{TurnId, UnitId, UnitKind, UploadFormat, YearBounds};
use crate::patterns::compile;

const UNIT_HEADER_EXAMPLE: &str =
    "\"Tribe 0987, ,Current Hex = QQ 1234, (Previous Hex = QQ 1234)\"";
const TURN_HEADER_EXAMPLE: &str =
    "\"Current Turn 899-12 (#0), Winter, FINE\tNext Turn 900-01 (#1), 29/10/2023\"";

/// Why a report or upload name was rejected. Both variants are meant for
/// the uploader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0}")]
    Header(String),
    #[error("{field} must be between {min} and {max}, found {value}")]
    Range {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

/// Turn, clan and format parsed from an upload named `YEAR-MONTH.CLAN.report.EXT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadName {
    pub turn: TurnId,
    pub clan: String,
    pub format: UploadFormat,
}

impl UploadName {
    /// `YYYY-MM.CCCC`, the stem shared by every file derived from the upload.
    pub fn report_id(&self) -> String {
        format!("{}.{}", self.turn, self.clan)
    }

    /// The name must agree with what the report itself says.
    pub fn check_against(&self, unit: &UnitId, turn: TurnId) -> Result<(), ValidationError> {
        if unit.clan_id().as_deref() == Some(self.clan.as_str()) && self.turn == turn {
            Ok(())
        } else {
            Err(ValidationError::Header(
                "file name does not match clan and turn from header".to_string(),
            ))
        }
    }
}

/// Compiled header and upload-name patterns.
#[derive(Debug, Clone)]
pub struct Validator {
    unit_prefixes: Vec<(UnitKind, Regex)>,
    turn_header: Regex,
    upload_name: Regex,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        let unit_prefixes = UnitKind::ALL
            .iter()
            .map(|kind| {
                let keyword = kind.keyword().to_ascii_lowercase();
                let pattern = match kind.suffix() {
                    Some(letter) => format!(r"^{keyword} (\d{{4}}{letter}\d),"),
                    None => format!(r"^{keyword} (\d{{4}}),"),
                };
                (*kind, compile(&pattern))
            })
            .collect();
        Self {
            unit_prefixes,
            turn_header: compile(r"^current turn\s+(\d+)-(\d+)"),
            upload_name: compile(r"^([0-9]+)-([0-9]+)\.([0-9]+)\.report\.(docx|txt)$"),
        }
    }

    /// Check the first two lines of a normalized report and return the unit
    /// that owns it and the turn it covers. Stops at the first failure.
    pub fn validate<L: AsRef<[u8]>>(
        &self,
        lines: &[L],
        bounds: YearBounds,
    ) -> Result<(UnitId, TurnId), ValidationError> {
        let [unit_line, turn_line, ..] = lines else {
            return Err(ValidationError::Header(
                "input file is missing the tribe and turn lines".to_string(),
            ));
        };
        let unit = self.check_unit_header(&String::from_utf8_lossy(unit_line.as_ref()))?;
        let turn = self.check_turn_header(&String::from_utf8_lossy(turn_line.as_ref()), bounds)?;
        Ok((unit, turn))
    }

    /// Unit header: one of the five unit prefixes, then exactly four
    /// comma-separated fields with the current and previous hex in the last two.
    pub fn check_unit_header(&self, line: &str) -> Result<UnitId, ValidationError> {
        let line = line.to_lowercase();

        let unit = self
            .match_unit_prefix(&line)
            .ok_or_else(|| header_error("first line is missing the unit"))?;

        let fields: Vec<&str> = line.split(',').collect();
        let (current_hex, previous_hex) = match fields.len() {
            4 => (fields[2].trim(), fields[3].trim()),
            1..=3 => return Err(header_error("first line is missing fields")),
            n => {
                return Err(ValidationError::Header(format!(
                    "first line contains too many fields. expected 4, found {n}"
                )))
            }
        };

        if !current_hex.starts_with("current hex = ") {
            return Err(header_error("first line is missing the current hex"));
        }
        if !previous_hex.starts_with("(previous hex = ") {
            return Err(header_error("first line is missing the previous hex"));
        }
        Ok(unit)
    }

    fn match_unit_prefix(&self, line: &str) -> Option<UnitId> {
        self.unit_prefixes.iter().find_map(|(kind, rx)| {
            let id = rx.captures(line)?.get(1)?.as_str();
            UnitId::parse(id).filter(|unit| unit.kind() == *kind)
        })
    }

    /// Turn header: `Current Turn YEAR-MONTH`, with the year checked against
    /// the caller's bounds and the month against 1..=12.
    pub fn check_turn_header(
        &self,
        line: &str,
        bounds: YearBounds,
    ) -> Result<TurnId, ValidationError> {
        let line = line.to_lowercase();
        let missing = || {
            ValidationError::Header(format!(
                "second line is missing Current Turn. expected it to look like {TURN_HEADER_EXAMPLE}"
            ))
        };
        let caps = self.turn_header.captures(&line).ok_or_else(missing)?;
        let year: u32 = caps[1].parse().map_err(|_| missing())?;
        let month: u32 = caps[2].parse().map_err(|_| missing())?;
        check_range("year", year, bounds.min_year, bounds.max_year)?;
        check_range("month", month, 1, 12)?;
        Ok(TurnId::new(year, month))
    }

    /// Parse a dropbox upload name such as `901-4.987.report.docx`. Three
    /// digit years and unpadded months and clans are accepted; the result
    /// is zero-padded.
    pub fn parse_upload_name(
        &self,
        name: &str,
        bounds: YearBounds,
    ) -> Result<UploadName, ValidationError> {
        let caps = self.upload_name.captures(name).ok_or_else(|| {
            ValidationError::Header(
                "file name must match YEAR-MONTH.CLAN.report and have an extension of .txt or .docx"
                    .to_string(),
            )
        })?;
        let numeric = |idx: usize, what: &str| {
            caps[idx].parse::<u32>().map_err(|_| {
                ValidationError::Header(format!("file name must include a numeric {what}"))
            })
        };
        let year = check_range("year", numeric(1, "YEAR")?, bounds.min_year, bounds.max_year)?;
        let month = check_range("month", numeric(2, "MONTH")?, 1, 12)?;
        let clan = check_range("clan", numeric(3, "CLAN")?, 1, 999)?;
        let format = match &caps[4] {
            "docx" => UploadFormat::WordPackage,
            _ => UploadFormat::PlainText,
        };
        Ok(UploadName {
            turn: TurnId::new(year, month),
            clan: format!("{clan:04}"),
            format,
        })
    }
}

/// Inclusive range check shared by every numeric field.
pub fn check_range(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<u32, ValidationError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::Range {
            field,
            value,
            min,
            max,
        })
    }
}

fn header_error(problem: &str) -> ValidationError {
    ValidationError::Header(format!(
        "{problem}. expected it to look like {UNIT_HEADER_EXAMPLE}"
    ))
}
