//! Upload ingestion pipeline.
//!
//! Coordinates the flow for one upload: size checks → text extraction (word
//! packages only) → line preparation → normalization → header validation →
//! scrubbing → one file written to the clan's `input` directory.
//!
//! Nothing here is shared between uploads except the compiled patterns held
//! by [`Ingestor`], which are read-only.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::extract::{self, ExtractError};
use crate::models::{RawUpload, TurnId, UnitId, UploadFormat, YearBounds};
use crate::normalize::{self, Normalizer};
use crate::scrub::Scrubber;
use crate::sections::{self, ScrubbedMeta};
use crate::validate::{ValidationError, Validator};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("the uploaded file is empty")]
    Empty,
    #[error("the uploaded file is {size} bytes, which exceeds the limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("we could not find any report sections in the report text")]
    NothingRecognized,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("your account has not been set up correctly: {0}")]
    AccountSetup(String),
    #[error("extracting report text: {0}")]
    Extract(#[from] ExtractError),
    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    /// True when the message should be shown to the uploader as-is.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, IngestError::Extract(_) | IngestError::Write { .. })
    }

    /// Short reference for an internal failure, the last eight characters
    /// of a fresh v4 uuid. `None` for user-facing errors.
    pub fn incident_id(&self) -> Option<String> {
        if self.is_user_facing() {
            return None;
        }
        let id = Uuid::new_v4().to_string();
        Some(id[id.len() - 8..].to_string())
    }

    /// Message for the uploader. Internal failures are logged with their
    /// incident id and only the id is handed back.
    pub fn user_message(&self) -> String {
        match self.incident_id() {
            None => self.to_string(),
            Some(incident) => {
                error!(incident = %incident, error = %self, "upload failed");
                format!("the upload failed because of a server error. Please report error {incident:?}")
            }
        }
    }
}

/// Which file an upload produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputVariant {
    /// `YYYY-MM.CCCC.report.txt`, the file the catalog lists.
    #[default]
    Report,
    /// `YYYY-MM.CCCC.scrubbed.txt`, sections with a comment preamble.
    Scrubbed,
    /// `YYYY-MM.CCCC.docx-to-text.txt`, every prepared line kept.
    DocxToText,
}

impl OutputVariant {
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputVariant::Report => "report.txt",
            OutputVariant::Scrubbed => "scrubbed.txt",
            OutputVariant::DocxToText => "docx-to-text.txt",
        }
    }
}

/// Per-upload choices made by the caller.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub variant: OutputVariant,
    /// Name the file was uploaded under; checked against the header when set.
    pub upload_name: Option<String>,
    /// Keep every line of a plain-text upload.
    pub keep_all_lines: bool,
    pub submitted_by: String,
    pub submitted_at: NaiveDateTime,
}

/// A report whose header lines passed validation.
#[derive(Debug, Clone)]
pub struct CheckedReport {
    pub lines: Vec<Vec<u8>>,
    pub unit: UnitId,
    pub turn: TurnId,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub unit: UnitId,
    pub turn: TurnId,
    pub clan: String,
    pub path: PathBuf,
    pub lines: usize,
}

/// Compiled patterns plus ingest settings. Build once, share across uploads.
#[derive(Debug, Clone)]
pub struct Ingestor {
    normalizer: Normalizer,
    validator: Validator,
    scrubber: Scrubber,
    settings: IngestConfig,
    upload_bounds: YearBounds,
}

impl Ingestor {
    pub fn new(settings: IngestConfig, upload_bounds: YearBounds) -> Self {
        Self {
            normalizer: Normalizer::new(),
            validator: Validator::new(),
            scrubber: Scrubber::new(),
            settings,
            upload_bounds,
        }
    }

    pub fn scrubber(&self) -> &Scrubber {
        &self.scrubber
    }

    /// Turn raw upload bytes into normalized lines with no blank lines at
    /// either end.
    pub fn prepare(&self, upload: &RawUpload) -> Result<Vec<Vec<u8>>, IngestError> {
        let size = upload.bytes.len();
        if size == 0 {
            return Err(IngestError::Empty);
        }
        if size > self.settings.max_upload_bytes {
            return Err(IngestError::TooLarge {
                size,
                limit: self.settings.max_upload_bytes,
            });
        }

        let raw = match upload.format {
            UploadFormat::WordPackage => extract::extract_lines(&upload.bytes)?
                .into_iter()
                .map(String::into_bytes)
                .collect(),
            UploadFormat::PlainText if self.settings.replace_invalid_utf8 => {
                normalize::split_text_lines(normalize::replace_invalid_utf8(&upload.bytes).as_bytes())
            }
            UploadFormat::PlainText => normalize::split_text_lines(&upload.bytes),
        };
        let raw = normalize::trim_blank_lines(raw);
        let lines = normalize::trim_blank_lines(self.normalizer.normalize_lines(&raw));
        debug!(
            format = upload.format.as_str(),
            raw = raw.len(),
            lines = lines.len(),
            "prepared upload text"
        );
        if lines.is_empty() {
            return Err(IngestError::Empty);
        }
        Ok(lines)
    }

    /// Prepare an upload and validate its first two lines.
    pub fn check(&self, upload: &RawUpload) -> Result<CheckedReport, IngestError> {
        let lines = self.prepare(upload)?;
        let (unit, turn) = self
            .validator
            .validate(&lines, self.upload_bounds)
            .inspect_err(|e| warn!(error = %e, "report header rejected"))?;
        Ok(CheckedReport { lines, unit, turn })
    }

    /// Run the whole pipeline and write the resulting file under
    /// `<clan_root>/input`.
    pub fn ingest(
        &self,
        upload: &RawUpload,
        request: &IngestRequest,
        clan_root: &Path,
    ) -> Result<IngestOutcome, IngestError> {
        info!(
            bytes = upload.bytes.len(),
            format = upload.format.as_str(),
            submitted_by = %request.submitted_by,
            "upload received"
        );
        let input_dir = clan_root.join("input");
        match std::fs::metadata(&input_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(IngestError::AccountSetup(
                    "your input directory is not a folder".to_string(),
                ))
            }
            Err(_) => {
                return Err(IngestError::AccountSetup(
                    "your input directory is missing".to_string(),
                ))
            }
        }

        let CheckedReport { lines, unit, turn } = self.check(upload)?;
        let clan = match unit.clan_id() {
            Some(clan) => clan,
            None => {
                return Err(ValidationError::Range {
                    field: "clan",
                    value: 0,
                    min: 1,
                    max: 999,
                }
                .into())
            }
        };

        if let Some(name) = &request.upload_name {
            let parsed = self.validator.parse_upload_name(name, self.upload_bounds)?;
            parsed.check_against(&unit, turn)?;
        }

        let scrub = match (request.variant, upload.format) {
            (OutputVariant::DocxToText, _) => false,
            (_, UploadFormat::WordPackage) => true,
            (_, UploadFormat::PlainText) => {
                self.settings.remove_sensitive_lines && !request.keep_all_lines
            }
        };
        let kept = if scrub {
            self.scrubber.scrub(&lines)
        } else {
            lines
        };
        if kept.is_empty() {
            return Err(IngestError::NothingRecognized);
        }

        let body = match request.variant {
            OutputVariant::Report | OutputVariant::DocxToText => join_lines(&kept),
            OutputVariant::Scrubbed => {
                let report_sections = sections::split_sections(&self.scrubber, &kept);
                if report_sections.is_empty() {
                    return Err(IngestError::NothingRecognized);
                }
                let extension = match upload.format {
                    UploadFormat::WordPackage => "docx",
                    UploadFormat::PlainText => "txt",
                };
                let meta = ScrubbedMeta {
                    file_name: format!("{turn}.{clan}.report.{extension}"),
                    format: upload.format,
                    submitted_by: request.submitted_by.clone(),
                    submitted_at: request.submitted_at,
                    version: env!("CARGO_PKG_VERSION").to_string(),
                };
                sections::render_scrubbed(&report_sections, &meta)
            }
        };

        let path = input_dir.join(format!("{turn}.{clan}.{}", request.variant.suffix()));
        std::fs::write(&path, &body).map_err(|source| IngestError::Write {
            path: path.clone(),
            source,
        })?;
        info!(
            path = %path.display(),
            unit = %unit,
            turn = %turn,
            lines = kept.len(),
            "report written"
        );

        Ok(IngestOutcome {
            unit,
            turn,
            clan,
            path,
            lines: kept.len(),
        })
    }
}

fn join_lines(lines: &[Vec<u8>]) -> Vec<u8> {
    let mut out = lines.join(&b'\n');
    out.push(b'\n');
    out
}
