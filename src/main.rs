//! # Turn Intake CLI (`intake`)
//!
//! Drives the upload pipeline and the clan file catalog from the command
//! line, against a storage root holding one data directory per clan.
//!
//! ## Usage
//!
//! ```bash
//! intake --config ./config/intake.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `intake ingest --clan <id> <file>` | Store an uploaded report for a clan |
//! | `intake check <file>` | Validate a report without storing it |
//! | `intake catalog --clan <id>` | List a clan's reports, maps and logs |
//! | `intake turns --clan <id>` | Group a clan's files by turn, newest first |
//! | `intake delete --clan <id> <name>` | Delete one catalog file |
//! | `intake units <file>` | List the units in a stored report |

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use turn_intake::catalog::Catalog;
use turn_intake::config::{self, Config, LoggingConfig};
use turn_intake::ingest::{IngestRequest, Ingestor, OutputVariant};
use turn_intake::models::{FileInfo, FileKind, RawUpload, TurnId, UploadFormat};
use turn_intake::normalize;
use turn_intake::scrub::Scrubber;
use turn_intake::sections;
use turn_intake::turns;

/// Turn Intake CLI: store player turn reports and list clan files.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/intake.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "intake",
    about = "Turn-report ingestion pipeline and clan file catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/intake.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an uploaded turn report in a clan's input directory.
    ///
    /// `.docx` files are read as word-processor packages, anything else as
    /// plain text. Word packages are always scrubbed.
    Ingest {
        /// Clan id owning the data directory, e.g. `0987`.
        #[arg(long)]
        clan: String,

        /// Report file to upload.
        file: PathBuf,

        /// Name the file was uploaded under (`YEAR-MONTH.CLAN.report.EXT`).
        /// Checked against the report header when given.
        #[arg(long)]
        name: Option<String>,

        /// Which file to produce.
        #[arg(long, value_enum, default_value_t = VariantArg::Report)]
        variant: VariantArg,

        /// Keep every line of a plain-text report.
        #[arg(long)]
        keep_all_lines: bool,
    },

    /// Validate a report and print its unit and turn.
    Check {
        /// Report file to check.
        file: PathBuf,
    },

    /// List a clan's reports, maps, logs and error logs.
    Catalog {
        #[arg(long)]
        clan: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Group a clan's files by turn, most recent first.
    Turns {
        #[arg(long)]
        clan: String,

        /// Only show this turn (`YYYY-MM`).
        #[arg(long)]
        turn: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Delete one report, map or log file.
    Delete {
        #[arg(long)]
        clan: String,

        /// File name as listed by `catalog`.
        name: String,
    },

    /// List the unit ids found in a report.
    Units {
        /// Report file to read.
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    Report,
    Scrubbed,
    DocxToText,
}

impl From<VariantArg> for OutputVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Report => OutputVariant::Report,
            VariantArg::Scrubbed => OutputVariant::Scrubbed,
            VariantArg::DocxToText => OutputVariant::DocxToText,
        }
    }
}

#[derive(Serialize)]
struct CatalogListing {
    reports: Vec<FileInfo>,
    maps: Vec<FileInfo>,
    error_logs: Vec<FileInfo>,
    logs: Vec<FileInfo>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    init_logging(&cfg.logging)?;

    match cli.command {
        Commands::Ingest {
            clan,
            file,
            name,
            variant,
            keep_all_lines,
        } => {
            let clan_root = clan_root(&cfg, &clan)?;
            let upload = read_upload(&file, name.as_deref())?;
            let request = IngestRequest {
                variant: variant.into(),
                upload_name: name,
                keep_all_lines,
                submitted_by: clan,
                submitted_at: Local::now().naive_local(),
            };
            let ingestor = Ingestor::new(cfg.ingest.clone(), cfg.bounds.upload);
            match ingestor.ingest(&upload, &request, &clan_root) {
                Ok(outcome) => {
                    println!("{}", outcome.path.display());
                    println!("unit {} turn {} clan {}", outcome.unit, outcome.turn, outcome.clan);
                }
                Err(e) => bail!("upload failed: {}", e.user_message()),
            }
        }
        Commands::Check { file } => {
            let upload = read_upload(&file, None)?;
            let ingestor = Ingestor::new(cfg.ingest.clone(), cfg.bounds.upload);
            match ingestor.check(&upload) {
                Ok(report) => println!("{} {}", report.unit, report.turn),
                Err(e) => bail!("{}", e.user_message()),
            }
        }
        Commands::Catalog { clan, json } => {
            let root = clan_root(&cfg, &clan)?;
            let files = Catalog::new(cfg.bounds.catalog, cfg.bounds.report_id).scan(&root)?;
            let info = |kind: FileKind| -> Vec<FileInfo> {
                files
                    .entries(kind)
                    .iter()
                    .map(|e| e.file_info(&Local))
                    .collect()
            };
            let listing = CatalogListing {
                reports: info(FileKind::Report),
                maps: info(FileKind::Map),
                error_logs: info(FileKind::ErrorLog),
                logs: info(FileKind::Log),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for (label, list) in [
                    ("reports", &listing.reports),
                    ("maps", &listing.maps),
                    ("errors", &listing.error_logs),
                    ("logs", &listing.logs),
                ] {
                    println!("{} ({})", label, list.len());
                    for f in list {
                        println!("  {}  {} {}", f.name, f.date, f.time);
                    }
                }
            }
        }
        Commands::Turns { clan, turn, json } => {
            let root = clan_root(&cfg, &clan)?;
            let files = Catalog::new(cfg.bounds.catalog, cfg.bounds.report_id).scan(&root)?;
            let groups = match turn {
                Some(t) => {
                    let turn = TurnId::parse(&t)
                        .with_context(|| format!("invalid turn {:?}, expected YYYY-MM", t))?;
                    vec![turns::turn_files(&files, turn, &clan, &Local)]
                }
                None => turns::group_by_turn(&files, &Local),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else {
                for group in &groups {
                    if group.is_empty {
                        println!("{} {}: no files", group.turn, group.clan);
                        continue;
                    }
                    println!("{} {}", group.turn, group.clan);
                    for f in group.files() {
                        println!("  {:<10} {}", kind_label(f.kind), f.name);
                    }
                }
            }
        }
        Commands::Delete { clan, name } => {
            let root = clan_root(&cfg, &clan)?;
            let removed = Catalog::new(cfg.bounds.catalog, cfg.bounds.report_id)
                .delete(&root, &name)?;
            println!("deleted {}", removed.display());
        }
        Commands::Units { file } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let lines = normalize::split_text_lines(&data);
            for unit in sections::unit_ids(&Scrubber::new(), &lines) {
                println!("{}", unit);
            }
        }
    }

    Ok(())
}

/// Build the global subscriber. `RUST_LOG` wins over the configured filter.
/// Logs go to stderr so command output stays parseable.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .context("Failed to create log filter")?;

    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

/// Data root of a clan. Clan ids are four digits, which also keeps the
/// path inside the storage root.
fn clan_root(cfg: &Config, clan: &str) -> Result<PathBuf> {
    if clan.len() != 4 || !clan.bytes().all(|b| b.is_ascii_digit()) {
        bail!("invalid clan id {:?}, expected four digits", clan);
    }
    Ok(cfg.storage.clan_root(clan))
}

fn read_upload(file: &Path, name: Option<&str>) -> Result<RawUpload> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let declared = name
        .map(str::to_string)
        .or_else(|| file.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();
    Ok(RawUpload::new(bytes, UploadFormat::from_file_name(&declared)))
}

fn kind_label(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Report => "report",
        FileKind::Map => "map",
        FileKind::ErrorLog => "error",
        FileKind::Log => "log",
    }
}
