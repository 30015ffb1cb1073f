//! # Turn Intake
//!
//! Ingestion pipeline and clan file catalog for play-by-mail turn reports.
//!
//! Players upload their turn report either as a word-processor package or
//! as plain text. The pipeline pulls the text out, repairs what extraction
//! broke, checks the unit and turn headers, drops every line mapping does
//! not need, and stores one canonical report per clan and turn. The catalog
//! then lists the reports, maps and render logs a clan has on disk.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌─────────┐   ┌───────────┐
//! │ .docx /  │──▶│  extract  │──▶│normalize │──▶│validate │──▶│   scrub   │
//! │  .txt    │   │ (zip+xml) │   │ (regex)  │   │ headers │   │           │
//! └──────────┘   └───────────┘   └──────────┘   └─────────┘   └─────┬─────┘
//!                                                                   ▼
//!                     ┌───────────┐   ┌──────────┐          <clan>/input/
//!                     │   turns   │◀──│ catalog  │◀──────── YYYY-MM.CCCC.*
//!                     └───────────┘   └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Paragraph text from word-processor packages |
//! | [`normalize`] | Line repair and text preparation |
//! | [`validate`] | Unit/turn header and upload-name checks |
//! | [`scrub`] | Mapping-relevant line filter |
//! | [`sections`] | Unit sections and the scrubbed-file layout |
//! | [`ingest`] | Upload pipeline orchestration |
//! | [`catalog`] | Clan file listing and deletes |
//! | [`turns`] | Per-turn dashboard grouping |

pub mod catalog;
pub mod config;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod normalize;
mod patterns;
pub mod scrub;
pub mod sections;
pub mod turns;
pub mod validate;
