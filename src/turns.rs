//! Per-turn views over a clan catalog, as shown on the dashboard.
//!
//! The catalog lists files oldest first. Turn groups go the other way: the
//! most recent turn comes first, and clans within a turn ascend.

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::TimeZone;
use serde::Serialize;

use crate::models::{ClanFileCatalog, FileInfo, FileKind, TurnId};

/// Files of one turn for one clan, each list in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnFiles {
    pub turn: TurnId,
    pub clan: String,
    pub reports: Vec<FileInfo>,
    pub maps: Vec<FileInfo>,
    pub errors: Vec<FileInfo>,
    pub logs: Vec<FileInfo>,
    pub is_empty: bool,
}

impl TurnFiles {
    fn new(turn: TurnId, clan: String) -> Self {
        Self {
            turn,
            clan,
            reports: Vec::new(),
            maps: Vec::new(),
            errors: Vec::new(),
            logs: Vec::new(),
            is_empty: true,
        }
    }

    fn push(&mut self, info: FileInfo) {
        let list = match info.kind {
            FileKind::Report => &mut self.reports,
            FileKind::Map => &mut self.maps,
            FileKind::ErrorLog => &mut self.errors,
            FileKind::Log => &mut self.logs,
        };
        list.push(info);
        self.is_empty = false;
    }

    /// Every file of the group in display order: reports, maps, error logs, logs.
    pub fn files(&self) -> impl Iterator<Item = &FileInfo> {
        self.reports
            .iter()
            .chain(&self.maps)
            .chain(&self.errors)
            .chain(&self.logs)
    }
}

/// Group every catalog entry by turn and clan, most recent turn first.
pub fn group_by_turn<Tz>(catalog: &ClanFileCatalog, tz: &Tz) -> Vec<TurnFiles>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut groups: BTreeMap<(TurnId, String), TurnFiles> = BTreeMap::new();
    for kind in FileKind::ALL {
        for entry in catalog.entries(kind) {
            groups
                .entry((entry.turn, entry.clan.clone()))
                .or_insert_with(|| TurnFiles::new(entry.turn, entry.clan.clone()))
                .push(entry.file_info(tz));
        }
    }

    let mut turns: Vec<TurnFiles> = groups.into_values().collect();
    turns.sort_by(|a, b| b.turn.cmp(&a.turn).then_with(|| a.clan.cmp(&b.clan)));
    turns
}

/// All files of a single turn, labelled with the owning clan. The result is
/// empty, not an error, when nothing is left for the turn.
pub fn turn_files<Tz>(catalog: &ClanFileCatalog, turn: TurnId, owner: &str, tz: &Tz) -> TurnFiles
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut files = TurnFiles::new(turn, owner.to_string());
    for entry in catalog.iter().filter(|e| e.turn == turn) {
        files.push(entry.file_info(tz));
    }
    files
}
