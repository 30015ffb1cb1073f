//! Clan file catalog.
//!
//! Each clan has a data root with three directories: `input` holds turn
//! reports, `output` holds maps, and `logs` holds the render logs of passing
//! (`.log`) and failing (`.err`) runs. Every file of interest is named
//! `YYYY-MM.CCCC.<ext>`; anything else in those directories is ignored.
//!
//! Scans are read-only. An entry that vanishes between listing and stat is
//! skipped, while a directory that cannot be listed fails the scan.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::models::{CatalogEntry, ClanFileCatalog, FileKind, TurnId, YearBounds};
use crate::patterns::compile;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0:?} is not a catalog file name")]
    InvalidName(String),
}

/// A file name the catalog understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogName {
    pub kind: FileKind,
    pub turn: TurnId,
    pub clan: String,
}

/// File-name patterns plus the year bounds for scans and deletes.
#[derive(Debug, Clone)]
pub struct Catalog {
    patterns: Vec<(FileKind, Regex)>,
    scan_bounds: YearBounds,
    delete_bounds: YearBounds,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(YearBounds::CATALOG, YearBounds::REPORT_ID)
    }
}

impl Catalog {
    pub fn new(scan_bounds: YearBounds, delete_bounds: YearBounds) -> Self {
        let patterns = FileKind::ALL
            .iter()
            .map(|kind| {
                let pattern = format!(
                    r"^(\d{{4}})-(\d{{2}})\.(\d{{4}}){}$",
                    regex::escape(kind.extension())
                );
                (*kind, compile(&pattern))
            })
            .collect();
        Self {
            patterns,
            scan_bounds,
            delete_bounds,
        }
    }

    /// Match `name` against the four patterns and range-check its fields.
    pub fn parse_name(&self, name: &str, bounds: YearBounds) -> Option<CatalogName> {
        let (kind, caps) = self
            .patterns
            .iter()
            .find_map(|(kind, rx)| rx.captures(name).map(|caps| (*kind, caps)))?;
        let year: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let clan: u32 = caps[3].parse().ok()?;
        if !bounds.contains(year) || !(1..=12).contains(&month) || !(1..=999).contains(&clan) {
            debug!(name, "catalog name out of range");
            return None;
        }
        Some(CatalogName {
            kind,
            turn: TurnId::new(year, month),
            clan: caps[3].to_string(),
        })
    }

    /// List every report, map, log and error log under a clan data root.
    /// Each list is sorted independently in catalog order.
    pub fn scan(&self, data_root: &Path) -> Result<ClanFileCatalog, CatalogError> {
        let mut catalog = ClanFileCatalog::default();

        for dir in [FileKind::Report, FileKind::Map, FileKind::Log].map(|k| k.directory()) {
            let path = data_root.join(dir);
            for entry in self.scan_dir(&path)? {
                catalog.entries_mut(entry.kind).push(entry);
            }
        }

        for kind in FileKind::ALL {
            catalog
                .entries_mut(kind)
                .sort_by(|a, b| a.catalog_cmp(b));
        }

        info!(
            root = %data_root.display(),
            reports = catalog.reports.len(),
            maps = catalog.maps.len(),
            logs = catalog.logs.len(),
            errors = catalog.error_logs.len(),
            "scanned clan files"
        );
        Ok(catalog)
    }

    /// Entries of one directory whose kind lives there. Unrelated names,
    /// sub-directories and entries that fail to stat are skipped.
    fn scan_dir(&self, dir: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(CatalogError::Io {
                        path: dir.to_path_buf(),
                        source: e.into(),
                    })
                }
                Err(e) => {
                    debug!(error = %e, "skipping unreadable catalog entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(parsed) = self.parse_name(name, self.scan_bounds) else {
                continue;
            };
            if parsed.kind.directory() != dir_name(dir) {
                continue;
            }
            let modified = match entry.metadata().map(|m| m.modified()) {
                Ok(Ok(time)) => DateTime::<Utc>::from(time),
                Ok(Err(e)) => {
                    debug!(name, error = %e, "no modification time, skipping");
                    continue;
                }
                Err(e) => {
                    debug!(name, error = %e, "stat failed, skipping");
                    continue;
                }
            };
            entries.push(CatalogEntry {
                name: name.to_string(),
                turn: parsed.turn,
                clan: parsed.clan,
                kind: parsed.kind,
                path: entry.path().to_path_buf(),
                modified,
            });
        }

        Ok(entries)
    }

    /// Distinct clan ids of the report files in `dir`, sorted.
    pub fn clans(&self, dir: &Path) -> Result<Vec<String>, CatalogError> {
        let mut clans = BTreeSet::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(CatalogError::Io {
                        path: dir.to_path_buf(),
                        source: e.into(),
                    })
                }
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let parsed = entry
                .file_name()
                .to_str()
                .and_then(|name| self.parse_name(name, self.scan_bounds));
            if let Some(CatalogName {
                kind: FileKind::Report,
                clan,
                ..
            }) = parsed
            {
                clans.insert(clan);
            }
        }
        Ok(clans.into_iter().collect())
    }

    /// Remove one catalog file from the directory its kind lives in.
    /// Returns the removed path.
    pub fn delete(&self, data_root: &Path, name: &str) -> Result<PathBuf, CatalogError> {
        let parsed = self
            .parse_name(name, self.delete_bounds)
            .ok_or_else(|| CatalogError::InvalidName(name.to_string()))?;
        let path = data_root.join(parsed.kind.directory()).join(name);
        std::fs::remove_file(&path).map_err(|source| CatalogError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), kind = ?parsed.kind, "deleted clan file");
        Ok(path)
    }
}

fn dir_name(dir: &Path) -> &str {
    dir.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn clan_root() -> TempDir {
        let tmp = TempDir::new().unwrap();
        for dir in ["input", "output", "logs"] {
            std::fs::create_dir(tmp.path().join(dir)).unwrap();
        }
        tmp
    }

    fn touch(root: &Path, dir: &str, name: &str) {
        std::fs::write(root.join(dir).join(name), b"x").unwrap();
    }

    fn names(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn scan_sorts_each_list() {
        let tmp = clan_root();
        let root = tmp.path();
        touch(root, "input", "0901-04.0987.report.txt");
        touch(root, "input", "0900-12.0988.report.txt");
        touch(root, "input", "0900-12.0987.report.txt");
        touch(root, "output", "0900-12.0987.wxx");
        touch(root, "logs", "0900-12.0987.log");
        touch(root, "logs", "0900-12.0987.err");

        let catalog = Catalog::default().scan(root).unwrap();
        assert_eq!(
            names(&catalog.reports),
            vec![
                "0900-12.0987.report.txt",
                "0900-12.0988.report.txt",
                "0901-04.0987.report.txt"
            ]
        );
        assert_eq!(names(&catalog.maps), vec!["0900-12.0987.wxx"]);
        assert_eq!(names(&catalog.logs), vec!["0900-12.0987.log"]);
        assert_eq!(names(&catalog.error_logs), vec!["0900-12.0987.err"]);
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn scan_skips_malformed_and_out_of_range_names() {
        let tmp = clan_root();
        let root = tmp.path();
        touch(root, "input", "0899-01.0001.report.txt");
        touch(root, "input", "0898-01.0987.report.txt");
        touch(root, "input", "1000-01.0987.report.txt");
        touch(root, "input", "0900-13.0987.report.txt");
        touch(root, "input", "0900-00.0987.report.txt");
        touch(root, "input", "0900-01.0000.report.txt");
        touch(root, "input", "0900-01.0987.report.txt.bak");
        touch(root, "input", "notes.txt");
        touch(root, "input", "0900-01.0987.wxx");
        std::fs::create_dir(root.join("input").join("0900-02.0987.report.txt")).unwrap();

        let catalog = Catalog::default().scan(root).unwrap();
        assert_eq!(names(&catalog.reports), vec!["0899-01.0001.report.txt"]);
        assert!(catalog.maps.is_empty());
    }

    #[test]
    fn entries_carry_parsed_fields() {
        let tmp = clan_root();
        touch(tmp.path(), "output", "0950-07.0042.wxx");
        let catalog = Catalog::default().scan(tmp.path()).unwrap();
        let map = &catalog.maps[0];
        assert_eq!(map.turn, TurnId::new(950, 7));
        assert_eq!(map.clan, "0042");
        assert_eq!(map.kind, FileKind::Map);
        assert!(map.path.ends_with("output/0950-07.0042.wxx"));
        assert!(map.modified <= Utc::now());
    }

    #[test]
    fn missing_directory_is_io_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("input")).unwrap();
        let err = Catalog::default().scan(tmp.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn clans_are_distinct_and_sorted() {
        let tmp = TempDir::new().unwrap();
        for name in [
            "0900-01.0988.report.txt",
            "0900-01.0987.report.txt",
            "0900-02.0987.report.txt",
            "0900-01.0986.wxx",
        ] {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        let clans = Catalog::default().clans(tmp.path()).unwrap();
        assert_eq!(clans, vec!["0987", "0988"]);
    }

    #[test]
    fn delete_removes_file_from_its_directory() {
        let tmp = clan_root();
        touch(tmp.path(), "logs", "0900-12.0987.err");
        let catalog = Catalog::default();
        let removed = catalog.delete(tmp.path(), "0900-12.0987.err").unwrap();
        assert!(!removed.exists());
        assert!(catalog.scan(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn delete_uses_report_id_bounds() {
        let tmp = clan_root();
        touch(tmp.path(), "input", "1300-01.0987.report.txt");
        let catalog = Catalog::default();
        // outside scan bounds, so invisible to a scan but still deletable
        assert!(catalog.scan(tmp.path()).unwrap().reports.is_empty());
        assert!(catalog.delete(tmp.path(), "1300-01.0987.report.txt").is_ok());
    }

    #[test]
    fn delete_rejects_foreign_names() {
        let tmp = clan_root();
        let catalog = Catalog::default();
        assert!(matches!(
            catalog.delete(tmp.path(), "../secrets.txt"),
            Err(CatalogError::InvalidName(_))
        ));
        assert!(matches!(
            catalog.delete(tmp.path(), "0900-01.0987.wxx"),
            Err(CatalogError::Io { .. })
        ));
    }
}
