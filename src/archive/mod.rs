use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{ConfigError, Result, VaultError};
use crate::types::RunMode;

pub mod name;

pub use name::ArchiveName;

/// Local directory of downloaded `<vm>-<timestamp>.tar.gz` archives.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    dir: PathBuf,
}

impl ArchiveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Every `*.tar.gz` file directly inside the archive directory.
    pub fn list_archives(&self) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        if !self.dir.exists() {
            return Ok(out);
        }
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                VaultError::message(format!("read {}: {}", self.dir.display(), e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry
                .file_name()
                .to_string_lossy()
                .ends_with(name::ARCHIVE_SUFFIX)
            {
                out.push(entry.into_path());
            }
        }
        out.sort();
        Ok(out)
    }

    /// Archives of exactly `vm`, oldest first.
    pub fn list_archives_for_vm(&self, vm: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .list_archives()?
            .into_iter()
            .filter(|path| parse_path(path).is_some_and(|name| name.vm == vm))
            .collect())
    }

    pub fn latest_archive_per_vm(&self) -> Result<BTreeMap<String, NaiveDateTime>> {
        Ok(latest_per_vm(self.list_archives()?.iter()))
    }

    /// Deletes all but the newest `rotation_count` archives of `vm`.
    pub fn trim(&self, vm: &str, rotation_count: usize, run_mode: RunMode) -> Result<Vec<PathBuf>> {
        if rotation_count == 0 {
            return Err(ConfigError::Invalid(format!(
                "vm {}: rotationCount must be at least 1",
                vm
            ))
            .into());
        }
        let archives = self.list_archives_for_vm(vm)?;
        if archives.len() <= rotation_count {
            debug!(vm, count = archives.len(), rotation_count, "nothing to trim");
            return Ok(Vec::new());
        }
        let to_delete = archives.len() - rotation_count;
        let mut deleted = Vec::new();
        for path in archives.into_iter().take(to_delete) {
            if run_mode.dry_run {
                info!("dry-run: rm {}", path.display());
                continue;
            }
            if run_mode.safe_mode {
                info!("skip delete (safe-mode): {}", path.display());
                continue;
            }
            info!("deleting archive {}", path.display());
            fs::remove_file(&path)
                .map_err(|e| VaultError::message(format!("delete {}: {}", path.display(), e)))?;
            deleted.push(path);
        }
        Ok(deleted)
    }
}

fn parse_path(path: &Path) -> Option<ArchiveName> {
    ArchiveName::parse(path.file_name()?.to_str()?)
}

/// Latest timestamp per VM among well-formed archive paths.
pub fn latest_per_vm<'a, I>(paths: I) -> BTreeMap<String, NaiveDateTime>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let mut res: BTreeMap<String, NaiveDateTime> = BTreeMap::new();
    for path in paths {
        let Some(name) = parse_path(path) else {
            continue;
        };
        res.entry(name.vm)
            .and_modify(|ts| {
                if name.timestamp > *ts {
                    *ts = name.timestamp;
                }
            })
            .or_insert(name.timestamp);
    }
    res
}
