//! Classifier for ghettoVCB log output.
//!
//! Only lines carrying the script's `YYYY-MM-DD HH:MM:SS -- <level>: ` prefix
//! are considered. A log without a final-status banner is a failed backup.

use std::collections::BTreeMap;
use std::fmt;

pub const SUCCESS_STATUS: &str = "All VMs backed up OK!";
pub const BACKUP_DIR_NAMING_KEY: &str = "VM_BACKUP_DIR_NAMING_CONVENTION";

const CONFIG_PREFIX: &str = "CONFIG - ";
const WARN_PREFIX: &str = "WARN: ";
const DURATION_PREFIX: &str = "Backup Duration: ";
const STATUS_PREFIX: &str = "###### Final status: ";
const STATUS_SUFFIX: &str = " ######";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupResult {
    pub config: BTreeMap<String, String>,
    pub warnings: Vec<String>,
    pub duration: Option<String>,
    pub final_status: bool,
}

impl BackupResult {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    pub fn backup_dir_naming(&self) -> Option<&str> {
        self.get(BACKUP_DIR_NAMING_KEY)
    }
}

impl fmt::Display for BackupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.config {
            writeln!(f, "\t{}: {}", key, value)?;
        }
        if let Some(duration) = &self.duration {
            writeln!(f, "\tBACKUP_DURATION: {}", duration)?;
        }
        for warning in &self.warnings {
            writeln!(f, "\tWARNING: {}", warning)?;
        }
        write!(f, "\tFINAL_STATUS: {}", self.final_status)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Config(&'a str, &'a str),
    Warning(&'a str),
    Duration(&'a str),
    FinalStatus(&'a str),
}

pub fn parse_report(raw: &str) -> BackupResult {
    let mut result = BackupResult::default();
    for line in raw.lines() {
        match classify(line) {
            Some(Line::Config(key, value)) => {
                result.config.insert(key.to_string(), value.to_string());
            }
            Some(Line::Warning(msg)) => result.warnings.push(msg.to_string()),
            Some(Line::Duration(value)) => result.duration = Some(value.to_string()),
            Some(Line::FinalStatus(status)) => result.final_status = status == SUCCESS_STATUS,
            None => {}
        }
    }
    result
}

fn classify(line: &str) -> Option<Line<'_>> {
    let body = strip_log_prefix(line.trim_end_matches('\r'))?;
    if let Some(rest) = body.strip_prefix(CONFIG_PREFIX) {
        let (key, value) = rest.split_once(" = ")?;
        if key.is_empty() || value.is_empty() || !key.chars().all(is_word_char) {
            return None;
        }
        return Some(Line::Config(key, value));
    }
    if let Some(msg) = body.strip_prefix(WARN_PREFIX) {
        return non_empty(msg).map(Line::Warning);
    }
    if let Some(value) = body.strip_prefix(DURATION_PREFIX) {
        return non_empty(value).map(Line::Duration);
    }
    if let Some(rest) = body.strip_prefix(STATUS_PREFIX) {
        let end = rest.rfind(STATUS_SUFFIX)?;
        return non_empty(&rest[..end]).map(Line::FinalStatus);
    }
    None
}

/// Returns what follows `YYYY-MM-DD HH:MM:SS -- <level>: `.
fn strip_log_prefix(line: &str) -> Option<&str> {
    let (stamp, rest) = line.split_once(" -- ")?;
    if !is_log_timestamp(stamp) {
        return None;
    }
    let (level, body) = rest.split_once(": ")?;
    if level.is_empty() || !level.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(body)
}

fn is_log_timestamp(stamp: &str) -> bool {
    let bytes = stamp.as_bytes();
    bytes.len() == 19
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 | 16 => *b == b':',
            _ => b.is_ascii_digit(),
        })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
