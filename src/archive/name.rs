use chrono::NaiveDateTime;

pub const ARCHIVE_SUFFIX: &str = ".tar.gz";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const TIMESTAMP_LEN: usize = 19;

/// `(vm, timestamp)` decoded from `<vm>-<YYYY-MM-DD_HH-MM-SS>.tar.gz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    pub vm: String,
    pub timestamp: NaiveDateTime,
}

impl ArchiveName {
    pub fn new(vm: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            vm: vm.into(),
            timestamp,
        }
    }

    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(ARCHIVE_SUFFIX)?;
        if stem.len() < TIMESTAMP_LEN + 2 || !stem.is_char_boundary(stem.len() - TIMESTAMP_LEN) {
            return None;
        }
        let (head, ts) = stem.split_at(stem.len() - TIMESTAMP_LEN);
        let vm = head.strip_suffix('-')?;
        if vm.is_empty() {
            return None;
        }
        let timestamp = parse_timestamp(ts)?;
        Some(Self::new(vm, timestamp))
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}-{}{}",
            self.vm,
            self.timestamp.format(TIMESTAMP_FORMAT),
            ARCHIVE_SUFFIX
        )
    }
}

/// Strict `YYYY-MM-DD_HH-MM-SS`; chrono alone would accept unpadded fields.
pub fn parse_timestamp(ts: &str) -> Option<NaiveDateTime> {
    let bytes = ts.as_bytes();
    if bytes.len() != TIMESTAMP_LEN {
        return None;
    }
    for (i, b) in bytes.iter().enumerate() {
        let ok = match i {
            4 | 7 | 13 | 16 => *b == b'-',
            10 => *b == b'_',
            _ => b.is_ascii_digit(),
        };
        if !ok {
            return None;
        }
    }
    NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn parse_vm_with_dashes() {
        let name = ArchiveName::parse("DummyVM-1-2013-03-31_11-23-45.tar.gz").unwrap();
        assert_eq!(name.vm, "DummyVM-1");
        assert_eq!(name.timestamp, at(2013, 3, 31, 11, 23, 45));
        assert_eq!(name.file_name(), "DummyVM-1-2013-03-31_11-23-45.tar.gz");
    }

    #[test]
    fn reject_malformed_names() {
        for bad in [
            "DummyVM-1-2013-03-31_11-23-45.tar",
            "DummyVM-1-2013-3-31_11-23-45.tar.gz",
            "DummyVM-1_2013-03-31_11-23-45.tar.gz",
            "-2013-03-31_11-23-45.tar.gz",
            "2013-03-31_11-23-45.tar.gz",
            "DummyVM-1-2013-02-30_11-23-45.tar.gz",
            "DummyVM-1-2013-03-31 11-23-45.tar.gz",
            "notes.tar.gz",
        ] {
            assert_eq!(ArchiveName::parse(bad), None, "{}", bad);
        }
    }

    #[test]
    fn file_name_order_matches_time_order() {
        let older = ArchiveName::new("vm", at(2013, 10, 1, 1, 23, 45)).file_name();
        let newer = ArchiveName::new("vm", at(2013, 12, 1, 1, 23, 45)).file_name();
        assert!(older < newer);
    }
}
