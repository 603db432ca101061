use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

use crate::{FileId, FileRecord};

/// Earliest year accepted as a real capture date.
pub const MIN_REASONABLE_YEAR: i32 = 1900;

/// How far past the reference year a date may lie before it is treated as bogus.
pub const FUTURE_YEAR_TOLERANCE: i32 = 10;

/// Parses the date formats file stores commonly hand out.
///
/// Returns `None` for anything unparseable; such dates never qualify as effective dates.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y:%m:%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn is_reasonable_date(date: &DateTime<Utc>, reference_year: i32) -> bool {
    let year = date.year();
    (MIN_REASONABLE_YEAR..=reference_year.saturating_add(FUTURE_YEAR_TOLERANCE)).contains(&year)
}

/// Resolves the effective date of a record: the first reasonable value of
/// `date_created → date_modified → date_added`.
pub fn resolve_effective_date(record: &FileRecord, reference_year: i32) -> Option<DateTime<Utc>> {
    [record.date_created, record.date_modified, record.date_added]
        .into_iter()
        .flatten()
        .find(|d| is_reasonable_date(d, reference_year))
}

type DateFingerprint = [Option<DateTime<Utc>>; 3];

fn fingerprint(record: &FileRecord) -> DateFingerprint {
    [record.date_created, record.date_modified, record.date_added]
}

#[derive(Clone, Debug)]
struct CachedDate {
    fingerprint: DateFingerprint,
    resolved: Option<DateTime<Utc>>,
}

/// Per-file cache of resolved effective dates.
///
/// Entries are keyed by file id and validated against the record's raw dates, so a record whose
/// dates changed is resolved again instead of serving a stale value.
#[derive(Clone, Debug, Default)]
pub struct DateCache {
    reference_year: Option<i32>,
    entries: HashMap<FileId, CachedDate>,
    hits: u64,
    misses: u64,
}

impl DateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, record: &FileRecord, reference_year: i32) -> Option<DateTime<Utc>> {
        if self.reference_year != Some(reference_year) {
            self.entries.clear();
            self.reference_year = Some(reference_year);
        }

        let fp = fingerprint(record);
        if let Some(cached) = self.entries.get(&record.id) {
            if cached.fingerprint == fp {
                self.hits += 1;
                return cached.resolved;
            }
        }

        self.misses += 1;
        let resolved = resolve_effective_date(record, reference_year);
        self.entries.insert(
            record.id,
            CachedDate {
                fingerprint: fp,
                resolved,
            },
        );
        resolved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drops entries for files that are no longer part of the working set.
    pub fn retain_ids(&mut self, mut keep: impl FnMut(FileId) -> bool) {
        self.entries.retain(|id, _| keep(*id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
