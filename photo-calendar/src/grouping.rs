use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, Month, Utc};

use crate::date::{DateCache, resolve_effective_date};
use crate::{CancellationToken, FileId, FileRecord, GroupId, GroupingError, MonthGroup, Photo};

/// Thresholds and chunk sizes used when picking a [`GroupingStrategy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GroupingOptions {
    /// Inputs up to this many files are grouped in one synchronous pass.
    pub sync_threshold: usize,
    /// Inputs up to this many files are grouped in batches; larger inputs are chunked.
    pub batched_threshold: usize,
    pub batch_size: usize,
    pub chunk_size: usize,
    /// Whether the chunked path reuses the per-file date cache.
    pub cache_dates: bool,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            sync_threshold: 1_000,
            batched_threshold: 10_000,
            batch_size: 500,
            chunk_size: 1_000,
            cache_dates: true,
        }
    }
}

impl GroupingOptions {
    pub fn with_sync_threshold(mut self, threshold: usize) -> Self {
        self.sync_threshold = threshold;
        self
    }

    pub fn with_batched_threshold(mut self, threshold: usize) -> Self {
        self.batched_threshold = threshold;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_cache_dates(mut self, cache_dates: bool) -> Self {
        self.cache_dates = cache_dates;
        self
    }
}

/// How a grouping run is decomposed. Every strategy produces identical groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupingStrategy {
    Synchronous,
    Batched { batch_size: usize },
    Chunked { chunk_size: usize, cache_dates: bool },
}

impl GroupingStrategy {
    pub fn for_len(len: usize, options: &GroupingOptions) -> Self {
        if len <= options.sync_threshold {
            Self::Synchronous
        } else if len <= options.batched_threshold {
            Self::Batched {
                batch_size: options.batch_size.max(1),
            }
        } else {
            Self::Chunked {
                chunk_size: options.chunk_size.max(1),
                cache_dates: options.cache_dates,
            }
        }
    }

    fn chunk_len(&self, total: usize) -> usize {
        match *self {
            Self::Synchronous => total.max(1),
            Self::Batched { batch_size } => batch_size.max(1),
            Self::Chunked { chunk_size, .. } => chunk_size.max(1),
        }
    }

    fn uses_cache(&self) -> bool {
        matches!(
            self,
            Self::Chunked {
                cache_dates: true,
                ..
            }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupingStatus {
    Complete,
    /// Grouping fell back to the single all-photos group.
    Degraded(GroupingError),
}

/// The result of a completed grouping run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grouping {
    pub groups: Vec<Arc<MonthGroup>>,
    /// Records that were malformed and diverted into the unknown-date group.
    pub diverted: Vec<FileId>,
    pub status: GroupingStatus,
    pub strategy: GroupingStrategy,
}

impl Grouping {
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, GroupingStatus::Degraded(_))
    }

    pub fn photo_count(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }

    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups.iter().map(|g| g.id).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupingOutcome {
    Complete(Grouping),
    /// The run was cancelled; no partial result exists.
    Cancelled,
}

impl GroupingOutcome {
    pub fn into_grouping(self) -> Option<Grouping> {
        match self {
            Self::Complete(g) => Some(g),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    /// Time spent on the chunk that just finished.
    pub chunk_elapsed: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStep {
    /// One chunk was processed; yield to the event loop before the next step.
    Pending(Progress),
    Done(GroupingOutcome),
}

#[derive(Debug, Default)]
pub(crate) struct Buckets {
    months: BTreeMap<(i32, u32), Vec<Photo>>,
    unknown: Vec<Photo>,
    diverted: Vec<FileId>,
}

impl Buckets {
    pub(crate) fn push(
        &mut self,
        record: &Arc<FileRecord>,
        resolve: &mut dyn FnMut(&FileRecord) -> Option<DateTime<Utc>>,
    ) {
        match classify(record, resolve) {
            Ok(Some(date)) => {
                self.months
                    .entry((date.year(), date.month0()))
                    .or_default()
                    .push(Photo {
                        file: Arc::clone(record),
                        effective_date: Some(date),
                    });
            }
            Ok(None) => self.unknown.push(Photo {
                file: Arc::clone(record),
                effective_date: None,
            }),
            Err(err) => {
                cwarn!(id = record.id, error = %err, "diverting malformed record");
                self.diverted.push(record.id);
                self.unknown.push(Photo {
                    file: Arc::clone(record),
                    effective_date: None,
                });
            }
        }
    }

    fn assemble(self, expected: usize) -> Result<(Vec<Arc<MonthGroup>>, Vec<FileId>), GroupingError> {
        let Buckets {
            months,
            mut unknown,
            mut diverted,
        } = self;

        let mut groups = Vec::with_capacity(months.len() + 1);
        for ((year, month), mut photos) in months.into_iter().rev() {
            photos.sort_by(compare_dated);
            groups.push(Arc::new(MonthGroup {
                id: GroupId::Month { year, month },
                display_name: month_display_name(year, month),
                year: Some(year),
                month: Some(month),
                photos,
            }));
        }

        if !unknown.is_empty() {
            unknown.sort_by(compare_undated);
            groups.push(Arc::new(MonthGroup {
                id: GroupId::UnknownDate,
                display_name: "Unknown Date".to_owned(),
                year: None,
                month: None,
                photos: unknown,
            }));
        }

        // Conservation invariant: every record pushed lands in exactly one bucket. A mismatch
        // means the buckets were fed a different file list than the one being reported.
        let actual: usize = groups.iter().map(|g| g.len()).sum();
        if actual != expected {
            return Err(GroupingError::CountMismatch { expected, actual });
        }

        diverted.sort_unstable();
        Ok((groups, diverted))
    }
}

fn classify(
    record: &FileRecord,
    resolve: &mut dyn FnMut(&FileRecord) -> Option<DateTime<Utc>>,
) -> Result<Option<DateTime<Utc>>, GroupingError> {
    if record.name.trim().is_empty() {
        return Err(GroupingError::MalformedRecord {
            id: record.id,
            reason: "empty file name",
        });
    }
    Ok(resolve(record))
}

fn compare_undated(a: &Photo, b: &Photo) -> Ordering {
    a.name()
        .cmp(b.name())
        .then_with(|| a.file.size.cmp(&b.file.size))
        .then_with(|| a.id().cmp(&b.id()))
}

fn compare_dated(a: &Photo, b: &Photo) -> Ordering {
    a.effective_date
        .cmp(&b.effective_date)
        .then_with(|| compare_undated(a, b))
}

fn month_display_name(year: i32, month: u32) -> String {
    match u8::try_from(month + 1).ok().and_then(|m| Month::try_from(m).ok()) {
        Some(m) => format!("{} {year}", m.name()),
        None => GroupId::Month { year, month }.to_string(),
    }
}

/// Builds the degraded single-group result: every file, sorted by filename.
pub fn fallback_grouping(
    files: &[Arc<FileRecord>],
    error: GroupingError,
    strategy: GroupingStrategy,
) -> Grouping {
    let mut photos: Vec<Photo> = files
        .iter()
        .map(|file| Photo {
            file: Arc::clone(file),
            effective_date: None,
        })
        .collect();
    photos.sort_by(compare_undated);

    Grouping {
        groups: vec![Arc::new(MonthGroup {
            id: GroupId::AllPhotos,
            display_name: "All Photos".to_owned(),
            year: None,
            month: None,
            photos,
        })],
        diverted: Vec::new(),
        status: GroupingStatus::Degraded(error),
        strategy,
    }
}

pub(crate) fn finish(
    buckets: Buckets,
    files: &[Arc<FileRecord>],
    strategy: GroupingStrategy,
) -> Grouping {
    match buckets.assemble(files.len()) {
        Ok((groups, diverted)) => {
            cdebug!(
                files = files.len(),
                groups = groups.len(),
                diverted = diverted.len(),
                "grouping complete"
            );
            Grouping {
                groups,
                diverted,
                status: GroupingStatus::Complete,
                strategy,
            }
        }
        Err(err) => {
            cwarn!(error = %err, "grouping degraded to a single group");
            fallback_grouping(files, err, strategy)
        }
    }
}

/// A grouping run decomposed into chunks.
///
/// Each [`GroupingJob::step`] processes one chunk, so the caller's event loop can yield between
/// steps. The cancellation token is polled before every chunk.
#[derive(Debug)]
pub struct GroupingJob {
    files: Vec<Arc<FileRecord>>,
    strategy: GroupingStrategy,
    token: CancellationToken,
    reference_year: i32,
    cursor: usize,
    buckets: Buckets,
    cache: Option<DateCache>,
    finished: Option<GroupingOutcome>,
}

impl GroupingJob {
    pub fn new(
        files: &[Arc<FileRecord>],
        strategy: GroupingStrategy,
        token: CancellationToken,
        reference_year: i32,
    ) -> Self {
        let cache = strategy.uses_cache().then(DateCache::new);
        Self {
            files: files.to_vec(),
            strategy,
            token,
            reference_year,
            cursor: 0,
            buckets: Buckets::default(),
            cache,
            finished: None,
        }
    }

    /// Supplies a warm date cache. Ignored by strategies that do not cache dates.
    pub fn with_cache(mut self, cache: DateCache) -> Self {
        if self.strategy.uses_cache() {
            self.cache = Some(cache);
        }
        self
    }

    pub fn strategy(&self) -> GroupingStrategy {
        self.strategy
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn processed(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Takes the date cache back out of the job, e.g. to hand it to the next run.
    pub fn take_cache(&mut self) -> Option<DateCache> {
        self.cache.take()
    }

    pub fn step(&mut self) -> JobStep {
        if let Some(outcome) = &self.finished {
            return JobStep::Done(outcome.clone());
        }

        if self.token.is_cancelled() {
            cdebug!(
                processed = self.cursor,
                total = self.files.len(),
                "grouping cancelled"
            );
            self.buckets = Buckets::default();
            return self.finish_with(GroupingOutcome::Cancelled);
        }

        let started = Instant::now();
        let total = self.files.len();
        let end = self
            .cursor
            .saturating_add(self.strategy.chunk_len(total))
            .min(total);
        let year = self.reference_year;

        match self.cache.as_mut() {
            Some(cache) => {
                for record in &self.files[self.cursor..end] {
                    self.buckets.push(record, &mut |r| cache.resolve(r, year));
                }
            }
            None => {
                for record in &self.files[self.cursor..end] {
                    self.buckets
                        .push(record, &mut |r| resolve_effective_date(r, year));
                }
            }
        }
        self.cursor = end;

        if self.cursor < total {
            let progress = Progress {
                processed: self.cursor,
                total,
                chunk_elapsed: started.elapsed(),
            };
            ctrace!(processed = progress.processed, total, "grouping chunk");
            return JobStep::Pending(progress);
        }

        let buckets = std::mem::take(&mut self.buckets);
        let grouping = finish(buckets, &self.files, self.strategy);
        self.finish_with(GroupingOutcome::Complete(grouping))
    }

    /// Drives the job to completion, calling `yield_point` between chunks.
    pub fn run(&mut self, mut yield_point: impl FnMut(&Progress)) -> GroupingOutcome {
        loop {
            match self.step() {
                JobStep::Pending(progress) => yield_point(&progress),
                JobStep::Done(outcome) => return outcome,
            }
        }
    }

    fn finish_with(&mut self, outcome: GroupingOutcome) -> JobStep {
        self.finished = Some(outcome.clone());
        JobStep::Done(outcome)
    }
}

/// Buckets file records into month groups, newest month first.
#[derive(Clone, Debug)]
pub struct DateGroupingEngine {
    options: GroupingOptions,
    reference_year: i32,
    cache: DateCache,
}

impl Default for DateGroupingEngine {
    fn default() -> Self {
        Self::new(GroupingOptions::default())
    }
}

impl DateGroupingEngine {
    pub fn new(options: GroupingOptions) -> Self {
        Self {
            options,
            reference_year: Utc::now().year(),
            cache: DateCache::new(),
        }
    }

    /// Pins the year used by the reasonable-date window (`[1900, year + 10]`).
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = year;
        self
    }

    pub fn options(&self) -> &GroupingOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: GroupingOptions) {
        self.options = options;
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    pub fn date_cache(&self) -> &DateCache {
        &self.cache
    }

    pub fn strategy_for(&self, len: usize) -> GroupingStrategy {
        GroupingStrategy::for_len(len, &self.options)
    }

    /// Groups `files` in a single synchronous pass.
    pub fn group(&mut self, files: &[Arc<FileRecord>]) -> Grouping {
        let year = self.reference_year;
        let mut buckets = Buckets::default();
        for record in files {
            buckets.push(record, &mut |r| resolve_effective_date(r, year));
        }
        finish(buckets, files, GroupingStrategy::Synchronous)
    }

    /// Groups `files` with the strategy chosen by [`GroupingOptions`] for the input size.
    pub fn group_auto(
        &mut self,
        files: &[Arc<FileRecord>],
        token: &CancellationToken,
        yield_point: impl FnMut(&Progress),
    ) -> GroupingOutcome {
        let strategy = self.strategy_for(files.len());
        self.group_with(files, strategy, token, yield_point)
    }

    pub fn group_with(
        &mut self,
        files: &[Arc<FileRecord>],
        strategy: GroupingStrategy,
        token: &CancellationToken,
        yield_point: impl FnMut(&Progress),
    ) -> GroupingOutcome {
        let mut job = self.job(files, strategy, token);
        let outcome = job.run(yield_point);
        self.restore_cache(&mut job);
        outcome
    }

    /// Creates a job for manual stepping. Call [`Self::restore_cache`] once it is done so the
    /// date cache survives for later runs.
    pub fn job(
        &mut self,
        files: &[Arc<FileRecord>],
        strategy: GroupingStrategy,
        token: &CancellationToken,
    ) -> GroupingJob {
        let job = GroupingJob::new(files, strategy, token.clone(), self.reference_year);
        if strategy.uses_cache() {
            job.with_cache(std::mem::take(&mut self.cache))
        } else {
            job
        }
    }

    pub fn restore_cache(&mut self, job: &mut GroupingJob) {
        if let Some(cache) = job.take_cache() {
            self.cache = cache;
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
