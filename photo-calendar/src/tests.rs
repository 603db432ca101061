use crate::*;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

const REFERENCE_YEAR: i32 = 2025;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() >> 16) % span
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        self.gen_range_u64(start as u64, end_exclusive as u64) as usize
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        self.gen_range_u64(start as u64, end_exclusive as u64) as u32
    }

    fn gen_bool(&mut self) -> bool {
        (self.next_u64() >> 33) & 1 == 1
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.gen_range_usize(0, i + 1);
            items.swap(i, j);
        }
    }
}

fn dt(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).single().unwrap()
}

fn file(id: FileId, name: &str, created: Option<DateTime<Utc>>) -> Arc<FileRecord> {
    Arc::new(FileRecord::new(id, name).with_date_created(created))
}

fn engine() -> DateGroupingEngine {
    DateGroupingEngine::default().with_reference_year(REFERENCE_YEAR)
}

fn names(group: &MonthGroup) -> Vec<&str> {
    group.photos.iter().map(|p| p.name()).collect()
}

fn random_date(rng: &mut Lcg) -> DateTime<Utc> {
    let year = rng.gen_range_u32(1995, 2026) as i32;
    let month = rng.gen_range_u32(1, 13);
    let day = rng.gen_range_u32(1, 29);
    let hour = rng.gen_range_u32(0, 24);
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .unwrap()
}

fn random_files(rng: &mut Lcg, n: usize) -> Vec<Arc<FileRecord>> {
    (0..n)
        .map(|i| {
            let kind = rng.gen_range_u32(0, 10);
            let created = match kind {
                0 => None,
                1 => Some(dt(1800, 1, 1)),
                2 => Some(dt(2090, 6, 1)),
                _ => Some(random_date(rng)),
            };
            let modified = (kind < 3 && rng.gen_bool()).then(|| random_date(rng));
            let added = (kind < 3 && rng.gen_bool()).then(|| random_date(rng));
            let name = if kind == 9 && rng.gen_range_u32(0, 8) == 0 {
                String::new()
            } else {
                // Few distinct names so the name/size tie-breaks are exercised.
                format!("IMG_{:04}.jpg", rng.gen_range_usize(0, n / 4 + 1))
            };
            Arc::new(
                FileRecord::new(i as FileId, name)
                    .with_size(rng.gen_range_u64(0, 4))
                    .with_dimensions(4000, 3000)
                    .with_date_created(created)
                    .with_date_modified(modified)
                    .with_date_added(added),
            )
        })
        .collect()
}

fn month_group(year: i32, month: u32, count: usize, id_base: FileId) -> Arc<MonthGroup> {
    let photos = (0..count)
        .map(|i| {
            let date = Utc
                .with_ymd_and_hms(year, month + 1, 1, 0, 0, 0)
                .single()
                .map(|d| d + chrono::Duration::minutes(i as i64));
            Photo {
                file: Arc::new(
                    FileRecord::new(id_base + i as FileId, format!("IMG_{i:04}.jpg"))
                        .with_date_created(date),
                ),
                effective_date: date,
            }
        })
        .collect();
    Arc::new(MonthGroup {
        id: GroupId::Month { year, month },
        display_name: format!("{year}-{month}"),
        year: Some(year),
        month: Some(month),
        photos,
    })
}

fn grid_config() -> LayoutConfig {
    LayoutConfig::default()
        .with_container_width(800.0)
        .with_thumbnail_size(160.0)
        .with_thumbnail_padding(8.0)
        .with_header_height(48.0)
        .with_group_margin(24.0)
}

fn layout_with(sizes: &[usize]) -> LayoutEngine {
    let groups = sizes
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let year = 2024 - (i / 12) as i32;
            let month = 11 - (i % 12) as u32;
            month_group(year, month, n, (i as FileId) * 10_000)
        })
        .collect();
    let mut layout = LayoutEngine::new(grid_config());
    layout.calculate_layout(groups).unwrap();
    layout
}

// ---------------------------------------------------------------------------------------------
// Grouping

#[test]
fn two_dated_months_newest_first() {
    let files = vec![
        file(1, "a.jpg", Some(dt(2024, 6, 15))),
        file(2, "b.jpg", Some(dt(2024, 6, 20))),
        file(3, "c.jpg", Some(dt(2024, 5, 10))),
    ];
    let grouping = engine().group(&files);

    assert_eq!(grouping.status, GroupingStatus::Complete);
    assert_eq!(grouping.groups.len(), 2);
    assert_eq!(grouping.groups[0].id.to_string(), "2024-06");
    assert_eq!(grouping.groups[0].display_name, "June 2024");
    assert_eq!(names(&grouping.groups[0]), ["a.jpg", "b.jpg"]);
    assert_eq!(grouping.groups[1].id.to_string(), "2024-05");
    assert_eq!(grouping.groups[1].month, Some(4));
    assert_eq!(names(&grouping.groups[1]), ["c.jpg"]);
}

#[test]
fn unparseable_and_ancient_dates_land_in_unknown_group() {
    let files = vec![
        file(1, "zebra.jpg", parse_date("not a date")),
        file(2, "apple.jpg", Some(dt(1800, 1, 1))),
        file(3, "dated.jpg", Some(dt(2020, 3, 3))),
    ];
    let grouping = engine().group(&files);

    assert_eq!(grouping.groups.len(), 2);
    let unknown = grouping.groups.last().unwrap();
    assert_eq!(unknown.id, GroupId::UnknownDate);
    assert_eq!(unknown.id.to_string(), "unknown-date");
    assert_eq!(names(unknown), ["apple.jpg", "zebra.jpg"]);
    assert!(unknown.photos.iter().all(|p| p.effective_date.is_none()));
}

#[test]
fn effective_date_falls_back_through_modified_and_added() {
    let record = FileRecord::new(1, "x.jpg")
        .with_date_created(Some(dt(1850, 1, 1)))
        .with_date_modified(Some(dt(2040, 1, 1)))
        .with_date_added(Some(dt(2019, 8, 2)));
    // 2040 is beyond reference year + 10.
    assert_eq!(
        resolve_effective_date(&record, REFERENCE_YEAR),
        Some(dt(2019, 8, 2))
    );

    let record = record.with_date_modified(Some(dt(2030, 1, 1)));
    assert_eq!(
        resolve_effective_date(&record, REFERENCE_YEAR),
        Some(dt(2030, 1, 1))
    );

    assert!(is_reasonable_date(&dt(1900, 1, 1), REFERENCE_YEAR));
    assert!(is_reasonable_date(&dt(2035, 12, 31), REFERENCE_YEAR));
    assert!(!is_reasonable_date(&dt(1899, 12, 31), REFERENCE_YEAR));
    assert!(!is_reasonable_date(&dt(2036, 1, 1), REFERENCE_YEAR));
}

#[test]
fn parse_date_accepts_common_formats() {
    assert_eq!(parse_date("2024-06-15"), Some(Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()));
    assert_eq!(
        parse_date("2024-06-15 08:30:00"),
        Some(Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap())
    );
    assert_eq!(
        parse_date("2024:06:15 08:30:00"),
        Some(Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap())
    );
    assert_eq!(
        parse_date("2024-06-15T10:00:00+02:00"),
        Some(Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap())
    );
    assert_eq!(parse_date(""), None);
    assert_eq!(parse_date("June 15th"), None);
    assert_eq!(parse_date("2024-13-40"), None);
}

#[test]
fn groups_order_across_years_with_unknown_last() {
    let files = vec![
        file(1, "old.jpg", Some(dt(2019, 12, 31))),
        file(2, "nodate.jpg", None),
        file(3, "new.jpg", Some(dt(2025, 1, 2))),
        file(4, "mid.jpg", Some(dt(2023, 7, 4))),
    ];
    let ids: Vec<String> = engine()
        .group(&files)
        .group_ids()
        .iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(ids, ["2025-01", "2023-07", "2019-12", "unknown-date"]);
}

#[test]
fn same_instant_breaks_ties_by_name_then_size() {
    let when = Some(dt(2022, 2, 2));
    let files = vec![
        Arc::new(FileRecord::new(1, "b.jpg").with_size(1).with_date_created(when)),
        Arc::new(FileRecord::new(2, "a.jpg").with_size(9).with_date_created(when)),
        Arc::new(FileRecord::new(3, "a.jpg").with_size(3).with_date_created(when)),
    ];
    let grouping = engine().group(&files);
    let ids: Vec<FileId> = grouping.groups[0].photos.iter().map(Photo::id).collect();
    assert_eq!(ids, [3, 2, 1]);
}

#[test]
fn grouping_is_deterministic_under_permutation() {
    let mut rng = Lcg::new(7);
    let files = random_files(&mut rng, 600);
    let expected = engine().group(&files);
    assert_eq!(expected.photo_count(), files.len());

    for _ in 0..8 {
        let mut shuffled = files.clone();
        rng.shuffle(&mut shuffled);
        let got = engine().group(&shuffled);
        assert_eq!(got.groups, expected.groups);
        assert_eq!(got.diverted, expected.diverted);
    }
}

#[test]
fn all_strategies_produce_identical_groups() {
    let mut rng = Lcg::new(42);
    let files = random_files(&mut rng, 3_000);
    let token = CancellationToken::new();

    let sync = engine().group(&files);
    let strategies = [
        GroupingStrategy::Synchronous,
        GroupingStrategy::Batched { batch_size: 97 },
        GroupingStrategy::Chunked {
            chunk_size: 250,
            cache_dates: true,
        },
        GroupingStrategy::Chunked {
            chunk_size: 1,
            cache_dates: false,
        },
    ];
    for strategy in strategies {
        let outcome = engine().group_with(&files, strategy, &token, |_| {});
        let grouping = outcome.into_grouping().unwrap();
        assert_eq!(grouping.strategy, strategy);
        assert_eq!(grouping.groups, sync.groups, "{strategy:?}");
        assert_eq!(grouping.diverted, sync.diverted, "{strategy:?}");
    }

    let auto = engine()
        .group_auto(&files, &token, |_| {})
        .into_grouping()
        .unwrap();
    assert!(matches!(auto.strategy, GroupingStrategy::Batched { .. }));
    assert_eq!(auto.groups, sync.groups);
}

#[test]
fn strategy_selection_follows_thresholds() {
    let options = GroupingOptions::default();
    assert_eq!(
        GroupingStrategy::for_len(1_000, &options),
        GroupingStrategy::Synchronous
    );
    assert_eq!(
        GroupingStrategy::for_len(1_001, &options),
        GroupingStrategy::Batched { batch_size: 500 }
    );
    assert_eq!(
        GroupingStrategy::for_len(10_001, &options),
        GroupingStrategy::Chunked {
            chunk_size: 1_000,
            cache_dates: true
        }
    );
}

#[test]
fn batched_run_yields_between_chunks() {
    let mut rng = Lcg::new(3);
    let files = random_files(&mut rng, 1_000);
    let token = CancellationToken::new();
    let mut seen = Vec::new();

    let outcome = engine().group_with(
        &files,
        GroupingStrategy::Batched { batch_size: 300 },
        &token,
        |p| seen.push((p.processed, p.total)),
    );
    assert!(!outcome.is_cancelled());
    assert_eq!(seen, [(300, 1_000), (600, 1_000), (900, 1_000)]);
}

#[test]
fn cancellation_between_chunks_returns_no_partial_result() {
    let mut rng = Lcg::new(11);
    let files = random_files(&mut rng, 1_000);
    let token = CancellationToken::new();
    let mut yields = 0;

    let outcome = engine().group_with(
        &files,
        GroupingStrategy::Chunked {
            chunk_size: 100,
            cache_dates: true,
        },
        &token,
        |_| {
            yields += 1;
            token.cancel();
        },
    );
    assert_eq!(outcome, GroupingOutcome::Cancelled);
    assert_eq!(yields, 1);

    // A token cancelled up front stops even the synchronous strategy.
    let outcome = engine().group_with(&files, GroupingStrategy::Synchronous, &token, |_| {});
    assert!(outcome.is_cancelled());

    token.reset();
    assert!(!engine().group_with(&files, GroupingStrategy::Synchronous, &token, |_| {}).is_cancelled());
}

#[test]
fn manual_job_stepping_reports_done_repeatedly() {
    let files = vec![file(1, "a.jpg", Some(dt(2024, 1, 1))), file(2, "b.jpg", None)];
    let token = CancellationToken::new();
    let mut job = GroupingJob::new(
        &files,
        GroupingStrategy::Batched { batch_size: 1 },
        token,
        REFERENCE_YEAR,
    );

    assert!(matches!(job.step(), JobStep::Pending(p) if p.processed == 1));
    let JobStep::Done(first) = job.step() else {
        panic!("expected the job to finish");
    };
    assert!(job.is_finished());
    assert_eq!(job.step(), JobStep::Done(first.clone()));
    assert_eq!(first.into_grouping().unwrap().photo_count(), 2);
}

#[test]
fn empty_input_groups_to_nothing() {
    let grouping = engine().group(&[]);
    assert!(grouping.groups.is_empty());
    assert_eq!(grouping.status, GroupingStatus::Complete);

    let token = CancellationToken::new();
    let outcome = engine().group_with(
        &[],
        GroupingStrategy::Chunked {
            chunk_size: 10,
            cache_dates: true,
        },
        &token,
        |_| panic!("no chunk boundaries for empty input"),
    );
    assert!(outcome.into_grouping().unwrap().groups.is_empty());
}

#[test]
fn malformed_records_are_diverted_not_fatal() {
    let files = vec![
        file(1, "ok.jpg", Some(dt(2024, 6, 1))),
        file(2, "   ", Some(dt(2024, 6, 2))),
        file(3, "", Some(dt(2024, 6, 3))),
    ];
    let grouping = engine().group(&files);

    assert_eq!(grouping.status, GroupingStatus::Complete);
    assert_eq!(grouping.diverted, [2, 3]);
    assert_eq!(grouping.groups.len(), 2);
    assert_eq!(grouping.groups[0].len(), 1);
    let unknown = &grouping.groups[1];
    assert_eq!(unknown.id, GroupId::UnknownDate);
    let ids: Vec<FileId> = unknown.photos.iter().map(Photo::id).collect();
    assert_eq!(ids, [3, 2]);
}

#[test]
fn fallback_grouping_is_single_degraded_group() {
    let files = vec![
        file(1, "c.jpg", Some(dt(2024, 6, 1))),
        file(2, "a.jpg", None),
        file(3, "b.jpg", Some(dt(2021, 1, 1))),
    ];
    let err = GroupingError::CountMismatch {
        expected: 3,
        actual: 2,
    };
    let grouping = fallback_grouping(&files, err.clone(), GroupingStrategy::Synchronous);

    assert!(grouping.is_degraded());
    assert_eq!(grouping.status, GroupingStatus::Degraded(err));
    assert_eq!(grouping.groups.len(), 1);
    assert_eq!(grouping.groups[0].id, GroupId::AllPhotos);
    assert_eq!(grouping.groups[0].id.to_string(), "all-photos");
    assert_eq!(names(&grouping.groups[0]), ["a.jpg", "b.jpg", "c.jpg"]);
}

#[test]
fn count_mismatch_degrades_to_the_all_photos_group() {
    let files = vec![file(1, "b.jpg", Some(dt(2024, 6, 1))), file(2, "a.jpg", None)];
    // Only the first record reaches the buckets.
    let mut buckets = crate::grouping::Buckets::default();
    buckets.push(&files[0], &mut |r| resolve_effective_date(r, 2025));
    let grouping = crate::grouping::finish(buckets, &files, GroupingStrategy::Synchronous);

    assert_eq!(
        grouping.status,
        GroupingStatus::Degraded(GroupingError::CountMismatch {
            expected: 2,
            actual: 1
        })
    );
    assert_eq!(grouping.groups.len(), 1);
    assert_eq!(grouping.groups[0].id, GroupId::AllPhotos);
    assert_eq!(names(&grouping.groups[0]), ["a.jpg", "b.jpg"]);
    assert!(grouping.diverted.is_empty());
}

#[test]
fn date_cache_is_reused_and_detects_changed_records() {
    let mut rng = Lcg::new(5);
    let mut files = random_files(&mut rng, 400);
    let strategy = GroupingStrategy::Chunked {
        chunk_size: 64,
        cache_dates: true,
    };
    let token = CancellationToken::new();
    let mut engine = engine();

    engine.group_with(&files, strategy, &token, |_| {});
    assert_eq!(engine.date_cache().misses(), 400);
    assert_eq!(engine.date_cache().hits(), 0);

    engine.group_with(&files, strategy, &token, |_| {});
    assert_eq!(engine.date_cache().hits(), 400);

    let changed = (*files[0]).clone().with_date_created(Some(dt(2001, 9, 9)));
    files[0] = Arc::new(FileRecord {
        name: "changed.jpg".to_owned(),
        ..changed
    });
    let grouping = engine
        .group_with(&files, strategy, &token, |_| {})
        .into_grouping()
        .unwrap();
    assert_eq!(engine.date_cache().misses(), 401);
    let group = grouping
        .groups
        .iter()
        .find(|g| g.id == GroupId::Month { year: 2001, month: 8 })
        .unwrap();
    assert!(group.photos.iter().any(|p| p.id() == files[0].id));
}

// ---------------------------------------------------------------------------------------------
// Layout

#[test]
fn items_per_row_and_grid_height_follow_the_formula() {
    let config = grid_config();
    assert_eq!(config.items_per_row(), 4);

    let mut layout = LayoutEngine::new(config);
    let items = layout
        .calculate_layout(vec![month_group(2024, 5, 9, 0)])
        .unwrap();
    assert_eq!(items.len(), 2);
    assert!(items[0].is_header());
    let LayoutItem::Grid { height, rows, .. } = &items[1] else {
        panic!("second item must be a grid");
    };
    assert_eq!(*rows, 3);
    assert_eq!(*height, 504.0);
}

#[test]
fn degenerate_configs_fall_back_to_one_item_per_row() {
    let base = grid_config();
    for config in [
        base.with_container_width(0.0),
        base.with_container_width(-50.0),
        base.with_container_width(f64::NAN),
        base.with_container_width(f64::INFINITY),
        base.with_thumbnail_size(0.0),
        base.with_container_width(100.0),
        base.with_max_items_per_row(0),
    ] {
        let engine = LayoutEngine::new(config);
        assert_eq!(engine.items_per_row(), 1, "{config:?}");
    }
    assert_eq!(LayoutEngine::new(base.with_max_items_per_row(3)).items_per_row(), 3);
    assert_eq!(LayoutEngine::new(base.with_container_width(1e12)).items_per_row(), 20);
}

#[test]
fn non_finite_lengths_are_sanitized_to_defaults() {
    let config = grid_config()
        .with_header_height(f64::NAN)
        .with_group_margin(-3.0)
        .with_thumbnail_padding(f64::NEG_INFINITY)
        .sanitized();
    let defaults = LayoutConfig::default();
    assert_eq!(config.header_height, defaults.header_height);
    assert_eq!(config.group_margin, 0.0);
    assert_eq!(config.thumbnail_padding, defaults.thumbnail_padding);
}

#[test]
fn items_are_stacked_with_margins_between_groups() {
    let layout = layout_with(&[9, 0, 4]);
    let items = layout.items();
    assert_eq!(items.len(), 6);

    for pair in items.chunks(2) {
        assert!(pair[0].is_header());
        assert!(!pair[1].is_header());
        assert_eq!(pair[1].top(), pair[0].top() + pair[0].height());
        assert!(Arc::ptr_eq(pair[0].group(), pair[1].group()));
        assert_eq!(pair[0].group_index(), pair[1].group_index());
    }
    for w in items.windows(2) {
        assert!(w[0].top() <= w[1].top());
    }
    // Empty group: header, zero-height grid.
    assert_eq!(items[3].height(), 0.0);
    assert!(items[3].photos().is_empty());
    assert_eq!(items[2].top(), items[1].bottom() + 24.0);
    assert_eq!(items[4].top(), items[3].bottom() + 24.0);
    // No margin after the last group.
    assert_eq!(layout.total_height(), items[5].bottom());
    assert_eq!(layout.total_height(), 48.0 + 504.0 + 24.0 + 48.0 + 24.0 + 48.0 + 168.0);
    assert_eq!(layout.photo_count(), 13);
}

#[test]
fn calculate_layout_is_idempotent() {
    let groups = vec![month_group(2024, 5, 7, 0), month_group(2024, 4, 13, 100)];
    let mut layout = LayoutEngine::new(grid_config());
    let first = layout.calculate_layout(groups.clone()).unwrap().to_vec();
    let r1 = layout.revision();
    let second = layout.calculate_layout(groups).unwrap().to_vec();
    assert_eq!(first, second);
    assert!(layout.revision() > r1);
}

#[test]
fn update_config_recomputes_existing_layout() {
    let mut layout = LayoutEngine::new(grid_config());
    layout.update_config(LayoutConfigPatch::container_width(400.0)).unwrap();
    assert!(layout.items().is_empty());
    assert_eq!(layout.items_per_row(), 2);

    layout.calculate_layout(vec![month_group(2024, 5, 9, 0)]).unwrap();
    assert_eq!(layout.items()[1].height(), 5.0 * 168.0);

    let revision = layout.revision();
    layout
        .update_config(LayoutConfigPatch {
            container_width: Some(1200.0),
            header_height: Some(32.0),
            ..LayoutConfigPatch::default()
        })
        .unwrap();
    assert!(layout.revision() > revision);
    assert_eq!(layout.items_per_row(), 7);
    assert_eq!(layout.items()[1].top(), 32.0);
    assert_eq!(layout.items()[1].height(), 2.0 * 168.0);

    // No-op patches never rebuild.
    let revision = layout.revision();
    layout.update_config(LayoutConfigPatch::default()).unwrap();
    layout.update_config(LayoutConfigPatch::container_width(1200.0)).unwrap();
    assert_eq!(layout.revision(), revision);
}

#[test]
fn overflowing_geometry_resets_layout_and_reports_error() {
    let mut layout = LayoutEngine::new(grid_config().with_header_height(f64::MAX));
    let groups = vec![month_group(2024, 5, 3, 0), month_group(2024, 4, 3, 100)];
    let before = layout.revision();

    let err = layout.calculate_layout(groups).unwrap_err();
    assert!(matches!(err, LayoutError::NonFiniteGeometry { .. }));
    assert!(layout.items().is_empty());
    assert_eq!(layout.total_height(), 0.0);
    assert!(layout.revision() > before);

    // A sane config recovers from the kept groups.
    layout.set_config(grid_config()).unwrap();
    assert_eq!(layout.items().len(), 4);
}

#[test]
fn navigator_is_empty_after_a_failed_layout() {
    let groups = vec![month_group(2024, 5, 3, 0), month_group(2024, 4, 3, 100)];
    let mut layout = LayoutEngine::new(grid_config());
    layout.calculate_layout(groups).unwrap();
    let mut nav = KeyboardNavigator::new();
    assert_eq!(nav.len(&layout), 6);

    assert!(layout.set_config(grid_config().with_header_height(f64::MAX)).is_err());
    assert_eq!(layout.photo_count(), 0);
    assert_eq!(layout.groups().len(), 2);

    assert!(nav.is_stale(&layout));
    assert_eq!(nav.len(&layout), 0);
    assert_eq!(nav.navigate(&layout, 0, Direction::Right), None);
    assert_eq!(nav.first(&layout), None);
    assert_eq!(nav.last(&layout), None);
    assert_eq!(nav.position_of(&layout, 0), None);
    assert!(nav.photo(&layout, 0).is_none());
    assert_eq!(KeyboardNavigator::new().len(&layout), 0);

    layout.set_config(grid_config()).unwrap();
    assert_eq!(nav.len(&layout), 6);
    assert_eq!(nav.navigate(&layout, 0, Direction::Right), Some(1));
    assert_eq!(nav.navigate(&layout, 0, Direction::Down), Some(3));
}

#[test]
fn overscan_changes_do_not_rebuild_geometry() {
    let groups = vec![
        month_group(2024, 5, 3, 0),
        month_group(2024, 4, 3, 100),
        month_group(2024, 3, 3, 200),
    ];
    let mut layout = LayoutEngine::new(grid_config().with_overscan(0));
    layout.calculate_layout(groups).unwrap();
    let revision = layout.revision();
    let items = layout.items().to_vec();
    assert_eq!(
        layout.visible_range(0.0, 100.0),
        VisibleRange {
            start_index: 0,
            end_index: 2,
            total_items: 6
        }
    );

    layout
        .update_config(LayoutConfigPatch {
            overscan: Some(3),
            ..LayoutConfigPatch::default()
        })
        .unwrap();
    assert_eq!(layout.revision(), revision);
    assert_eq!(layout.items(), items.as_slice());
    assert_eq!(layout.config().overscan, 3);
    assert_eq!(layout.visible_range(0.0, 100.0).end_index, 5);

    let mut seen = Vec::new();
    layout.for_each_visible_item(0.0, 100.0, |index, _| seen.push(index));
    assert_eq!(seen, [0, 1, 2, 3, 4]);
}

#[test]
fn navigator_built_for_one_engine_is_stale_for_another() {
    let mut a = LayoutEngine::new(grid_config());
    a.calculate_layout(vec![month_group(2024, 5, 8, 0)]).unwrap();
    let mut b = LayoutEngine::new(grid_config());
    b.calculate_layout(vec![month_group(2024, 5, 2, 50)]).unwrap();
    assert_ne!(a.revision(), b.revision());
    assert_ne!(LayoutEngine::default().revision(), LayoutEngine::default().revision());

    let mut nav = KeyboardNavigator::new();
    assert_eq!(nav.len(&a), 8);
    assert!(nav.is_stale(&b));
    assert_eq!(nav.len(&b), 2);
    assert_eq!(nav.navigate(&b, 1, Direction::Right), None);
    assert_eq!(nav.position_of(&b, 50).map(|p| p.global_index), Some(0));

    // An unmodified clone has the same committed layout.
    let clone = b.clone();
    assert!(!nav.is_stale(&clone));
}

#[test]
fn grid_height_is_clamped() {
    let mut layout = LayoutEngine::new(grid_config().with_max_grid_height(1_000.0));
    layout.calculate_layout(vec![month_group(2024, 5, 400, 0)]).unwrap();
    assert_eq!(layout.items()[1].height(), 1_000.0);
}

fn brute_force(
    items: &[LayoutItem],
    scroll_top: f64,
    viewport_height: f64,
    overscan: usize,
) -> Option<VisibleRange> {
    let viewport_bottom = scroll_top + viewport_height;
    let hits: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, it)| it.top() < viewport_bottom && it.top() + it.height() > scroll_top)
        .map(|(i, _)| i)
        .collect();
    let (first, last) = (*hits.first()?, *hits.last()?);
    Some(VisibleRange {
        start_index: first.saturating_sub(overscan),
        end_index: (last + 1 + overscan).min(items.len()),
        total_items: items.len(),
    })
}

fn assert_matches_brute_force(layout: &LayoutEngine, scroll_top: f64, viewport: f64, overscan: usize) {
    let got = layout.find_visible_items(scroll_top, viewport, overscan);
    match brute_force(layout.items(), scroll_top, viewport, overscan) {
        Some(expected) => assert_eq!(
            got, expected,
            "scroll_top={scroll_top} viewport={viewport} overscan={overscan}"
        ),
        None => assert!(
            got.is_empty(),
            "expected empty range at scroll_top={scroll_top} viewport={viewport}, got {got:?}"
        ),
    }
    assert_eq!(got.total_items, layout.items().len());
}

#[test]
fn find_visible_items_matches_linear_scan() {
    let layout = layout_with(&[9, 0, 4, 1, 33, 0, 0, 8, 12]);
    let total = layout.total_height();
    let tops = [
        -10_000.0,
        -500.0,
        -1.0,
        0.0,
        1.0,
        47.9,
        48.0,
        total / 2.0,
        total - 1.0,
        total,
        total + 1.0,
        total * 3.0,
    ];
    for scroll_top in tops {
        for viewport in [0.0, 1.0, 24.0, 300.0, 900.0, total * 2.0] {
            for overscan in [0, 1, 5] {
                assert_matches_brute_force(&layout, scroll_top, viewport, overscan);
            }
        }
    }
}

#[test]
fn find_visible_items_matches_linear_scan_randomized() {
    let mut rng = Lcg::new(99);
    for _ in 0..40 {
        let n_groups = rng.gen_range_usize(0, 30);
        let sizes: Vec<usize> = (0..n_groups)
            .map(|_| {
                if rng.gen_range_u32(0, 5) == 0 {
                    0
                } else {
                    rng.gen_range_usize(1, 60)
                }
            })
            .collect();
        let layout = layout_with(&sizes);
        let total = layout.total_height().max(1.0);
        for _ in 0..50 {
            let scroll_top = rng.gen_range_u64(0, (total * 1.4) as u64 + 2) as f64 - total * 0.2;
            let viewport = rng.gen_range_u64(0, 1200) as f64;
            let overscan = rng.gen_range_usize(0, 6);
            assert_matches_brute_force(&layout, scroll_top, viewport, overscan);
        }
    }
}

#[test]
fn find_visible_items_edges() {
    let layout = layout_with(&[9, 4]);
    let n = layout.items().len();

    let above = layout.find_visible_items(-1_000.0, 100.0, 3);
    assert_eq!(above, VisibleRange::empty(0, n));

    let below = layout.find_visible_items(layout.total_height() + 10.0, 100.0, 3);
    assert_eq!(below, VisibleRange::empty(n, n));

    let all = layout.find_visible_items(0.0, layout.total_height(), 0);
    assert_eq!((all.start_index, all.end_index), (0, n));

    let nan = layout.find_visible_items(f64::NAN, 10.0, 0);
    assert_eq!((nan.start_index, nan.end_index), (0, 1));

    let empty = LayoutEngine::default().find_visible_items(0.0, 500.0, 5);
    assert_eq!(empty, VisibleRange::empty(0, 0));
}

#[test]
fn photo_geometry_and_scroll_into_view() {
    let layout = layout_with(&[9, 4]);
    assert_eq!(layout.total_height(), 792.0);

    let rect = layout.photo_rect(6).unwrap();
    assert_eq!((rect.x, rect.y), (8.0 + 2.0 * 168.0, 48.0 + 168.0));
    let rect = layout.photo_rect(9).unwrap();
    assert_eq!((rect.x, rect.y, rect.width), (8.0, 624.0, 160.0));
    assert!(layout.photo_rect(13).is_none());

    assert_eq!(layout.locate(9), Some((1, 0)));
    assert_eq!(layout.photo(9).unwrap().id(), 10_000);

    assert_eq!(layout.offset_for_photo(9, 300.0, 0.0, Align::Start), Some(492.0));
    assert_eq!(layout.offset_for_photo(9, 300.0, 0.0, Align::End), Some(484.0));
    assert_eq!(layout.offset_for_photo(9, 300.0, 0.0, Align::Auto), Some(484.0));
    assert_eq!(layout.offset_for_photo(0, 300.0, 0.0, Align::Auto), Some(0.0));
    assert_eq!(layout.offset_for_photo(0, 300.0, 400.0, Align::Auto), Some(48.0));

    assert_eq!(layout.item_at_offset(10.0), Some(0));
    assert_eq!(layout.item_at_offset(560.0), None);
    assert_eq!(layout.item_at_offset(600.0), Some(2));
    assert_eq!(layout.clamp_scroll_top(-4.0, 300.0), 0.0);
    assert_eq!(layout.clamp_scroll_top(9_999.0, 300.0), 492.0);
}

#[test]
fn locate_skips_empty_groups() {
    let layout = layout_with(&[2, 0, 0, 3]);
    assert_eq!(layout.locate(1), Some((0, 1)));
    assert_eq!(layout.locate(2), Some((3, 0)));
    assert_eq!(layout.locate(4), Some((3, 2)));
    assert_eq!(layout.locate(5), None);
}

#[test]
fn visible_photo_ids_cover_intersecting_rows_only() {
    let layout = layout_with(&[9, 4]);
    let ids = layout.visible_photo_ids(216.0, 168.0);
    assert_eq!(ids, [4, 5, 6, 7]);

    let ids = layout.visible_photo_ids(0.0, 60.0);
    assert_eq!(ids, [0, 1, 2, 3]);

    let ids = layout.visible_photo_ids(500.0, 200.0);
    assert_eq!(ids, [8, 10_000, 10_001, 10_002, 10_003]);
}

#[test]
fn first_visible_photo_tracks_the_topmost_row() {
    let layout = layout_with(&[9, 0, 4]);
    assert_eq!(layout.first_visible_photo(0.0, 300.0), Some(0));
    assert_eq!(layout.first_visible_photo(216.0, 300.0), Some(4));
    assert_eq!(layout.first_visible_photo(390.0, 300.0), Some(8));
    // Margins and the empty group's header resolve to the next real row.
    assert_eq!(layout.first_visible_photo(560.0, 200.0), Some(9));
    assert_eq!(layout.first_visible_photo(layout.total_height() + 1.0, 300.0), None);
    assert_eq!(LayoutEngine::default().first_visible_photo(0.0, 300.0), None);
}

// ---------------------------------------------------------------------------------------------
// Navigation

#[test]
fn navigation_boundaries_return_no_move() {
    let layout = layout_with(&[6, 3]);
    let mut nav = KeyboardNavigator::new();
    let last = nav.last(&layout).unwrap();
    assert_eq!(last, 8);

    assert_eq!(nav.navigate(&layout, 0, Direction::Left), None);
    assert_eq!(nav.navigate(&layout, 0, Direction::Up), None);
    assert_eq!(nav.navigate(&layout, 2, Direction::Up), None);
    assert_eq!(nav.navigate(&layout, last, Direction::Right), None);
    assert_eq!(nav.navigate(&layout, last, Direction::Down), None);
    assert_eq!(nav.navigate(&layout, 7, Direction::Down), None);
    assert_eq!(nav.navigate(&layout, 99, Direction::Left), None);
}

#[test]
fn right_from_month_end_lands_on_next_month_start() {
    let layout = layout_with(&[8, 5]);
    let mut nav = KeyboardNavigator::new();
    assert_eq!(layout.items_per_row(), 4);
    assert_eq!(nav.navigate(&layout, 7, Direction::Right), Some(8));
    assert_eq!(nav.navigate(&layout, 8, Direction::Left), Some(7));
    // Row wrap within a month.
    assert_eq!(nav.navigate(&layout, 3, Direction::Right), Some(4));
    assert_eq!(nav.navigate(&layout, 4, Direction::Left), Some(3));
}

#[test]
fn vertical_moves_clamp_on_uneven_rows() {
    // Month A: rows [0..4), [4..6). Month B: [6..9).
    let layout = layout_with(&[6, 3]);
    let mut nav = KeyboardNavigator::new();

    assert_eq!(nav.navigate(&layout, 3, Direction::Down), Some(5));
    assert_eq!(nav.navigate(&layout, 1, Direction::Down), Some(5));
    assert_eq!(nav.navigate(&layout, 0, Direction::Down), Some(4));
    assert_eq!(nav.navigate(&layout, 5, Direction::Down), Some(7));
    assert_eq!(nav.navigate(&layout, 4, Direction::Down), Some(6));

    assert_eq!(nav.navigate(&layout, 8, Direction::Up), Some(5));
    assert_eq!(nav.navigate(&layout, 6, Direction::Up), Some(4));
    assert_eq!(nav.navigate(&layout, 5, Direction::Up), Some(1));

    // Next month shorter than the column.
    let layout = layout_with(&[4, 2]);
    assert_eq!(nav.navigate(&layout, 3, Direction::Down), Some(5));
}

#[test]
fn navigation_skips_empty_months() {
    let layout = layout_with(&[3, 0, 0, 2]);
    let mut nav = KeyboardNavigator::new();
    assert_eq!(nav.navigate(&layout, 2, Direction::Down), Some(4));
    assert_eq!(nav.navigate(&layout, 3, Direction::Up), Some(0));
    assert_eq!(nav.navigate(&layout, 2, Direction::Right), Some(3));
    assert_eq!(nav.group_index_of(&layout, 3), Some(3));
    assert_eq!(nav.month_start(&layout, 4), Some(3));
    assert_eq!(nav.month_end(&layout, 0), Some(2));
}

#[test]
fn navigator_rebuilds_after_layout_changes() {
    let mut layout = layout_with(&[8]);
    let mut nav = KeyboardNavigator::new();
    assert_eq!(nav.navigate(&layout, 0, Direction::Down), Some(4));
    assert!(!nav.is_stale(&layout));

    layout
        .update_config(LayoutConfigPatch::container_width(400.0))
        .unwrap();
    assert!(nav.is_stale(&layout));
    assert_eq!(nav.navigate(&layout, 0, Direction::Down), Some(2));

    layout
        .calculate_layout(vec![month_group(2020, 0, 2, 500)])
        .unwrap();
    assert_eq!(nav.len(&layout), 2);
    assert_eq!(nav.position_of(&layout, 501).unwrap().global_index, 1);
    assert!(nav.position_of(&layout, 0).is_none());

    let pos = nav.position(&layout, 1).unwrap();
    assert_eq!((pos.row, pos.column, pos.index_in_group), (0, 1, 1));
}

#[test]
fn navigation_on_empty_layout_never_moves() {
    let layout = LayoutEngine::default();
    let mut nav = KeyboardNavigator::new();
    for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
        assert_eq!(nav.navigate(&layout, 0, dir), None);
    }
    assert_eq!(nav.first(&layout), None);
    assert_eq!(nav.last(&layout), None);
}

// ---------------------------------------------------------------------------------------------
// Memory

#[derive(Clone, Debug, PartialEq)]
struct Thumb {
    width: u32,
    height: u32,
}

impl ThumbnailResource for Thumb {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn thumb() -> Thumb {
    Thumb {
        width: 16,
        height: 16,
    }
}

fn small_cache(max_entries: usize) -> MemoryManager<Thumb> {
    MemoryManager::new(
        MemoryConfig::default()
            .with_max_entries(max_entries)
            .with_max_bytes(usize::MAX / 4)
            .with_eviction_threshold(0.9)
            .with_eviction_target(0.5),
    )
}

#[test]
fn byte_estimate_is_a_pure_function_of_dimensions() {
    use crate::memory::{ENTRY_OVERHEAD_BYTES, estimate_bytes};
    assert_eq!(estimate_bytes(0, 0), ENTRY_OVERHEAD_BYTES);
    assert_eq!(estimate_bytes(256, 256), 256 * 256 * 4 + ENTRY_OVERHEAD_BYTES);

    let mut cache = small_cache(100);
    cache.cache_thumbnail(1, thumb(), false);
    assert_eq!(cache.bytes(), estimate_bytes(16, 16));
    cache.cache_thumbnail(1, Thumb { width: 32, height: 8 }, false);
    assert_eq!(cache.bytes(), estimate_bytes(32, 8));
    assert_eq!(cache.len(), 1);
}

#[test]
fn eviction_removes_least_recently_used_down_to_target() {
    let mut cache = small_cache(10);
    for id in 0..9 {
        cache.cache_thumbnail(id, thumb(), false);
    }
    assert_eq!(cache.len(), 9);

    assert!(cache.get_thumbnail(0).is_some());
    cache.cache_thumbnail(9, thumb(), false);

    assert_eq!(cache.len(), 5);
    let kept: Vec<FileId> = (0..10).filter(|&id| cache.contains(id)).collect();
    assert_eq!(kept, [0, 6, 7, 8, 9]);
    assert_eq!(cache.stats().evictions, 5);
}

#[test]
fn repeated_hits_keep_lru_order_with_a_bounded_queue() {
    let mut cache = small_cache(10);
    for id in 0..9 {
        cache.cache_thumbnail(id, thumb(), false);
    }
    for round in 0..5_000u64 {
        assert!(cache.get_thumbnail(round % 4).is_some());
        assert!(cache.queue_len() <= 2 * cache.len() + 64);
    }

    cache.cache_thumbnail(9, thumb(), false);
    let kept: Vec<FileId> = (0..10).filter(|&id| cache.contains(id)).collect();
    assert_eq!(kept, [0, 1, 2, 3, 9]);
    assert_eq!(cache.stats().hits, 5_000);
}

#[test]
fn removed_then_recached_entries_are_ordered_by_their_new_access() {
    let mut cache = small_cache(10);
    for id in 0..9 {
        cache.cache_thumbnail(id, thumb(), false);
    }
    assert!(cache.remove(0).is_some());
    cache.cache_thumbnail(0, thumb(), false);
    cache.cache_thumbnail(9, thumb(), false);

    let kept: Vec<FileId> = (0..10).filter(|&id| cache.contains(id)).collect();
    assert_eq!(kept, [0, 6, 7, 8, 9]);
}

#[test]
fn visible_entries_are_cycled_not_evicted() {
    let mut cache = small_cache(10);
    for id in 0..10 {
        cache.cache_thumbnail(id, thumb(), id < 2);
    }
    let kept: Vec<FileId> = (0..10).filter(|&id| cache.contains(id)).collect();
    assert_eq!(kept, [0, 1, 7, 8, 9]);
}

#[test]
fn visible_entries_survive_even_when_they_exceed_the_target() {
    let mut cache = small_cache(4);
    for id in 0..6 {
        cache.cache_thumbnail(id, thumb(), true);
    }
    assert_eq!(cache.len(), 6);
    assert!(cache.evict_if_needed().is_empty());
    assert_eq!(cache.stats().visible, 6);
}

#[test]
fn visible_entries_are_never_evicted_randomized() {
    let mut rng = Lcg::new(1234);
    let mut cache = small_cache(20);
    let mut pinned: HashSet<FileId> = HashSet::new();
    let all: Vec<FileId> = (0..200).collect();

    for _ in 0..2_000 {
        let id = rng.gen_range_u64(0, 200);
        match rng.gen_range_u32(0, 4) {
            0 | 1 => {
                let visible = rng.gen_range_u32(0, 6) == 0;
                cache.cache_thumbnail(id, thumb(), visible);
                if visible {
                    pinned.insert(id);
                } else {
                    pinned.remove(&id);
                }
            }
            2 => {
                cache.get_thumbnail(id);
            }
            _ => {
                let visible: Vec<FileId> = (0..200)
                    .filter(|_| rng.gen_range_u32(0, 25) == 0)
                    .collect();
                cache.update_visibility(visible.iter().copied(), all.iter().copied());
                pinned = visible.into_iter().filter(|&v| cache.contains(v)).collect();
            }
        }
        cache.evict_if_needed();
        for id in &pinned {
            assert!(cache.contains(*id), "visible entry {id} was evicted");
        }
    }
}

#[test]
fn update_visibility_purges_removed_files_regardless_of_visibility() {
    let mut cache = small_cache(100);
    for id in 0..5 {
        cache.cache_thumbnail(id, thumb(), true);
    }
    let purged = cache.update_visibility([1, 2], [1, 2, 3]);
    assert_eq!(purged, 2);
    assert!(!cache.contains(0));
    assert!(!cache.contains(4));
    assert!(cache.entry(1).unwrap().is_visible);
    assert!(!cache.entry(3).unwrap().is_visible);
    assert_eq!(cache.stats().visible, 2);
}

#[test]
fn set_visible_changes_flags_without_purging() {
    let mut cache = small_cache(100);
    for id in 0..4 {
        cache.cache_thumbnail(id, thumb(), false);
    }
    cache.set_visible([2, 3, 99]);
    assert_eq!(cache.len(), 4);
    assert!(!cache.entry(0).unwrap().is_visible);
    assert!(cache.entry(3).unwrap().is_visible);
    assert_eq!(cache.stats().visible, 2);
}

#[test]
fn get_thumbnail_counts_hits_and_misses() {
    let mut cache = small_cache(100);
    cache.cache_thumbnail(7, thumb(), false);
    let accessed = cache.entry(7).unwrap().last_accessed;

    assert_eq!(cache.get_thumbnail(7), Some(&thumb()));
    assert!(cache.entry(7).unwrap().last_accessed > accessed);
    assert!(cache.get_thumbnail(8).is_none());

    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
    assert_eq!(stats.hit_rate(), 0.5);
    assert_eq!(cache.remove(7), Some(thumb()));
    assert_eq!(cache.bytes(), 0);
}

#[test]
fn aggressive_cleanup_drops_hidden_entries_and_notifies() {
    let mut cache = small_cache(100);
    for id in 0..6 {
        cache.cache_thumbnail(id, thumb(), id % 2 == 0);
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let callback: PressureCallback = Arc::new(move |event: &MemoryPressureEvent| {
        assert_eq!(event.freed_entries, 3);
        seen.fetch_add(1, Ordering::SeqCst);
    });
    cache.on_memory_pressure(Arc::clone(&callback));
    assert_eq!(cache.pressure_listener_count(), 1);

    let event = cache.aggressive_cleanup();
    assert_eq!(event.freed_entries, 3);
    assert_eq!(event.freed_bytes, 3 * memory::estimate_bytes(16, 16));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 3);
    assert!((0..6).filter(|id| id % 2 == 0).all(|id| cache.contains(id)));

    assert!(cache.off_memory_pressure(&callback));
    assert!(!cache.off_memory_pressure(&callback));
    cache.aggressive_cleanup();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn pressure_levels_track_utilization() {
    assert_eq!(MemoryPressure::from_utilization(0.1), MemoryPressure::Low);
    assert_eq!(MemoryPressure::from_utilization(0.6), MemoryPressure::Moderate);
    assert_eq!(MemoryPressure::from_utilization(0.8), MemoryPressure::High);
    assert_eq!(MemoryPressure::from_utilization(0.95), MemoryPressure::Critical);

    let mut cache = MemoryManager::new(MemoryConfig::default().with_max_entries(10));
    for id in 0..6 {
        cache.cache_thumbnail(id, thumb(), false);
    }
    assert_eq!(cache.pressure(), MemoryPressure::Moderate);
}

// ---------------------------------------------------------------------------------------------
// Performance monitor

#[test]
fn chunk_size_recommendation_fits_the_frame_budget() {
    let mut monitor = PerformanceMonitor::new(Duration::from_millis(16));
    assert_eq!(monitor.recommended_chunk_size(1_000), 1_000);
    assert_eq!(monitor.recommended_chunk_size(5), perf::MIN_CHUNK_SIZE);

    // 1 000 items in 32ms: half as many fit into 16ms.
    monitor.record_chunk(1_000, Duration::from_millis(32));
    assert_eq!(monitor.recommended_chunk_size(1_000), 500);

    monitor.record_chunk(1_000, Duration::from_micros(1));
    assert_eq!(monitor.recommended_chunk_size(1_000), perf::MAX_CHUNK_SIZE);

    let stats = monitor.stats(perf::Operation::GroupingChunk).unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.max, Duration::from_millis(32));
    assert_eq!(stats.mean(), Duration::from_nanos(16_000_500));

    let out = monitor.measure(perf::Operation::Layout, || 7);
    assert_eq!(out, 7);
    assert_eq!(monitor.stats(perf::Operation::Layout).unwrap().count, 1);

    monitor.record_ratio(perf::Ratio::CacheHitRate, 1.7);
    assert_eq!(monitor.ratio(perf::Ratio::CacheHitRate), Some(1.0));
    monitor.record_ratio(perf::Ratio::RenderedItems, f64::NAN);
    assert_eq!(monitor.ratio(perf::Ratio::RenderedItems), None);

    monitor.reset();
    assert!(monitor.stats(perf::Operation::Layout).is_none());
}

// ---------------------------------------------------------------------------------------------
// Serialization

#[cfg(feature = "serde")]
#[test]
fn layout_config_deserializes_with_defaults_for_missing_and_unknown_keys() {
    let config: LayoutConfig =
        serde_json::from_str(r#"{ "container_width": 1024.0, "unknown_option": true }"#).unwrap();
    assert_eq!(config.container_width, 1024.0);
    assert_eq!(config.thumbnail_size, LayoutConfig::default().thumbnail_size);

    let patch: LayoutConfigPatch = serde_json::from_str(r#"{ "overscan": 4 }"#).unwrap();
    assert_eq!(patch.overscan, Some(4));
    assert!(patch.container_width.is_none());
}
