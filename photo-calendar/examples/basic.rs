// Example: group a synthetic library, lay it out and query the viewport.
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use photo_calendar::{
    DateGroupingEngine, Direction, FileRecord, KeyboardNavigator, LayoutConfig, LayoutEngine,
};

fn main() {
    let start = Utc
        .with_ymd_and_hms(2022, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();
    let files: Vec<Arc<FileRecord>> = (0..50_000u64)
        .map(|i| {
            let date = (i % 97 != 0).then(|| start + Duration::hours(i as i64));
            Arc::new(FileRecord::new(i, format!("IMG_{i:05}.jpg")).with_date_created(date))
        })
        .collect();

    let mut engine = DateGroupingEngine::default();
    let grouping = engine.group(&files);
    println!(
        "groups={} photos={} first={:?} last={:?}",
        grouping.groups.len(),
        grouping.photo_count(),
        grouping.groups.first().map(|g| g.display_name.as_str()),
        grouping.groups.last().map(|g| g.display_name.as_str()),
    );

    let mut layout = LayoutEngine::new(LayoutConfig::default().with_container_width(1280.0));
    if let Err(err) = layout.calculate_layout(grouping.groups) {
        eprintln!("layout failed: {err}");
        return;
    }
    println!(
        "items={} items_per_row={} total_height={}",
        layout.items().len(),
        layout.items_per_row(),
        layout.total_height()
    );

    let range = layout.find_visible_items(123_456.0, 900.0, 2);
    println!("visible_range={range:?}");
    for item in layout.visible_items(range) {
        println!(
            "  {} {} top={} height={}",
            if item.is_header() { "header" } else { "grid  " },
            item.group().id,
            item.top(),
            item.height()
        );
    }

    let mut nav = KeyboardNavigator::new();
    let mut at = 0;
    for direction in [Direction::Right, Direction::Down, Direction::Down, Direction::Left] {
        if let Some(next) = nav.navigate(&layout, at, direction) {
            at = next;
        }
        println!("{direction:?} -> {at} {:?}", nav.position(&layout, at));
    }
}
