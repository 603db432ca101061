// Example: drive a CalendarController from synthetic UI events.
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use photo_calendar::{Direction, FileRecord, LayoutConfig, Photo, ThumbnailResource};
use photo_calendar_adapter::{CalendarController, ControllerOptions, SelectionModifiers};

struct Decoded {
    width: u32,
    height: u32,
}

impl ThumbnailResource for Decoded {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn main() {
    let start = Utc
        .with_ymd_and_hms(2023, 3, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();
    let files: Vec<Arc<FileRecord>> = (0..5_000u64)
        .map(|i| {
            Arc::new(
                FileRecord::new(i, format!("DSC{i:05}.jpg"))
                    .with_date_created(Some(start + Duration::hours(3 * i as i64))),
            )
        })
        .collect();

    let mut c: CalendarController<Decoded> = CalendarController::new(
        LayoutConfig::default().with_container_width(1024.0),
        ControllerOptions::default().with_viewport_height(720.0),
    );
    c.on_photo_select(Arc::new(|photo: &Photo, additive: bool, range: bool| {
        println!("selected {} additive={additive} range={range}", photo.name());
    }));
    if let Err(err) = c.set_files(files) {
        eprintln!("layout failed: {err}");
        return;
    }

    // A scroll burst: only the first event and the final offset reach the layout.
    let mut now_ms = 0u64;
    for offset in (0..40).map(|i| i as f64 * 25.0) {
        now_ms += 4;
        if let Some(range) = c.on_scroll(offset, now_ms) {
            println!("t={now_ms} scroll={offset} range={range:?}");
        }
    }
    now_ms += 16;
    if let Some(range) = c.tick(now_ms) {
        println!("t={now_ms} flushed scroll={} range={range:?}", c.scroll_top());
    }

    let visible: Vec<_> = c
        .visible_items()
        .iter()
        .flat_map(|item| item.photos().iter().map(|p| p.id()))
        .filter(|&id| c.is_photo_visible(id))
        .collect();
    for id in visible {
        c.cache_thumbnail(id, Decoded { width: 256, height: 192 });
    }
    println!("memory={:?}", c.memory().stats());

    c.handle_key(Direction::Right, SelectionModifiers::NONE);
    c.handle_key(Direction::Down, SelectionModifiers::NONE.with_range(true));

    match c.resize(640.0, 720.0) {
        Ok(scroll) => println!("resized: per_row={} scroll={scroll}", c.layout().items_per_row()),
        Err(err) => eprintln!("resize failed: {err}"),
    }
    println!("pressure={:?} freed={:?}", c.pressure(), c.memory_pressure());
}
