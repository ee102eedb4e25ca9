//! Cyclic carousel over a loaded list.
//!
//! [`Carousel`] is the pure state: how many items fit on one "page" for a viewport
//! width, and which page is showing. Navigation wraps in both directions.
//! [`CarouselTicker`] drives a carousel from a tokio task on a fixed period.
//! Any manual move through the ticker restarts the period, so the automatic advance
//! never lands right after the user moved.

use serde::{Deserialize, Serialize};
use std::{ops::Range, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
    time::{Instant, interval_at},
};
use utoipa::ToSchema;

/// Viewport breakpoints (minimum width in px, items per page), widest first.
pub const BREAKPOINTS: [(u32, usize); 3] = [(1400, 4), (992, 3), (768, 2)];

/// Items per page for a viewport `width`; 1 below the smallest breakpoint.
pub fn items_per_page_for_width(width: u32) -> usize {
    BREAKPOINTS
        .iter()
        .find(|(min_width, _)| width >= *min_width)
        .map(|(_, per_page)| *per_page)
        .unwrap_or(1)
}

/// Carousel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Carousel {
    total_items: usize,
    items_per_page: usize,
    page: usize,
}

impl Carousel {
    pub fn new(total_items: usize, items_per_page: usize) -> Self {
        Self {
            total_items,
            items_per_page: items_per_page.max(1),
            page: 0,
        }
    }

    pub fn for_width(total_items: usize, width: u32) -> Self {
        Self::new(total_items, items_per_page_for_width(width))
    }

    /// Zero-based index of the page showing.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    /// Always at least 1, even for an empty list.
    pub fn page_count(&self) -> usize {
        self.total_items.div_ceil(self.items_per_page).max(1)
    }

    /// Moves forward, wrapping from the last page to page 0.
    pub fn advance(&mut self) -> usize {
        self.page = (self.page + 1) % self.page_count();
        self.page
    }

    /// Moves back, wrapping from page 0 to the last page.
    pub fn retreat(&mut self) -> usize {
        let count = self.page_count();
        self.page = (self.page + count - 1) % count;
        self.page
    }

    /// Jumps to `page` (e.g. at the end of a drag). Out-of-range pages are ignored.
    pub fn jump_to(&mut self, page: usize) -> bool {
        if page >= self.page_count() {
            return false;
        }
        self.page = page;
        true
    }

    /// Recomputes items per page for a new viewport width, keeping the page in range.
    pub fn resize(&mut self, width: u32) {
        self.items_per_page = items_per_page_for_width(width);
        self.clamp();
    }

    /// The list behind the carousel changed size.
    pub fn set_total_items(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.clamp();
    }

    fn clamp(&mut self) {
        self.page = self.page.min(self.page_count() - 1);
    }

    /// Index range of the visible items. The final page may be partial.
    pub fn visible_range(&self) -> Range<usize> {
        let start = (self.page * self.items_per_page).min(self.total_items);
        let end = (start + self.items_per_page).min(self.total_items);
        start..end
    }

    /// The visible slice of `items`, which should hold `total_items` elements.
    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.visible_range();
        let end = range.end.min(items.len());
        &items[range.start.min(end)..end]
    }
}

/// CarouselTicker
///
/// Owns a carousel and a background task advancing it every `period`.
/// Dropping the ticker stops the task.
pub struct CarouselTicker {
    carousel: Arc<Mutex<Carousel>>,
    restart: Arc<Notify>,
    task: JoinHandle<()>,
}

impl CarouselTicker {
    /// Starts ticking. The first automatic advance happens one full `period` from now.
    /// Must be called from within a tokio runtime.
    pub fn spawn(carousel: Carousel, period: Duration) -> Self {
        let carousel = Arc::new(Mutex::new(carousel));
        let restart = Arc::new(Notify::new());

        let task = tokio::spawn({
            let carousel = carousel.clone();
            let restart = restart.clone();
            async move {
                let mut ticks = interval_at(Instant::now() + period, period);
                loop {
                    tokio::select! {
                        _ = ticks.tick() => {
                            let page = carousel.lock().await.advance();
                            tracing::trace!(page, "carousel auto-advanced");
                        }
                        _ = restart.notified() => {
                            ticks.reset();
                        }
                    }
                }
            }
        });

        Self {
            carousel,
            restart,
            task,
        }
    }

    pub async fn snapshot(&self) -> Carousel {
        *self.carousel.lock().await
    }

    pub async fn advance(&self) -> usize {
        let page = self.carousel.lock().await.advance();
        self.restart.notify_one();
        page
    }

    pub async fn retreat(&self) -> usize {
        let page = self.carousel.lock().await.retreat();
        self.restart.notify_one();
        page
    }

    pub async fn jump_to(&self, page: usize) -> bool {
        let moved = self.carousel.lock().await.jump_to(page);
        if moved {
            self.restart.notify_one();
        }
        moved
    }

    pub async fn resize(&self, width: u32) -> Carousel {
        let mut carousel = self.carousel.lock().await;
        carousel.resize(width);
        *carousel
    }

    pub async fn set_total_items(&self, total_items: usize) -> Carousel {
        let mut carousel = self.carousel.lock().await;
        carousel.set_total_items(total_items);
        *carousel
    }
}

impl Drop for CarouselTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
