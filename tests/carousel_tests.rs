use chamber_portal::carousel::{Carousel, CarouselTicker, items_per_page_for_width};
use std::time::Duration;

#[test]
fn test_breakpoints() {
    assert_eq!(items_per_page_for_width(1920), 4);
    assert_eq!(items_per_page_for_width(1400), 4);
    assert_eq!(items_per_page_for_width(1399), 3);
    assert_eq!(items_per_page_for_width(992), 3);
    assert_eq!(items_per_page_for_width(800), 2);
    assert_eq!(items_per_page_for_width(767), 1);
    assert_eq!(items_per_page_for_width(0), 1);
}

#[test]
fn test_advance_wraps_from_last_page() {
    let mut carousel = Carousel::new(10, 4);
    assert_eq!(carousel.page_count(), 3);

    carousel.advance();
    carousel.advance();
    assert_eq!(carousel.page(), 2);

    assert_eq!(carousel.advance(), 0);
}

#[test]
fn test_retreat_wraps_from_first_page() {
    let mut carousel = Carousel::new(10, 4);
    assert_eq!(carousel.retreat(), carousel.page_count() - 1);
}

#[test]
fn test_partial_final_page() {
    let items: Vec<u32> = (0..10).collect();
    let mut carousel = Carousel::new(items.len(), 4);
    assert!(carousel.jump_to(2));

    assert_eq!(carousel.visible_range(), 8..10);
    assert_eq!(carousel.visible(&items), &[8, 9]);
}

#[test]
fn test_empty_carousel_is_stable() {
    let mut carousel = Carousel::new(0, 3);
    assert_eq!(carousel.page_count(), 1);
    assert_eq!(carousel.advance(), 0);
    assert_eq!(carousel.retreat(), 0);
    assert!(carousel.visible::<u32>(&[]).is_empty());
}

#[test]
fn test_jump_out_of_range_is_ignored() {
    let mut carousel = Carousel::new(5, 2);
    assert!(!carousel.jump_to(3));
    assert_eq!(carousel.page(), 0);
}

#[test]
fn test_resize_keeps_page_in_range() {
    let mut carousel = Carousel::for_width(8, 500);
    assert_eq!(carousel.items_per_page(), 1);
    carousel.jump_to(7);

    carousel.resize(1500);

    assert_eq!(carousel.items_per_page(), 4);
    assert_eq!(carousel.page(), 1);
}

#[test]
fn test_shrinking_list_clamps_page() {
    let mut carousel = Carousel::new(12, 4);
    carousel.jump_to(2);

    carousel.set_total_items(5);

    assert_eq!(carousel.page(), 1);
}

// --- Ticker ---

#[tokio::test(start_paused = true)]
async fn test_ticker_advances_each_period() {
    let ticker = CarouselTicker::spawn(Carousel::new(10, 4), Duration::from_secs(7));

    tokio::time::sleep(Duration::from_millis(7_100)).await;
    assert_eq!(ticker.snapshot().await.page(), 1);

    tokio::time::sleep(Duration::from_secs(14)).await;
    // 2 -> wraps to 0
    assert_eq!(ticker.snapshot().await.page(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_manual_move_restarts_period() {
    let ticker = CarouselTicker::spawn(Carousel::new(10, 4), Duration::from_secs(7));

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(ticker.jump_to(2).await);

    // The tick that was due one second later must not fire.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(ticker.snapshot().await.page(), 2);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(ticker.snapshot().await.page(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ticker_manual_navigation() {
    let ticker = CarouselTicker::spawn(Carousel::new(6, 2), Duration::from_secs(7));

    assert_eq!(ticker.retreat().await, 2);
    assert_eq!(ticker.advance().await, 0);

    let resized = ticker.resize(1400).await;
    assert_eq!(resized.page_count(), 2);
}
