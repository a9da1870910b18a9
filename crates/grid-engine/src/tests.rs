//! Grid Controller Scenario Tests
//!
//! Drives the controller through in-memory ports. Fetches are completed by
//! hand, which makes out-of-order arrival easy to stage.

use std::cell::{Cell, RefCell};
use std::ops::Range;
use std::rc::Rc;

use ring_logger::{RingBuffer, RingLayer};
use serde_json::{json, Value};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use url::Url;

use crate::{
    CatalogEndpoint, Clock, Dispatch, DisplayUnit, EntryFactory, Filter, FilterMenu,
    FilterMenuTemplate, FilterWhitelist, GridController, GridOptions, GridPorts,
    GridResponse, GridSettings, GridView, GrowthDirection, HistoryPort, ProtocolError, Query,
};

// ========================
// Fakes
// ========================

#[derive(Default)]
struct ViewLog {
    units: Vec<DisplayUnit>,
    page_numbers: Vec<i64>,
    highlighted: Option<i64>,
    end_visible: bool,
    end_toggles: usize,
    page_bar_shown: bool,
    horizontal_bar_shown: bool,
}

struct FakeView(Rc<RefCell<ViewLog>>);

impl GridView for FakeView {
    fn append_unit(&mut self, unit: DisplayUnit) {
        self.0.borrow_mut().units.push(unit);
    }
    fn clear_units(&mut self) -> usize {
        let removed: Vec<DisplayUnit> = self.0.borrow_mut().units.drain(..).collect();
        for unit in &removed {
            unit.disconnect();
        }
        removed.len()
    }
    fn append_page_numbers(&mut self, pages: Range<i64>) {
        self.0.borrow_mut().page_numbers.extend(pages);
    }
    fn truncate_page_numbers(&mut self, len: i64) {
        self.0.borrow_mut().page_numbers.truncate(len as usize);
    }
    fn highlight_page(&mut self, page_index: i64) {
        self.0.borrow_mut().highlighted = Some(page_index);
    }
    fn set_end_of_results(&mut self, visible: bool) {
        let mut log = self.0.borrow_mut();
        log.end_visible = visible;
        log.end_toggles += 1;
    }
    fn show_page_bar(&mut self) {
        self.0.borrow_mut().page_bar_shown = true;
    }
    fn show_horizontal_bar(&mut self) {
        self.0.borrow_mut().horizontal_bar_shown = true;
    }
}

struct FakeMenu(Rc<RefCell<Vec<FilterMenuTemplate>>>);

impl FilterMenu for FakeMenu {
    fn apply_template(&mut self, template: &FilterMenuTemplate) {
        self.0.borrow_mut().push(template.clone());
    }
}

#[derive(Default)]
struct HistoryLog {
    location: String,
    pushes: Vec<String>,
    replaces: Vec<String>,
}

struct FakeHistory(Rc<RefCell<HistoryLog>>);

impl HistoryPort for FakeHistory {
    fn current_location(&self) -> String {
        self.0.borrow().location.clone()
    }
    fn push(&mut self, url: &str) {
        let mut log = self.0.borrow_mut();
        log.pushes.push(url.to_string());
        log.location = url.to_string();
    }
    fn replace(&mut self, url: &str) {
        let mut log = self.0.borrow_mut();
        log.replaces.push(url.to_string());
        log.location = url.to_string();
    }
}

struct ManualClock(Rc<Cell<u64>>);

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

struct Harness {
    controller: GridController,
    factory: EntryFactory,
    view: Rc<RefCell<ViewLog>>,
    menu: Rc<RefCell<Vec<FilterMenuTemplate>>>,
    history: Rc<RefCell<HistoryLog>>,
    clock: Rc<Cell<u64>>,
}

impl Harness {
    fn new() -> Self {
        Self::with_settings(GridSettings::default())
    }

    fn with_settings(settings: GridSettings) -> Self {
        let factory = EntryFactory::new(Url::parse("https://shop.example/").unwrap());
        factory.provide_markup("<a class=\"container\"></a>");

        let view = Rc::new(RefCell::new(ViewLog::default()));
        let menu = Rc::new(RefCell::new(Vec::new()));
        let history = Rc::new(RefCell::new(HistoryLog {
            location: "https://shop.example/catalog".into(),
            ..Default::default()
        }));
        let clock = Rc::new(Cell::new(1_000));

        let controller = GridController::new(
            CatalogEndpoint::new(Url::parse("https://shop.example/api/product-grid").unwrap()),
            factory.clone(),
            settings,
            GridPorts {
                view: Box::new(FakeView(view.clone())),
                filter_menu: Box::new(FakeMenu(menu.clone())),
                history: Box::new(FakeHistory(history.clone())),
                clock: Box::new(ManualClock(clock.clone())),
            },
        );

        Self {
            controller,
            factory,
            view,
            menu,
            history,
            clock,
        }
    }

    fn at(&mut self, now_ms: u64) -> &mut Self {
        self.clock.set(now_ms);
        self
    }

    fn rendered_names(&self) -> Vec<String> {
        self.view
            .borrow()
            .units
            .iter()
            .filter_map(|unit| unit.rendered().map(|entry| entry.name))
            .collect()
    }
}

fn paged() -> GridOptions {
    GridOptions {
        pages_enabled: true,
        ..Default::default()
    }
}

fn item(index: i64) -> Value {
    json!({
        "imgSrc": format!("/img/{index}.jpg"),
        "name": format!("item-{index}"),
        "culture": "Edo",
        "priceCents": 1000 + index,
        "productURL": format!("/products/{index}")
    })
}

fn items(range: Range<i64>) -> Vec<Value> {
    range.map(item).collect()
}

fn response(items: Vec<Value>, block_size: Option<i64>, last: Option<i64>) -> GridResponse {
    GridResponse {
        items,
        block_size,
        last_available_index: last,
        filter_menu_template: None,
    }
}

fn template() -> Value {
    json!({
        "categoryTypes": [{
            "displayName": "Culture",
            "categoryType": "culture",
            "categoryIDs": [
                { "displayName": "Japanese", "categoryID": "japanese" },
                { "displayName": "Korean", "categoryID": "korean" }
            ]
        }]
    })
}

fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, RingBuffer) {
    let layer = RingLayer::new(128, LevelFilter::DEBUG).silent();
    let buffer = layer.buffer();
    let subscriber = tracing_subscriber::registry().with(layer);
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, buffer)
}

/// Initialize and apply the Scenario B answer: block 12, last index 119
fn loaded_first_page(h: &mut Harness) -> Dispatch {
    let first = h.controller.initialize(paged());
    h.controller
        .complete(first.clone(), Ok(response(items(0..12), Some(12), Some(119))));
    first
}

// ========================
// Initialization
// ========================

#[test]
fn test_initial_draft_requests_scalars() {
    let mut h = Harness::new();
    let dispatch = h.controller.initialize(paged());

    let request = &dispatch.request;
    assert_eq!(request.start_index, 0);
    assert_eq!(request.length, None);
    assert!(request.get_block_size);
    assert!(request.get_last_available_index);
    assert!(!request.get_filter_menu_template);
    assert_eq!(
        dispatch.url.as_str(),
        "https://shop.example/api/product-grid?start-id=0&get-block-size=true&get-last-available-id=true"
    );
    assert!(h.view.borrow().page_bar_shown);
    assert_eq!(h.controller.in_flight(), Some(&dispatch.request));
}

#[test]
fn test_initialize_is_never_throttled() {
    let mut h = Harness::new();
    h.controller.initialize(paged());
    // Re-initializing straight away still dispatches
    let again = h.controller.initialize(paged());
    assert_eq!(again.request.start_index, 0);
}

#[test]
fn test_initialize_with_filter_menu_and_cap() {
    let mut h = Harness::new();
    let dispatch = h.controller.initialize(GridOptions {
        max_products: 10,
        filter_menu_enabled: true,
        ..Default::default()
    });
    assert!(dispatch.request.get_filter_menu_template);
    assert_eq!(dispatch.request.length, Some(10));
    assert!(!h.view.borrow().page_bar_shown);
}

#[test]
fn test_horizontal_grid_disables_paging() {
    let mut h = Harness::new();
    h.controller.initialize(GridOptions {
        direction: GrowthDirection::Horizontal,
        pages_enabled: true,
        ..Default::default()
    });
    assert!(!h.controller.state().pages_enabled);
    assert!(h.view.borrow().horizontal_bar_shown);
    assert!(!h.view.borrow().page_bar_shown);
    assert_eq!(h.controller.change_page(1), Ok(None));
}

// ========================
// Reconciliation
// ========================

#[test]
fn test_first_load_derives_page_size_and_total() {
    let mut h = Harness::new();
    loaded_first_page(&mut h);

    let state = h.controller.state();
    assert_eq!(state.block_size, Some(12));
    assert_eq!(state.page_size, Some(24));
    assert_eq!(state.total_pages, 5);
    assert_eq!(state.pointer, 11);
    assert_eq!(state.product_count, 12);
    assert_eq!(h.view.borrow().page_numbers, vec![0, 1, 2, 3, 4]);
    assert_eq!(h.view.borrow().highlighted, Some(0));
    assert_eq!(h.controller.fulfilled().map(|r| r.start_index), Some(0));
    assert_eq!(h.controller.in_flight(), None);
}

#[test]
fn test_narrow_layout_uses_narrow_target() {
    let mut h = Harness::new();
    let first = h.controller.initialize(GridOptions {
        pages_enabled: true,
        narrow: true,
        ..Default::default()
    });
    h.controller
        .complete(first, Ok(response(items(0..10), Some(10), Some(99))));
    assert_eq!(h.controller.state().page_size, Some(20));
    assert_eq!(h.controller.state().total_pages, 5);
}

#[test]
fn test_non_positive_page_targets_fall_back_to_defaults() {
    let mut h = Harness::with_settings(GridSettings {
        wide_items_per_page: 0,
        narrow_items_per_page: -4,
        ..Default::default()
    });
    loaded_first_page(&mut h);
    assert_eq!(h.controller.state().page_size, Some(24));
    assert_eq!(h.controller.state().total_pages, 5);

    let mut h = Harness::with_settings(GridSettings {
        narrow_items_per_page: -4,
        ..Default::default()
    });
    let first = h.controller.initialize(GridOptions {
        pages_enabled: true,
        narrow: true,
        ..Default::default()
    });
    h.controller
        .complete(first, Ok(response(items(0..10), Some(10), Some(99))));
    assert_eq!(h.controller.state().page_size, Some(20));
    assert_eq!(h.controller.state().total_pages, 5);
}

#[test]
fn test_price_is_rendered_in_major_units() {
    let mut h = Harness::new();
    let first = h.controller.initialize(paged());
    let mut entry = item(0);
    entry["priceCents"] = json!(1250);
    h.controller
        .complete(first, Ok(response(vec![entry], Some(12), Some(0))));

    let view = h.view.borrow();
    assert_eq!(view.units[0].rendered().unwrap().price, "12.50 USD");
}

#[test]
fn test_known_block_size_is_never_overwritten() {
    let mut h = Harness::new();
    loaded_first_page(&mut h);

    let next = h.at(4_000).controller.on_scroll_near_end().unwrap().unwrap();
    assert!(!next.request.get_block_size);
    h.controller
        .complete(next, Ok(response(items(12..24), Some(30), Some(7))));

    assert_eq!(h.controller.state().block_size, Some(12));
    assert_eq!(h.controller.state().last_available_index, Some(119));
    assert_eq!(h.controller.state().page_size, Some(24));
}

#[test]
fn test_block_size_inferred_from_batch_length() {
    let mut h = Harness::new();
    let first = h.controller.initialize(paged());
    h.controller
        .complete(first, Ok(response(items(0..9), None, Some(40))));
    assert_eq!(h.controller.state().block_size, Some(9));
    assert_eq!(h.controller.state().page_size, Some(27));
    assert_eq!(h.controller.state().total_pages, 2);
}

#[test]
fn test_short_batch_is_not_trusted_as_block_size() {
    let mut h = Harness::new();
    let first = h.controller.initialize(paged());
    h.controller
        .complete(first, Ok(response(items(0..5), None, Some(4))));
    assert_eq!(h.controller.state().block_size, None);
    assert_eq!(h.controller.state().page_size, None);
    assert_eq!(h.controller.state().product_count, 5);
}

#[test]
fn test_invalid_items_are_skipped_and_logged() {
    let mut h = Harness::new();
    let first = h.controller.initialize(paged());
    let mut batch = items(0..12);
    batch[3] = json!({ "name": "no image" });
    batch[7]["priceCents"] = json!(-1);

    let (summary, logs) = capture_logs(|| {
        h.controller
            .complete(first, Ok(response(batch, Some(12), Some(119))))
    });

    assert_eq!(summary.rendered, 10);
    assert_eq!(summary.skipped, 2);
    assert_eq!(h.controller.state().product_count, 10);
    assert_eq!(h.controller.state().pointer, 11);
    assert!(logs.contains(Level::ERROR, "skipping invalid product entry"));
}

#[test]
fn test_all_invalid_batch_does_not_fulfil() {
    let mut h = Harness::new();
    let first = h.controller.initialize(paged());
    let summary = h.controller.complete(
        first,
        Ok(response(vec![json!({}), json!(null)], Some(12), Some(119))),
    );
    assert_eq!(summary.rendered, 0);
    assert_eq!(h.controller.fulfilled(), None);
    // Scalars still land
    assert_eq!(h.controller.state().page_size, Some(24));
}

#[test]
fn test_protocol_error_leaves_state_alone() {
    let mut h = Harness::new();
    loaded_first_page(&mut h);
    let before = h.controller.state().clone();

    let next = h.at(4_000).controller.on_scroll_near_end().unwrap().unwrap();
    let (summary, logs) = capture_logs(|| {
        h.controller.complete(next, Err(ProtocolError::Status(503)))
    });

    assert_eq!(summary.failed, Some(ProtocolError::Status(503)));
    let after = h.controller.state();
    assert_eq!(after.pointer, before.pointer);
    assert_eq!(after.product_count, before.product_count);
    assert_eq!(h.controller.in_flight(), None);
    assert!(logs.contains(Level::ERROR, "catalog fetch failed"));
}

#[test]
fn test_template_is_forwarded_and_cached() {
    let mut h = Harness::new();
    let first = h.controller.initialize(GridOptions {
        pages_enabled: true,
        filter_menu_enabled: true,
        ..Default::default()
    });
    let mut answer = response(items(0..12), Some(12), Some(119));
    answer.filter_menu_template = Some(template());
    h.controller.complete(first, Ok(answer));

    assert_eq!(h.menu.borrow().len(), 1);
    assert!(h.controller.whitelist().contains("culture", "korean"));
    let next = h.at(4_000).controller.on_scroll_near_end().unwrap().unwrap();
    assert!(!next.request.get_filter_menu_template);
}

#[test]
fn test_malformed_template_keeps_directive_on() {
    let mut h = Harness::new();
    let first = h.controller.initialize(GridOptions {
        filter_menu_enabled: true,
        ..Default::default()
    });
    let mut answer = response(items(0..12), Some(12), Some(119));
    answer.filter_menu_template = Some(json!({ "categoryTypes": "nope" }));
    h.controller.complete(first, Ok(answer));

    assert!(h.menu.borrow().is_empty());
    let next = h.at(4_000).controller.on_scroll_near_end().unwrap().unwrap();
    assert!(next.request.get_filter_menu_template);
}

// ========================
// Drafts & Admission
// ========================

#[test]
fn test_length_omitted_when_space_covers_a_block() {
    let mut h = Harness::new();
    let first = h.controller.initialize(GridOptions::default());
    h.controller
        .complete(first, Ok(response(items(0..12), Some(12), Some(119))));

    let next = h.at(4_000).controller.on_scroll_near_end().unwrap().unwrap();
    assert_eq!(next.request.start_index, 12);
    assert_eq!(next.request.length, None);
}

#[test]
fn test_length_trimmed_to_page_end() {
    let mut h = Harness::new();
    loaded_first_page(&mut h);

    let next = h.at(4_000).controller.on_scroll_near_end().unwrap().unwrap();
    assert_eq!(next.request.start_index, 12);
    assert_eq!(next.request.length, Some(12));
    h.controller
        .complete(next, Ok(response(items(12..24), None, None)));
    assert_eq!(h.controller.state().pointer, 23);

    // The page is full, the next attempt falls outside it
    assert_eq!(h.at(8_000).controller.on_scroll_near_end(), Ok(None));
}

#[test]
fn test_length_trimmed_to_last_available() {
    let mut h = Harness::new();
    let first = h.controller.initialize(GridOptions::default());
    h.controller
        .complete(first, Ok(response(items(0..12), Some(12), Some(15))));

    let next = h.at(4_000).controller.on_scroll_near_end().unwrap().unwrap();
    assert_eq!(next.request.length, Some(4));
    h.controller
        .complete(next, Ok(response(items(12..16), None, None)));

    assert_eq!(h.controller.state().pointer, 15);
    assert!(h.view.borrow().end_visible);
    assert_eq!(h.at(8_000).controller.on_scroll_near_end(), Ok(None));
}

#[test]
fn test_product_cap_stops_rendering() {
    let mut h = Harness::new();
    let first = h.controller.initialize(GridOptions {
        max_products: 5,
        ..Default::default()
    });
    assert_eq!(first.request.length, Some(5));
    let summary = h
        .controller
        .complete(first, Ok(response(items(0..12), Some(12), Some(119))));

    assert_eq!(summary.rendered, 5);
    assert_eq!(h.controller.state().product_count, 5);
    assert_eq!(h.at(4_000).controller.on_scroll_near_end(), Ok(None));
}

#[test]
fn test_scroll_is_throttled() {
    let mut h = Harness::new();
    loaded_first_page(&mut h);

    let (attempt, logs) = capture_logs(|| h.at(2_500).controller.on_scroll_near_end());
    assert_eq!(attempt, Ok(None));
    assert!(logs.contains(Level::WARN, "request throttled"));
    assert!(h.at(3_000).controller.on_scroll_near_end().unwrap().is_some());
}

#[test]
fn test_throttled_trigger_retry_covers_repeat_window() {
    let mut h = Harness::new();
    h.controller.initialize(paged());
    assert_eq!(h.controller.throttle_remaining_ms(), Some(4_000));

    // Near-end fires while the first load is still out: same range, a repeat
    assert_eq!(h.at(1_500).controller.on_scroll_near_end(), Ok(None));
    let wait = h.controller.throttle_remaining_ms().unwrap();
    assert_eq!(wait, 3_500);

    // Waiting only the novel window would still be refused
    assert_eq!(h.at(3_000).controller.on_scroll_near_end(), Ok(None));
    let retry = h.at(1_500 + wait).controller.on_scroll_near_end().unwrap();
    assert_eq!(retry.map(|d| d.request.start_index), Some(0));
    assert_eq!(h.controller.throttle_remaining_ms(), Some(4_000));
}

#[test]
fn test_in_flight_directive_is_carried_forward() {
    let mut h = Harness::new();
    let first = h.controller.initialize(paged());
    h.controller
        .complete(first, Ok(response(items(0..12), Some(12), None)));

    let scroll = h.at(4_000).controller.on_scroll_near_end().unwrap().unwrap();
    let jump = h.at(8_000).controller.change_page(1).unwrap().unwrap();
    assert!(jump.request.get_last_available_index);

    // The superseded scroll answers the last index while the jump is still out
    h.controller
        .complete(scroll, Ok(response(items(12..24), None, Some(119))));
    assert_eq!(h.controller.state().last_available_index, Some(119));

    let retry = h.at(12_000).controller.on_scroll_near_end().unwrap().unwrap();
    assert_eq!(retry.request.start_index, 24);
    assert!(retry.request.get_last_available_index);
    assert_eq!(h.controller.in_flight(), Some(&retry.request));
}

#[test]
fn test_repeat_request_waits_longer_and_duplicate_answer_is_inert() {
    let mut h = Harness::new();
    loaded_first_page(&mut h);

    let a = h.at(4_000).controller.on_scroll_near_end().unwrap().unwrap();
    // Same draft again: a repeat, needs 4s
    assert_eq!(h.at(7_000).controller.on_scroll_near_end(), Ok(None));
    let b = h.at(8_000).controller.on_scroll_near_end().unwrap().unwrap();
    assert_eq!(a.request, b.request);

    let first = h
        .controller
        .complete(a, Ok(response(items(12..24), None, None)));
    let second = h
        .controller
        .complete(b, Ok(response(items(12..24), None, None)));
    assert_eq!(first.rendered, 12);
    assert!(second.items_discarded);
    assert_eq!(h.controller.state().product_count, 24);
}

// ========================
// Paging
// ========================

#[test]
fn test_double_page_change_dispatches_once() {
    let mut h = Harness::new();
    loaded_first_page(&mut h);

    let first = h.at(5_000).controller.change_page(2).unwrap();
    let second = h.at(5_400).controller.change_page(2).unwrap();

    let first = first.expect("first page change is admitted");
    assert_eq!(first.request.start_index, 48);
    assert_eq!(second, None);
    assert_eq!(h.controller.state().page_index, 2);
    assert_eq!(h.controller.state().pointer, 47);
}

#[test]
fn test_page_change_recycles_units_and_updates_history() {
    let mut h = Harness::new();
    loaded_first_page(&mut h);
    assert_eq!(h.view.borrow().units.len(), 12);

    let dispatch = h.at(5_000).controller.change_page(1).unwrap().unwrap();
    assert_eq!(dispatch.request.start_index, 24);
    assert_eq!(dispatch.request.length, None);
    assert!(h.view.borrow().units.is_empty());
    assert_eq!(h.factory.pooled(), 12);
    assert_eq!(h.controller.state().product_count, 0);
    assert_eq!(h.controller.state().pointer, 23);
    assert_eq!(h.view.borrow().highlighted, Some(1));

    let history = h.history.borrow();
    assert_eq!(history.pushes, vec!["https://shop.example/catalog".to_string()]);
    assert_eq!(history.replaces, vec!["https://shop.example/catalog?page=2".to_string()]);
    drop(history);

    h.controller
        .complete(dispatch, Ok(response(items(24..36), None, None)));
    assert_eq!(h.factory.pooled(), 0);
    assert_eq!(h.factory.constructed(), 12);
    assert_eq!(h.rendered_names()[0], "item-24");
}

#[test]
fn test_page_change_guards() {
    let mut h = Harness::new();
    h.controller.initialize(paged());
    // Page size unknown yet
    assert_eq!(h.at(5_000).controller.change_page(1), Ok(None));

    let mut h = Harness::new();
    loaded_first_page(&mut h);
    assert_eq!(h.at(5_000).controller.change_page(5), Ok(None));
    assert_eq!(h.controller.change_page(-1), Ok(None));
}

#[test]
fn test_huge_page_index_is_refused_while_total_is_unknown() {
    let mut h = Harness::new();
    let first = h.controller.initialize(paged());
    h.controller
        .complete(first, Ok(response(items(0..12), Some(12), None)));
    assert_eq!(h.controller.state().total_pages, 0);

    let ((huge, max), logs) = capture_logs(|| {
        (
            h.at(5_000).controller.change_page(i64::MAX / 2),
            h.controller.change_page(i64::MAX),
        )
    });
    assert_eq!(huge, Ok(None));
    assert_eq!(max, Ok(None));
    assert!(logs.contains(Level::WARN, "page index too large"));
    assert_eq!(h.controller.state().page_index, 0);
    assert_eq!(h.view.borrow().units.len(), 12);

    // A reasonable page still goes through without a known total
    let dispatch = h.controller.change_page(3).unwrap().unwrap();
    assert_eq!(dispatch.request.start_index, 72);
}

#[test]
fn test_last_page_shows_end_marker_once() {
    let mut h = Harness::new();
    loaded_first_page(&mut h);

    let to_last = h.at(5_000).controller.change_page(4).unwrap().unwrap();
    h.controller
        .complete(to_last, Ok(response(items(96..108), None, None)));
    assert!(!h.view.borrow().end_visible);

    let rest = h.at(8_000).controller.on_scroll_near_end().unwrap().unwrap();
    assert_eq!(rest.request.length, Some(12));
    h.controller
        .complete(rest.clone(), Ok(response(items(108..120), None, None)));
    assert!(h.view.borrow().end_visible);
    assert_eq!(h.view.borrow().end_toggles, 1);

    // A redundant answer with no state change causes no churn
    h.controller
        .complete(rest, Ok(response(Vec::new(), None, None)));
    assert_eq!(h.view.borrow().end_toggles, 1);
}

// ========================
// Queries & Staleness
// ========================

#[test]
fn test_stale_query_answer_is_inert() {
    let mut h = Harness::new();
    let q1 = h.controller.initialize(GridOptions {
        pages_enabled: true,
        initial_query: Some(Query::search("mask")),
        ..Default::default()
    });

    let q2 = h
        .at(4_000)
        .controller
        .apply_query(Query::search("bowl"))
        .unwrap()
        .unwrap();
    assert!(q2.request.get_last_available_index);
    assert_eq!(q2.request.query, Query::search("bowl"));

    let stale = h
        .controller
        .complete(q1, Ok(response(items(0..12), Some(12), Some(50))));
    assert!(stale.items_discarded);
    assert!(stale.last_index_discarded);
    assert!(h.view.borrow().units.is_empty());
    assert_eq!(h.controller.state().last_available_index, None);
    // Block size is a global fact and still lands
    assert_eq!(h.controller.state().block_size, Some(12));

    let fresh = h
        .controller
        .complete(q2, Ok(response(items(0..12), None, Some(30))));
    assert_eq!(fresh.rendered, 12);
    assert_eq!(h.controller.state().last_available_index, Some(30));
    assert_eq!(h.controller.state().total_pages, 2);
}

#[test]
fn test_stale_query_answer_arriving_last_keeps_new_index() {
    let mut h = Harness::new();
    let q1 = h.controller.initialize(GridOptions {
        initial_query: Some(Query::search("mask")),
        ..Default::default()
    });
    let q2 = h
        .at(4_000)
        .controller
        .apply_query(Query::search("bowl"))
        .unwrap()
        .unwrap();

    h.controller
        .complete(q2, Ok(response(items(0..12), Some(12), Some(30))));
    h.controller
        .complete(q1, Ok(response(items(100..112), Some(12), Some(50))));

    assert_eq!(h.controller.state().last_available_index, Some(30));
    assert_eq!(h.rendered_names().len(), 12);
    assert_eq!(h.rendered_names()[0], "item-0");
}

#[test]
fn test_range_only_staleness_keeps_scalars() {
    let mut h = Harness::new();
    let first = h.controller.initialize(paged());
    h.controller
        .complete(first, Ok(response(items(0..12), Some(12), None)));

    let scroll = h.at(4_000).controller.on_scroll_near_end().unwrap().unwrap();
    let jump = h.at(8_000).controller.change_page(1).unwrap().unwrap();

    let stale = h
        .controller
        .complete(scroll, Ok(response(items(12..24), None, Some(119))));
    assert!(stale.items_discarded);
    assert!(!stale.last_index_discarded);
    assert_eq!(h.controller.state().last_available_index, Some(119));
    assert_eq!(h.controller.state().total_pages, 5);
    assert!(h.view.borrow().units.is_empty());

    h.controller
        .complete(jump, Ok(response(items(24..36), None, None)));
    assert_eq!(h.rendered_names()[0], "item-24");
}

#[test]
fn test_apply_query_drops_unknown_filters() {
    let mut h = Harness::new();
    let first = h.controller.initialize(GridOptions {
        pages_enabled: true,
        filter_menu_enabled: true,
        ..Default::default()
    });
    let mut answer = response(items(0..12), Some(12), Some(119));
    answer.filter_menu_template = Some(template());
    h.controller.complete(first, Ok(answer));

    let query = Query::default()
        .with_filter(Filter::new("culture", "korean"))
        .with_filter(Filter::new("era", "meiji"));
    let dispatch = h.at(4_000).controller.apply_query(query).unwrap().unwrap();

    assert_eq!(dispatch.request.query.filters, vec![Filter::new("culture", "korean")]);
    assert_eq!(dispatch.request.start_index, 0);
    assert!(h.view.borrow().units.is_empty());
    assert_eq!(
        h.history.borrow().location,
        "https://shop.example/catalog?culture=korean"
    );
}

#[test]
fn test_location_filters_restored_once_template_names_them() {
    let mut h = Harness::new();
    h.history.borrow_mut().location =
        "https://shop.example/catalog?searchStr=tea&culture=japanese&era=meiji".into();
    let first = h.controller.initialize(GridOptions {
        pages_enabled: true,
        filter_menu_enabled: true,
        initial_query: Some(Query::search("tea")),
        ..Default::default()
    });
    // Nothing whitelisted yet, so the address bar matches the query in use
    assert_eq!(h.controller.query_from_location(), None);

    let mut answer = response(items(0..12), Some(12), Some(119));
    answer.filter_menu_template = Some(template());
    h.controller.complete(first, Ok(answer));

    let restored = h.controller.query_from_location().expect("culture filter is now known");
    assert_eq!(restored, Query::search("tea").with_filter(Filter::new("culture", "japanese")));

    let dispatch = h.at(5_000).controller.apply_query(restored).unwrap().unwrap();
    assert_eq!(dispatch.request.query.filters, vec![Filter::new("culture", "japanese")]);
    assert_eq!(h.controller.query_from_location(), None);
}

#[test]
fn test_throttled_query_keeps_previous_state() {
    let mut h = Harness::new();
    loaded_first_page(&mut h);

    assert_eq!(h.at(1_500).controller.apply_query(Query::search("fan")), Ok(None));
    assert_eq!(h.controller.query(), &Query::default());
    assert_eq!(h.controller.state().last_available_index, Some(119));
    assert_eq!(h.view.borrow().units.len(), 12);
    assert!(h.history.borrow().pushes.is_empty());
}

#[test]
fn test_initial_whitelist_validates_queries_before_template() {
    let mut h = Harness::new();
    h.controller.initialize(GridOptions {
        whitelist: FilterWhitelist::from_pairs([("era", "edo")]),
        ..Default::default()
    });
    let dispatch = h
        .at(4_000)
        .controller
        .apply_query(Query::default().with_filter(Filter::new("era", "edo")))
        .unwrap()
        .unwrap();
    assert_eq!(dispatch.request.query.filters.len(), 1);
}
