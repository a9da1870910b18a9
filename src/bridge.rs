//! Browser Ports
//!
//! Implements the grid engine's collaborator traits on Leptos signals,
//! the browser History API and the JS clock.

use std::ops::Range;

use grid_engine::{Clock, DisplayUnit, FilterMenu, FilterMenuTemplate, GridView, HistoryPort};
use leptos::prelude::*;
use tracing::warn;
use wasm_bindgen::JsValue;

use crate::store::{GridBarStateStoreFields, GridBarStore};

// ========================
// Grid View
// ========================

/// Units live in a local signal (they are `Rc`-based); bar state in the store
pub struct SignalGridView {
    units: RwSignal<Vec<DisplayUnit>, LocalStorage>,
    bar: GridBarStore,
}

impl SignalGridView {
    pub fn new(units: RwSignal<Vec<DisplayUnit>, LocalStorage>, bar: GridBarStore) -> Self {
        Self { units, bar }
    }
}

impl GridView for SignalGridView {
    fn append_unit(&mut self, unit: DisplayUnit) {
        self.units.update(|units| units.push(unit));
    }

    fn clear_units(&mut self) -> usize {
        let removed = std::mem::take(&mut *self.units.write());
        for unit in &removed {
            unit.disconnect();
        }
        removed.len()
    }

    fn append_page_numbers(&mut self, pages: Range<i64>) {
        self.bar.page_numbers().write().extend(pages);
    }

    fn truncate_page_numbers(&mut self, len: i64) {
        self.bar.page_numbers().write().truncate(len.max(0) as usize);
    }

    fn highlight_page(&mut self, page_index: i64) {
        self.bar.current_page().set(page_index);
    }

    fn set_end_of_results(&mut self, visible: bool) {
        self.bar.end_of_results().set(visible);
    }

    fn show_page_bar(&mut self) {
        self.bar.page_bar_visible().set(true);
    }

    fn show_horizontal_bar(&mut self) {
        self.bar.horizontal_bar_visible().set(true);
    }
}

// ========================
// Filter Menu
// ========================

pub struct SignalFilterMenu {
    template: RwSignal<Option<FilterMenuTemplate>>,
}

impl SignalFilterMenu {
    pub fn new(template: RwSignal<Option<FilterMenuTemplate>>) -> Self {
        Self { template }
    }
}

impl FilterMenu for SignalFilterMenu {
    fn apply_template(&mut self, template: &FilterMenuTemplate) {
        self.template.set(Some(template.clone()));
    }
}

// ========================
// History & Clock
// ========================

/// Current page URL, empty when there is no window
pub fn current_href() -> String {
    web_sys::window()
        .and_then(|win| win.location().href().ok())
        .unwrap_or_default()
}

pub fn current_origin() -> String {
    web_sys::window()
        .and_then(|win| win.location().origin().ok())
        .unwrap_or_default()
}

pub struct BrowserHistory;

impl BrowserHistory {
    fn history() -> Option<web_sys::History> {
        web_sys::window().and_then(|win| win.history().ok())
    }
}

impl HistoryPort for BrowserHistory {
    fn current_location(&self) -> String {
        current_href()
    }

    fn push(&mut self, url: &str) {
        let Some(history) = Self::history() else { return };
        if let Err(err) = history.push_state_with_url(&JsValue::NULL, "", Some(url)) {
            warn!(?err, url, "history push failed");
        }
    }

    fn replace(&mut self, url: &str) {
        let Some(history) = Self::history() else { return };
        if let Err(err) = history.replace_state_with_url(&JsValue::NULL, "", Some(url)) {
            warn!(?err, url, "history replace failed");
        }
    }
}

pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}
