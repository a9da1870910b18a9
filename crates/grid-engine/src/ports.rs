//! Collaborator Ports
//!
//! What the controller needs from its host. The browser build implements
//! these on Leptos signals and web-sys; tests use in-memory fakes.

use std::ops::Range;

use crate::entry::DisplayUnit;
use crate::models::FilterMenuTemplate;

/// The grid container and its sub-views
pub trait GridView {
    fn append_unit(&mut self, unit: DisplayUnit);

    /// Remove every rendered unit, disconnecting each one. Returns how many were removed.
    fn clear_units(&mut self) -> usize;

    /// Add page-number links for the given 0-based page indices
    fn append_page_numbers(&mut self, pages: Range<i64>);

    /// Keep only the first `len` page-number links
    fn truncate_page_numbers(&mut self, len: i64);

    fn highlight_page(&mut self, page_index: i64);

    fn set_end_of_results(&mut self, visible: bool);

    fn show_page_bar(&mut self);

    fn show_horizontal_bar(&mut self);
}

pub trait FilterMenu {
    fn apply_template(&mut self, template: &FilterMenuTemplate);
}

pub trait HistoryPort {
    fn current_location(&self) -> String;
    fn push(&mut self, url: &str);
    fn replace(&mut self, url: &str);
}

/// Milliseconds since the epoch
pub trait Clock {
    fn now_ms(&self) -> u64;
}
