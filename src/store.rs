//! Grid Bar State Store
//!
//! Uses Leptos reactive_stores for fine-grained reactivity. Written by the
//! grid view bridge, read by the page bar and end-of-results components.

use leptos::prelude::*;
use reactive_stores::Store;

/// Sub-view state of the product grid
#[derive(Clone, Debug, Default, Store)]
pub struct GridBarState {
    /// 0-based indices of the page links currently shown
    pub page_numbers: Vec<i64>,
    /// Highlighted page (0-based)
    pub current_page: i64,
    pub end_of_results: bool,
    pub page_bar_visible: bool,
    pub horizontal_bar_visible: bool,
    /// A catalog fetch is outstanding
    pub loading: bool,
}

/// Type alias for the store
pub type GridBarStore = Store<GridBarState>;

/// Get the grid bar store from context
pub fn use_grid_bar() -> GridBarStore {
    expect_context::<GridBarStore>()
}
