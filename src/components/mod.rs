//! UI Components
//!
//! Leptos components of the storefront page.

mod header;
mod product_grid;
mod product_entry;
mod page_bar;
mod filter_menu;
mod end_of_results;
mod horizontal_bar;

pub use header::Header;
pub use product_grid::ProductGrid;
pub use product_entry::ProductEntry;
pub use page_bar::PageBar;
pub use filter_menu::FilterMenuPanel;
pub use end_of_results::EndOfResults;
pub use horizontal_bar::HorizontalBar;
