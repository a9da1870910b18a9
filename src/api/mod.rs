//! Network Calls
//!
//! Fetch wrappers over gloo-net, organized by what they load.

mod catalog;
mod markup;

pub use catalog::fetch_catalog;
pub use markup::load_entry_markup;
