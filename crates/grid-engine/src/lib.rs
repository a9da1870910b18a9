//! Product Grid Engine
//!
//! Framework-free core of the storefront product grid:
//! - models: catalog data shapes and the wire codec for them
//! - request: query/request predicates and the filter whitelist
//! - throttle: time-based admission of outgoing requests
//! - entry: pooled display units for catalog items
//! - history: URL serialization and browser history sync
//! - controller: the paging state machine tying it all together
//!
//! Nothing here touches the DOM or the network. The host implements the
//! traits in [`ports`] and performs the fetches the controller hands out.

mod error;
mod models;
mod request;
mod throttle;
mod entry;
mod endpoint;
mod history;
mod ports;
mod controller;

#[cfg(test)]
mod tests;

pub use error::{GridError, ProtocolError, StateInvariantError, ValidationError};
pub use models::{
    CategoryIdEntry, CategoryTypeEntry, Filter, FilterMenuTemplate, GridRequest, GridResponse,
    ItemData, Query,
};
pub use request::{equal_queries, equal_requests, is_valid_filter, is_valid_query, FilterWhitelist};
pub use throttle::{ThrottleGate, NOVEL_REQUEST_WINDOW_MS, REPEAT_REQUEST_WINDOW_MS};
pub use entry::{format_price, DisplayUnit, EntryFactory, EntrySkeleton, RenderedEntry, StructureReady};
pub use endpoint::{decode_response, CatalogEndpoint};
pub use history::{parse, parse_page, serialize, sync_history};
pub use ports::{Clock, FilterMenu, GridView, HistoryPort};
pub use controller::{
    Dispatch, GridController, GridOptions, GridPorts, GridSettings, GridState, GrowthDirection,
    Reconciliation,
};
