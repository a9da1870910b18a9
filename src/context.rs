//! Grid Context
//!
//! Shared grid handle provided via Leptos Context API. Owns the controller
//! and runs the fetches it hands out.

use grid_engine::{
    CatalogEndpoint, Dispatch, DisplayUnit, EntryFactory, Filter, FilterMenuTemplate,
    GridController, GridError, GridOptions, GridPorts, GrowthDirection, Query,
};
use leptos::prelude::*;
use leptos::task::spawn_local;
use tracing::{debug, error};
use url::Url;

use crate::api;
use crate::bridge::{BrowserClock, BrowserHistory, SignalFilterMenu, SignalGridView};
use crate::config::{ConfigError, StorefrontConfig};
use crate::store::{GridBarStateStoreFields, GridBarStore};

/// Grid handle provided via context
#[derive(Clone, Copy)]
pub struct GridHandle {
    controller: StoredValue<GridController, LocalStorage>,
    factory: StoredValue<EntryFactory, LocalStorage>,
    /// Units currently in the grid, in display order
    pub units: RwSignal<Vec<DisplayUnit>, LocalStorage>,
    /// Latest template served by the catalog
    pub filter_template: RwSignal<Option<FilterMenuTemplate>>,
    /// Query the controller is working with
    pub query: RwSignal<Query>,
    /// Entry skeleton markup, once loaded
    pub skeleton: RwSignal<Option<String>>,
    pub direction: GrowthDirection,
    /// Bumped after every reconciliation
    pub settled: RwSignal<u64>,
    bar: GridBarStore,
}

impl GridHandle {
    pub fn new(config: &StorefrontConfig, origin: &Url, bar: GridBarStore) -> Result<Self, ConfigError> {
        let endpoint = CatalogEndpoint::new(config.endpoint_url(origin)?);
        let factory = EntryFactory::new(origin.clone());
        let units = RwSignal::new_local(Vec::new());
        let filter_template = RwSignal::new(None);
        let skeleton = RwSignal::new(None);

        factory.structure().when_ready(move |loaded| {
            skeleton.set(Some(loaded.markup().to_string()));
        });

        let ports = GridPorts {
            view: Box::new(SignalGridView::new(units, bar)),
            filter_menu: Box::new(SignalFilterMenu::new(filter_template)),
            history: Box::new(BrowserHistory),
            clock: Box::new(BrowserClock),
        };
        let controller = GridController::new(endpoint, factory.clone(), config.settings(), ports);

        Ok(Self {
            controller: StoredValue::new_local(controller),
            factory: StoredValue::new_local(factory),
            units,
            filter_template,
            query: RwSignal::new(Query::default()),
            skeleton,
            direction: config.direction,
            settled: RwSignal::new(0),
            bar,
        })
    }

    /// Load the entry skeleton and dispatch the first catalog request
    pub fn start(&self, options: GridOptions, markup_url: String) {
        if let Some(factory) = self.factory.try_get_value() {
            spawn_local(async move {
                api::load_entry_markup(&markup_url, &factory).await;
            });
        }

        let Some(dispatch) = self.controller.try_update_value(|c| c.initialize(options)) else {
            return;
        };
        self.sync_query();
        self.run(dispatch);
    }

    /// Fetch, then reconcile against whatever the controller state is by then
    fn run(&self, dispatch: Dispatch) {
        let controller = self.controller;
        let bar = self.bar;
        let settle_count = self.settled;
        bar.loading().set(true);

        spawn_local(async move {
            let outcome = api::fetch_catalog(&dispatch.url).await;
            let settled = controller.try_update_value(|c| {
                let summary = c.complete(dispatch, outcome);
                (summary, c.in_flight().is_some())
            });
            if let Some((summary, still_loading)) = settled {
                debug!(?summary, "catalog response reconciled");
                bar.loading().set(still_loading);
                settle_count.update(|count| *count += 1);
            }
        });
    }

    fn handle(&self, attempt: Option<Result<Option<Dispatch>, GridError>>) -> bool {
        match attempt {
            Some(Ok(Some(dispatch))) => {
                self.sync_query();
                self.run(dispatch);
                true
            }
            Some(Err(err)) => {
                error!(%err, "grid operation aborted");
                false
            }
            _ => false,
        }
    }

    fn sync_query(&self) {
        if let Some(query) = self.controller.try_with_value(|c| c.query().clone()) {
            self.query.set(query);
        }
    }

    // ========================
    // Grid Inputs
    // ========================

    /// The end of the grid came into view. Returns whether a fetch went out.
    pub fn scroll_near_end(&self) -> bool {
        let attempt = self.controller.try_update_value(|c| c.on_scroll_near_end());
        self.handle(attempt)
    }

    /// Time until the throttle admits any request, `None` when it already does
    pub fn throttle_remaining_ms(&self) -> Option<u64> {
        self.controller.try_with_value(|c| c.throttle_remaining_ms()).flatten()
    }

    pub fn change_page(&self, page_index: i64) -> bool {
        let attempt = self.controller.try_update_value(|c| c.change_page(page_index));
        self.handle(attempt)
    }

    pub fn apply_query(&self, query: Query) -> bool {
        let attempt = self.controller.try_update_value(|c| c.apply_query(query));
        self.handle(attempt)
    }

    /// Re-read the address bar against the filters known by now and reload
    /// when it asks for more than the current query
    pub fn restore_location_query(&self) -> bool {
        let attempt = self.controller.try_update_value(|c| match c.query_from_location() {
            Some(query) => c.apply_query(query),
            None => Ok(None),
        });
        self.handle(attempt)
    }

    /// Replace the search string, keeping filters and sort. Blank clears it.
    pub fn search(&self, text: &str) -> bool {
        let text = text.trim();
        let mut query = self.query.get_untracked();
        query.search_string = (!text.is_empty()).then(|| text.to_string());
        self.apply_query(query)
    }

    /// Turn a filter on, or off when it is already active
    pub fn toggle_filter(&self, filter: Filter) -> bool {
        let query = self.query.get_untracked();
        let next = if query.filters.contains(&filter) {
            query.without_filter(&filter.category_type)
        } else {
            query.with_filter(filter)
        };
        self.apply_query(next)
    }

    pub fn set_narrow(&self, narrow: bool) {
        self.controller.update_value(|c| c.set_narrow(narrow));
    }
}

/// Get the grid handle from context
pub fn use_grid() -> Option<GridHandle> {
    use_context::<GridHandle>()
}
