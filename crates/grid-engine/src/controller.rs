//! Grid Controller
//!
//! Owns the paging state of one product grid. Decides when a request may go
//! out, hands it to the host as a [`Dispatch`], and reconciles whatever
//! comes back against the state at arrival time.
//!
//! Responses may arrive in any order. A response whose request has been
//! superseded never renders its items; its scalar facts (block size, last
//! available index) are still used when they answer a question that is
//! still being asked.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::endpoint::CatalogEndpoint;
use crate::entry::EntryFactory;
use crate::error::{GridError, ProtocolError, StateInvariantError};
use crate::history::{parse, serialize, sync_history};
use crate::models::{FilterMenuTemplate, GridRequest, GridResponse, Query};
use crate::ports::{Clock, FilterMenu, GridView, HistoryPort};
use crate::request::{check_query, equal_queries, equal_requests, is_valid_filter, FilterWhitelist};
use crate::throttle::{ThrottleGate, NOVEL_REQUEST_WINDOW_MS, REPEAT_REQUEST_WINDOW_MS};

/// Below this many items a first batch is not trusted as the block size
const MIN_INFERRED_BLOCK_SIZE: usize = 8;

// ========================
// Options & State
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthDirection {
    #[default]
    Vertical,
    Horizontal,
}

/// Tunables that hold for the whole session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSettings {
    pub narrow_items_per_page: i64,
    pub wide_items_per_page: i64,
    pub novel_request_window_ms: u64,
    pub repeat_request_window_ms: u64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            narrow_items_per_page: 20,
            wide_items_per_page: 28,
            novel_request_window_ms: NOVEL_REQUEST_WINDOW_MS,
            repeat_request_window_ms: REPEAT_REQUEST_WINDOW_MS,
        }
    }
}

impl GridSettings {
    /// Non-positive items-per-page targets fall back to the defaults
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let mut settings = self;
        if settings.narrow_items_per_page <= 0 {
            warn!(value = settings.narrow_items_per_page, "narrow items per page must be positive");
            settings.narrow_items_per_page = defaults.narrow_items_per_page;
        }
        if settings.wide_items_per_page <= 0 {
            warn!(value = settings.wide_items_per_page, "wide items per page must be positive");
            settings.wide_items_per_page = defaults.wide_items_per_page;
        }
        settings
    }
}

/// Per-grid options passed to [`GridController::initialize`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridOptions {
    pub direction: GrowthDirection,
    /// 0 means unlimited
    pub max_products: i64,
    pub pages_enabled: bool,
    pub filter_menu_enabled: bool,
    pub initial_query: Option<Query>,
    /// Filter pairs known before the first template arrives
    pub whitelist: FilterWhitelist,
    pub narrow: bool,
}

/// Snapshot of the controller's paging state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridState {
    /// Index of the last rendered item, -1 when nothing is rendered
    pub pointer: i64,
    pub product_count: i64,
    pub page_index: i64,
    pub page_size: Option<i64>,
    pub total_pages: i64,
    pub block_size: Option<i64>,
    pub last_available_index: Option<i64>,
    pub max_products: i64,
    pub direction: GrowthDirection,
    pub pages_enabled: bool,
    pub filter_menu_enabled: bool,
    pub narrow: bool,
    pub last_request_ms: Option<u64>,
}

impl Default for GridState {
    fn default() -> Self {
        Self {
            pointer: -1,
            product_count: 0,
            page_index: 0,
            page_size: None,
            total_pages: 0,
            block_size: None,
            last_available_index: None,
            max_products: 0,
            direction: GrowthDirection::Vertical,
            pages_enabled: false,
            filter_menu_enabled: false,
            narrow: false,
            last_request_ms: None,
        }
    }
}

impl GridState {
    fn cap_active(&self) -> bool {
        self.max_products > 0
    }

    fn paging(&self) -> Option<i64> {
        if self.pages_enabled {
            self.page_size
        } else {
            None
        }
    }
}

// ========================
// Dispatch & Reconciliation
// ========================

/// A request the host must fetch. Hand it back to [`GridController::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub ticket: u64,
    /// Frozen copy of the request as sent
    pub request: GridRequest,
    pub url: Url,
}

/// What happened when a response was applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub ticket: u64,
    pub rendered: usize,
    pub skipped: usize,
    /// Items were dropped because the request was superseded
    pub items_discarded: bool,
    /// The last available index was dropped because the query changed
    pub last_index_discarded: bool,
    pub failed: Option<ProtocolError>,
}

/// Host-side collaborators
pub struct GridPorts {
    pub view: Box<dyn GridView>,
    pub filter_menu: Box<dyn FilterMenu>,
    pub history: Box<dyn HistoryPort>,
    pub clock: Box<dyn Clock>,
}

// ========================
// Controller
// ========================

pub struct GridController {
    state: GridState,
    settings: GridSettings,
    query: Query,
    draft: Option<GridRequest>,
    /// Most recently dispatched request
    latest: Option<GridRequest>,
    latest_ticket: u64,
    latest_settled: bool,
    fulfilled: Option<GridRequest>,
    gate: ThrottleGate,
    last_admitted: Option<GridRequest>,
    whitelist: FilterWhitelist,
    template: Option<FilterMenuTemplate>,
    page_numbers_shown: i64,
    end_marker_visible: bool,
    next_ticket: u64,
    endpoint: CatalogEndpoint,
    factory: EntryFactory,
    ports: GridPorts,
}

impl GridController {
    pub fn new(endpoint: CatalogEndpoint, factory: EntryFactory, settings: GridSettings, ports: GridPorts) -> Self {
        let settings = settings.sanitized();
        let gate = ThrottleGate::new(settings.novel_request_window_ms, settings.repeat_request_window_ms);
        Self {
            state: GridState::default(),
            settings,
            query: Query::default(),
            draft: None,
            latest: None,
            latest_ticket: 0,
            latest_settled: true,
            fulfilled: None,
            gate,
            last_admitted: None,
            whitelist: FilterWhitelist::new(),
            template: None,
            page_numbers_shown: 0,
            end_marker_visible: false,
            next_ticket: 0,
            endpoint,
            factory,
            ports,
        }
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn whitelist(&self) -> &FilterWhitelist {
        &self.whitelist
    }

    pub fn filter_menu_template(&self) -> Option<&FilterMenuTemplate> {
        self.template.as_ref()
    }

    /// The request currently awaiting its response, if any
    pub fn in_flight(&self) -> Option<&GridRequest> {
        if self.latest_settled {
            None
        } else {
            self.latest.as_ref()
        }
    }

    pub fn fulfilled(&self) -> Option<&GridRequest> {
        self.fulfilled.as_ref()
    }

    /// Time until the throttle admits any request, `None` when it already does
    pub fn throttle_remaining_ms(&self) -> Option<u64> {
        self.gate.remaining_ms(self.ports.clock.now_ms())
    }

    /// Only used to pick the items-per-page target on the next page-size computation
    pub fn set_narrow(&mut self, narrow: bool) {
        self.state.narrow = narrow;
    }

    /// Reset state for `options` and dispatch the first load. Never throttled.
    pub fn initialize(&mut self, options: GridOptions) -> Dispatch {
        let pages_enabled = options.pages_enabled && options.direction == GrowthDirection::Vertical;
        if options.pages_enabled && !pages_enabled {
            warn!("paging is only supported for vertical grids, disabling it");
        }

        self.state = GridState {
            max_products: options.max_products.max(0),
            direction: options.direction,
            pages_enabled,
            filter_menu_enabled: options.filter_menu_enabled,
            narrow: options.narrow,
            ..GridState::default()
        };
        self.whitelist = options.whitelist;
        self.query = options.initial_query.unwrap_or_default();
        self.template = None;
        self.fulfilled = None;
        self.last_admitted = None;
        self.page_numbers_shown = 0;
        self.end_marker_visible = false;
        self.gate.reset();

        if pages_enabled {
            self.ports.view.show_page_bar();
        }
        if options.direction == GrowthDirection::Horizontal {
            self.ports.view.show_horizontal_bar();
        }

        let draft = self.build_draft(Some(0), self.state.page_index);
        let now = self.ports.clock.now_ms();
        self.gate.record(now);
        info!(query = ?self.query, "initializing product grid");
        self.dispatch(draft, now)
    }

    // ========================
    // Draft & Admission
    // ========================

    /// Assemble the next request for `page_index`, starting at `start` or pointer+1
    fn build_draft(&mut self, start: Option<i64>, page_index: i64) -> GridRequest {
        let start_index = start.unwrap_or(self.state.pointer + 1);

        // Smallest defined bound wins; each is "last allowed index - start"
        let bounds = [
            self.state.last_available_index.map(|last| last - start_index),
            self.state
                .cap_active()
                .then(|| self.state.max_products - 1 - start_index),
            self.state
                .paging()
                .map(|size| (page_index + 1) * size - 1 - start_index),
        ];
        let available_space = bounds.into_iter().flatten().min();

        // Bounds are inclusive indices, so `space` is one less than the slots left
        let length = match (available_space, self.state.block_size) {
            (None, _) => None,
            (Some(space), Some(block)) if space >= block => None,
            // Slots from start through the last allowed index
            (Some(space), _) if space >= 0 => Some(space + 1),
            (Some(_), _) => None,
        };

        let carry_last_index = self
            .in_flight()
            .map(|request| request.get_last_available_index)
            .unwrap_or(false);

        let draft = GridRequest {
            start_index,
            length,
            query: self.query.clone(),
            get_block_size: self.state.block_size.is_none(),
            get_last_available_index: self.state.last_available_index.is_none() || carry_last_index,
            get_filter_menu_template: self.state.filter_menu_enabled && self.template.is_none(),
        };
        self.draft = Some(draft.clone());
        draft
    }

    /// Range and duplicate checks. `Ok(false)` means drop the attempt.
    fn check_preconditions(&self, draft: &GridRequest) -> Result<bool, StateInvariantError> {
        if let Some(fulfilled) = &self.fulfilled {
            if equal_requests(draft, fulfilled)? {
                debug!(start = draft.start_index, "draft equals the fulfilled request");
                return Ok(false);
            }
        }
        if let Some(last) = self.state.last_available_index {
            // `last` is inclusive: starting exactly on it still fetches one item
            if draft.start_index > last {
                debug!(start = draft.start_index, last, "nothing left to fetch");
                return Ok(false);
            }
        }
        if self.state.cap_active() && draft.start_index + 1 > self.state.max_products {
            debug!(start = draft.start_index, cap = self.state.max_products, "product cap reached");
            return Ok(false);
        }
        if let Some(size) = self.state.paging() {
            let first = self.state.page_index * size;
            let last = first + size - 1;
            if draft.start_index < first || draft.start_index > last {
                debug!(start = draft.start_index, first, last, "draft outside current page");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn admit(&mut self, draft: &GridRequest, now: u64) -> Result<bool, StateInvariantError> {
        let is_repeat = match &self.last_admitted {
            Some(previous) => equal_requests(draft, previous)?,
            None => false,
        };
        let admitted = self.gate.admit(now, is_repeat);
        if !admitted {
            warn!(start = draft.start_index, is_repeat, "request throttled");
        }
        Ok(admitted)
    }

    fn dispatch(&mut self, draft: GridRequest, now: u64) -> Dispatch {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let url = self.endpoint.request_url(&draft);
        debug!(ticket, %url, "dispatching catalog request");

        self.latest = Some(draft.clone());
        self.latest_ticket = ticket;
        self.latest_settled = false;
        self.last_admitted = Some(draft.clone());
        self.state.last_request_ms = Some(now);
        self.draft = None;

        Dispatch {
            ticket,
            request: draft,
            url,
        }
    }

    // ========================
    // Inputs
    // ========================

    /// The end of the grid came into view
    pub fn on_scroll_near_end(&mut self) -> Result<Option<Dispatch>, GridError> {
        let draft = self.build_draft(None, self.state.page_index);
        let outcome = self.admit_general(draft);
        if !matches!(outcome, Ok(Some(_))) {
            self.draft = None;
        }
        outcome
    }

    fn admit_general(&mut self, draft: GridRequest) -> Result<Option<Dispatch>, GridError> {
        draft.validate_range()?;
        if !self.check_preconditions(&draft)? {
            return Ok(None);
        }
        let now = self.ports.clock.now_ms();
        if !self.admit(&draft, now)? {
            return Ok(None);
        }
        Ok(Some(self.dispatch(draft, now)))
    }

    /// Jump to a 0-based page. Skips the range preconditions but not the throttle.
    pub fn change_page(&mut self, page_index: i64) -> Result<Option<Dispatch>, GridError> {
        if !self.state.pages_enabled {
            warn!(page_index, "page change ignored, paging is disabled");
            return Ok(None);
        }
        if page_index < 0 || (self.state.total_pages > 0 && page_index >= self.state.total_pages) {
            warn!(page_index, total = self.state.total_pages, "page change out of range");
            return Ok(None);
        }
        let target_pointer = match (page_index, self.state.page_size) {
            (0, _) => -1,
            // The page's end must be representable too
            (_, Some(size)) => match page_index.checked_add(1).and_then(|next| next.checked_mul(size)) {
                Some(_) => page_index * size - 1,
                None => {
                    warn!(page_index, size, "page index too large");
                    return Ok(None);
                }
            },
            (_, None) => {
                warn!(page_index, "page size not known yet");
                return Ok(None);
            }
        };
        self.enter_page(page_index, target_pointer)
    }

    fn enter_page(&mut self, page_index: i64, target_pointer: i64) -> Result<Option<Dispatch>, GridError> {
        let draft = self.build_draft(Some(target_pointer + 1), page_index);
        if let Err(err) = draft.validate_range() {
            self.draft = None;
            return Err(err.into());
        }
        let now = self.ports.clock.now_ms();
        let admitted = match self.admit(&draft, now) {
            Ok(admitted) => admitted,
            Err(err) => {
                self.draft = None;
                return Err(err.into());
            }
        };
        if !admitted {
            self.draft = None;
            return Ok(None);
        }

        self.update_history(page_index);
        self.clear_grid();
        self.state.pointer = target_pointer;
        self.state.page_index = page_index;
        self.highlight_current_page();
        self.update_end_marker();
        Ok(Some(self.dispatch(draft, now)))
    }

    /// Adopt a new query and reload from page 0.
    ///
    /// Filters not offered by the catalog are dropped. If the throttle rejects
    /// the reload, the previous query stays in place.
    pub fn apply_query(&mut self, query: Query) -> Result<Option<Dispatch>, GridError> {
        let query = self.sanitize_query(query);
        let previous_query = std::mem::replace(&mut self.query, query);
        let previous_last = self.state.last_available_index.take();

        match self.enter_page(0, -1) {
            Ok(Some(dispatch)) => {
                info!(query = ?self.query, "query applied");
                Ok(Some(dispatch))
            }
            other => {
                self.query = previous_query;
                self.state.last_available_index = previous_last;
                other
            }
        }
    }

    /// The query in the address bar, read against every filter known so far.
    /// `None` when it is the query already in use.
    pub fn query_from_location(&self) -> Option<Query> {
        let location = self.ports.history.current_location();
        let parsed = parse(&location, &self.whitelist).unwrap_or_default();
        (!equal_queries(&parsed, &self.query)).then_some(parsed)
    }

    fn sanitize_query(&self, mut query: Query) -> Query {
        if let Err(err) = check_query(&query, &self.whitelist) {
            warn!(%err, "query failed validation, dropping offending parts");
            if matches!(&query.search_string, Some(s) if s.is_empty()) {
                query.search_string = None;
            }
            query.filters.retain(|f| is_valid_filter(f, &self.whitelist));
        }
        query
    }

    // ========================
    // Reconciliation
    // ========================

    /// Apply the outcome of a dispatched fetch
    pub fn complete(
        &mut self,
        dispatch: Dispatch,
        outcome: Result<GridResponse, ProtocolError>,
    ) -> Reconciliation {
        let Dispatch { ticket, request: sent, .. } = dispatch;
        if ticket == self.latest_ticket {
            self.latest_settled = true;
        }
        let mut summary = Reconciliation {
            ticket,
            ..Default::default()
        };

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                error!(ticket, %err, "catalog fetch failed");
                summary.failed = Some(err);
                return summary;
            }
        };

        let query_changed = !equal_queries(&sent.query, &self.query);
        let superseded = match &self.latest {
            Some(latest) => !equal_requests(&sent, latest).unwrap_or(false),
            None => true,
        };
        let already_applied = match &self.fulfilled {
            Some(fulfilled) => equal_requests(&sent, fulfilled).unwrap_or(false),
            None => false,
        };

        // Scalar facts, write-once while unknown
        let mut learned = false;
        match response.block_size {
            Some(block) if block > 0 => {
                if self.state.block_size.is_none() {
                    self.state.block_size = Some(block);
                    learned = true;
                }
            }
            Some(block) => warn!(block, "ignoring non-positive block size"),
            None => {}
        }
        match response.last_available_index {
            Some(last) if query_changed => {
                debug!(ticket, last, "discarding last available index for an abandoned query");
                summary.last_index_discarded = true;
            }
            Some(last) if last >= 0 => {
                if self.state.last_available_index.is_none() {
                    self.state.last_available_index = Some(last);
                    learned = true;
                }
            }
            Some(last) => warn!(last, "ignoring negative last available index"),
            None => {}
        }
        if learned {
            self.resync_pages();
        }

        if query_changed || superseded || already_applied {
            if !response.items.is_empty() {
                warn!(ticket, query_changed, superseded, already_applied, "discarding stale items");
            }
            summary.items_discarded = true;
        } else {
            self.render_items(&sent, &response, &mut summary);
        }

        if let Some(raw) = response.filter_menu_template {
            self.adopt_template(raw);
        }

        self.update_end_marker();
        summary
    }

    fn render_items(&mut self, sent: &GridRequest, response: &GridResponse, summary: &mut Reconciliation) {
        for (offset, raw) in response.items.iter().enumerate() {
            if self.state.cap_active() && self.state.product_count >= self.state.max_products {
                debug!(cap = self.state.max_products, "product cap reached mid-batch");
                break;
            }
            match self.factory.create_entry(raw) {
                Ok(unit) => {
                    self.ports.view.append_unit(unit);
                    self.state.product_count += 1;
                    summary.rendered += 1;
                }
                Err(err) => {
                    error!(index = sent.start_index + offset as i64, %err, "skipping invalid product entry");
                    summary.skipped += 1;
                }
            }
            self.state.pointer = self.state.pointer.max(sent.start_index + offset as i64);
        }

        if summary.rendered == 0 {
            return;
        }
        self.fulfilled = Some(sent.clone());
        if self.state.block_size.is_none() && response.items.len() >= MIN_INFERRED_BLOCK_SIZE {
            debug!(block = response.items.len(), "inferring block size from batch length");
            self.state.block_size = Some(response.items.len() as i64);
        }
        self.resync_pages();
    }

    fn adopt_template(&mut self, raw: serde_json::Value) {
        match FilterMenuTemplate::from_value(raw) {
            Ok(template) => {
                self.whitelist.extend(FilterWhitelist::from_template(&template));
                self.ports.filter_menu.apply_template(&template);
                self.template = Some(template);
            }
            Err(err) => error!(%err, "ignoring filter menu template"),
        }
    }

    // ========================
    // Sub-views
    // ========================

    fn resync_pages(&mut self) {
        if let Some(block) = self.state.block_size {
            let target = if self.state.narrow {
                self.settings.narrow_items_per_page
            } else {
                self.settings.wide_items_per_page
            };
            let size = nearest_multiple(block, target);
            self.state.page_size = Some(if size <= 0 { target } else { size });
        }
        if let (Some(last), Some(size)) = (self.state.last_available_index, self.state.page_size) {
            if size > 0 {
                self.state.total_pages = (last + size) / size;
            }
        }

        if !self.state.pages_enabled {
            return;
        }
        let total = self.state.total_pages;
        if total > self.page_numbers_shown {
            self.ports.view.append_page_numbers(self.page_numbers_shown..total);
        } else if total < self.page_numbers_shown {
            self.ports.view.truncate_page_numbers(total);
        }
        self.page_numbers_shown = total;
        self.highlight_current_page();
    }

    fn highlight_current_page(&mut self) {
        if self.state.pages_enabled {
            self.ports.view.highlight_page(self.state.page_index);
        }
    }

    /// Remove rendered units, keeping pointer and count in step with what remains
    fn clear_grid(&mut self) {
        let removed = self.ports.view.clear_units() as i64;
        self.state.product_count -= removed;
        self.state.pointer -= removed;
        // Nothing fulfilled is on screen any more
        self.fulfilled = None;
    }

    fn update_end_marker(&mut self) {
        let visible = end_of_results_visible(self.state.pointer, self.state.last_available_index);
        if visible != self.end_marker_visible {
            self.end_marker_visible = visible;
            self.ports.view.set_end_of_results(visible);
        }
    }

    fn update_history(&mut self, page_index: i64) {
        let location = self.ports.history.current_location();
        let mut base = match Url::parse(&location) {
            Ok(url) => url,
            Err(err) => {
                warn!(%err, %location, "cannot read current location, history left alone");
                return;
            }
        };
        base.set_query(None);
        base.set_fragment(None);
        let target = serialize(&base, &self.query, page_index);
        sync_history(self.ports.history.as_mut(), &target);
    }
}

/// Multiple of `block` closest to `target`, possibly 0
fn nearest_multiple(block: i64, target: i64) -> i64 {
    ((target + block / 2) / block) * block
}

/// Shown iff both are known and the last available item has been rendered
pub(crate) fn end_of_results_visible(pointer: i64, last_available_index: Option<i64>) -> bool {
    match last_available_index {
        Some(last) if pointer >= 0 && last >= 0 => pointer >= last,
        _ => false,
    }
}
