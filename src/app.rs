//! Storefront App
//!
//! Header, filter menu and product grid. Builds the grid handle from the
//! config and seeds it from the current URL.

use gloo_timers::future::TimeoutFuture;
use grid_engine::{parse, parse_page, FilterWhitelist};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_viewport::{create_media_signal, NARROW_LAYOUT_QUERY};
use reactive_stores::Store;
use tracing::{error, info, warn};

use crate::bridge;
use crate::components::{FilterMenuPanel, Header, ProductGrid};
use crate::config::StorefrontConfig;
use crate::context::GridHandle;
use crate::store::{GridBarState, GridBarStore};

#[component]
pub fn App(config: StorefrontConfig) -> impl IntoView {
    let narrow = create_media_signal(NARROW_LAYOUT_QUERY);
    let bar: GridBarStore = Store::new(GridBarState::default());
    provide_context(bar);

    let grid = config
        .origin_url(&bridge::current_origin())
        .and_then(|origin| GridHandle::new(&config, &origin, bar));
    let grid = match grid {
        Ok(grid) => Some(grid),
        Err(err) => {
            error!(%err, "product grid disabled");
            None
        }
    };

    if let Some(grid) = grid {
        provide_context(grid);

        // No template yet, so only the search string and sort survive for now
        let href = bridge::current_href();
        let initial_query = parse(&href, &FilterWhitelist::new());
        info!(?initial_query, "starting product grid");
        grid.start(
            config.grid_options(initial_query, narrow.get_untracked()),
            config.entry_markup_url.clone(),
        );

        Effect::new(move |_| grid.set_narrow(narrow.get()));

        // The first load always starts at 0; jump once the page size is known
        let page = parse_page(&href).filter(|page| *page > 0);
        if let Some(page) = page {
            let wait = config.novel_request_window_ms as u32;
            spawn_local(async move {
                TimeoutFuture::new(wait).await;
                restore_page(grid, page);
            });
        }

        // URL filters can only be checked once the catalog has named them
        let filters_checked = StoredValue::new(false);
        Effect::new(move |_| {
            if grid.filter_template.with(Option::is_none) || filters_checked.get_value() {
                return;
            }
            filters_checked.set_value(true);
            spawn_local(async move {
                wait_for_throttle(grid).await;
                if !grid.restore_location_query() {
                    return;
                }
                info!("restored filters from the URL");
                // Applying the query went back to page 0
                if let Some(page) = page {
                    wait_for_throttle(grid).await;
                    restore_page(grid, page);
                }
            });
        });
    }

    let on_search = Callback::new(move |text: String| {
        if let Some(grid) = grid {
            grid.search(&text);
        }
    });

    view! {
        <Header narrow=narrow on_search=on_search />
        <main class="storefront">
            <FilterMenuPanel />
            <ProductGrid />
        </main>
    }
}

async fn wait_for_throttle(grid: GridHandle) {
    if let Some(wait) = grid.throttle_remaining_ms() {
        TimeoutFuture::new(wait.min(u32::MAX as u64) as u32).await;
    }
}

fn restore_page(grid: GridHandle, page: i64) {
    if !grid.change_page(page) {
        warn!(page, "could not restore page from the URL");
    }
}
