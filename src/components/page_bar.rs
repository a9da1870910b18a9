//! Page Bar Component
//!
//! One link per known page; the current page is highlighted.

use leptos::prelude::*;

use crate::context::use_grid;
use crate::store::{use_grid_bar, GridBarStateStoreFields};

#[component]
pub fn PageBar() -> impl IntoView {
    let bar = use_grid_bar();
    let grid = use_grid();

    view! {
        <Show when=move || bar.page_bar_visible().get()>
            <nav class="page-bar" class:loading=move || bar.loading().get()>
                <For
                    each=move || bar.page_numbers().get()
                    key=|page| *page
                    children=move |page| {
                        let is_current = move || bar.current_page().get() == page;
                        view! {
                            <button
                                class="page-number"
                                class:current=is_current
                                on:click=move |_| {
                                    if let Some(grid) = grid {
                                        grid.change_page(page);
                                    }
                                }
                            >
                                {page + 1}
                            </button>
                        }
                    }
                />
            </nav>
        </Show>
    }
}
