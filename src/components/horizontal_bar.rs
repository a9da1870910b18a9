//! Horizontal Bar Component
//!
//! Scroll buttons for horizontally growing grids.

use leptos::html::Div;
use leptos::prelude::*;

use crate::store::{use_grid_bar, GridBarStateStoreFields};

/// Scroll `container` by one visible width in `direction` (-1 or 1)
fn scroll_by_page(container: NodeRef<Div>, direction: f64) {
    if let Some(el) = container.get_untracked() {
        el.scroll_by_with_x_and_y(direction * el.client_width() as f64, 0.0);
    }
}

#[component]
pub fn HorizontalBar(container: NodeRef<Div>) -> impl IntoView {
    let bar = use_grid_bar();

    view! {
        <Show when=move || bar.horizontal_bar_visible().get()>
            <div class="horizontal-bar">
                <button class="scroll-back" on:click=move |_| scroll_by_page(container, -1.0)>"‹"</button>
                <button class="scroll-forward" on:click=move |_| scroll_by_page(container, 1.0)>"›"</button>
            </div>
        </Show>
    }
}
