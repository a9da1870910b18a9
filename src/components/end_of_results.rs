//! End of Results Component

use leptos::prelude::*;

use crate::store::{use_grid_bar, GridBarStateStoreFields};

#[component]
pub fn EndOfResults() -> impl IntoView {
    let bar = use_grid_bar();

    view! {
        <Show when=move || bar.end_of_results().get()>
            <p class="end-of-results">"You have reached the end of the catalog."</p>
        </Show>
    }
}
