//! Filter Menu Component
//!
//! Renders the catalog's filter template as category groups. Toggling a
//! category rebuilds the query and reloads the grid from page 0.

use grid_engine::{CategoryIdEntry, Filter};
use leptos::prelude::*;

use crate::context::{use_grid, GridHandle};

fn filter_toggle(grid: GridHandle, category_type: String, entry: CategoryIdEntry) -> impl IntoView {
    let filter = Filter::new(category_type, entry.category_id);
    let active_filter = filter.clone();
    let is_active = move || grid.query.with(|q| q.filters.contains(&active_filter));

    view! {
        <button
            class="filter-toggle"
            class:active=is_active
            on:click=move |_| {
                grid.toggle_filter(filter.clone());
            }
        >
            {entry.img_src.map(|src| view! { <img class="filter-icon" src=src alt="" /> })}
            <span>{entry.display_name}</span>
        </button>
    }
}

#[component]
pub fn FilterMenuPanel() -> impl IntoView {
    let Some(grid) = use_grid() else {
        return ().into_any();
    };
    let groups = move || {
        grid.filter_template
            .get()
            .map(|template| template.category_types)
            .unwrap_or_default()
    };

    view! {
        <aside class="filter-menu">
            <For
                each=groups
                key=|group| group.category_type.clone()
                children=move |group| {
                    let category_type = group.category_type.clone();
                    view! {
                        <fieldset class="filter-group">
                            <legend>{group.display_name}</legend>
                            {group
                                .category_ids
                                .into_iter()
                                .map(|entry| filter_toggle(grid, category_type.clone(), entry))
                                .collect_view()}
                        </fieldset>
                    }
                }
            />
        </aside>
    }
    .into_any()
}
