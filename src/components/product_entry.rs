//! Product Entry Component
//!
//! Renders one pooled display unit. The unit pushes its fields through an
//! observer; the component itself never holds on to the unit.

use grid_engine::{DisplayUnit, RenderedEntry};
use leptos::prelude::*;

#[component]
pub fn ProductEntry(unit: DisplayUnit, skeleton: RwSignal<Option<String>>) -> impl IntoView {
    let (entry, set_entry) = signal(unit.rendered());
    unit.observe(move |rendered| set_entry.set(rendered.cloned()));

    let field = move |pick: fn(&RenderedEntry) -> String| {
        move || entry.with(|e| e.as_ref().map(pick).unwrap_or_default())
    };

    view! {
        <article class="product-entry" class:pending=move || entry.with(Option::is_none)>
            <div class="entry-skeleton" inner_html=move || skeleton.get().unwrap_or_default()></div>
            <a class="entry-link" href=move || entry.with(|e| e.as_ref().map(|e| e.href.clone()))>
                <img class="entry-image" src=field(|e| e.image_src.clone()) alt=field(|e| e.name.clone()) />
                <h3 class="entry-name">{field(|e| e.name.clone())}</h3>
                <p class="entry-culture">{field(|e| e.culture.clone())}</p>
                <p class="entry-price">{field(|e| e.price.clone())}</p>
            </a>
        </article>
    }
}
