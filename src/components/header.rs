//! Header Component
//!
//! Wide header with inline search; narrow header with a search toggle.
//! Switches on the layout breakpoint signal.

use leptos::prelude::*;

#[component]
pub fn Header(
    narrow: ReadSignal<bool>,
    #[prop(into)] on_search: Callback<String>,
) -> impl IntoView {
    let (search_open, set_search_open) = signal(false);
    let (search_text, set_search_text) = signal(String::new());

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        on_search.run(search_text.get_untracked());
        set_search_open.set(false);
    };

    let search_form = move || {
        view! {
            <form class="header-search" on:submit=on_submit>
                <input
                    type="search"
                    placeholder="Search the catalog"
                    prop:value=move || search_text.get()
                    on:input=move |ev| set_search_text.set(event_target_value(&ev))
                />
                <button type="submit">"Search"</button>
            </form>
        }
    };

    // Leaving the narrow layout closes the mobile search
    Effect::new(move |_| {
        if !narrow.get() {
            set_search_open.set(false);
        }
    });

    move || if narrow.get() {
        view! {
            <header class="site-header narrow">
                <a class="logo" href="/">"Storefront"</a>
                <button
                    class="search-toggle"
                    class:open=move || search_open.get()
                    on:click=move |_| set_search_open.update(|open| *open = !*open)
                >
                    "Search"
                </button>
                {move || search_open.get().then(search_form)}
            </header>
        }.into_any()
    } else {
        view! {
            <header class="site-header wide">
                <a class="logo" href="/">"Storefront"</a>
                <nav class="site-nav">
                    <a href="/">"Catalog"</a>
                    <a href="/about">"About"</a>
                </nav>
                {search_form()}
            </header>
        }.into_any()
    }
}
