//! Storefront Frontend Entry Point

mod config;
mod api;
mod bridge;
mod store;
mod context;
mod components;
mod app;

use app::App;
use config::StorefrontConfig;
use leptos::prelude::*;
use tracing::{info, warn};

fn main() {
    console_error_panic_hook::set_once();

    let (config, problem) = match StorefrontConfig::from_window() {
        Ok(config) => (config, None),
        Err(err) => (StorefrontConfig::default(), Some(err)),
    };
    if let Err(err) = ring_logger::init(config.level_filter(), config.log_capacity) {
        web_sys::console::warn_1(&format!("logger not installed: {err}").into());
    }
    if let Some(err) = problem {
        warn!(%err, "using default storefront config");
    }
    info!(endpoint = %config.catalog_endpoint, "storefront starting");

    mount_to_body(move || view! { <App config=config /> });
}
