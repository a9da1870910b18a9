//! Entry Markup
//!
//! Loads the product entry skeleton once per session and hands it to the
//! factory, which releases every entry waiting on it.

use gloo_net::http::Request;
use grid_engine::EntryFactory;
use tracing::{debug, error};

async fn fetch_text(url: &str) -> Result<String, String> {
    let response = Request::get(url).send().await.map_err(|e| e.to_string())?;
    if !response.ok() {
        return Err(format!("HTTP {}", response.status()));
    }
    response.text().await.map_err(|e| e.to_string())
}

/// Entries render with bare markup when the skeleton cannot be loaded
pub async fn load_entry_markup(url: &str, factory: &EntryFactory) {
    match fetch_text(url).await {
        Ok(markup) => {
            debug!(url, bytes = markup.len(), "entry skeleton loaded");
            factory.provide_markup(markup);
        }
        Err(err) => {
            error!(url, %err, "entry skeleton failed to load, using bare entries");
            factory.provide_markup("");
        }
    }
}
