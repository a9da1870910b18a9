//! Storefront Configuration
//!
//! Read once at startup from `window.storefrontConfig`. Every field has a
//! default so a partial object is fine.

use grid_engine::{GridOptions, GridSettings, GrowthDirection, Query};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;
use wasm_bindgen::JsValue;

const CONFIG_GLOBAL: &str = "storefrontConfig";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("window.storefrontConfig is not set")]
    Missing,
    #[error("window.storefrontConfig is malformed: {0}")]
    Malformed(String),
    #[error("invalid URL `{value}`: {reason}")]
    InvalidUrl { value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorefrontConfig {
    pub catalog_endpoint: String,
    pub entry_markup_url: String,
    /// Resolves relative links; the page origin when unset
    pub origin: Option<String>,
    pub max_products: i64,
    pub pages_enabled: bool,
    pub filter_menu_enabled: bool,
    pub direction: GrowthDirection,
    pub narrow_items_per_page: i64,
    pub wide_items_per_page: i64,
    pub novel_request_window_ms: u64,
    pub repeat_request_window_ms: u64,
    pub log_level: String,
    pub log_capacity: usize,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        let settings = GridSettings::default();
        Self {
            catalog_endpoint: "/api/product-grid".into(),
            entry_markup_url: "/components/product-entry.html".into(),
            origin: None,
            max_products: 0,
            pages_enabled: true,
            filter_menu_enabled: true,
            direction: GrowthDirection::Vertical,
            narrow_items_per_page: settings.narrow_items_per_page,
            wide_items_per_page: settings.wide_items_per_page,
            novel_request_window_ms: settings.novel_request_window_ms,
            repeat_request_window_ms: settings.repeat_request_window_ms,
            log_level: "info".into(),
            log_capacity: 256,
        }
    }
}

impl StorefrontConfig {
    /// Read `window.storefrontConfig`
    pub fn from_window() -> Result<Self, ConfigError> {
        let window = web_sys::window().ok_or(ConfigError::Missing)?;
        let raw = js_sys::Reflect::get(&window, &JsValue::from_str(CONFIG_GLOBAL))
            .map_err(|_| ConfigError::Missing)?;
        if raw.is_undefined() || raw.is_null() {
            return Err(ConfigError::Missing);
        }
        serde_wasm_bindgen::from_value(raw).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    /// Unknown level names fall back to `info`
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::INFO)
    }

    pub fn origin_url(&self, page_origin: &str) -> Result<Url, ConfigError> {
        let value = self.origin.as_deref().unwrap_or(page_origin);
        Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
            value: value.to_string(),
            reason: e.to_string(),
        })
    }

    /// Catalog endpoint, relative paths resolved against `origin`
    pub fn endpoint_url(&self, origin: &Url) -> Result<Url, ConfigError> {
        origin.join(&self.catalog_endpoint).map_err(|e| ConfigError::InvalidUrl {
            value: self.catalog_endpoint.clone(),
            reason: e.to_string(),
        })
    }

    pub fn settings(&self) -> GridSettings {
        GridSettings {
            narrow_items_per_page: self.narrow_items_per_page,
            wide_items_per_page: self.wide_items_per_page,
            novel_request_window_ms: self.novel_request_window_ms,
            repeat_request_window_ms: self.repeat_request_window_ms,
        }
    }

    pub fn grid_options(&self, initial_query: Option<Query>, narrow: bool) -> GridOptions {
        GridOptions {
            direction: self.direction,
            max_products: self.max_products,
            pages_enabled: self.pages_enabled,
            filter_menu_enabled: self.filter_menu_enabled,
            initial_query,
            narrow,
            ..Default::default()
        }
    }
}
