//! Catalog Models
//!
//! Data structures exchanged with the catalog endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{StateInvariantError, ValidationError};

// ========================
// Query
// ========================

/// One active filter: a category type narrowed to one category ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "categoryType")]
    pub category_type: String,
    #[serde(rename = "categoryID")]
    pub category_id: String,
}

impl Filter {
    pub fn new(category_type: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            category_type: category_type.into(),
            category_id: category_id.into(),
        }
    }
}

/// What the shopper is looking for. Compared structurally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub search_string: Option<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    pub sort: Option<String>,
}

impl Query {
    pub fn search(search_string: impl Into<String>) -> Self {
        Self {
            search_string: Some(search_string.into()),
            ..Default::default()
        }
    }

    /// Add a filter; an existing filter on the same category type is replaced
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.retain(|f| f.category_type != filter.category_type);
        self.filters.push(filter);
        self
    }

    pub fn without_filter(mut self, category_type: &str) -> Self {
        self.filters.retain(|f| f.category_type != category_type);
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search_string.is_none() && self.filters.is_empty() && self.sort.is_none()
    }
}

// ========================
// Request / Response
// ========================

/// One paging request against the catalog.
///
/// The `get_*` flags are one-shot directives asking the server to include
/// a derived value in its answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridRequest {
    pub start_index: i64,
    /// `None` lets the server apply its block size
    pub length: Option<i64>,
    pub query: Query,
    pub get_block_size: bool,
    pub get_last_available_index: bool,
    pub get_filter_menu_template: bool,
}

impl GridRequest {
    /// Start must be non-negative and length, when present, positive
    pub fn validate_range(&self) -> Result<(), StateInvariantError> {
        if self.start_index < 0 {
            return Err(StateInvariantError::NegativeStart(self.start_index));
        }
        match self.length {
            Some(length) if length <= 0 => Err(StateInvariantError::NonPositiveLength(length)),
            _ => Ok(()),
        }
    }
}

/// Catalog answer. Items stay raw so each one is validated on its own.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GridResponse {
    #[serde(rename = "productEntries", default)]
    pub items: Vec<Value>,
    #[serde(rename = "blockSize", default)]
    pub block_size: Option<i64>,
    #[serde(rename = "lastAvailableID", default)]
    pub last_available_index: Option<i64>,
    #[serde(rename = "productFilterMenuTemplate", default)]
    pub filter_menu_template: Option<Value>,
}

// ========================
// Item Data
// ========================

/// Validated data for one catalog item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemData {
    pub image_url: Url,
    pub display_name: String,
    pub culture_label: String,
    pub price_minor_units: u64,
    pub detail_url: Url,
}

impl ItemData {
    /// Validate a raw `productEntries` element. Relative URLs resolve against `origin`.
    pub fn from_json(raw: &Value, origin: &Url) -> Result<Self, ValidationError> {
        let object = raw.as_object().ok_or(ValidationError::NotAnObject)?;

        let text = |field: &'static str| -> Result<String, ValidationError> {
            match object.get(field) {
                None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
                Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
                Some(_) => Err(ValidationError::EmptyField(field)),
            }
        };
        let link = |field: &'static str| -> Result<Url, ValidationError> {
            let value = text(field)?;
            origin.join(&value).map_err(|_| ValidationError::InvalidUrl { field, value })
        };

        let image_url = link("imgSrc")?;
        let display_name = text("name")?;
        let culture_label = text("culture")?;
        let price_minor_units = match object.get("priceCents") {
            None | Some(Value::Null) => return Err(ValidationError::MissingField("priceCents")),
            Some(value) => value.as_u64().ok_or(ValidationError::InvalidPrice)?,
        };
        let detail_url = link("productURL")?;

        Ok(Self {
            image_url,
            display_name,
            culture_label,
            price_minor_units,
            detail_url,
        })
    }
}

// ========================
// Filter Menu Template
// ========================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryIdEntry {
    pub display_name: String,
    #[serde(rename = "categoryID")]
    pub category_id: String,
    #[serde(default)]
    pub img_src: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTypeEntry {
    pub display_name: String,
    pub category_type: String,
    #[serde(rename = "categoryIDs", default)]
    pub category_ids: Vec<CategoryIdEntry>,
}

/// The menu of filters the catalog offers, as served by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterMenuTemplate {
    #[serde(default)]
    pub category_types: Vec<CategoryTypeEntry>,
}

impl FilterMenuTemplate {
    pub fn from_value(raw: Value) -> Result<Self, ValidationError> {
        serde_json::from_value(raw).map_err(|e| ValidationError::MalformedTemplate(e.to_string()))
    }
}
