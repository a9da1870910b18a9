//! Catalog Endpoint
//!
//! Wire format of the product grid fetch: query parameters out, JSON in.

use url::Url;

use crate::error::ProtocolError;
use crate::models::{GridRequest, GridResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEndpoint {
    base: Url,
}

impl CatalogEndpoint {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Build the GET URL for one request
    pub fn request_url(&self, request: &GridRequest) -> Url {
        let mut url = self.base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("start-id", &request.start_index.to_string());
            if let Some(length) = request.length {
                pairs.append_pair("length", &length.to_string());
            }
            if let Some(search) = &request.query.search_string {
                pairs.append_pair("search-str", search);
            }
            for filter in &request.query.filters {
                pairs.append_pair(&filter.category_type, &filter.category_id);
            }
            if let Some(sort) = &request.query.sort {
                pairs.append_pair("sort", sort);
            }
            if request.get_block_size {
                pairs.append_pair("get-block-size", "true");
            }
            if request.get_last_available_index {
                pairs.append_pair("get-last-available-id", "true");
            }
            if request.get_filter_menu_template {
                pairs.append_pair("get-product-filter-menu-template", "true");
            }
        }
        url
    }
}

/// Decode a response body into a [`GridResponse`]
pub fn decode_response(body: &str) -> Result<GridResponse, ProtocolError> {
    Ok(serde_json::from_str(body)?)
}
