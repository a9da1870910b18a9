//! Catalog Fetch
//!
//! Performs the GET the grid controller hands out and maps failures onto
//! `ProtocolError`.

use gloo_net::http::Request;
use grid_engine::{decode_response, GridResponse, ProtocolError};
use url::Url;

pub async fn fetch_catalog(url: &Url) -> Result<GridResponse, ProtocolError> {
    let response = Request::get(url.as_str())
        .send()
        .await
        .map_err(|e| ProtocolError::Transport(e.to_string()))?;
    if !response.ok() {
        return Err(ProtocolError::Status(response.status()));
    }
    let body = response
        .text()
        .await
        .map_err(|e| ProtocolError::Transport(e.to_string()))?;
    decode_response(&body)
}
