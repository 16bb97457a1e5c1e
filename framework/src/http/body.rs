//! Body collection and typed parsing for HTTP requests

use crate::error::FrameworkError;
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use serde::de::DeserializeOwned;

/// Collect the full body from an Incoming stream, up to `limit` bytes
pub async fn collect_body(body: Incoming, limit: usize) -> Result<Bytes, FrameworkError> {
    Limited::new(body, limit)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                FrameworkError::PayloadTooLarge { limit }
            } else {
                FrameworkError::internal(format!("Failed to read request body: {}", e))
            }
        })
}

/// Parse bytes as JSON into the target type
pub fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FrameworkError> {
    serde_json::from_slice(bytes)
        .map_err(|e| FrameworkError::domain(format!("Failed to parse JSON body: {}", e), 400))
}

/// Parse bytes as form-urlencoded into the target type
pub fn parse_form<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FrameworkError> {
    serde_urlencoded::from_bytes(bytes)
        .map_err(|e| FrameworkError::domain(format!("Failed to parse form body: {}", e), 400))
}
