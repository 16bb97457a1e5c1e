use serde_json::{Map, Value};
use std::collections::HashMap;

/// Keyed parameters decoded from a route, query string or body
pub type Params = Map<String, Value>;

/// Route, query and body parameters negotiated for one request
///
/// Stored in the request extensions once negotiation succeeds. The three maps
/// are independent; merging them is left to the handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterContainer {
    route: Params,
    query: Params,
    body: Params,
}

impl ParameterContainer {
    pub fn new(route: Params, query: Params, body: Params) -> Self {
        Self { route, query, body }
    }

    pub fn route_params(&self) -> &Params {
        &self.route
    }

    pub fn query_params(&self) -> &Params {
        &self.query
    }

    pub fn body_params(&self) -> &Params {
        &self.body
    }

    /// Split into `(route, query, body)`
    pub fn into_parts(self) -> (Params, Params, Params) {
        (self.route, self.query, self.body)
    }
}

/// Convert matched route parameters to a `Params` map without transformation
pub fn route_params(params: &HashMap<String, String>) -> Params {
    params
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect()
}
