mod body;
mod form;
mod lifecycle;
mod request;
mod response;

pub use body::{collect_body, parse_form, parse_json};
pub use form::{nest_pairs, parse_params};
pub use lifecycle::{RequestLifecycle, UploadedFile};
pub use request::{Request, RequestContext};
pub use response::{HttpResponse, Response};

/// Error type for missing route parameters
#[derive(Debug)]
pub struct ParamError {
    pub param_name: String,
}

impl From<ParamError> for crate::error::FrameworkError {
    fn from(err: ParamError) -> crate::error::FrameworkError {
        crate::error::FrameworkError::ParamError {
            param_name: err.param_name,
        }
    }
}

impl From<ParamError> for HttpResponse {
    fn from(err: ParamError) -> HttpResponse {
        crate::error::FrameworkError::from(err).into()
    }
}

/// Create a text response
pub fn text(body: impl Into<String>) -> Response {
    Ok(HttpResponse::text(body))
}

/// Create a JSON response from a serde_json::Value
pub fn json(body: serde_json::Value) -> Response {
    Ok(HttpResponse::json(body))
}
