use super::body::{collect_body, parse_form, parse_json};
use super::form::parse_params;
use super::lifecycle::UploadedFile;
use super::ParamError;
use crate::error::FrameworkError;
use crate::negotiation::media::{self, FORM_URLENCODED};
use crate::negotiation::{ParameterContainer, Params};
use bytes::Bytes;
use http::request::Parts;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// HTTP request wrapper with route, query and body access
///
/// The body is collected up front so it can be inspected by content
/// negotiation and read again by the handler.
pub struct Request {
    parts: Parts,
    body: Bytes,
    params: HashMap<String, String>,
    form: Option<Params>,
}

impl Request {
    /// Wrap a request whose body is already in memory
    ///
    /// # Example
    ///
    /// ```rust
    /// use bytes::Bytes;
    /// use kit_negotiation::Request;
    ///
    /// let req = Request::new(
    ///     http::Request::builder()
    ///         .method("PUT")
    ///         .uri("/users/1?expand=roles")
    ///         .header("content-type", "application/json")
    ///         .body(Bytes::from_static(br#"{"name":"ann"}"#))
    ///         .unwrap(),
    /// );
    /// assert_eq!(req.path(), "/users/1");
    /// assert_eq!(req.query_params()["expand"], "roles");
    /// ```
    pub fn new(inner: http::Request<Bytes>) -> Self {
        let (parts, body) = inner.into_parts();
        Self {
            parts,
            body,
            params: HashMap::new(),
            form: None,
        }
    }

    /// Collect a hyper request body (bounded by `max_body_size`) and wrap it
    pub async fn from_hyper(
        inner: hyper::Request<hyper::body::Incoming>,
        max_body_size: usize,
    ) -> Result<Self, FrameworkError> {
        let (parts, body) = inner.into_parts();
        let body = collect_body(body, max_body_size).await?;
        Ok(Self::new(http::Request::from_parts(parts, body)))
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// Supply form fields decoded by the host (e.g. a POST multipart body)
    ///
    /// When set, these take the place of URL-decoding the body in
    /// [`Request::form_params`].
    pub fn with_form(mut self, fields: Params) -> Self {
        self.form = Some(fields);
        self
    }

    /// Get the request method
    pub fn method(&self) -> &http::Method {
        &self.parts.method
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Get a route parameter by name (e.g., /users/{id})
    /// Returns Err(ParamError) if the parameter is missing, enabling use of `?` operator
    pub fn param(&self, name: &str) -> Result<&str, ParamError> {
        self.params
            .get(name)
            .map(|s| s.as_str())
            .ok_or_else(|| ParamError {
                param_name: name.to_string(),
            })
    }

    /// Get all route parameters
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Get a header value by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Raw body bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Query string decoded into parameters
    pub fn query_params(&self) -> Params {
        self.parts
            .uri
            .query()
            .map(|query| parse_params(query.as_bytes()))
            .unwrap_or_default()
    }

    /// Conventional form fields
    ///
    /// Host-supplied fields win; otherwise an `application/x-www-form-urlencoded`
    /// body is decoded. Any other body yields no fields.
    pub fn form_params(&self) -> Params {
        if let Some(form) = &self.form {
            return form.clone();
        }
        if media::matches(self.content_type(), FORM_URLENCODED) {
            return parse_params(&self.body);
        }
        Params::new()
    }

    pub fn extensions(&self) -> &http::Extensions {
        &self.parts.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.parts.extensions
    }

    /// Parameters negotiated for this request, once the server has run negotiation
    pub fn parameters(&self) -> Option<&ParameterContainer> {
        self.parts.extensions.get::<ParameterContainer>()
    }

    /// Files uploaded with this request
    pub fn uploads(&self) -> &[UploadedFile] {
        self.parts
            .extensions
            .get::<Vec<UploadedFile>>()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Parse the request body as JSON
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// #[derive(Deserialize)]
    /// struct CreateUser { name: String, email: String }
    ///
    /// pub async fn store(req: Request) -> Response {
    ///     let data: CreateUser = req.json()?;
    ///     // ...
    /// }
    /// ```
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        parse_json(&self.body)
    }

    /// Parse the request body as form-urlencoded
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        parse_form(&self.body)
    }
}

/// A request context that may or may not carry HTTP semantics
///
/// Negotiation is a no-op for contexts without an HTTP view, such as console
/// commands or queued jobs dispatched through the same handlers.
pub trait RequestContext {
    fn http(&self) -> Option<&Request>;
}

impl RequestContext for Request {
    fn http(&self) -> Option<&Request> {
        Some(self)
    }
}
