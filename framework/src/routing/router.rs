use crate::http::{Request, Response};
use hyper::Method;
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for route handlers
pub type BoxedHandler =
    Box<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

/// HTTP router with one path table per method
///
/// ```rust,ignore
/// Router::new()
///     .get("/users/{id}", controllers::user::show)
///     .put("/users/{id}", controllers::user::update)
/// ```
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Arc<BoxedHandler>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method` and `path`
    ///
    /// A path that conflicts with an already registered one is ignored with
    /// a warning.
    pub fn route<H, Fut>(mut self, method: Method, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let handler: BoxedHandler = Box::new(move |req| Box::pin(handler(req)));
        let table = self.routes.entry(method.clone()).or_default();
        if let Err(err) = table.insert(path, Arc::new(handler)) {
            tracing::warn!(%method, path, error = %err, "route not registered");
        }
        self
    }

    pub fn get<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    pub fn post<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    pub fn put<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::PUT, path, handler)
    }

    pub fn patch<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::PATCH, path, handler)
    }

    pub fn delete<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::DELETE, path, handler)
    }

    /// Match a request and return the handler with extracted params
    pub fn match_route(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<BoxedHandler>, HashMap<String, String>)> {
        let matched = self.routes.get(method)?.at(path).ok()?;
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Some((matched.value.clone(), params))
    }
}
