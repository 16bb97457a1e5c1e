use crate::config::{
    Config, NegotiationConfig, ServerConfig, DEFAULT_HOST, DEFAULT_MAX_BODY_SIZE, DEFAULT_PORT,
};
use crate::http::{HttpResponse, Request, RequestLifecycle};
use crate::negotiation::Negotiator;
use crate::routing::{BoxedHandler, Router};
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Server {
    router: Arc<Router>,
    negotiator: Arc<Negotiator>,
    host: String,
    port: u16,
    max_body_size: usize,
}

impl Server {
    pub fn new(router: Router, negotiator: Negotiator) -> Self {
        Self {
            router: Arc::new(router),
            negotiator: Arc::new(negotiator),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Build a server from the registered [`ServerConfig`] and [`NegotiationConfig`]
    ///
    /// Falls back to reading the environment when [`Config::init`] has not
    /// been called.
    pub fn from_config(router: Router) -> Self {
        let server = Config::get::<ServerConfig>().unwrap_or_else(ServerConfig::from_env);
        let negotiation =
            Config::get::<NegotiationConfig>().unwrap_or_else(NegotiationConfig::from_env);

        Self {
            router: Arc::new(router),
            negotiator: Arc::new(Negotiator::from_config(&negotiation)),
            host: server.host,
            port: server.port,
            max_body_size: server.max_body_size,
        }
    }

    /// Replace the negotiator, e.g. to plug in another multipart parser
    pub fn negotiator(mut self, negotiator: Negotiator) -> Self {
        self.negotiator = Arc::new(negotiator);
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        tracing::info!(addr = %listener.local_addr()?, "server listening");

        let router = self.router;
        let negotiator = self.negotiator;
        let max_body_size = self.max_body_size;

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let router = router.clone();
            let negotiator = negotiator.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                    let router = router.clone();
                    let negotiator = negotiator.clone();
                    async move {
                        Ok::<_, Infallible>(
                            handle_request(router, negotiator, max_body_size, req).await,
                        )
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!(%peer, error = ?err, "error serving connection");
                }
            });
        }
    }
}

async fn handle_request(
    router: Arc<Router>,
    negotiator: Arc<Negotiator>,
    max_body_size: usize,
    req: hyper::Request<hyper::body::Incoming>,
) -> hyper::Response<Full<Bytes>> {
    let response = match Request::from_hyper(req, max_body_size).await {
        Ok(request) => dispatch(&router, &negotiator, request).await,
        Err(err) => {
            tracing::debug!(error = %err, "request body not collected");
            HttpResponse::from(err)
        }
    };
    response.into_hyper()
}

/// Route one request, negotiate its parameters and run the handler
///
/// The request lifecycle is finished after the handler returns, so upload
/// cleanup only sees files the handler left in place.
pub(crate) async fn dispatch(
    router: &Router,
    negotiator: &Negotiator,
    request: Request,
) -> HttpResponse {
    let Some((handler, params)) = router.match_route(request.method(), request.path()) else {
        return HttpResponse::text("404 Not Found").status(404);
    };
    let mut lifecycle = RequestLifecycle::new();

    let response = respond(
        &handler,
        negotiator,
        request.with_params(params),
        &mut lifecycle,
    )
    .await;

    finish_lifecycle(lifecycle).await;
    response
}

async fn respond(
    handler: &BoxedHandler,
    negotiator: &Negotiator,
    mut request: Request,
    lifecycle: &mut RequestLifecycle,
) -> HttpResponse {
    // Multipart POST fields are the host's conventional form fields
    let host_form = negotiator.decode_host_form(&request, lifecycle).await;
    match host_form {
        Ok(Some(fields)) => request = request.with_form(fields),
        Ok(None) => {}
        Err(err) => return HttpResponse::from(err),
    }

    let negotiated = negotiator
        .negotiate(&request, request.params(), lifecycle)
        .await;
    let container = match negotiated {
        Ok(container) => container,
        Err(err) => return HttpResponse::from(err),
    };

    if let Some(container) = container {
        request.extensions_mut().insert(container);
    }
    if !lifecycle.uploads().is_empty() {
        request.extensions_mut().insert(lifecycle.uploads().to_vec());
    }
    handler(request).await.unwrap_or_else(|err| err)
}

/// Run end-of-request hooks on the blocking pool; cleanup touches the filesystem
async fn finish_lifecycle(lifecycle: RequestLifecycle) {
    if let Err(err) = tokio::task::spawn_blocking(move || lifecycle.finish()).await {
        tracing::error!(error = %err, "request teardown failed");
    }
}
