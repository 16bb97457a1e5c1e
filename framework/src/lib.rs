//! HTTP request handling with body content negotiation
//!
//! Incoming requests are routed, their bodies decoded according to method
//! and Content-Type into route, query and body parameters, and multipart
//! uploads the handler leaves behind are removed once the response is built.

pub mod config;
pub mod error;
pub mod http;
pub mod negotiation;
pub mod routing;
pub mod server;

pub use crate::config::{env, env_optional, Config, Environment, NegotiationConfig, ServerConfig};
pub use crate::error::{FrameworkError, HttpError};
pub use crate::http::{
    json, text, HttpResponse, Request, RequestContext, RequestLifecycle, Response, UploadedFile,
};
pub use crate::negotiation::{
    DecodeError, MulterParser, MultipartParser, Negotiator, ParameterContainer, Params,
    SniffFallback,
};
pub use crate::routing::Router;
pub use crate::server::Server;
