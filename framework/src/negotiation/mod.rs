//! Request body content negotiation
//!
//! Chooses how to decode a request body from its method and Content-Type,
//! decodes it into a [`ParameterContainer`], and schedules removal of any
//! multipart temp files left behind once the request ends.
//!
//! | Method | Content-Type | Body parameters |
//! |---|---|---|
//! | POST | `application/json` | JSON |
//! | POST | anything else | conventional form fields |
//! | PUT, PATCH, DELETE | `multipart/form-data` | multipart fields |
//! | PUT, PATCH, DELETE | `application/json` | JSON |
//! | PUT, PATCH, DELETE | anything else | sniffed JSON, else URL-decoded |
//! | other | any | empty |

pub mod cleanup;
mod error;
pub mod json;
pub mod media;
mod multipart;
mod negotiator;
mod params;
pub mod strategy;

pub use cleanup::{UploadCleanupContext, CLEANUP_PRIORITY};
pub use error::{DecodeError, DecodeErrorKind, JsonErrorKind};
pub use multipart::{MulterParser, MultipartError, MultipartParser, ParsedMultipart};
pub use negotiator::Negotiator;
pub use params::{route_params, ParameterContainer, Params};
pub use strategy::{select_strategy, SniffFallback, Strategy};
