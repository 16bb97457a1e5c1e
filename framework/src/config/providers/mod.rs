mod negotiation;
mod server;

pub use negotiation::{
    NegotiationConfig, NegotiationConfigBuilder, DEFAULT_MAX_FILE_SIZE, DEFAULT_UPLOAD_PREFIX,
};
pub use server::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HOST, DEFAULT_MAX_BODY_SIZE, DEFAULT_PORT,
};
