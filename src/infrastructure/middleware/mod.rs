// Request-scoped viewer resolution and the extractors handlers use to read it

pub mod client_ip;
pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use client_ip::ClientIp;
pub use viewer_context_extractor::Vc;
pub use viewer_context_middleware::*;
