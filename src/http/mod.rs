pub mod client;
pub mod crypto;
pub mod executor;
pub mod http_request;
pub mod http_response;
pub mod trust_all_verifier;
#[cfg(any(test, feature = "server"))]
pub mod server;
