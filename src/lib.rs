#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::client::http_client_factory::{InsecureHttpClientFactory, create_client_builder};
