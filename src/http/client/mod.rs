pub mod http_client;
pub mod http_client_builder;
pub mod http_client_factory;
pub mod http_client_version;
