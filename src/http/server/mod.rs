pub mod http_server;
pub mod http_server_config;
