use std::path::Path;

use anyhow::Context;
use rustls::{ServerConfig, pki_types::{CertificateDer, PrivateKeyDer}};

use crate::http::crypto::Crypto;

pub struct HttpServerConfig {
    pub ip: String,
    pub port: u16,
    pub tls_config: Option<ServerConfig>,
}

impl HttpServerConfig {
    /// Port `0` binds an ephemeral port, see [`HttpServerHandle::local_addr`](crate::http::server::http_server::HttpServerHandle::local_addr).
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        HttpServerConfig {
            ip: ip.into(),
            port,
            tls_config: None,
        }
    }

    /// Enables TLS for incoming connections using the provided certificate chain and private key, and sets the
    /// supported ALPN protocols to allow HTTP/2 and HTTP/1.1.
    pub fn tls(mut self, certs: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> anyhow::Result<Self> {
        if let Err(error) = Crypto::install_crypto_provider() {
            tracing::trace!("{:?}", error);
        }

        let mut tls_config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .context("Failed to create tls server config.")?;

        tls_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        self.tls_config = Some(tls_config);
        Ok(self)
    }

    /// Same as [`tls`](HttpServerConfig::tls) with the server certificate and private key read from `.pem` files.
    pub fn tls_pem(self, tls_server_cert_path: impl AsRef<Path>, tls_server_key_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let certs = Crypto::pem_load_certs(tls_server_cert_path)?;
        let key = Crypto::pem_load_private_key(tls_server_key_path)?;
        self.tls(certs, key)
    }
}
