use std::sync::Arc;

use anyhow::Context;
use rustls::{ClientConfig, RootCertStore, crypto::CryptoProvider};

use crate::http::{client::{http_client::HttpClient, http_client_version::HttpClientVersion}, crypto::Crypto, trust_all_verifier::TrustAllVerifier};

/// How the server certificate is checked on TLS connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustMode {
    /// Any certificate is accepted, including self-signed and expired ones.
    Insecure,
    /// Certificates must chain to a trusted root and match the host name.
    Default,
}

/// A reusable client configuration from which any number of [`HttpClient`]s can be built.
///
/// Every client built from the same builder shares its TLS settings, HTTP version, base URL and default headers.
#[derive(Clone)]
pub struct HttpClientBuilder {
    tls_config: Arc<ClientConfig>,
    trust_mode: TrustMode,
    http_version: HttpClientVersion,
    base_url: Option<String>,
    default_headers: Vec<(String, String)>,
}

impl HttpClientBuilder {
    /// Creates a builder that validates server certificates against the Mozilla root certificates provided by the
    /// [`webpki_roots`](https://docs.rs/webpki-roots) crate.
    ///
    /// No I/O happens here. Use [`with_native_roots`](HttpClientBuilder::with_native_roots) to also trust the
    /// system certificate store.
    pub fn new() -> Self {
        Self::validating(Crypto::webpki_root_store())
    }

    /// Like [`new`](HttpClientBuilder::new), additionally trusting the system native root certs.
    ///
    /// The native certs are read from the filesystem when this is called.
    pub fn with_native_roots() -> Self {
        Self::validating(Crypto::native_root_store())
    }

    /// Uses the process default crypto provider when it supports the default protocol versions, the ring provider
    /// otherwise.
    fn validating(root_cert_store: RootCertStore) -> Self {
        let root_cert_store = Arc::new(root_cert_store);
        let process_default = CryptoProvider::get_default()
            .cloned()
            .and_then(|provider| Self::validating_config(provider, root_cert_store.clone()).ok());

        let tls_config = match process_default {
            Some(tls_config) => tls_config,
            None => Self::validating_config(Crypto::default_provider(), root_cert_store)
                .expect("ring provider supports the default protocol versions"),
        };

        Self::with_tls_config(tls_config, TrustMode::Default)
    }

    fn validating_config(provider: Arc<CryptoProvider>, root_cert_store: Arc<RootCertStore>) -> Result<ClientConfig, rustls::Error> {
        Ok(ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(root_cert_store)
            .with_no_client_auth())
    }

    /// Creates a builder that accepts any server certificate.
    ///
    /// Fails if `provider` cannot produce a TLS configuration, e.g. when it has no cipher suites or key exchange
    /// groups usable with the default protocol versions.
    pub fn insecure(provider: Arc<CryptoProvider>) -> anyhow::Result<Self> {
        let verifier = TrustAllVerifier::new(&provider);
        let tls_config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .context("failed to build trust-all TLS configuration")?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        Ok(Self::with_tls_config(tls_config, TrustMode::Insecure))
    }

    fn with_tls_config(tls_config: ClientConfig, trust_mode: TrustMode) -> Self {
        HttpClientBuilder {
            tls_config: Arc::new(tls_config),
            trust_mode,
            http_version: HttpClientVersion::Auto,
            base_url: None,
            default_headers: Vec::new(),
        }
    }

    pub fn http_version(mut self, version: HttpClientVersion) -> Self {
        self.http_version = version;
        self
    }

    /// Sets the URL that relative request paths are resolved against.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Adds a header sent with every request. A header of the same name on the request takes precedence.
    pub fn default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((key.into(), value.into()));
        self
    }

    pub fn trust_mode(&self) -> TrustMode {
        self.trust_mode
    }

    pub fn build(&self) -> HttpClient {
        let mut tls_config = (*self.tls_config).clone();
        tls_config.alpn_protocols = self.http_version.alpn_protocols();

        HttpClient::new(
            Arc::new(tls_config),
            self.http_version,
            self.base_url.clone(),
            self.default_headers.clone(),
        )
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        HttpClientBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insecure_builder_reports_insecure_mode() {
        let builder = HttpClientBuilder::insecure(Crypto::default_provider()).unwrap();
        assert_eq!(builder.trust_mode(), TrustMode::Insecure);
    }

    #[test]
    fn insecure_builder_fails_without_cipher_suites() {
        let provider = CryptoProvider {
            cipher_suites: Vec::new(),
            ..rustls::crypto::ring::default_provider()
        };
        assert!(HttpClientBuilder::insecure(Arc::new(provider)).is_err());
    }

    #[test]
    fn insecure_builder_fails_without_kx_groups() {
        let provider = CryptoProvider {
            kx_groups: Vec::new(),
            ..rustls::crypto::ring::default_provider()
        };
        assert!(HttpClientBuilder::insecure(Arc::new(provider)).is_err());
    }

    #[test]
    fn default_builder_reports_default_mode() {
        assert_eq!(HttpClientBuilder::new().trust_mode(), TrustMode::Default);
        assert_eq!(HttpClientBuilder::with_native_roots().trust_mode(), TrustMode::Default);
    }

    #[test]
    fn validating_config_rejects_unusable_provider_and_falls_back_to_ring() {
        let provider = CryptoProvider {
            cipher_suites: Vec::new(),
            ..rustls::crypto::ring::default_provider()
        };
        let validating = HttpClientBuilder::validating_config(Arc::new(provider), Arc::new(Crypto::webpki_root_store()));
        assert!(validating.is_err());

        let builder = HttpClientBuilder::validating(Crypto::webpki_root_store());
        assert_eq!(builder.trust_mode(), TrustMode::Default);
        assert!(!builder.tls_config.crypto_provider().cipher_suites.is_empty());
    }

    #[test]
    fn setters_do_not_leak_into_clones() {
        let base = HttpClientBuilder::insecure(Crypto::default_provider()).unwrap();
        let configured = base.clone().http_version(HttpClientVersion::Http1).base_url("https://localhost").default_header("x-id", "1");

        assert_eq!(base.http_version, HttpClientVersion::Auto);
        assert!(base.base_url.is_none());
        assert!(base.default_headers.is_empty());
        assert_eq!(configured.http_version, HttpClientVersion::Http1);
        assert_eq!(configured.default_headers.len(), 1);
    }
}
