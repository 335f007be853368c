use std::sync::Arc;

use rustls::crypto::CryptoProvider;

use crate::http::{client::http_client_builder::HttpClientBuilder, crypto::Crypto};

/// Produces client builders that accept self-signed and otherwise untrusted server certificates.
///
/// If the trust-all TLS configuration cannot be built from the crypto provider, the factory hands out a
/// certificate validating builder instead. That failure never reaches the caller.
///
/// Meant to be called once while wiring up the application, with the resulting builder passed to
/// whatever needs to make outbound HTTP calls.
#[derive(Clone)]
pub struct InsecureHttpClientFactory {
    provider: Arc<CryptoProvider>,
}

impl InsecureHttpClientFactory {
    pub fn new() -> Self {
        InsecureHttpClientFactory {
            provider: Crypto::default_provider(),
        }
    }

    /// Uses `provider` to build the trust-all TLS configuration.
    pub fn with_provider(provider: Arc<CryptoProvider>) -> Self {
        InsecureHttpClientFactory { provider }
    }

    pub fn create_client_builder(&self) -> HttpClientBuilder {
        match HttpClientBuilder::insecure(self.provider.clone()) {
            Ok(builder) => builder,
            Err(err) => {
                tracing::warn!("falling back to certificate validating HTTP client: {:#}", err);
                HttpClientBuilder::new()
            }
        }
    }
}

impl Default for InsecureHttpClientFactory {
    fn default() -> Self {
        InsecureHttpClientFactory::new()
    }
}

/// Shorthand for `InsecureHttpClientFactory::new().create_client_builder()`.
pub fn create_client_builder() -> HttpClientBuilder {
    InsecureHttpClientFactory::new().create_client_builder()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::client::http_client_builder::TrustMode;

    #[test]
    fn creates_insecure_builder() {
        assert_eq!(create_client_builder().trust_mode(), TrustMode::Insecure);
    }

    #[test]
    fn falls_back_to_default_builder_when_provider_is_unusable() {
        let provider = CryptoProvider {
            cipher_suites: Vec::new(),
            ..rustls::crypto::ring::default_provider()
        };
        let factory = InsecureHttpClientFactory::with_provider(Arc::new(provider));

        assert_eq!(factory.create_client_builder().trust_mode(), TrustMode::Default);
    }

    #[test]
    fn repeated_calls_return_insecure_builders() {
        let factory = InsecureHttpClientFactory::default();
        let first = factory.create_client_builder();
        let second = factory.create_client_builder();

        assert_eq!(first.trust_mode(), TrustMode::Insecure);
        assert_eq!(second.trust_mode(), TrustMode::Insecure);
    }
}
