use std::{path::Path, sync::Arc};

use anyhow::Context;
use rustls::{RootCertStore, crypto::CryptoProvider};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, pem::PemObject};
use webpki_roots::TLS_SERVER_ROOTS;

pub struct Crypto;

impl Crypto {
    /// Installs the ring provider as the process wide rustls default.
    ///
    /// Returns an error if another provider was installed first, in which case that provider stays in use.
    pub fn install_crypto_provider() -> anyhow::Result<()> {
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|_| anyhow::anyhow!("a crypto provider is already installed"))
    }

    /// The provider used to build insecure client configs when none is given.
    pub fn default_provider() -> Arc<CryptoProvider> {
        Arc::new(rustls::crypto::ring::default_provider())
    }

    /// Mozilla root certificates compiled in from [`webpki_roots`]. Reads nothing from disk.
    pub fn webpki_root_store() -> RootCertStore {
        let mut root_cert_store = RootCertStore::empty();
        root_cert_store.extend(TLS_SERVER_ROOTS.iter().cloned());
        root_cert_store
    }

    /// Mozilla root certificates together with the system native certs, which are read from the filesystem.
    ///
    /// Native certs that fail to load are skipped.
    pub fn native_root_store() -> RootCertStore {
        let mut root_cert_store = Self::webpki_root_store();

        let native_certs = rustls_native_certs::load_native_certs();
        for cert in native_certs.certs {
            if let Err(error) = root_cert_store.add(cert) {
                tracing::warn!("failed to add native cert: {:?}", error);
            }
        }
        for error in native_certs.errors {
            tracing::warn!("failed to load native cert: {:?}", error);
        }

        root_cert_store
    }

    pub fn pem_load_certs(file_name: impl AsRef<Path>) -> anyhow::Result<Vec<CertificateDer<'static>>> {
        let file_name = file_name.as_ref();
        let certs = CertificateDer::pem_file_iter(file_name)
            .with_context(|| format!("failed to open {}", file_name.display()))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to parse certificates in {}", file_name.display()))?;

        if certs.is_empty() {
            return Err(anyhow::anyhow!("no certificates found in {}", file_name.display()));
        }
        Ok(certs)
    }

    pub fn pem_load_private_key(file_name: impl AsRef<Path>) -> anyhow::Result<PrivateKeyDer<'static>> {
        let file_name = file_name.as_ref();
        PrivateKeyDer::from_pem_file(file_name)
            .with_context(|| format!("failed to load private key from {}", file_name.display()))
    }
}
