#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpClientVersion {
    /// Negotiate HTTP/2 or HTTP/1.1 with ALPN on TLS connections, HTTP/1.1 otherwise.
    #[default]
    Auto,
    Http1,
    Http2,
}

impl HttpClientVersion {
    pub fn alpn_protocols(&self) -> Vec<Vec<u8>> {
        match self {
            HttpClientVersion::Auto => vec![b"h2".to_vec(), b"http/1.1".to_vec()],
            HttpClientVersion::Http1 => vec![b"http/1.1".to_vec()],
            HttpClientVersion::Http2 => vec![b"h2".to_vec()],
        }
    }
}
