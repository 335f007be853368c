use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Uri, Version, header::{HeaderName, HeaderValue}};
use hyper_util::rt::TokioIo;
use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::http::{client::http_client_version::HttpClientVersion, executor::Executor, http_request::HttpRequest, http_response::HttpResponse};

/// A client produced by [`HttpClientBuilder::build`](crate::http::client::http_client_builder::HttpClientBuilder::build).
///
/// Each call to [`send`](HttpClient::send) opens a new connection.
#[derive(Clone)]
pub struct HttpClient {
    tls_config: Arc<ClientConfig>,
    http_version: HttpClientVersion,
    base_url: Option<String>,
    default_headers: Vec<(String, String)>,
}

impl HttpClient {
    pub(crate) fn new(
        tls_config: Arc<ClientConfig>,
        http_version: HttpClientVersion,
        base_url: Option<String>,
        default_headers: Vec<(String, String)>,
    ) -> Self {
        HttpClient {
            tls_config,
            http_version,
            base_url,
            default_headers,
        }
    }

    /// Sends an HTTP request to the server, automatically selecting the appropriate protocol and transport.
    ///
    /// If the URL scheme is `"http"`, HTTP/1.1 will be used for the request.
    ///
    /// If the URL scheme is `"https"`, a TLS connection is established using the builder's trust settings and ALPN
    /// is used to determine whether to use HTTP/2 or HTTP/1.1 for the request.
    pub async fn send(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let url = self.resolve_url(&request.uri)?;
        let scheme = match url.scheme_str() {
            Some(scheme) => scheme,
            None => return Err(anyhow::anyhow!("URL is missing a scheme.")),
        };

        match scheme {
            "http" => {
                if self.http_version == HttpClientVersion::Http2 {
                    return Err(anyhow::anyhow!("https scheme is required for HTTP/2"));
                }
                self.send_tcp(url, request).await
            },
            "https" => self.send_tls(url, request).await,
            _ => Err(anyhow::anyhow!("Unsupported scheme: {}", scheme)),
        }
    }

    fn resolve_url(&self, uri: &str) -> anyhow::Result<Uri> {
        if !uri.starts_with('/') {
            return uri.parse::<Uri>().with_context(|| format!("Invalid URL: {}", uri));
        }

        match &self.base_url {
            Some(base_url) => {
                let joined = format!("{}{}", base_url.trim_end_matches('/'), uri);
                joined.parse::<Uri>().with_context(|| format!("Invalid URL: {}", joined))
            },
            None => Err(anyhow::anyhow!("Relative URL {} requires a base URL.", uri)),
        }
    }

    async fn send_tcp(&self, url: Uri, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let host = match url.host() {
            Some(host) => host,
            None => return Err(anyhow::anyhow!("Invalid URL.")),
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = url.port_u16().unwrap_or(80);

        tracing::trace!("Connecting to {}:{}", host, port);
        let stream = TcpStream::connect((host, port)).await?;
        let io = TokioIo::new(stream);

        let (mut sender, connection) = hyper::client::conn::http1::handshake(io).await?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!("{:?}", err);
            }
        });

        let req = self.build_http_request(url, request, Version::HTTP_11)?;
        let res = sender.send_request(req).await?;
        HttpResponse::from_incoming(res).await
    }

    async fn send_tls(&self, url: Uri, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let host = match url.host() {
            Some(host) => host,
            None => return Err(anyhow::anyhow!("Invalid URL.")),
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = url.port_u16().unwrap_or(443);
        let domain = rustls::pki_types::ServerName::try_from(host.to_string())?;

        tracing::trace!("Connecting to {}:{} over TLS", host, port);
        let tcp_stream = TcpStream::connect((host, port)).await?;
        let tls_connector = TlsConnector::from(self.tls_config.clone());
        let tls_stream = tls_connector.connect(domain, tcp_stream).await?;

        let version = match self.http_version {
            HttpClientVersion::Auto => {
                match tls_stream.get_ref().1.alpn_protocol() {
                    Some(b"h2") => Version::HTTP_2,
                    _ => Version::HTTP_11,
                }
            },
            HttpClientVersion::Http1 => Version::HTTP_11,
            HttpClientVersion::Http2 => Version::HTTP_2,
        };

        match version {
            Version::HTTP_2 => {
                let io = TokioIo::new(tls_stream);
                let (mut sender, connection) = hyper::client::conn::http2::Builder::new(Executor).handshake(io).await?;

                tokio::spawn(async move {
                    if let Err(err) = connection.await {
                        tracing::error!("{:?}", err);
                    }
                });

                let req = self.build_http_request(url, request, Version::HTTP_2)?;
                let res = sender.send_request(req).await?;
                HttpResponse::from_incoming(res).await
            }
            _ => {
                let io = TokioIo::new(tls_stream);
                let (mut sender, connection) = hyper::client::conn::http1::handshake(io).await?;

                tokio::spawn(async move {
                    if let Err(err) = connection.await {
                        tracing::error!("{:?}", err);
                    }
                });

                let req = self.build_http_request(url, request, Version::HTTP_11)?;
                let res = sender.send_request(req).await?;
                HttpResponse::from_incoming(res).await
            }
        }
    }

    fn build_http_request(&self, url: Uri, request: HttpRequest, version: Version) -> anyhow::Result<Request<Full<Bytes>>> {
        let mut req = match version {
            Version::HTTP_2 => {
                Request::builder()
                    .version(version)
                    .method(request.method.as_str())
                    .uri(url.clone())
                    .body(Full::new(request.body))?
            }
            _ => {
                let authority = match url.authority() {
                    Some(authority) => authority,
                    None => return Err(anyhow::anyhow!("Invalid URL.")),
                };
                let path = url.path_and_query().map(|path| path.as_str()).unwrap_or("/");

                Request::builder()
                    .version(version)
                    .method(request.method.as_str())
                    .uri(path)
                    .header(hyper::header::HOST, authority.as_str())
                    .body(Full::new(request.body))?
            }
        };

        let headers = req.headers_mut();
        for (key, value) in &self.default_headers {
            let header_name = HeaderName::from_bytes(key.as_bytes())?;
            let header_value = HeaderValue::from_str(value)?;
            headers.insert(header_name, header_value);
        }
        for key in request.headers.keys() {
            headers.remove(key);
        }
        for (key, value) in request.headers.iter() {
            headers.append(key.clone(), value.clone());
        }

        Ok(req)
    }
}
