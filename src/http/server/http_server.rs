use std::{convert::Infallible, net::SocketAddr, panic::AssertUnwindSafe, pin::Pin, sync::Arc, time::Duration};

use bytes::Bytes;
use futures::FutureExt;
use http_body_util::Full;
use hyper::{Request, Response, body::Incoming, service::service_fn};
use hyper_util::rt::TokioIo;
use matchit::Router;
use tokio::{net::{TcpListener, TcpStream}, task::{JoinHandle, JoinSet}};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use crate::http::{executor::Executor, http_request::HttpRequest, http_response::HttpResponse, server::http_server_config::HttpServerConfig};

type RouteCallback = Arc<dyn Fn(HttpRequest) -> Pin<Box<dyn Future<Output = HttpResponse> + Send>> + Send + Sync>;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct HttpServer {
    config: HttpServerConfig,
    router: Router<RouteCallback>,
}

/// A running server started with [`HttpServer::start`].
pub struct HttpServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl HttpServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for open ones to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(err) = self.task.await {
            tracing::error!("{:?}", err);
        }
    }
}

impl HttpServer {
    pub fn new(config: HttpServerConfig) -> Self {
        HttpServer {
            config,
            router: Router::new(),
        }
    }

    /// Registers a route with a path, associating it with a handler callback.
    pub fn route<T, Fut>(mut self, path: impl Into<String>, callback: T) -> anyhow::Result<Self>
    where
        T: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        let callback: RouteCallback = Arc::new(move |request| Box::pin(callback(request)));
        self.router.insert(path.into(), callback)?;
        Ok(self)
    }

    /// Binds the listener and serves connections on a background task until the returned handle is shut down.
    pub async fn start(self) -> anyhow::Result<HttpServerHandle> {
        let host = format!("{}:{}", self.config.ip, self.config.port);
        let listener = TcpListener::bind(&host).await?;
        let local_addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        let tls_acceptor = self.config.tls_config.map(|tls_config| {
            TlsAcceptor::from(Arc::new(tls_config))
        });
        let task = tokio::spawn(Self::serve(listener, tls_acceptor, Arc::new(self.router), shutdown.clone()));

        tracing::trace!("Started on {}", local_addr);
        Ok(HttpServerHandle {
            local_addr,
            shutdown,
            task,
        })
    }

    async fn serve(listener: TcpListener, tls_acceptor: Option<TlsAcceptor>, router: Arc<Router<RouteCallback>>, shutdown: CancellationToken) {
        let mut receiver_join_set = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    drop(listener);
                    break;
                },
                result = listener.accept() => {
                    let (tcp_stream, client_addr) = match result {
                        Ok(pair) => pair,
                        Err(err) => {
                            tracing::error!("{:?}", err);
                            continue;
                        },
                    };

                    tracing::trace!("Connection {:?}", client_addr);
                    match tls_acceptor.clone() {
                        Some(acceptor) => {
                            receiver_join_set.spawn(Self::tls_connection(acceptor, tcp_stream, router.clone()));
                        },
                        None => {
                            receiver_join_set.spawn(Self::tcp_connection(tcp_stream, router.clone()));
                        },
                    }
                }
            }
        }

        tracing::trace!("Shut down pending...");
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while receiver_join_set.join_next().await.is_some() {}
        }).await;
        if drained.is_err() {
            tracing::warn!("Aborting {} open connections", receiver_join_set.len());
            receiver_join_set.shutdown().await;
        }
        tracing::trace!("Shut down complete");
    }

    async fn tcp_connection(tcp_stream: TcpStream, router: Arc<Router<RouteCallback>>) {
        let service = service_fn(move |req| {
            Self::incoming_request(req, router.clone())
        });

        let io = TokioIo::new(tcp_stream);
        if let Err(err) = hyper::server::conn::http1::Builder::new().serve_connection(io, service).await {
            tracing::error!("{:?}", err);
        }
    }

    async fn tls_connection(tls_acceptor: TlsAcceptor, tcp_stream: TcpStream, router: Arc<Router<RouteCallback>>) {
        let tls_stream = match tls_acceptor.accept(tcp_stream).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!("TLS handshake failed {:?}", err);
                return;
            },
        };

        let service = service_fn(move |req| {
            Self::incoming_request(req, router.clone())
        });

        let io = TokioIo::new(tls_stream);
        let is_h2 = io.inner().get_ref().1.alpn_protocol() == Some(b"h2".as_slice());
        if is_h2 {
            if let Err(err) = hyper::server::conn::http2::Builder::new(Executor).serve_connection(io, service).await {
                tracing::error!("{:?}", err);
            }
        } else if let Err(err) = hyper::server::conn::http1::Builder::new().keep_alive(false).serve_connection(io, service).await {
            tracing::error!("{:?}", err);
        }
    }

    async fn incoming_request(request: Request<Incoming>, router: Arc<Router<RouteCallback>>) -> Result<Response<Full<Bytes>>, Infallible> {
        let callback = match router.at(request.uri().path()) {
            Ok(matched) => matched.value.clone(),
            Err(_) => return Ok(Response::from(HttpResponse::not_found())),
        };

        let req = match HttpRequest::from_incoming(request).await {
            Ok(req) => req,
            Err(err) => {
                tracing::error!("{:?}", err);
                return Ok(Response::from(HttpResponse::internal_server_error()));
            }
        };

        let response = match AssertUnwindSafe(callback(req)).catch_unwind().await {
            Ok(res) => res,
            Err(_) => {
                tracing::error!("Route handler panicked");
                HttpResponse::internal_server_error()
            }
        };

        Ok(Response::from(response))
    }
}
