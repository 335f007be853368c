use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{HeaderMap, Response, StatusCode, Version, body::Incoming, header::{HeaderName, HeaderValue}};

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status_code: u16) -> Self {
        HttpResponse {
            status_code,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok() -> Self {
        HttpResponse::new(200)
    }

    pub fn not_found() -> Self {
        HttpResponse::new(404)
    }

    pub fn internal_server_error() -> Self {
        HttpResponse::new(500)
    }

    /// Sets a header, replacing any previous values of the same name. Invalid names or values are skipped.
    pub fn header(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let Some((name, value)) = Self::parse_header(key.as_ref(), value.as_ref()) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Adds a header value, keeping earlier values of the same name, e.g. for `set-cookie`.
    pub fn append_header(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let Some((name, value)) = Self::parse_header(key.as_ref(), value.as_ref()) {
            self.headers.append(name, value);
        }
        self
    }

    fn parse_header(key: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
        match (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => Some((name, value)),
            _ => {
                tracing::warn!("skipping invalid response header {:?}", key);
                None
            }
        }
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn body_to_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Reads a hyper response into an owned response, collecting the whole body.
    pub async fn from_incoming(response: Response<Incoming>) -> anyhow::Result<Self> {
        let (parts, body) = response.into_parts();

        Ok(HttpResponse {
            status_code: parts.status.as_u16(),
            version: parts.version,
            headers: parts.headers,
            body: body.collect().await?.to_bytes(),
        })
    }
}

impl From<HttpResponse> for Response<Full<Bytes>> {
    fn from(res: HttpResponse) -> Self {
        let mut response = Response::new(Full::new(res.body));
        *response.status_mut() = StatusCode::from_u16(res.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        *response.headers_mut() = res.headers;
        response
    }
}
