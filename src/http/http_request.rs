use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{HeaderMap, Request, body::Incoming, header::{HeaderName, HeaderValue}};

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new() -> Self {
        HttpRequest {
            method: String::from("GET"),
            uri: String::from("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Builds a GET request equal to:
    ///
    /// HttpRequest::new().method("GET").uri(uri)
    pub fn get(uri: impl Into<String>) -> Self {
        HttpRequest::new().method("GET").uri(uri)
    }

    /// Builds a POST request equal to:
    ///
    /// HttpRequest::new().method("POST").uri(uri)
    pub fn post(uri: impl Into<String>) -> Self {
        HttpRequest::new().method("POST").uri(uri)
    }

    pub fn put(uri: impl Into<String>) -> Self {
        HttpRequest::new().method("PUT").uri(uri)
    }

    pub fn delete(uri: impl Into<String>) -> Self {
        HttpRequest::new().method("DELETE").uri(uri)
    }

    pub fn method(mut self, method: impl AsRef<str>) -> Self {
        self.method = method.as_ref().to_uppercase();
        self
    }

    /// Either an absolute URL or a path that is resolved against the client's base URL.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// Sets a header, replacing any previous values of the same name. Invalid names or values are skipped.
    pub fn header(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        match (HeaderName::from_bytes(key.as_ref().as_bytes()), HeaderValue::from_str(value.as_ref())) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!("skipping invalid request header {:?}", key.as_ref()),
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn body_to_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Reads a hyper request into an owned request, collecting the whole body.
    pub async fn from_incoming(request: Request<Incoming>) -> anyhow::Result<Self> {
        let (parts, body) = request.into_parts();

        Ok(HttpRequest {
            method: parts.method.to_string(),
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body: body.collect().await?.to_bytes(),
        })
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        HttpRequest::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_replaces_previous_value() {
        let request = HttpRequest::get("/").header("x-user-email", "a@example.com").header("x-user-email", "b@example.com");
        assert_eq!(request.headers.get_all("x-user-email").iter().count(), 1);
        assert_eq!(request.headers.get("x-user-email").unwrap(), "b@example.com");
    }

    #[test]
    fn invalid_header_is_skipped() {
        let request = HttpRequest::get("/").header("bad header", "value").header("x-ok", "line\nbreak").header("x-id", "7");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers.get("x-id").unwrap(), "7");
    }
}
