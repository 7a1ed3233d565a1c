use crate::RemoteError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::io::Read;
use ureq::http::HeaderMap;

/// RFC 3986 unreserved characters stay literal; everything else is
/// percent-encoded. Applied per path segment so `/` separators survive.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Escape an object path, preserving `/` separators.
pub fn escape_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Escape a query parameter value.
pub fn escape_query(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Outcome of a HEAD request: status code plus response headers. Non-2xx
/// statuses are reported here rather than as errors, since the probe
/// treats them as data.
pub struct HeadResponse {
    pub status: u16,
    headers: HeaderMap,
}

impl HeadResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Thin synchronous HTTP client for the object store. Every request
/// carries the storage bearer token as `X-Auth-Token`. Cloning shares the
/// underlying connection pool, so each worker clones its own handle.
#[derive(Clone)]
pub struct SwiftClient {
    agent: ureq::Agent,
    token: String,
}

impl SwiftClient {
    pub fn new(token: &str) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            token: token.to_owned(),
        }
    }

    /// GET a text body (the listing endpoint). Non-2xx is an error.
    pub fn get_text(&self, url: &str) -> Result<String, RemoteError> {
        let resp = self
            .agent
            .get(url)
            .header("X-Auth-Token", &self.token)
            .call()
            .map_err(|e| map_err(e, url))?;

        let mut reader = resp.into_body().into_reader();
        let mut body = String::new();
        reader
            .read_to_string(&mut body)
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(body)
    }

    /// HEAD an object. Status codes are returned, not raised; headers are
    /// only available on non-error statuses.
    pub fn head(&self, url: &str) -> Result<HeadResponse, RemoteError> {
        match self
            .agent
            .head(url)
            .header("X-Auth-Token", &self.token)
            .call()
        {
            Ok(resp) => Ok(HeadResponse {
                status: resp.status().into(),
                headers: resp.headers().clone(),
            }),
            Err(ureq::Error::StatusCode(code)) => Ok(HeadResponse {
                status: code,
                headers: HeaderMap::new(),
            }),
            Err(e) => Err(RemoteError::Http(e.to_string())),
        }
    }

    /// PUT a body with extra headers. Non-2xx is an error.
    pub fn put(&self, url: &str, headers: &[(&str, String)], body: &[u8]) -> Result<(), RemoteError> {
        let mut req = self
            .agent
            .put(url)
            .header("X-Auth-Token", &self.token)
            .header("Content-Type", "application/octet-stream");
        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }
        req.send(body).map_err(|e| map_err(e, url))?;
        Ok(())
    }
}

fn map_err(e: ureq::Error, url: &str) -> RemoteError {
    match e {
        ureq::Error::StatusCode(code) => RemoteError::Status {
            code,
            url: url.to_owned(),
        },
        other => RemoteError::Http(other.to_string()),
    }
}
