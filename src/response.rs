use std::convert::TryInto;

use bytes::Bytes;
use http::{
    header::{HeaderMap, HeaderName, HeaderValue},
    StatusCode,
};
use serde::de::DeserializeOwned;

/// The content type of every body the dispatcher writes.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

struct Parts {
    status: StatusCode,
    headers: HeaderMap,
}

/// Represents an HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Response::builder().body(Bytes::new())
    }
}

impl Response {
    /// Creates a response builder.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder(Parts {
            status: StatusCode::OK,
            headers: Default::default(),
        })
    }

    /// Returns the associated status code.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code for this response.
    #[inline]
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns a reference to the associated header map.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the associated header map.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the content type of this response, if it is present and
    /// valid.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns the body of this response.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Sets the body for this response.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Consumes this response and deserializes its body as JSON.
    pub fn into_json<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    #[cfg(feature = "server")]
    pub(crate) fn into_hyper(self) -> hyper::Response<hyper::Body> {
        let mut resp = hyper::Response::new(hyper::Body::from(self.body));
        *resp.status_mut() = self.status;
        *resp.headers_mut() = self.headers;
        resp
    }
}

/// An response builder.
pub struct ResponseBuilder(Parts);

impl ResponseBuilder {
    /// Sets the HTTP status for this response.
    ///
    /// By default this is [`StatusCode::OK`].
    #[must_use]
    pub fn status(self, status: StatusCode) -> Self {
        Self(Parts { status, ..self.0 })
    }

    /// Appends a header to this response builder.
    ///
    /// Pairs that do not convert into a valid header name and value are
    /// ignored.
    #[must_use]
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        if let (Ok(key), Ok(value)) = (key.try_into(), value.try_into()) {
            self.0.headers.append(key, value);
        }
        self
    }

    /// Extends the headers of this response builder.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.0.headers.extend(headers);
        self
    }

    /// Consumes this builder, using the provided body to return a constructed
    /// [Response].
    pub fn body(self, body: impl Into<Bytes>) -> Response {
        Response {
            status: self.0.status,
            headers: self.0.headers,
            body: body.into(),
        }
    }
}
