use std::collections::BTreeMap;
use std::convert::TryInto;

use bytes::Bytes;
use http::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method, Uri,
};
use serde::de::DeserializeOwned;

/// Query-string parameters, keyed by name.
pub type Query = BTreeMap<String, String>;

struct Parts {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Option<Query>,
}

/// Represents a parsed HTTP request.
///
/// The query mapping is either supplied by the host through
/// [`RequestBuilder::query`] or decoded from the URI when the request is
/// built.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Query,
    body: Bytes,
}

impl Request {
    /// Creates a request builder.
    pub fn builder() -> RequestBuilder {
        RequestBuilder(Ok(Parts {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: Default::default(),
            query: None,
        }))
    }

    /// Returns the request method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path of the URI, without the query string.
    #[inline]
    pub fn pathname(&self) -> &str {
        self.uri.path()
    }

    /// Returns the request headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the query-string parameters.
    #[inline]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Returns the request body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    #[cfg(feature = "server")]
    pub(crate) async fn from_hyper(req: hyper::Request<hyper::Body>) -> Result<Self, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body = hyper::body::to_bytes(body).await?;
        let query = parse_query(parts.uri.query());
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            query,
            body,
        })
    }
}

fn parse_query(query: Option<&str>) -> Query {
    match query {
        Some(query) => serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_else(|err| {
                tracing::debug!(error = %err, query, "ignore malformed query string");
                Query::new()
            }),
        None => Query::new(),
    }
}

/// An request builder.
pub struct RequestBuilder(Result<Parts, http::Error>);

impl RequestBuilder {
    /// Sets the HTTP method for this request.
    ///
    /// By default this is [`Method::GET`].
    #[must_use]
    pub fn method(self, method: Method) -> Self {
        Self(self.0.map(move |parts| Parts { method, ..parts }))
    }

    /// Sets the URI for this request.
    ///
    /// By default this is `/`.
    #[must_use]
    pub fn uri<T>(self, uri: T) -> Self
    where
        T: TryInto<Uri>,
        <T as TryInto<Uri>>::Error: Into<http::Error>,
    {
        Self(self.0.and_then(move |parts| {
            Ok(Parts {
                uri: uri.try_into().map_err(Into::into)?,
                ..parts
            })
        }))
    }

    /// Appends a header to this request builder.
    #[must_use]
    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        <K as TryInto<HeaderName>>::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        <V as TryInto<HeaderValue>>::Error: Into<http::Error>,
    {
        Self(self.0.and_then(move |mut parts| {
            let key = key.try_into().map_err(Into::into)?;
            let value = value.try_into().map_err(Into::into)?;
            parts.headers.append(key, value);
            Ok(parts)
        }))
    }

    /// Sets one query parameter.
    ///
    /// Once any parameter is set this way, the query string of the URI is no
    /// longer decoded.
    #[must_use]
    pub fn query(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self(self.0.map(move |mut parts| {
            parts
                .query
                .get_or_insert_with(Query::new)
                .insert(name.into(), value.into());
            parts
        }))
    }

    /// Consumes this builder, using the provided body to return a constructed
    /// [Request].
    ///
    /// # Errors
    ///
    /// This function may return an error if any previously configured argument
    /// failed to parse or get converted to the internal representation.
    pub fn body(self, body: impl Into<Bytes>) -> Result<Request, http::Error> {
        self.0.map(move |parts| {
            let query = match parts.query {
                Some(query) => query,
                None => parse_query(parts.uri.query()),
            };
            Request {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                query,
                body: body.into(),
            }
        })
    }

    /// Consumes this builder and returns a [Request] with an empty body.
    pub fn finish(self) -> Result<Request, http::Error> {
        self.body(Bytes::new())
    }
}
