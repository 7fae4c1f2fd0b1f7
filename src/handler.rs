//! The handler protocol.

use std::collections::BTreeMap;
use std::convert::TryInto;
use std::fmt::{self, Debug, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use http::{
    header::{HeaderMap, HeaderName, HeaderValue},
    StatusCode,
};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::{
    error::{HandlerError, Result},
    pattern::Validator,
    Request,
};

/// A callback-style request handler.
///
/// The handler answers by consuming its [`Done`]. It may do so before
/// returning or later, from a spawned task.
///
/// # Example
///
/// ```
/// use restmount::{Context, Done, Params};
/// use serde_json::json;
///
/// fn show(_ctx: Context, params: Params, done: Done) {
///     done.ok(json!({ "id": params.get("id") }));
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Handles one request.
    fn call(&self, ctx: Context, params: Params, done: Done);
}

impl<F> Handler for F
where
    F: Fn(Context, Params, Done) + Send + Sync + 'static,
{
    fn call(&self, ctx: Context, params: Params, done: Done) {
        (self)(ctx, params, done)
    }
}

/// The request being handled and the response under construction.
#[derive(Clone)]
pub struct Context {
    request: Arc<Request>,
    response: ResponseSink,
}

impl Context {
    pub(crate) fn new(request: Arc<Request>, response: ResponseSink) -> Self {
        Self { request, response }
    }

    /// Returns the original request.
    #[inline]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the response sink.
    #[inline]
    pub fn response(&self) -> &ResponseSink {
        &self.response
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .finish()
    }
}

#[derive(Debug, Default)]
pub(crate) struct SinkParts {
    pub(crate) status: Option<StatusCode>,
    pub(crate) headers: HeaderMap,
}

/// Status and headers a handler sets before answering.
#[derive(Debug, Clone, Default)]
pub struct ResponseSink(Arc<Mutex<SinkParts>>);

impl ResponseSink {
    /// Returns the status set by the handler, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.0.lock().status
    }

    /// Sets the status code for the response.
    pub fn set_status(&self, status: StatusCode) {
        self.0.lock().status = Some(status);
    }

    /// Appends a header to the response. Invalid pairs are ignored.
    pub fn append_header<K, V>(&self, key: K, value: V)
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        if let (Ok(key), Ok(value)) = (key.try_into(), value.try_into()) {
            self.0.lock().headers.append(key, value);
        }
    }

    pub(crate) fn take(&self) -> SinkParts {
        std::mem::take(&mut *self.0.lock())
    }
}

/// How a handler finished.
#[derive(Debug)]
pub(crate) enum Reply {
    Finished(Result<Option<Value>, HandlerError>),
    Declined,
}

/// The single-shot completion callback handed to a [`Handler`].
///
/// Every method consumes the callback, so it can be completed at most once.
/// Dropping it without completing makes the dispatch fail with
/// [`DispatchError::Unanswered`](crate::DispatchError::Unanswered).
pub struct Done {
    tx: oneshot::Sender<Reply>,
}

impl Done {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    fn reply(self, reply: Reply) {
        if self.tx.send(reply).is_err() {
            tracing::debug!("the request was dropped before the handler answered");
        }
    }

    /// Completes with an `(error, data)` pair.
    pub fn send(self, result: Result<Option<Value>, HandlerError>) {
        self.reply(Reply::Finished(result));
    }

    /// Completes successfully with `data`.
    pub fn ok(self, data: impl Serialize) {
        let result = serde_json::to_value(data).map(Some).map_err(|err| {
            HandlerError::from(err.to_string()).with_status(StatusCode::INTERNAL_SERVER_ERROR)
        });
        self.send(result);
    }

    /// Completes successfully without data.
    pub fn empty(self) {
        self.send(Ok(None));
    }

    /// Completes with an error.
    pub fn err(self, err: impl Into<HandlerError>) {
        self.send(Err(err.into()));
    }

    /// Gives up on the request, letting the next endpoint of the pipeline
    /// handle it.
    pub fn decline(self) {
        self.reply(Reply::Declined);
    }
}

impl Debug for Done {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done").finish()
    }
}

/// Path and query parameters of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    /// Returns the value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns `true` if `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Parses the value of `name`.
    ///
    /// Returns `None` if the parameter is missing, `Some(Err(_))` if it does
    /// not parse.
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.get(name).map(str::parse)
    }

    /// Deserializes every parameter into `T`, e.g. a struct with one field
    /// per parameter.
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        let object = self
            .0
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::from_value(Value::Object(object))
    }

    /// Returns the number of parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, name: String, value: String) {
        self.0.insert(name, value);
    }

    /// Inserts `value` unless `name` is already present.
    pub(crate) fn insert_missing(&mut self, name: &str, value: &str) {
        if !self.0.contains_key(name) {
            self.0.insert(name.to_string(), value.to_string());
        }
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Validators for the parameters a template introduces.
///
/// ```
/// use restmount::{ParamConfig, Validator};
///
/// let params = ParamConfig::new()
///     .param("id", r"\d+")
///     .validator("name", Validator::word());
/// assert_eq!(params.len(), 2);
///
/// let same: ParamConfig = [("id", r"\d+"), ("name", r"\w+")].into();
/// assert_eq!(same.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParamConfig {
    entries: Vec<(String, ParamSource)>,
}

#[derive(Debug, Clone)]
enum ParamSource {
    Pattern(String),
    Validator(Validator),
}

impl ParamConfig {
    /// Create an empty parameter configuration.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a parameter validated by the regular expression `pattern`.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.entries
            .push((name.into(), ParamSource::Pattern(pattern.into())));
        self
    }

    /// Adds a parameter validated by `validator`.
    #[must_use]
    pub fn validator(mut self, name: impl Into<String>, validator: Validator) -> Self {
        self.entries
            .push((name.into(), ParamSource::Validator(validator)));
        self
    }

    /// Returns the number of parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no parameter is configured.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the configuration, compiling pattern sources on the way.
    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, Result<Validator>)> {
        self.entries.into_iter().map(|(name, source)| {
            let validator = match source {
                ParamSource::Pattern(pattern) => Validator::new(pattern),
                ParamSource::Validator(validator) => Ok(validator),
            };
            (name, validator)
        })
    }
}

impl From<()> for ParamConfig {
    fn from(_: ()) -> Self {
        ParamConfig::new()
    }
}

impl<N: Into<String>, P: Into<String>> From<Vec<(N, P)>> for ParamConfig {
    fn from(entries: Vec<(N, P)>) -> Self {
        entries
            .into_iter()
            .fold(ParamConfig::new(), |config, (name, pattern)| {
                config.param(name, pattern)
            })
    }
}

macro_rules! impl_param_config_from_array {
    ($($n:literal),*) => {
        $(
        impl<N: Into<String>, P: Into<String>> From<[(N, P); $n]> for ParamConfig {
            fn from(entries: [(N, P); $n]) -> Self {
                IntoIterator::into_iter(entries)
                    .fold(ParamConfig::new(), |config, (name, pattern)| {
                        config.param(name, pattern)
                    })
            }
        }
        )*
    };
}

impl_param_config_from_array!(1, 2, 3, 4, 5, 6, 7, 8);
