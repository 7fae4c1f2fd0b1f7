//! Registered resources.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use http::Method;
use parking_lot::RwLock;

use crate::{error::DispatchError, handler::Handler, pattern::Matcher, pattern::ParamMap};

/// The kind of endpoint a resource answers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Verb {
    /// Fetch one item.
    Get,
    /// Fetch the collection.
    List,
    /// Create an item.
    Save,
    /// Replace an item.
    Update,
    /// Remove an item.
    Delete,
}

impl Verb {
    /// Returns the HTTP method this verb is served on.
    pub fn method(self) -> Method {
        match self {
            Verb::Get | Verb::List => Method::GET,
            Verb::Save => Method::POST,
            Verb::Update => Method::PUT,
            Verb::Delete => Method::DELETE,
        }
    }

    /// Returns `true` if a request with `method` is served by this verb.
    ///
    /// # Errors
    ///
    /// Methods other than `GET`, `POST`, `PUT` and `DELETE` fail with
    /// [`DispatchError::UnsupportedMethod`].
    pub fn accepts(self, method: &Method) -> Result<bool, DispatchError> {
        match *method {
            Method::GET => Ok(matches!(self, Verb::Get | Verb::List)),
            Method::POST => Ok(self == Verb::Save),
            Method::PUT => Ok(self == Verb::Update),
            Method::DELETE => Ok(self == Verb::Delete),
            _ => Err(DispatchError::UnsupportedMethod(method.clone())),
        }
    }
}

/// A compiled, immutable resource.
pub struct Resource {
    verb: Verb,
    matcher: Matcher,
    params: ParamMap,
    handler: Arc<dyn Handler>,
}

impl Resource {
    pub(crate) fn new(
        verb: Verb,
        matcher: Matcher,
        params: ParamMap,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            verb,
            matcher,
            params,
            handler,
        }
    }

    /// Returns the verb this resource answers.
    #[inline]
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Returns the compiled path matcher.
    #[inline]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Returns the parameters declared when this resource was created.
    #[inline]
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    #[inline]
    pub(crate) fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl Debug for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("verb", &self.verb)
            .field("matcher", &self.matcher.as_str())
            .field("params", &self.params)
            .finish()
    }
}

/// The append-only collection shared by every node of a resource tree.
#[derive(Clone, Default)]
pub struct ResourceSet(Arc<RwLock<Vec<Arc<Resource>>>>);

impl ResourceSet {
    pub(crate) fn push(&self, resource: Resource) {
        self.0.write().push(Arc::new(resource));
    }

    /// Returns the number of registered resources.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Returns the resource at `index` in registration order.
    pub fn get(&self, index: usize) -> Option<Arc<Resource>> {
        self.0.read().get(index).cloned()
    }

    /// Returns the registered resources in registration order.
    pub fn snapshot(&self) -> Arc<[Arc<Resource>]> {
        self.0.read().iter().cloned().collect()
    }

    /// Returns `true` if both handles refer to the same collection.
    pub fn ptr_eq(&self, other: &ResourceSet) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for ResourceSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.read().iter()).finish()
    }
}
