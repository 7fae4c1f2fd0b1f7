//! Endpoint trait and pipeline combinators.

use std::sync::Arc;

use crate::{error::DispatchError, Dispatcher, Request, Response};

/// An asynchronous step of a request pipeline.
///
/// `Ok(None)` declines the request so that the next step may handle it.
#[async_trait::async_trait]
pub trait Endpoint: Send + Sync + 'static {
    /// Get the response to the request.
    async fn call(&self, req: Request) -> Result<Option<Response>, DispatchError>;
}

#[async_trait::async_trait]
impl<T: Endpoint + ?Sized> Endpoint for Box<T> {
    async fn call(&self, req: Request) -> Result<Option<Response>, DispatchError> {
        self.as_ref().call(req).await
    }
}

#[async_trait::async_trait]
impl<T: Endpoint + ?Sized> Endpoint for Arc<T> {
    async fn call(&self, req: Request) -> Result<Option<Response>, DispatchError> {
        self.as_ref().call(req).await
    }
}

#[async_trait::async_trait]
impl Endpoint for Dispatcher {
    async fn call(&self, req: Request) -> Result<Option<Response>, DispatchError> {
        self.dispatch(req).await
    }
}

/// Extension trait for [`Endpoint`].
pub trait EndpointExt: Endpoint + Sized {
    /// Hands requests declined by this endpoint to `next`.
    ///
    /// Errors are returned as they are, without trying `next`.
    fn or<E: Endpoint>(self, next: E) -> Or<Self, E> {
        Or { first: self, next }
    }

    /// Wraps this endpoint in a `Box`.
    fn boxed(self) -> Box<dyn Endpoint> {
        Box::new(self)
    }
}

impl<T: Endpoint> EndpointExt for T {}

/// Endpoint for the [`or`](EndpointExt::or) method.
pub struct Or<A, B> {
    first: A,
    next: B,
}

#[async_trait::async_trait]
impl<A: Endpoint, B: Endpoint> Endpoint for Or<A, B> {
    async fn call(&self, req: Request) -> Result<Option<Response>, DispatchError> {
        match self.first.call(req.clone()).await? {
            Some(resp) => Ok(Some(resp)),
            None => self.next.call(req).await,
        }
    }
}
