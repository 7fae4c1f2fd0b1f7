use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use http::{header, StatusCode};
use serde_json::json;
use tracing::Instrument;

use crate::{response::JSON_CONTENT_TYPE, Endpoint, Request, Response};

/// Port used by [`Server::default_addr`].
pub const DEFAULT_PORT: u16 = 3000;

/// An HTTP server serving one [`Endpoint`].
///
/// ```no_run
/// use restmount::{Builder, Config, Context, Dispatcher, Done, Params, Server};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let api = Builder::new(Config::default());
/// api.resource("products")?
///     .all(|_ctx: Context, _params: Params, done: Done| done.ok(vec!["opel", "volvo"]))?;
///
/// Server::bind(Server::default_addr())
///     .run(Dispatcher::new(&api))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Create a server that listens on `addr`.
    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self { addr: addr.into() }
    }

    /// `0.0.0.0:3000`.
    pub fn default_addr() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
    }

    /// Returns the address the server listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves `ep` until the listener fails.
    pub async fn run(self, ep: impl Endpoint) -> Result<(), hyper::Error> {
        let ep: Arc<dyn Endpoint> = Arc::new(ep);
        let service = hyper::service::make_service_fn(move |_| {
            let ep = ep.clone();
            async move {
                Ok::<_, Infallible>(hyper::service::service_fn(
                    move |req: hyper::Request<hyper::Body>| {
                        let ep = ep.clone();
                        async move { Ok::<_, Infallible>(handle(ep.as_ref(), req).await) }
                    },
                ))
            }
        });

        tracing::info!(addr = %self.addr, "listening");
        hyper::Server::try_bind(&self.addr)?.serve(service).await
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(json!({ "error": message }).to_string())
}

pub(crate) async fn handle(
    ep: &dyn Endpoint,
    req: hyper::Request<hyper::Body>,
) -> hyper::Response<hyper::Body> {
    let span = tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let req = match Request::from_hyper(req).await {
            Ok(req) => req,
            Err(err) => {
                tracing::debug!(error = %err, "failed to read the request body");
                return error_response(StatusCode::BAD_REQUEST, "invalid request body")
                    .into_hyper();
            }
        };

        let resp = match ep.call(req).await {
            Ok(Some(resp)) => resp,
            Ok(None) => error_response(StatusCode::NOT_FOUND, "not found"),
            Err(err) => {
                tracing::error!(error = %err, "dispatch failed");
                err.as_response()
            }
        };
        tracing::info!(status = %resp.status(), "response");
        resp.into_hyper()
    }
    .instrument(span)
    .await
}
