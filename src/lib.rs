//! Restmount builds REST resources declaratively and dispatches HTTP requests
//! to them.
//!
//! A tree of [`Builder`] nodes describes the URL space. Each node is
//! immutable: extending the path returns a new node, and registering an
//! endpoint records a [`Resource`] in the collection shared by the whole
//! tree. A [`Dispatcher`] matches requests against those resources, recovers
//! path and query parameters, and turns the handler's answer into a JSON
//! response.
//!
//! # Example
//!
//! ```no_run
//! use restmount::{create, Config, Context, Dispatcher, Done, Params, Server};
//! use serde_json::json;
//!
//! fn list(_ctx: Context, params: Params, done: Done) {
//!     done.ok(json!({ "limit": params.get("limit"), "cars": ["opel", "volvo"] }));
//! }
//!
//! fn show(_ctx: Context, params: Params, done: Done) {
//!     done.ok(json!({ "id": params.get("id") }));
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = create(Config::new().version("v1").base_path("api"));
//!     api.resource("cars")?
//!         .all(list)?
//!         .get("/:id", [("id", r"\d+")], show)?;
//!
//!     Server::bind(Server::default_addr())
//!         .run(Dispatcher::new(&api))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! |Feature           |Description                     |
//! |------------------|--------------------------------|
//! |server            | HTTP server over hyper (enabled by default) |

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod endpoint;
pub mod error;
pub mod pattern;
pub mod test;

#[doc(inline)]
pub use http;

mod builder;
mod config;
mod dispatcher;
mod handler;
mod request;
mod resource;
mod response;
#[cfg(feature = "server")]
mod server;

pub use async_trait::async_trait;
pub use builder::{create, Builder};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use endpoint::{Endpoint, EndpointExt};
pub use error::{BuildError, ConfigError, DispatchError, HandlerError, Result};
pub use handler::{Context, Done, Handler, ParamConfig, Params, ResponseSink};
pub use pattern::{Fragment, Matcher, ParamMap, ParamSpec, Validator};
pub use request::{Query, Request, RequestBuilder};
pub use resource::{Resource, ResourceSet, Verb};
pub use response::{Response, ResponseBuilder, JSON_CONTENT_TYPE};
#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub use server::{Server, DEFAULT_PORT};
