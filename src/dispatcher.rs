use std::sync::Arc;

use http::{header, HeaderValue, StatusCode};
use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::{
    error::{DispatchError, HandlerError},
    handler::{Context, Done, Params, Reply, ResponseSink},
    resource::Resource,
    response::JSON_CONTENT_TYPE,
    Builder, Request, Response,
};

/// Matches requests against the resources of a tree and runs their handlers.
///
/// The dispatcher works on the resources registered when it was created.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    resources: Arc<[Arc<Resource>]>,
}

impl Dispatcher {
    /// Create a dispatcher for every resource registered through the tree
    /// `builder` belongs to.
    pub fn new(builder: &Builder) -> Self {
        Self {
            resources: builder.resources().snapshot(),
        }
    }

    /// Returns the resources this dispatcher serves.
    #[inline]
    pub fn resources(&self) -> &[Arc<Resource>] {
        &self.resources
    }

    /// Finds the resource that serves `method` at `path`.
    ///
    /// Returns `Ok(None)` when no resource matches.
    pub fn find(
        &self,
        method: &http::Method,
        path: &str,
    ) -> Result<Option<&Arc<Resource>>, DispatchError> {
        let mut found: Option<&Arc<Resource>> = None;

        for resource in self.resources.iter() {
            if !resource.matcher().is_match(path) || !resource.verb().accepts(method)? {
                continue;
            }

            if let Some(first) = found {
                let patterns = self
                    .resources
                    .iter()
                    .filter(|r| r.matcher().is_match(path))
                    .filter(|r| r.verb().accepts(method).unwrap_or(false))
                    .map(|r| r.matcher().as_str().to_string())
                    .collect::<Vec<_>>();
                tracing::error!(
                    method = %method,
                    path,
                    first = first.matcher().as_str(),
                    second = resource.matcher().as_str(),
                    "ambiguous route"
                );
                return Err(DispatchError::AmbiguousRoute {
                    method: method.clone(),
                    path: path.to_string(),
                    patterns,
                });
            }
            found = Some(resource);
        }

        Ok(found)
    }

    /// Dispatches one request.
    ///
    /// Returns `Ok(None)` when the request is declined, either because no
    /// resource matches it or because the handler declined it.
    pub async fn dispatch(&self, req: Request) -> Result<Option<Response>, DispatchError> {
        let resource = match self.find(req.method(), req.pathname())? {
            Some(resource) => resource.clone(),
            None => {
                tracing::debug!(method = %req.method(), path = req.pathname(), "no resource matches");
                return Ok(None);
            }
        };
        tracing::debug!(
            verb = ?resource.verb(),
            pattern = resource.matcher().as_str(),
            "resource found"
        );

        let params = recover_params(&resource, &req);
        let sink = ResponseSink::default();
        let ctx = Context::new(Arc::new(req), sink.clone());
        let (done, rx) = Done::channel();

        resource.handler().call(ctx, params, done);

        match rx.await {
            Ok(Reply::Finished(result)) => Ok(Some(into_response(result, &sink))),
            Ok(Reply::Declined) => Ok(None),
            Err(_) => {
                tracing::error!(
                    pattern = resource.matcher().as_str(),
                    "handler dropped its callback"
                );
                Err(DispatchError::Unanswered)
            }
        }
    }
}

/// Path parameters by capture position, then query parameters not already
/// set by the path.
fn recover_params(resource: &Resource, req: &Request) -> Params {
    let mut params = Params::default();

    if let Some(captures) = resource.matcher().captures(req.pathname()) {
        for (name, spec) in resource.params() {
            let value = spec
                .index
                .and_then(|index| captures.get(index).copied().flatten());
            if let Some(value) = value {
                let value = percent_decode_str(value).decode_utf8_lossy();
                params.insert(name.clone(), value.into_owned());
            }
        }
    }

    for (name, value) in req.query() {
        params.insert_missing(name, value);
    }

    params
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn into_response(result: Result<Option<Value>, HandlerError>, sink: &ResponseSink) -> Response {
    let parts = sink.take();

    let (status, body) = match result {
        Ok(data) => {
            let data = data
                .filter(|data| !is_falsy(data))
                .unwrap_or_else(|| Value::String(String::new()));
            (parts.status.unwrap_or(StatusCode::OK), data)
        }
        Err(err) => {
            let status = err
                .status()
                .or(parts.status)
                .filter(|status| status.as_u16() >= 400)
                .unwrap_or(StatusCode::BAD_REQUEST);
            (status, err.payload().clone())
        }
    };

    let mut headers = parts.headers;
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    Response::builder()
        .status(status)
        .headers(headers)
        .body(body.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::Method;
    use serde_json::json;

    use super::*;
    use crate::Config;

    fn request(method: Method, uri: &str) -> Request {
        Request::builder().method(method).uri(uri).finish().unwrap()
    }

    fn echo(_ctx: Context, params: Params, done: Done) {
        let object = params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect::<serde_json::Map<_, _>>();
        done.ok(object);
    }

    async fn call(dispatcher: &Dispatcher, method: Method, uri: &str) -> Response {
        dispatcher
            .dispatch(request(method, uri))
            .await
            .unwrap()
            .expect("handled")
    }

    #[tokio::test]
    async fn list_and_item() {
        let api = Builder::new(Config::new().version("1.0").base_path("api"));
        let products = api.resource("products").unwrap();
        products
            .all(|_ctx: Context, params: Params, done: Done| {
                let limit = params.parse::<usize>("limit").and_then(Result::ok).unwrap_or(20);
                done.ok((0..limit).map(|i| json!({ "id": i })).collect::<Vec<_>>());
            })
            .unwrap()
            .get("/:id", [("id", r"\d+")], echo)
            .unwrap();

        let dispatcher = Dispatcher::new(&api);

        let resp = call(&dispatcher, Method::GET, "/api/1.0/products").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.content_type(), Some(JSON_CONTENT_TYPE));
        assert_eq!(resp.into_json::<Vec<Value>>().unwrap().len(), 20);

        let resp = call(&dispatcher, Method::GET, "/api/1.0/products?limit=10").await;
        assert_eq!(resp.into_json::<Vec<Value>>().unwrap().len(), 10);

        let resp = call(&dispatcher, Method::GET, "/api/1.0/products/1").await;
        assert_eq!(resp.into_json::<Value>().unwrap(), json!({ "id": "1" }));
    }

    #[tokio::test]
    async fn path_params_win_over_query() {
        let api = Builder::new(Config::default());
        api.resource("products")
            .unwrap()
            .get("/:id", [("id", r"\d+")], echo)
            .unwrap();
        let dispatcher = Dispatcher::new(&api);

        let resp = call(&dispatcher, Method::GET, "/products/7?id=99&limit=5").await;
        assert_eq!(
            resp.into_json::<Value>().unwrap(),
            json!({ "id": "7", "limit": "5" })
        );
    }

    #[tokio::test]
    async fn percent_decoded_params() {
        let api = Builder::new(Config::default());
        api.resource("users")
            .unwrap()
            .get("/:name", [("name", "[^/]+")], echo)
            .unwrap();
        let dispatcher = Dispatcher::new(&api);

        let resp = call(&dispatcher, Method::GET, "/users/j%C3%BCrgen%20b").await;
        assert_eq!(
            resp.into_json::<Value>().unwrap(),
            json!({ "name": "jürgen b" })
        );
    }

    #[tokio::test]
    async fn round_trip_template() {
        let api = Builder::new(Config::new().type_suffix(true));
        api.resource("shops")
            .unwrap()
            .get("/:shop/items/:sku", [("shop", r"\w+"), ("sku", r"[A-Z]{3}-\d+")], echo)
            .unwrap();
        let dispatcher = Dispatcher::new(&api);

        let resp = call(&dispatcher, Method::GET, "/shops/oslo/items/ABC-12.json").await;
        assert_eq!(
            resp.into_json::<Value>().unwrap(),
            json!({ "shop": "oslo", "sku": "ABC-12" })
        );
    }

    #[tokio::test]
    async fn declines_unknown_paths() {
        let api = Builder::new(Config::default());
        api.resource("books").unwrap().all(echo).unwrap();
        let dispatcher = Dispatcher::new(&api);

        assert!(dispatcher
            .dispatch(request(Method::GET, "/unknown"))
            .await
            .unwrap()
            .is_none());
        assert!(dispatcher
            .dispatch(request(Method::POST, "/books"))
            .await
            .unwrap()
            .is_none());
        assert!(dispatcher
            .dispatch(request(Method::HEAD, "/unknown"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unsupported_method() {
        let api = Builder::new(Config::default());
        api.resource("books").unwrap().all(echo).unwrap();
        let dispatcher = Dispatcher::new(&api);

        let err = dispatcher
            .dispatch(request(Method::PATCH, "/books"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedMethod(m) if m == Method::PATCH));
    }

    #[tokio::test]
    async fn ambiguous_route() {
        let api = Builder::new(Config::default());
        let books = api.resource("books").unwrap();
        books.all(echo).unwrap();
        books.get_list(echo).unwrap();
        let dispatcher = Dispatcher::new(&api);

        match dispatcher.dispatch(request(Method::GET, "/books")).await {
            Err(DispatchError::AmbiguousRoute { patterns, path, .. }) => {
                assert_eq!(path, "/books");
                assert_eq!(patterns, vec!["^/books$", "^/books$"]);
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.is_some())),
        }

        // a different method is still unambiguous
        books.save(echo).unwrap();
        let dispatcher = Dispatcher::new(&api);
        assert!(dispatcher
            .dispatch(request(Method::POST, "/books"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn verbs_share_a_path() {
        let api = Builder::new(Config::default());
        let item = api
            .resource("cars")
            .unwrap()
            .get("/:id", [("id", r"\d+")], |_ctx: Context, _p: Params, done: Done| {
                done.ok("get")
            })
            .unwrap()
            .end();
        item.update("/:id", [("id", r"\d+")], |_ctx: Context, _p: Params, done: Done| {
            done.ok("update")
        })
        .unwrap()
        .end()
        .delete("/:id", [("id", r"\d+")], |_ctx: Context, _p: Params, done: Done| {
            done.ok("delete")
        })
        .unwrap();
        let dispatcher = Dispatcher::new(&api);

        for (method, expected) in &[
            (Method::GET, "get"),
            (Method::PUT, "update"),
            (Method::DELETE, "delete"),
        ] {
            let resp = call(&dispatcher, method.clone(), "/cars/3").await;
            assert_eq!(resp.into_json::<String>().unwrap(), *expected);
        }
    }

    #[tokio::test]
    async fn success_body() {
        let api = Builder::new(Config::default());
        api.resource("list")
            .unwrap()
            .all(|_ctx: Context, _p: Params, done: Done| done.send(Ok(Some(json!([1, 2, 3])))))
            .unwrap();
        api.resource("nothing")
            .unwrap()
            .all(|_ctx: Context, _p: Params, done: Done| done.empty())
            .unwrap();
        api.resource("zero")
            .unwrap()
            .all(|_ctx: Context, _p: Params, done: Done| done.ok(0))
            .unwrap();
        let dispatcher = Dispatcher::new(&api);

        let resp = call(&dispatcher, Method::GET, "/list").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.into_json::<Vec<i32>>().unwrap().len(), 3);

        for uri in &["/nothing", "/zero"] {
            let resp = call(&dispatcher, Method::GET, uri).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(resp.body().as_ref(), b"\"\"");
        }
    }

    #[tokio::test]
    async fn error_body() {
        let api = Builder::new(Config::default());
        api.resource("bad")
            .unwrap()
            .all(|_ctx: Context, _p: Params, done: Done| done.err(json!({ "msg": "bad" })))
            .unwrap();
        api.resource("gone")
            .unwrap()
            .all(|_ctx: Context, _p: Params, done: Done| {
                done.err(HandlerError::new(json!({ "msg": "gone" })).with_status(StatusCode::GONE))
            })
            .unwrap();
        api.resource("sink")
            .unwrap()
            .all(|ctx: Context, _p: Params, done: Done| {
                ctx.response().set_status(StatusCode::FORBIDDEN);
                done.err("nope")
            })
            .unwrap();
        api.resource("low")
            .unwrap()
            .all(|_ctx: Context, _p: Params, done: Done| {
                done.err(HandlerError::new("moved").with_status(StatusCode::MOVED_PERMANENTLY))
            })
            .unwrap();
        let dispatcher = Dispatcher::new(&api);

        let resp = call(&dispatcher, Method::GET, "/bad").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.content_type(), Some(JSON_CONTENT_TYPE));
        assert_eq!(resp.into_json::<Value>().unwrap(), json!({ "msg": "bad" }));

        let resp = call(&dispatcher, Method::GET, "/gone").await;
        assert_eq!(resp.status(), StatusCode::GONE);

        let resp = call(&dispatcher, Method::GET, "/sink").await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.into_json::<Value>().unwrap(), json!({ "error": "nope" }));

        let resp = call(&dispatcher, Method::GET, "/low").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.into_json::<String>().unwrap(), "moved");
    }

    #[tokio::test]
    async fn sink_status_and_headers() {
        let api = Builder::new(Config::default());
        api.resource("cars")
            .unwrap()
            .save(|ctx: Context, _p: Params, done: Done| {
                let car: Value = ctx.request().json().unwrap_or(Value::Null);
                ctx.response().set_status(StatusCode::CREATED);
                ctx.response().append_header("location", "/cars/1");
                done.ok(car)
            })
            .unwrap();
        let dispatcher = Dispatcher::new(&api);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/cars")
            .body(r#"{"name":"Volvo"}"#)
            .unwrap();
        let resp = dispatcher.dispatch(req).await.unwrap().unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["location"], "/cars/1");
        assert_eq!(resp.into_json::<Value>().unwrap(), json!({ "name": "Volvo" }));
    }

    #[tokio::test]
    async fn handler_answers_later() {
        let api = Builder::new(Config::default());
        api.resource("slow")
            .unwrap()
            .all(|_ctx: Context, _p: Params, done: Done| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    done.ok("late");
                });
            })
            .unwrap();
        let dispatcher = Dispatcher::new(&api);

        let resp = call(&dispatcher, Method::GET, "/slow").await;
        assert_eq!(resp.into_json::<String>().unwrap(), "late");
    }

    #[tokio::test]
    async fn handler_declines_or_drops() {
        let api = Builder::new(Config::default());
        api.resource("pass")
            .unwrap()
            .all(|_ctx: Context, _p: Params, done: Done| done.decline())
            .unwrap();
        api.resource("drop")
            .unwrap()
            .all(|_ctx: Context, _p: Params, done: Done| drop(done))
            .unwrap();
        let dispatcher = Dispatcher::new(&api);

        assert!(dispatcher
            .dispatch(request(Method::GET, "/pass"))
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            dispatcher.dispatch(request(Method::GET, "/drop")).await,
            Err(DispatchError::Unanswered)
        ));
    }

    #[test]
    fn snapshot_is_frozen() {
        let api = Builder::new(Config::default());
        api.resource("a").unwrap().all(echo).unwrap();
        let dispatcher = Dispatcher::new(&api);
        api.resource("b").unwrap().all(echo).unwrap();

        assert_eq!(dispatcher.resources().len(), 1);
        assert!(dispatcher.find(&Method::GET, "/b").unwrap().is_none());
        assert!(dispatcher.find(&Method::GET, "/A").unwrap().is_some());
    }
}
