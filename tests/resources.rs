use http::StatusCode;
use restmount::{
    create, test::TestClient, Config, Context, Dispatcher, Done, EndpointExt, HandlerError,
    JSON_CONTENT_TYPE, Params,
};
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

fn list_products(_ctx: Context, params: Params, done: Done) {
    let limit = params.parse::<usize>("limit").and_then(Result::ok).unwrap_or(2);
    let products = ["opel", "volvo", "saab"]
        .iter()
        .take(limit)
        .collect::<Vec<_>>();
    done.ok(products);
}

fn show_product(_ctx: Context, params: Params, done: Done) {
    match params.get("id") {
        Some("1") => done.ok(json!({ "id": 1, "name": "opel" })),
        _ => done.err(
            HandlerError::new(json!({ "error": "no such product" }))
                .with_status(StatusCode::NOT_FOUND),
        ),
    }
}

fn save_product(ctx: Context, _params: Params, done: Done) {
    match ctx.request().json::<Value>() {
        Ok(product) => {
            ctx.response().set_status(StatusCode::CREATED);
            done.ok(product);
        }
        Err(err) => done.err(err.to_string()),
    }
}

fn list_reviews(_ctx: Context, params: Params, done: Done) {
    done.ok(json!({ "product": params.get("id"), "reviews": [] }));
}

fn show_review(_ctx: Context, params: Params, done: Done) {
    done.ok(json!({ "product": params.get("id"), "review": params.get("review") }));
}

fn api() -> Dispatcher {
    let root = create(Config::new().version("1.0").base_path("/api"));

    let products = root.resource("products").unwrap();
    products.all(list_products).unwrap();
    products.save(save_product).unwrap();

    let product = products
        .get("/:id", [("id", r"\d+")], show_product)
        .unwrap();

    let reviews = product.resource("reviews").unwrap();
    reviews.all(list_reviews).unwrap();
    reviews
        .get("/:review", [("review", r"\w+")], show_review)
        .unwrap();

    Dispatcher::new(&root)
}

#[tokio::test]
async fn collection_and_items() {
    init_tracing();
    let cli = TestClient::new(api());

    let resp = cli.get("/api/1.0/products").send().await;
    resp.assert_status_is_ok();
    resp.assert_header(http::header::CONTENT_TYPE, JSON_CONTENT_TYPE);
    resp.assert_json(&["opel", "volvo"]);

    cli.get("/api/1.0/products")
        .query("limit", 3)
        .send()
        .await
        .assert_json(&["opel", "volvo", "saab"]);

    cli.get("/API/1.0/Products/1")
        .send()
        .await
        .assert_json(json!({ "id": 1, "name": "opel" }));

    let resp = cli.get("/api/1.0/products/2").send().await;
    resp.assert_status(StatusCode::NOT_FOUND);
    resp.assert_json(json!({ "error": "no such product" }));
}

#[tokio::test]
async fn nested_resources() {
    init_tracing();
    let cli = TestClient::new(api());

    cli.get("/api/1.0/products/7/reviews")
        .send()
        .await
        .assert_json(json!({ "product": "7", "reviews": [] }));

    cli.get("/api/1.0/products/7/reviews/great")
        .send()
        .await
        .assert_json(json!({ "product": "7", "review": "great" }));
}

#[tokio::test]
async fn save_sets_status() {
    init_tracing();
    let cli = TestClient::new(api());

    let resp = cli
        .post("/api/1.0/products")
        .body_json(&json!({ "name": "saab" }))
        .send()
        .await;
    resp.assert_status(StatusCode::CREATED);
    resp.assert_json(json!({ "name": "saab" }));

    let resp = cli.post("/api/1.0/products").body("not json").send().await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_paths_and_methods() {
    init_tracing();
    let cli = TestClient::new(api());

    cli.get("/products").send().await.assert_declined();
    cli.get("/api/1.0/products/abc").send().await.assert_declined();
    cli.put("/api/1.0/products/1").send().await.assert_declined();
    cli.patch("/api/1.0/products")
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn declined_requests_fall_through() {
    init_tracing();
    let fallback = create(Config::default());
    fallback
        .resource("health")
        .unwrap()
        .all(|_ctx: Context, _params: Params, done: Done| done.ok("up"))
        .unwrap();

    let cli = TestClient::new(api().or(Dispatcher::new(&fallback)));
    cli.get("/health").send().await.assert_json("up");
    cli.get("/api/1.0/products/1")
        .send()
        .await
        .assert_json(json!({ "id": 1, "name": "opel" }));
}
