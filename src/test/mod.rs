//! Test utilities to test your endpoints.


pub use client::TestClient;
pub use request_builder::TestRequestBuilder;
pub use response::TestResponse;
