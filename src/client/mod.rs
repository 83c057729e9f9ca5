//! Transport layer: the single HTTP client every resource call goes through.

mod error;
mod http;
mod request;

pub use error::ClientError;
pub use http::ApiClient;
pub use request::{ApiRequest, FormPart, Method, RequestBody, Upload};

use async_trait::async_trait;
use serde_json::Value;

/// Sends one request to the backend and yields the envelope's `data`.
///
/// `ApiClient` is the production implementation; tests substitute scripted
/// transports to control timing and failures.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ClientError>;
}
