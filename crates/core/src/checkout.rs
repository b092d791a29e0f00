//! Simulated checkout against a remote endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    error::{Result, StoreError},
    models::CartLine,
};

/// Endpoint used when none is configured.
pub const DEFAULT_CHECKOUT_URL: &str = "https://jsonplaceholder.typicode.com/posts";

const CHECKOUT_TITLE: &str = "Compra realizada";
const CHECKOUT_USER_ID: u32 = 1;
const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Body posted to the checkout endpoint. The cart travels as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    /// Always `1`.
    pub user_id: u32,
    /// Always `"Compra realizada"`.
    pub title: String,
    /// JSON-encoded cart lines.
    pub body: String,
}

impl CheckoutPayload {
    /// Snapshot `lines` into a payload.
    pub fn from_lines(lines: &[CartLine]) -> Result<Self> {
        let body = serde_json::to_string(lines)
            .map_err(|err| StoreError::Checkout(format!("failed to encode cart: {err}")))?;
        Ok(Self {
            user_id: CHECKOUT_USER_ID,
            title: CHECKOUT_TITLE.to_string(),
            body,
        })
    }

    /// Decode the cart lines carried in `body`.
    pub fn lines(&self) -> Result<Vec<CartLine>> {
        serde_json::from_str(&self.body)
            .map_err(|err| StoreError::Checkout(format!("failed to decode cart: {err}")))
    }
}

/// Remote side of the checkout. Any error means the purchase did not happen.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Send `payload`. `Ok` means the purchase was accepted.
    async fn submit(&self, payload: &CheckoutPayload) -> Result<()>;
}

/// Posts the payload as JSON; any 2xx status is a success.
#[derive(Debug, Clone)]
pub struct HttpCheckout {
    client: Client,
    url: String,
}

impl HttpCheckout {
    /// Gateway posting to `url` with a default client.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    /// Gateway sharing an existing HTTP client.
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Endpoint receiving the POST.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CheckoutGateway for HttpCheckout {
    async fn submit(&self, payload: &CheckoutPayload) -> Result<()> {
        let body = serde_json::to_vec(payload)
            .map_err(|err| StoreError::Checkout(format!("failed to encode payload: {err}")))?;
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|err| {
                error!(url = %self.url, %err, "Checkout request failed");
                StoreError::Checkout(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %self.url, %status, "Checkout rejected");
            return Err(StoreError::Checkout(format!("server answered {status}")));
        }
        info!(url = %self.url, %status, "Checkout accepted");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryCheckoutState {
    submissions: Vec<CheckoutPayload>,
    fail_with: Option<String>,
}

/// Gateway that records submissions instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckout {
    state: Arc<Mutex<InMemoryCheckoutState>>,
}

impl InMemoryCheckout {
    /// Gateway accepting every submission.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following submission fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        self.state.lock().fail_with = Some(reason.into());
    }

    /// Undo [`InMemoryCheckout::fail_with`].
    pub fn succeed(&self) {
        self.state.lock().fail_with = None;
    }

    /// Number of submissions attempted, failed ones included.
    pub fn submission_count(&self) -> usize {
        self.state.lock().submissions.len()
    }

    /// Copies of every payload received so far.
    pub fn submissions(&self) -> Vec<CheckoutPayload> {
        self.state.lock().submissions.clone()
    }
}

#[async_trait]
impl CheckoutGateway for InMemoryCheckout {
    async fn submit(&self, payload: &CheckoutPayload) -> Result<()> {
        let mut state = self.state.lock();
        state.submissions.push(payload.clone());
        match &state.fail_with {
            Some(reason) => Err(StoreError::Checkout(reason.clone())),
            None => Ok(()),
        }
    }
}
