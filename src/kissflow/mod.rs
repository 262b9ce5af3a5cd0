pub mod mapper;
pub mod mock;
pub mod types;

pub use types::{FetchResponse, ItemId};

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{Config, KissflowCredentials};
use types::{ErrorBody, ExternalRecord, FetchRequest};

/// Every Kissflow product-feature item id starts with this prefix.
pub const ITEM_ID_PREFIX: &str = "KFF-";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Item ID is required")]
    MissingItemId,

    #[error("Invalid Item ID. Must start with \"KFF-\"")]
    InvalidItemId,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// User-facing text taken from a non-2xx backend response.
    #[error("{0}")]
    Backend(String),

    #[error("Failed to parse item payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Validate a user-supplied item id before anything goes over the network.
pub fn parse_item_id(raw: &str) -> Result<ItemId, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FetchError::MissingItemId);
    }
    if !trimmed.starts_with(ITEM_ID_PREFIX) {
        return Err(FetchError::InvalidItemId);
    }
    Ok(ItemId(trimmed.to_string()))
}

/// Where work items come from.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Short label for logs (e.g., "backend", "kissflow", "mock")
    fn name(&self) -> &str;

    /// Fetch the item and map it into a report record.
    async fn fetch(&self, item_id: &ItemId) -> Result<FetchResponse, FetchError>;
}

/// Pick the item source for this run: `--mock` wins, then direct Kissflow
/// access when credentials are configured, otherwise the QSR backend proxy.
pub fn select_source(config: &Config, use_mock: bool) -> Result<Box<dyn ItemSource>, FetchError> {
    if use_mock {
        return Ok(Box::new(MockSource));
    }
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?;
    match config.kissflow_credentials() {
        Some(credentials) => Ok(Box::new(KissflowApi::new(client, credentials))),
        None => {
            info!("Kissflow credentials not configured, using backend proxy");
            Ok(Box::new(BackendProxy::new(client, config.backend_url())))
        }
    }
}

/// Built-in example item; never touches the network.
pub struct MockSource;

#[async_trait]
impl ItemSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, item_id: &ItemId) -> Result<FetchResponse, FetchError> {
        mock::mock_response(item_id)
    }
}

/// The QSR backend, which talks to Kissflow and does the mapping server-side.
pub struct BackendProxy {
    client: reqwest::Client,
    base_url: String,
}

impl BackendProxy {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/v1/qsr/fetch-data", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ItemSource for BackendProxy {
    fn name(&self) -> &str {
        "backend"
    }

    /// Non-2xx responses become `FetchError::Backend` carrying the server's
    /// `detail` or `message`. A backend that cannot be reached at all is
    /// replaced by the mock item.
    #[instrument(skip(self))]
    async fn fetch(&self, item_id: &ItemId) -> Result<FetchResponse, FetchError> {
        debug!(endpoint = %self.endpoint(), "posting fetch request to backend");
        let sent = self
            .client
            .post(self.endpoint())
            .json(&FetchRequest {
                item_id: item_id.as_str(),
            })
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(err) if err.is_connect() => {
                warn!(error = %err, "backend not available, falling back to mock data");
                return mock::mock_response(item_id);
            }
            Err(err) => return Err(err.into()),
        };

        let status = response.status();
        debug!(status = status.as_u16(), "backend responded");
        if !status.is_success() {
            let body = response.json::<ErrorBody>().await.unwrap_or_default();
            let message = body
                .user_message()
                .unwrap_or_else(|| format!("Failed to fetch data: {}", status.as_u16()));
            error!(status = status.as_u16(), %message, "backend API error");
            return Err(FetchError::Backend(message));
        }

        let fetched = response.json::<FetchResponse>().await?;
        if !fetched.success {
            return Err(FetchError::Backend(format!(
                "Backend could not fetch item {item_id}"
            )));
        }
        debug!(missing = fetched.missing_fields.len(), "received mapped item");
        Ok(fetched)
    }
}

/// Direct access to the Kissflow REST API with an access key pair.
pub struct KissflowApi {
    client: reqwest::Client,
    credentials: KissflowCredentials,
}

impl KissflowApi {
    pub fn new(client: reqwest::Client, credentials: KissflowCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    async fn fetch_payload(&self, item_id: &ItemId) -> Result<ExternalRecord, FetchError> {
        let url = format!(
            "{}/{}",
            self.credentials.base_url.trim_end_matches('/'),
            item_id
        );
        let response = self
            .client
            .get(&url)
            .header("X-Access-Key-Id", &self.credentials.access_key_id)
            .header("X-Access-Key-Secret", &self.credentials.access_key_secret)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Backend(format!(
                "Kissflow API error: {} - {}",
                status.as_u16(),
                body
            )));
        }
        Ok(response.json::<ExternalRecord>().await?)
    }
}

#[async_trait]
impl ItemSource for KissflowApi {
    fn name(&self) -> &str {
        "kissflow"
    }

    /// Any failure talking to Kissflow degrades to the mock item.
    #[instrument(skip(self))]
    async fn fetch(&self, item_id: &ItemId) -> Result<FetchResponse, FetchError> {
        info!("fetching item from Kissflow");
        match self.fetch_payload(item_id).await {
            Ok(payload) => {
                let data = mapper::map(&payload);
                let missing_fields = mapper::identify_missing_fields(&data);
                info!(missing = missing_fields.len(), "mapped Kissflow item");
                Ok(FetchResponse {
                    success: true,
                    data,
                    missing_fields,
                })
            }
            Err(err) => {
                error!(error = %err, "Kissflow fetch failed, falling back to mock data");
                mock::mock_response(item_id)
            }
        }
    }
}
