use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use do_exporter_common::error::{ExporterError, Result};
use reqwest::{StatusCode, Url, header};
use tracing::debug;

use crate::{
    credentials::TokenSource,
    types::{AccountRoot, AccountSnapshot, ApiErrorBody},
};

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

const ACCOUNT_PATH: &str = "v2/account";
const USER_AGENT: &str = concat!("do_exporter/", env!("CARGO_PKG_VERSION"));

/// Something that can produce a fresh account snapshot within a bounded time.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn fetch_account(&self, timeout: Duration) -> Result<AccountSnapshot>;
}

/// Reads the account resource of the authenticated DigitalOcean user.
///
/// Every call is a fresh request: there is no retry and no caching.
pub struct AccountClient {
    endpoint: Url,
    tokens: Arc<dyn TokenSource>,
    client: reqwest::Client,
}

impl AccountClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let endpoint = account_endpoint(base_url)?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| ExporterError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            endpoint,
            tokens,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn fetch_account(&self, timeout: Duration) -> Result<AccountSnapshot> {
        // Dropping the request future on expiry cancels the in-flight call.
        match tokio::time::timeout(timeout, self.request_account()).await {
            Ok(result) => result,
            Err(_) => Err(ExporterError::Timeout(timeout)),
        }
    }

    async fn request_account(&self) -> Result<AccountSnapshot> {
        let token = self
            .tokens
            .token()
            .map_err(|err| ExporterError::Upstream(format!("failed to obtain API token: {err}")))?;

        let response = self
            .client
            .get(self.endpoint.clone())
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| {
                ExporterError::Upstream(format!("failed to request {}: {err}", self.endpoint))
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| {
            ExporterError::Upstream(format!(
                "failed to read response body from {}: {err}",
                self.endpoint
            ))
        })?;

        if !status.is_success() {
            return Err(ExporterError::Upstream(describe_failure(status, &body)));
        }

        let snapshot = decode_account(&body)?;
        debug!(
            status = %snapshot.status,
            droplet_limit = snapshot.droplet_limit,
            floating_ip_limit = snapshot.floating_ip_limit,
            "fetched account snapshot"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl AccountSource for AccountClient {
    async fn fetch_account(&self, timeout: Duration) -> Result<AccountSnapshot> {
        Self::fetch_account(self, timeout).await
    }
}

pub fn decode_account(body: &[u8]) -> Result<AccountSnapshot> {
    let root: AccountRoot = serde_json::from_slice(body).map_err(|err| {
        ExporterError::Upstream(format!("failed to decode account response: {err}"))
    })?;
    Ok(root.account)
}

fn describe_failure(status: StatusCode, body: &[u8]) -> String {
    let details = serde_json::from_slice::<ApiErrorBody>(body).unwrap_or_default();
    match (details.id, details.message) {
        (Some(id), Some(message)) => format!("account API returned status {status}: {id}: {message}"),
        (None, Some(message)) => format!("account API returned status {status}: {message}"),
        _ => format!("account API returned status {status}"),
    }
}

fn account_endpoint(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url)
        .map_err(|err| ExporterError::Config(format!("invalid API url {base_url:?}: {err}")))?;

    if !matches!(base.scheme(), "http" | "https") {
        return Err(ExporterError::Config(format!(
            "API url must use http or https: {base_url}"
        )));
    }

    // Url::join replaces the last segment unless the base ends with a slash.
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(ACCOUNT_PATH)
        .map_err(|err| ExporterError::Config(format!("invalid API url {base_url:?}: {err}")))
}
