//! Async HTTP client for the gatelog ingestion endpoint.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use gatelog_core::{
  event::Event,
  ingest::{Batch, BatchReceipt},
};
use reqwest::Client;
use serde::Deserialize;

/// Header carrying the device credential.
const API_KEY_HEADER: &str = "x-api-key";

/// Connection settings for the gatelog server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url:  String,
  pub device_id: String,
  /// Empty when the server does not require device authentication.
  pub api_key:   String,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .user_agent(concat!("gatelog-capture/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  pub fn device_id(&self) -> &str { &self.config.device_id }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  /// `POST /api/events/batch`
  pub async fn submit(&self, events: Vec<Event>) -> Result<BatchReceipt> {
    let batch = Batch {
      device_id: Some(self.config.device_id.clone()),
      events,
    };
    let mut req = self.client.post(self.url("/events/batch")).json(&batch);
    if !self.config.api_key.is_empty() {
      req = req.header(API_KEY_HEADER, &self.config.api_key);
    }
    let resp = req.send().await.context("POST /events/batch failed")?;

    let status = resp.status();
    if !status.is_success() {
      let detail = resp
        .json::<ErrorBody>()
        .await
        .map(|b| b.error)
        .unwrap_or_default();
      return Err(anyhow!("POST /events/batch → {status} {detail}"));
    }
    resp.json().await.context("deserialising batch receipt")
  }
}
