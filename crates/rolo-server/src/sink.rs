//! [`WebhookSink`] pushes exported cards to an HTTP endpoint as JSON.

use std::time::Duration;

use reqwest::Client;
use rolo_core::{
  card::CardRecord,
  export::{ExportSink, SinkError},
};

#[derive(Clone)]
pub struct WebhookSink {
  client: Client,
  url:    String,
}

impl WebhookSink {
  pub fn new(url: impl Into<String>) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
    Ok(Self { client, url: url.into() })
  }
}

impl ExportSink for WebhookSink {
  async fn push(&self, card: &CardRecord) -> Result<(), SinkError> {
    self
      .client
      .post(&self.url)
      .json(card)
      .send()
      .await?
      .error_for_status()?;
    Ok(())
  }
}
