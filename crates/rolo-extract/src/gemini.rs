//! [`GeminiTransport`]: the Gemini `generateContent` implementation of
//! [`VisionTransport`].

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use reqwest::Client;
use rolo_core::card::CardImage;
use serde::{Deserialize, Serialize};

use crate::transport::{TransportError, VisionTransport};

/// The fixed instruction sent alongside every card image.
pub const CARD_PROMPT: &str = r#"Read the business card in this image and reply with a single JSON object with exactly these keys:
{
  "name": "the person's full name",
  "company": "the company or organisation",
  "designation": "job title or position",
  "email": "email address",
  "phone": "phone number",
  "address": "postal address",
  "website": "website URL",
  "additional_info": "anything else worth keeping"
}
Use null for anything that is not on the card. Reply with the JSON object only."#;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_model() -> String { "gemini-2.0-flash".to_owned() }

fn default_base_url() -> String {
  "https://generativelanguage.googleapis.com".to_owned()
}

fn default_timeout_secs() -> u64 { 30 }

/// Connection settings for the Gemini API.
#[derive(Clone, Deserialize)]
pub struct GeminiConfig {
  pub api_key:      String,
  #[serde(default = "default_model")]
  pub model:        String,
  #[serde(default = "default_base_url")]
  pub base_url:     String,
  /// Per-attempt request timeout.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
  contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
  parts: [Part<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
  Text { text: &'a str },
  Inline { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
  mime_type: &'a str,
  data:      String,
}

#[derive(Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
  text: Option<String>,
}

impl GenerateResponse {
  /// Text of the first part of the first candidate.
  fn into_text(self) -> Option<String> {
    self
      .candidates
      .into_iter()
      .next()?
      .content?
      .parts
      .into_iter()
      .next()?
      .text
  }
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GeminiTransport {
  client: Client,
  config: GeminiConfig,
}

impl GeminiTransport {
  pub fn new(config: GeminiConfig) -> reqwest::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn endpoint(&self) -> String {
    format!(
      "{}/v1beta/models/{}:generateContent",
      self.config.base_url.trim_end_matches('/'),
      self.config.model
    )
  }
}

fn transport_error(e: reqwest::Error) -> TransportError {
  if e.is_timeout() {
    TransportError::Timeout
  } else if e.is_decode() {
    TransportError::Envelope(e.to_string())
  } else {
    TransportError::Network(e.to_string())
  }
}

impl VisionTransport for GeminiTransport {
  async fn send(&self, image: &CardImage) -> Result<String, TransportError> {
    let body = GenerateRequest {
      contents: [Content {
        parts: [
          Part::Text { text: CARD_PROMPT },
          Part::Inline {
            inline_data: InlineData {
              mime_type: &image.media_type,
              data:      B64.encode(&image.bytes),
            },
          },
        ],
      }],
    };

    let resp = self
      .client
      .post(self.endpoint())
      .query(&[("key", self.config.api_key.as_str())])
      .json(&body)
      .send()
      .await
      .map_err(transport_error)?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(TransportError::Status { code: status.as_u16(), body });
    }

    let envelope: GenerateResponse = resp.json().await.map_err(transport_error)?;
    envelope
      .into_text()
      .ok_or_else(|| TransportError::Envelope("no content in response".to_owned()))
  }
}
