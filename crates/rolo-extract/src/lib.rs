//! Extraction gateway for Rolo.
//!
//! [`Gateway`] wraps a [`VisionTransport`] with the bounded retry policy and
//! the failure classification, and implements
//! [`rolo_core::extract::CardExtractor`]. [`GeminiTransport`] talks to the
//! Gemini `generateContent` endpoint.

pub mod gateway;
pub mod gemini;
pub mod parse;
pub mod transport;

pub use gateway::{Gateway, MAX_ATTEMPTS, RetryPolicy};
pub use gemini::{GeminiConfig, GeminiTransport};
pub use transport::{TransportError, VisionTransport};
