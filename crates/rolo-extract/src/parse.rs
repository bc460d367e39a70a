//! Pulling a card object out of the model's free text.
//!
//! Models often wrap the object in prose or code fences, so the text from the
//! first `{` through the last `}` is taken as the candidate.

use rolo_core::extract::RawCard;

/// The slice from the first `{` to the last `}` inclusive, if both exist in
/// that order.
pub fn locate_json_object(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let end = text.rfind('}')?;
  (end > start).then(|| &text[start..=end])
}

/// Parse the card object embedded in `text`. The error is a short
/// description suitable for the extraction error detail.
pub fn parse_card(text: &str) -> Result<RawCard, String> {
  let candidate =
    locate_json_object(text).ok_or_else(|| "no JSON object in response".to_owned())?;
  let value: serde_json::Value = serde_json::from_str(candidate)
    .map_err(|e| format!("invalid JSON in response: {e}"))?;
  value
    .as_object()
    .map(RawCard::from_json_object)
    .ok_or_else(|| "response JSON is not an object".to_owned())
}
