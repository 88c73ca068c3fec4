//! Serde-deserializable types matching catalog API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::types::User;

/// Standard response wrapper used by every catalog endpoint.
///
/// Success bodies look like `{"data": ..., "message": "...", "statusCode": 200}`
/// with the payload always under `data`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  pub data: T,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(rename = "statusCode", default)]
  pub status_code: Option<u16>,
}

/// Response body of the login and register endpoints.
///
/// Unlike the rest of the API this payload uses a snake_case token field.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
  pub access_token: String,
  pub user: User,
}

/// Error response body.
///
/// Validation failures carry `message` as an array of strings; other errors
/// use a single string.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: Option<serde_json::Value>,
  #[serde(default)]
  pub error: Option<String>,
}

impl ApiErrorBody {
  /// Flatten the error body into one printable message.
  pub fn message_text(&self) -> Option<String> {
    match &self.message {
      Some(serde_json::Value::String(s)) => Some(s.clone()),
      Some(serde_json::Value::Array(items)) => {
        let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
        if parts.is_empty() {
          self.error.clone()
        } else {
          Some(parts.join(", "))
        }
      }
      _ => self.error.clone(),
    }
  }
}
