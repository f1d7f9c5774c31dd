// Uniform `{success, ...}` result returned by every action wrapper.
//
// Wrappers around external SDK calls never let a failure escape as an error
// value; they convert it into `Outcome::failure` so callers (including the
// LLM tool layer) always get a structured answer.

use serde::Serialize;
use std::fmt::Display;

/// Structured result of an externally-facing operation.
///
/// Serializes as `{"success": true, ..payload}` or
/// `{"success": false, "error": "..."}`. The payload's fields are flattened
/// into the top-level object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Outcome<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Convert a `Result`, stringifying the error with its `Display` form.
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// The error message, or `"Unknown error"` for a failure that carried none.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("Unknown error")
    }
}
