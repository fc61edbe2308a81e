//! Success/error envelopes.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Outcome of an operation that produces no payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpResult {
    /// Whether the operation completed.
    pub success: bool,
    /// Optional message; carries the failure text on error.
    #[serde(default)]
    pub message: Option<String>,
}

impl OpResult {
    /// A successful outcome without a message.
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// A successful outcome with an informational message.
    pub fn success_with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// A failed outcome carrying the failure text.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    /// Converts the envelope into a `Result`, using the message as the error.
    ///
    /// # Errors
    ///
    /// Returns the envelope's message (or an empty string) when `success` is false.
    pub fn into_result(self) -> Result<(), String> {
        if self.success {
            Ok(())
        } else {
            Err(self.message.unwrap_or_default())
        }
    }
}

impl<E: Display> From<Result<(), E>> for OpResult {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// Outcome of an operation that produces a payload of type `T`.
///
/// A successful envelope always carries `data`; a failed one never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResult<T> {
    /// Whether the operation completed.
    pub success: bool,
    /// Optional message; carries the failure text on error.
    #[serde(default)]
    pub message: Option<String>,
    /// The payload, present only on success.
    pub data: Option<T>,
}

impl<T> DataResult<T> {
    /// A successful outcome carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// A successful outcome carrying `data` and an informational message.
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// A failed outcome carrying the failure text and no payload.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Converts the envelope into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the envelope's message (or an empty string) when `success` is
    /// false or the payload is missing.
    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.message.unwrap_or_default()),
        }
    }
}

impl<T, E: Display> From<Result<T, E>> for DataResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::error(e.to_string()),
        }
    }
}
