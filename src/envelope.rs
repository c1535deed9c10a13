//! The uniform result shape returned by every operation.
//!
//! ```json
//! { "success": true,  "data": { ... },          "message": "Clicked at coordinates (10, 20)" }
//! { "success": false, "error": "Device not connected", "message": "Cannot perform click - device is not connected" }
//! ```
//!
//! The constructors are the only way to build an [`Envelope`], so a failure
//! never carries `data` and a success never carries `error`.

use serde::Serialize;
use serde_json::Value;

/// `error` text used by every connectivity guard.
pub const DEVICE_NOT_CONNECTED: &str = "Device not connected";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    message: String,
}

impl Envelope {
    pub fn ok(data: impl Serialize, message: impl Into<String>) -> Self {
        let data = serde_json::to_value(data).unwrap_or(Value::Null);
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: message.into(),
        }
    }

    pub fn fail(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: message.into(),
        }
    }

    /// Connectivity guard failure: `"Cannot <action> - device is not connected"`.
    pub fn not_connected(action: &str) -> Self {
        Self::fail(
            DEVICE_NOT_CONNECTED,
            format!("Cannot {action} - device is not connected"),
        )
    }

    pub fn missing_param(name: &str) -> Self {
        Self::fail(
            format!("Missing required parameter: {name}"),
            format!("Parameter '{name}' is required"),
        )
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    #[cfg(test)]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Pretty-printed JSON, the form sent back over the protocol.
    pub fn to_text(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
