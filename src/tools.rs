//! MCP tool definitions and dispatch.
//!
//! Each tool is defined as a JSON schema (returned by [`tool_definitions`])
//! and routed by [`handle_tool_call`] to a handler in [`crate::ops`]. Every
//! handler answers with an [`Envelope`], which becomes the single text
//! content block of the tool result.
//!
//! ## Tool categories
//!
//! - **Device**: `adb_list_devices`, `adb_get_device_info`,
//!   `adb_check_connection`, `adb_set_default_device`, `adb_get_default_device`
//! - **Screen**: `adb_screenshot`, `adb_click`, `adb_swipe`,
//!   `adb_input_text`, `adb_press_key`
//! - **App**: `adb_install_app`, `adb_uninstall_app`, `adb_start_app`,
//!   `adb_stop_app`, `adb_list_apps`, `adb_get_app_info`
//! - **File**: `adb_push_file`, `adb_pull_file`, `adb_list_files`,
//!   `adb_delete_file`, `adb_create_directory`
//! - **Shell**: `adb_shell`, `adb_get_system_info`, `adb_get_battery_info`,
//!   `adb_get_logcat`

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::envelope::Envelope;
use crate::ops::screen::{Swipe, DEFAULT_SWIPE_MS};
use crate::ops::shell::DEFAULT_LOGCAT_LINES;
use crate::ops::{app, device, file, number, screen, shell, ToolContext};

const DEVICE_ID_DESC: &str = "Device ID (optional, uses default device if not specified)";

fn device_id_property() -> Value {
    json!({ "type": "string", "description": DEVICE_ID_DESC })
}

/// Schema for a tool whose only input is the optional `deviceId`.
fn device_only(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": { "deviceId": device_id_property() },
            "additionalProperties": false
        }
    })
}

/// Schema for a tool taking one required string plus the optional `deviceId`.
fn one_string(name: &str, description: &str, param: &str, param_desc: &str) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": {
                param: { "type": "string", "description": param_desc },
                "deviceId": device_id_property()
            },
            "required": [param],
            "additionalProperties": false
        }
    })
}

/// Returns every tool definition, in catalog order.
pub fn tool_definitions() -> Vec<Value> {
    vec![
        // ── Device ───────────────────────────────────────────────────
        json!({
            "name": "adb_list_devices",
            "description": "List all Android devices known to adb, with their status and model.",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }
        }),
        device_only(
            "adb_get_device_info",
            "Get model, manufacturer, Android version, API level, screen size and battery level of a device.",
        ),
        device_only(
            "adb_check_connection",
            "Check whether a device is attached and authorized.",
        ),
        json!({
            "name": "adb_set_default_device",
            "description": "Set the default device for subsequent operations. The device must be connected.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "deviceId": {
                        "type": "string",
                        "description": "Device ID to set as default"
                    }
                },
                "required": ["deviceId"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "adb_get_default_device",
            "description": "Show the current default device, if any.",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }
        }),
        // ── Screen ───────────────────────────────────────────────────
        json!({
            "name": "adb_screenshot",
            "description": "Take a screenshot of the device screen and pull it to the host screenshot directory.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "deviceId": device_id_property(),
                    "format": {
                        "type": "string",
                        "enum": ["png", "jpg"],
                        "description": "Screenshot format (default: png)"
                    }
                },
                "additionalProperties": false
            }
        }),
        json!({
            "name": "adb_click",
            "description": "Tap at specific coordinates on the device screen.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "x": { "type": "number", "description": "X coordinate" },
                    "y": { "type": "number", "description": "Y coordinate" },
                    "deviceId": device_id_property()
                },
                "required": ["x", "y"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "adb_swipe",
            "description": "Swipe from one point to another on the device screen.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "x1": { "type": "number", "description": "Start X coordinate" },
                    "y1": { "type": "number", "description": "Start Y coordinate" },
                    "x2": { "type": "number", "description": "End X coordinate" },
                    "y2": { "type": "number", "description": "End Y coordinate" },
                    "duration": {
                        "type": "integer",
                        "description": "Swipe duration in milliseconds (default: 300)"
                    },
                    "deviceId": device_id_property()
                },
                "required": ["x1", "y1", "x2", "y2"],
                "additionalProperties": false
            }
        }),
        one_string(
            "adb_input_text",
            "Type text into the focused field on the device.",
            "text",
            "Text to input",
        ),
        json!({
            "name": "adb_press_key",
            "description": "Press a key on the device.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "keyCode": {
                        "type": ["string", "number"],
                        "description": "Key code to press (e.g. \"KEYCODE_BACK\", \"KEYCODE_HOME\", or a numeric code)"
                    },
                    "deviceId": device_id_property()
                },
                "required": ["keyCode"],
                "additionalProperties": false
            }
        }),
        // ── App ──────────────────────────────────────────────────────
        one_string(
            "adb_install_app",
            "Install an APK file from the host onto the device.",
            "apkPath",
            "Host path to the APK file",
        ),
        one_string(
            "adb_uninstall_app",
            "Uninstall an app from the device.",
            "packageName",
            "Package name of the app to uninstall",
        ),
        json!({
            "name": "adb_start_app",
            "description": "Start an app on the device, optionally at a specific activity.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "packageName": {
                        "type": "string",
                        "description": "Package name of the app to start"
                    },
                    "activityName": {
                        "type": "string",
                        "description": "Activity name (optional; the launcher activity is used otherwise)"
                    },
                    "deviceId": device_id_property()
                },
                "required": ["packageName"],
                "additionalProperties": false
            }
        }),
        one_string(
            "adb_stop_app",
            "Force-stop an app on the device.",
            "packageName",
            "Package name of the app to stop",
        ),
        device_only(
            "adb_list_apps",
            "List third-party apps installed on the device.",
        ),
        one_string(
            "adb_get_app_info",
            "Get version and install state of an app.",
            "packageName",
            "Package name of the app",
        ),
        // ── File ─────────────────────────────────────────────────────
        json!({
            "name": "adb_push_file",
            "description": "Push a file from the host to the device.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "localPath": { "type": "string", "description": "Host file path" },
                    "remotePath": { "type": "string", "description": "Destination path on the device" },
                    "deviceId": device_id_property()
                },
                "required": ["localPath", "remotePath"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "adb_pull_file",
            "description": "Pull a file from the device to the host.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "remotePath": { "type": "string", "description": "File path on the device" },
                    "localPath": {
                        "type": "string",
                        "description": "Host destination (optional; defaults to the working directory)"
                    },
                    "deviceId": device_id_property()
                },
                "required": ["remotePath"],
                "additionalProperties": false
            }
        }),
        one_string(
            "adb_list_files",
            "List files in a directory on the device.",
            "remotePath",
            "Directory path on the device",
        ),
        one_string(
            "adb_delete_file",
            "Delete a file on the device.",
            "remotePath",
            "File path on the device",
        ),
        one_string(
            "adb_create_directory",
            "Create a directory (and missing parents) on the device.",
            "remotePath",
            "Directory path on the device",
        ),
        // ── Shell ────────────────────────────────────────────────────
        one_string(
            "adb_shell",
            "Execute a shell command on the device. Destructive commands (filesystem wipes, formatting, factory reset, bootloader/fastboot, raw disk writes) are refused.",
            "command",
            "Shell command to execute",
        ),
        device_only(
            "adb_get_system_info",
            "Get Android version, build, kernel, uptime, memory and CPU information from the device.",
        ),
        device_only(
            "adb_get_battery_info",
            "Get battery level, status, health, temperature and related fields.",
        ),
        json!({
            "name": "adb_get_logcat",
            "description": "Dump recent logcat output from the device.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "lines": {
                        "type": "integer",
                        "description": "Number of lines to retrieve (default: 100)"
                    },
                    "tag": { "type": "string", "description": "Filter by tag (optional)" },
                    "deviceId": device_id_property()
                },
                "additionalProperties": false
            }
        }),
    ]
}

/// Result of an MCP tool call, ready to be serialized into a JSON-RPC response.
#[derive(Debug)]
pub struct ToolResult {
    /// MCP content blocks (a single `{"type":"text","text":"..."}` entry).
    pub content: Vec<Value>,
    /// Whether the tool call failed (maps to `isError` in the MCP response).
    pub is_error: bool,
}

impl ToolResult {
    fn error(message: String) -> Self {
        Self {
            content: vec![json!({ "type": "text", "text": message })],
            is_error: true,
        }
    }
}

impl From<Envelope> for ToolResult {
    fn from(envelope: Envelope) -> Self {
        Self {
            content: vec![json!({ "type": "text", "text": envelope.to_text() })],
            is_error: !envelope.is_success(),
        }
    }
}

/// Handle a tool call and return MCP content.
///
/// A handler that panics is reported as a failed envelope; the server keeps
/// serving.
pub async fn handle_tool_call(name: &str, args: &Value, ctx: &ToolContext) -> ToolResult {
    debug!(tool = name, "tool call");
    match AssertUnwindSafe(dispatch(name, args, ctx))
        .catch_unwind()
        .await
    {
        Ok(Some(envelope)) => {
            debug!(
                tool = name,
                success = envelope.is_success(),
                error = envelope.error().unwrap_or(""),
                message = envelope.message(),
                "tool finished"
            );
            envelope.into()
        }
        Ok(None) => ToolResult::error(format!("Unknown tool: {name}")),
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(tool = name, reason = %reason, "tool handler panicked");
            Envelope::fail(reason, "Tool execution failed").into()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Unwrap a parameter or return its validation envelope from `dispatch`.
macro_rules! param {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(envelope) => return Some(envelope),
        }
    };
}

/// Route to the handler. `None` means the tool name is unknown.
async fn dispatch(name: &str, args: &Value, ctx: &ToolContext) -> Option<Envelope> {
    let dev = device_param(args);
    let envelope = match name {
        "adb_list_devices" => device::list(ctx).await,
        "adb_get_device_info" => device::info(ctx, dev).await,
        "adb_check_connection" => device::check_connection(ctx, dev).await,
        "adb_set_default_device" => {
            device::set_default(ctx, param!(str_param(args, "deviceId"))).await
        }
        "adb_get_default_device" => device::get_default(ctx).await,

        "adb_screenshot" => {
            let format = args.get("format").and_then(Value::as_str);
            screen::screenshot(ctx, format, dev).await
        }
        "adb_click" => {
            let x = param!(num_param(args, "x"));
            let y = param!(num_param(args, "y"));
            screen::click(ctx, x, y, dev).await
        }
        "adb_swipe" => {
            let swipe = Swipe {
                x1: param!(num_param(args, "x1")),
                y1: param!(num_param(args, "y1")),
                x2: param!(num_param(args, "x2")),
                y2: param!(num_param(args, "y2")),
                duration_ms: param!(count_param(args, "duration", DEFAULT_SWIPE_MS)),
            };
            screen::swipe(ctx, swipe, dev).await
        }
        "adb_input_text" => screen::input_text(ctx, param!(str_param(args, "text")), dev).await,
        "adb_press_key" => {
            let key = param!(key_code_param(args));
            screen::press_key(ctx, &key, dev).await
        }

        "adb_install_app" => app::install(ctx, param!(str_param(args, "apkPath")), dev).await,
        "adb_uninstall_app" => {
            app::uninstall(ctx, param!(str_param(args, "packageName")), dev).await
        }
        "adb_start_app" => {
            let package = param!(str_param(args, "packageName"));
            let activity = args
                .get("activityName")
                .and_then(Value::as_str)
                .filter(|a| !a.is_empty());
            app::start(ctx, package, activity, dev).await
        }
        "adb_stop_app" => app::stop(ctx, param!(str_param(args, "packageName")), dev).await,
        "adb_list_apps" => app::list(ctx, dev).await,
        "adb_get_app_info" => app::info(ctx, param!(str_param(args, "packageName")), dev).await,

        "adb_push_file" => {
            let local = param!(str_param(args, "localPath"));
            let remote = param!(str_param(args, "remotePath"));
            file::push(ctx, local, remote, dev).await
        }
        "adb_pull_file" => {
            let remote = param!(str_param(args, "remotePath"));
            let local = args
                .get("localPath")
                .and_then(Value::as_str)
                .filter(|p| !p.is_empty());
            file::pull(ctx, remote, local, dev).await
        }
        "adb_list_files" => file::list(ctx, param!(str_param(args, "remotePath")), dev).await,
        "adb_delete_file" => file::delete(ctx, param!(str_param(args, "remotePath")), dev).await,
        "adb_create_directory" => {
            file::mkdir(ctx, param!(str_param(args, "remotePath")), dev).await
        }

        "adb_shell" => shell::exec(ctx, param!(str_param(args, "command")), dev).await,
        "adb_get_system_info" => shell::system_info(ctx, dev).await,
        "adb_get_battery_info" => shell::battery_info(ctx, dev).await,
        "adb_get_logcat" => {
            let lines = param!(count_param(args, "lines", DEFAULT_LOGCAT_LINES));
            let tag = args
                .get("tag")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty());
            shell::logcat(ctx, lines, tag, dev).await
        }
        _ => return None,
    };
    Some(envelope)
}

fn device_param(args: &Value) -> Option<&str> {
    args.get("deviceId")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
}

fn str_param<'a>(args: &'a Value, name: &str) -> Result<&'a str, Envelope> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| Envelope::missing_param(name))
}

fn num_param(args: &Value, name: &str) -> Result<f64, Envelope> {
    args.get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| Envelope::missing_param(name))
}

/// Optional non-negative integer. Absent or `null` gives `default`; an
/// integral float such as `500.0` is accepted.
fn count_param(args: &Value, name: &str, default: u64) -> Result<u64, Envelope> {
    let value = match args.get(name) {
        None | Some(Value::Null) => return Ok(default),
        Some(v) => v,
    };
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < 9.0e15 => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let n = f as u64;
            Ok(n)
        }
        _ => Err(Envelope::fail(
            format!("Invalid parameter: {name}"),
            format!("Parameter '{name}' must be a non-negative integer"),
        )),
    }
}

/// `keyCode` may be sent as a string or a number.
fn key_code_param(args: &Value) -> Result<String, Envelope> {
    match args.get("keyCode") {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n
            .as_f64()
            .map_or_else(|| n.to_string(), |f| number(f).to_string())),
        _ => Err(Envelope::missing_param("keyCode")),
    }
}
