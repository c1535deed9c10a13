//! Shell execution and read-only system diagnostics.

use indexmap::IndexMap;
use serde_json::json;
use tracing::warn;

use crate::argv;
use crate::envelope::Envelope;
use crate::ops::{with_device, Step, ToolContext};
use crate::parse::{self, NOT_AVAILABLE};
use crate::runner::shell_quote;

pub const DEFAULT_LOGCAT_LINES: u64 = 100;

/// Lower-cased substrings that block a shell command outright. This is a
/// coarse filter, not a sandbox.
const DENIED: [&str; 6] = [
    "rm -rf /",
    "format",
    "factory_reset",
    "reboot bootloader",
    "fastboot",
    "dd if=",
];

/// `(payload key, device shell command)` in reporting order.
const SYSTEM_PROBES: [(&str, &str); 11] = [
    ("androidVersion", "getprop ro.build.version.release"),
    ("apiLevel", "getprop ro.build.version.sdk"),
    ("manufacturer", "getprop ro.product.manufacturer"),
    ("model", "getprop ro.product.model"),
    ("brand", "getprop ro.product.brand"),
    ("device", "getprop ro.product.device"),
    ("buildId", "getprop ro.build.id"),
    ("kernel", "uname -r"),
    ("uptime", "uptime"),
    ("meminfo", "cat /proc/meminfo | head -5"),
    ("cpuinfo", "cat /proc/cpuinfo | grep \"model name\" | head -1"),
];

fn denied_fragment(command: &str) -> Option<&'static str> {
    let lowered = command.to_lowercase();
    DENIED.iter().copied().find(|d| lowered.contains(d))
}

/// Run `command` through the device shell as-is.
pub async fn exec(ctx: &ToolContext, command: &str, device: Option<&str>) -> Envelope {
    if let Some(fragment) = denied_fragment(command) {
        warn!(command, fragment, "blocked shell command");
        return Envelope::fail(
            "Dangerous command blocked",
            format!("Command contains potentially dangerous operation: {fragment}"),
        );
    }
    let step = Step::new("execute shell command", "Command execution failed");
    ctx.guarded(device, step, argv!["shell", command], |outcome, target| {
        let mut payload = json!({ "command": command, "output": outcome.output });
        if let Some(stderr) = outcome.diagnostic {
            payload["stderr"] = json!(stderr);
        }
        Envelope::ok(with_device(payload, target), "Command executed successfully")
    })
    .await
}

/// Run every probe in turn. A failed probe reports `N/A` and does not fail
/// the call.
pub async fn system_info(ctx: &ToolContext, device: Option<&str>) -> Envelope {
    if let Err(envelope) = ctx.ensure_connected(device, "get system info").await {
        return envelope;
    }
    let mut info: IndexMap<&str, String> = IndexMap::with_capacity(SYSTEM_PROBES.len() + 1);
    for (key, command) in SYSTEM_PROBES {
        let outcome = ctx.run(device, &argv!["shell", command]).await;
        let value = if outcome.succeeded {
            outcome.output.trim().to_string()
        } else {
            NOT_AVAILABLE.to_string()
        };
        info.insert(key, value);
    }
    if let Some(id) = ctx.registry.resolve(device).await {
        info.insert("deviceId", id);
    }
    Envelope::ok(info, "System information retrieved successfully")
}

pub async fn battery_info(ctx: &ToolContext, device: Option<&str>) -> Envelope {
    let step = Step::new("get battery info", "Failed to get battery info");
    let args = argv!["shell", "dumpsys", "battery"];
    ctx.guarded(device, step, args, |outcome, target| {
        let battery = parse::parse_battery_info(&outcome.output);
        Envelope::ok(
            with_device(json!(battery), target),
            "Battery information retrieved successfully",
        )
    })
    .await
}

/// Dump the last `lines` log lines, optionally filtered to one tag.
pub async fn logcat(
    ctx: &ToolContext,
    lines: u64,
    tag: Option<&str>,
    device: Option<&str>,
) -> Envelope {
    let mut args = argv!["shell", "logcat", "-d", "-t", lines];
    if let Some(t) = tag {
        args.extend(argv!["-s", shell_quote(t)]);
    }
    let step = Step::new("get logcat", "Failed to get logcat");
    ctx.guarded(device, step, args, |outcome, target| {
        let mut payload = json!({ "logs": outcome.output, "lines": lines });
        let message = match tag {
            Some(t) => {
                payload["tag"] = json!(t);
                format!("Retrieved {lines} logcat lines for tag: {t}")
            }
            None => format!("Retrieved {lines} logcat lines"),
        };
        Envelope::ok(with_device(payload, target), message)
    })
    .await
}
