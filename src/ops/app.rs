//! App lifecycle handlers: install, uninstall, start, stop, list, inspect.

use serde_json::json;

use crate::argv;
use crate::envelope::Envelope;
use crate::ops::{with_device, Step, ToolContext};
use crate::parse;
use crate::runner::shell_quote;

/// `adb install` / `adb uninstall` print this on stdout and still exit 0
/// on some platform-tools versions.
const FAILURE_MARKER: &str = "Failure";

pub async fn install(ctx: &ToolContext, apk_path: &str, device: Option<&str>) -> Envelope {
    let step = Step::new("install app", "Failed to install app").with_marker(FAILURE_MARKER);
    ctx.guarded(device, step, argv!["install", apk_path], |_, target| {
        Envelope::ok(
            with_device(json!({ "apkPath": apk_path }), target),
            format!("App installed successfully from {apk_path}"),
        )
    })
    .await
}

pub async fn uninstall(ctx: &ToolContext, package: &str, device: Option<&str>) -> Envelope {
    let step = Step::new("uninstall app", "Failed to uninstall app").with_marker(FAILURE_MARKER);
    ctx.guarded(device, step, argv!["uninstall", package], |_, target| {
        Envelope::ok(
            with_device(json!({ "packageName": package }), target),
            format!("App {package} uninstalled successfully"),
        )
    })
    .await
}

/// Launch an explicit activity with `am start`, or the launcher activity
/// through `monkey` when none is given.
pub async fn start(
    ctx: &ToolContext,
    package: &str,
    activity: Option<&str>,
    device: Option<&str>,
) -> Envelope {
    let args = match activity {
        Some(a) => argv![
            "shell",
            "am",
            "start",
            "-n",
            shell_quote(&format!("{package}/{a}"))
        ],
        None => argv![
            "shell",
            "monkey",
            "-p",
            shell_quote(package),
            "-c",
            "android.intent.category.LAUNCHER",
            "1"
        ],
    };
    let step = Step::new("start app", "Failed to start app");
    ctx.guarded(device, step, args, |_, target| {
        let mut payload = json!({ "packageName": package });
        if let Some(a) = activity {
            payload["activityName"] = json!(a);
        }
        Envelope::ok(
            with_device(payload, target),
            format!("App {package} started successfully"),
        )
    })
    .await
}

pub async fn stop(ctx: &ToolContext, package: &str, device: Option<&str>) -> Envelope {
    let step = Step::new("stop app", "Failed to stop app");
    let args = argv!["shell", "am", "force-stop", shell_quote(package)];
    ctx.guarded(device, step, args, |_, target| {
        Envelope::ok(
            with_device(json!({ "packageName": package }), target),
            format!("App {package} stopped successfully"),
        )
    })
    .await
}

/// Third-party packages only (`pm list packages -3`).
pub async fn list(ctx: &ToolContext, device: Option<&str>) -> Envelope {
    let step = Step::new("list apps", "Failed to list installed apps");
    let args = argv!["shell", "pm", "list", "packages", "-3"];
    ctx.guarded(device, step, args, |outcome, target| {
        let packages = parse::parse_package_list(&outcome.output);
        let count = packages.len();
        Envelope::ok(
            with_device(json!({ "packages": packages, "count": count }), target),
            format!("Found {count} installed apps"),
        )
    })
    .await
}

pub async fn info(ctx: &ToolContext, package: &str, device: Option<&str>) -> Envelope {
    let step = Step::new("get app info", "Failed to get app info");
    let args = argv!["shell", "dumpsys", "package", shell_quote(package)];
    ctx.guarded(device, step, args, |outcome, _| {
        Envelope::ok(
            parse::parse_app_info(package, &outcome.output),
            format!("App info retrieved for {package}"),
        )
    })
    .await
}
