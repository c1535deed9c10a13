//! Screen capture and input injection.

use serde_json::json;
use tracing::{debug, warn};

use crate::argv;
use crate::envelope::Envelope;
use crate::ops::{number, with_device, Step, ToolContext};
use crate::runner::shell_quote;

pub const DEFAULT_SWIPE_MS: u64 = 300;
const FORMATS: [&str; 2] = ["png", "jpg"];

/// Capture on the device, pull to the download directory, then remove the
/// device copy. The steps are not atomic: a failed pull leaves the device
/// file in place, and a failed cleanup is ignored.
pub async fn screenshot(ctx: &ToolContext, format: Option<&str>, device: Option<&str>) -> Envelope {
    let format = format.unwrap_or("png");
    if !FORMATS.contains(&format) {
        return Envelope::fail("Invalid format", "Format must be png or jpg");
    }
    if let Err(envelope) = ctx.ensure_connected(device, "take screenshot").await {
        return envelope;
    }

    let remote = format!("/sdcard/screenshot.{format}");
    let capture = ctx
        .run(device, &argv!["shell", "screencap", "-p", remote])
        .await;
    if !capture.succeeded {
        return Envelope::fail(
            capture.failure_text(),
            "Failed to capture screenshot on device",
        );
    }

    let filename = format!("current_screenshot.{format}");
    let adb_path = ctx.paths.adb_path(&filename);
    let mcp_path = ctx.paths.read_path(&filename);
    let pull = ctx.run(device, &argv!["pull", remote, adb_path]).await;
    if !pull.succeeded {
        return Envelope::fail(pull.failure_text(), "Failed to pull screenshot from device");
    }

    let cleanup = ctx.run(device, &argv!["shell", "rm", remote]).await;
    if !cleanup.succeeded {
        debug!(path = %remote, "screenshot cleanup failed");
    }

    let (file_size, file_exists) = match tokio::fs::metadata(&mcp_path).await {
        Ok(meta) => (format!("{} KB", kilobytes(meta.len())), true),
        Err(e) => {
            warn!(path = %mcp_path, error = %e, "could not stat screenshot");
            ("Unknown".to_string(), false)
        }
    };

    let target = ctx.registry.resolve(device).await;
    let message = format!("Screenshot saved to {adb_path} (readable at {mcp_path})");
    let payload = json!({
        "adbPath": adb_path,
        "mcpPath": mcp_path,
        "filename": filename,
        "format": format,
        "fileSize": file_size,
        "fileExists": file_exists,
    });
    let mut payload = with_device(payload, target);
    payload["pullInfo"] = json!(pull.output);
    Envelope::ok(payload, message)
}

fn kilobytes(bytes: u64) -> u64 {
    (bytes + 512) / 1024
}

pub async fn click(ctx: &ToolContext, x: f64, y: f64, device: Option<&str>) -> Envelope {
    if x < 0.0 || y < 0.0 {
        return Envelope::fail("Invalid coordinates", "Coordinates must be positive numbers");
    }
    let (x, y) = (number(x), number(y));
    let step = Step::new("perform click", "Failed to perform click");
    let args = argv!["shell", "input", "tap", x, y];
    ctx.guarded(device, step, args, |_, target| {
        let message = format!("Clicked at coordinates ({x}, {y})");
        Envelope::ok(with_device(json!({ "x": x, "y": y }), target), message)
    })
    .await
}

pub struct Swipe {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub duration_ms: u64,
}

pub async fn swipe(ctx: &ToolContext, swipe: Swipe, device: Option<&str>) -> Envelope {
    let Swipe {
        x1,
        y1,
        x2,
        y2,
        duration_ms,
    } = swipe;
    if [x1, y1, x2, y2].iter().any(|v| *v < 0.0) {
        return Envelope::fail(
            "Invalid coordinates",
            "All coordinates must be positive numbers",
        );
    }
    let (x1, y1, x2, y2) = (number(x1), number(y1), number(x2), number(y2));
    let step = Step::new("perform swipe", "Failed to perform swipe");
    let args = argv!["shell", "input", "swipe", x1, y1, x2, y2, duration_ms];
    ctx.guarded(device, step, args, |_, target| {
        let message = format!("Swiped from ({x1}, {y1}) to ({x2}, {y2})");
        let payload = json!({
            "from": { "x": x1, "y": y1 },
            "to": { "x": x2, "y": y2 },
            "duration": duration_ms,
        });
        Envelope::ok(with_device(payload, target), message)
    })
    .await
}

/// Type `text` into the focused field. `input text` splits on spaces, so
/// they are sent as `%s`. `input` has no escape for a literal `%s`, so one
/// already present in `text` is typed as a space.
pub async fn input_text(ctx: &ToolContext, text: &str, device: Option<&str>) -> Envelope {
    if text.trim().is_empty() {
        return Envelope::fail("Empty text", "Text cannot be empty");
    }
    let encoded = shell_quote(&text.replace(' ', "%s"));
    let step = Step::new("input text", "Failed to input text");
    ctx.guarded(device, step, argv!["shell", "input", "text", encoded], |_, target| {
        Envelope::ok(
            with_device(json!({ "text": text }), target),
            format!("Input text: \"{text}\""),
        )
    })
    .await
}

/// `key_code` is either a numeric keycode or a `KEYCODE_*` name.
pub async fn press_key(ctx: &ToolContext, key_code: &str, device: Option<&str>) -> Envelope {
    let step = Step::new("press key", "Failed to press key");
    let args = argv!["shell", "input", "keyevent", shell_quote(key_code)];
    ctx.guarded(device, step, args, |_, target| {
        let echoed = key_code
            .parse::<i64>()
            .map_or_else(|_| json!(key_code), |n| json!(n));
        Envelope::ok(
            with_device(json!({ "keyCode": echoed }), target),
            format!("Pressed key: {key_code}"),
        )
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathConfig;
    use crate::envelope::DEVICE_NOT_CONNECTED;
    use crate::ops::testing::{context, context_with_paths, SpyRunner};
    use crate::runner::CommandOutcome;
    use std::sync::Arc;

    #[tokio::test]
    async fn click_rejects_negative_without_commands() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let env = click(&context(&spy), -1.0, 5.0, None).await;
        assert_eq!(env.error(), Some("Invalid coordinates"));
        assert_eq!(env.message(), "Coordinates must be positive numbers");
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn click_success() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let env = click(&context(&spy), 100.0, 200.0, Some("abc")).await;
        assert!(env.is_success());
        assert_eq!(env.message(), "Clicked at coordinates (100, 200)");
        assert_eq!(env.data().unwrap()["deviceId"], "abc");
        assert_eq!(spy.device_commands(), vec!["shell input tap 100 200"]);
    }

    #[tokio::test]
    async fn click_disconnected() {
        let spy = Arc::new(SpyRunner::new());
        let env = click(&context(&spy), 1.0, 1.0, None).await;
        assert_eq!(env.error(), Some(DEVICE_NOT_CONNECTED));
        assert_eq!(env.message(), "Cannot perform click - device is not connected");
        assert!(spy.device_commands().is_empty());
    }

    #[tokio::test]
    async fn swipe_default_duration_and_payload() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let env = swipe(
            &context(&spy),
            Swipe {
                x1: 10.0,
                y1: 20.0,
                x2: 30.0,
                y2: 40.0,
                duration_ms: DEFAULT_SWIPE_MS,
            },
            None,
        )
        .await;
        assert_eq!(env.message(), "Swiped from (10, 20) to (30, 40)");
        let data = env.data().unwrap();
        assert_eq!(data["from"]["x"], 10);
        assert_eq!(data["to"]["y"], 40);
        assert_eq!(data["duration"], 300);
        assert_eq!(spy.device_commands(), vec!["shell input swipe 10 20 30 40 300"]);
    }

    #[tokio::test]
    async fn swipe_rejects_any_negative() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let env = swipe(
            &context(&spy),
            Swipe {
                x1: 0.0,
                y1: 0.0,
                x2: 5.0,
                y2: -0.5,
                duration_ms: 100,
            },
            None,
        )
        .await;
        assert_eq!(env.message(), "All coordinates must be positive numbers");
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn input_text_encodes_for_device_shell() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let env = input_text(&context(&spy), "it's a test", None).await;
        assert!(env.is_success());
        assert_eq!(env.message(), "Input text: \"it's a test\"");
        assert_eq!(env.data().unwrap()["text"], "it's a test");
        assert_eq!(
            spy.device_commands(),
            vec![r"shell input text 'it'\''s%sa%stest'"]
        );
    }

    #[tokio::test]
    async fn input_text_blank_is_rejected() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let env = input_text(&context(&spy), "   ", None).await;
        assert_eq!(env.error(), Some("Empty text"));
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn press_key_echoes_numbers_and_names() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let ctx = context(&spy);
        let env = press_key(&ctx, "66", None).await;
        assert_eq!(env.data().unwrap()["keyCode"], 66);
        assert_eq!(env.message(), "Pressed key: 66");
        let env = press_key(&ctx, "KEYCODE_HOME", None).await;
        assert_eq!(env.data().unwrap()["keyCode"], "KEYCODE_HOME");
        assert_eq!(
            spy.device_commands(),
            vec![
                "shell input keyevent '66'",
                "shell input keyevent 'KEYCODE_HOME'"
            ]
        );
    }

    #[tokio::test]
    async fn screenshot_rejects_unknown_format() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let env = screenshot(&context(&spy), Some("gif"), None).await;
        assert!(!env.is_success());
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn screenshot_reports_file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().to_string();
        std::fs::write(dir.path().join("current_screenshot.png"), vec![0u8; 2048]).unwrap();

        let spy = Arc::new(SpyRunner::connected("abc"));
        let pull = format!("pull /sdcard/screenshot.png {path}/current_screenshot.png");
        spy.respond(&pull, CommandOutcome::success("1 file pulled"));
        let ctx = context_with_paths(
            &spy,
            PathConfig {
                download_path: path.clone(),
                read_path: path.clone(),
            },
        );
        ctx.registry.set_default("abc").await;

        let env = screenshot(&ctx, None, None).await;
        assert!(env.is_success());
        let data = env.data().unwrap();
        assert_eq!(data["fileSize"], "2 KB");
        assert_eq!(data["fileExists"], true);
        assert_eq!(data["format"], "png");
        assert_eq!(data["deviceId"], "abc");
        assert_eq!(data["pullInfo"], "1 file pulled");
        assert_eq!(
            spy.device_commands(),
            vec![
                "shell screencap -p /sdcard/screenshot.png".to_string(),
                pull,
                "shell rm /sdcard/screenshot.png".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn screenshot_missing_local_file_is_still_success() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let env = screenshot(&context(&spy), Some("jpg"), None).await;
        assert!(env.is_success());
        let data = env.data().unwrap();
        assert_eq!(data["fileSize"], "Unknown");
        assert_eq!(data["fileExists"], false);
        assert_eq!(data["filename"], "current_screenshot.jpg");
    }

    #[tokio::test]
    async fn screenshot_pull_failure_skips_cleanup() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        spy.respond(
            "pull /sdcard/screenshot.png /tmp/adb-mcp-test/current_screenshot.png",
            CommandOutcome::failure("remote object does not exist", Some(1)),
        );
        let env = screenshot(&context(&spy), None, None).await;
        assert_eq!(env.message(), "Failed to pull screenshot from device");
        assert_eq!(env.error(), Some("remote object does not exist"));
        assert_eq!(spy.device_commands().len(), 2);
    }

    #[tokio::test]
    async fn screenshot_capture_failure_short_circuits() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        spy.respond(
            "shell screencap -p /sdcard/screenshot.png",
            CommandOutcome::failure("screencap: permission denied", Some(1)),
        );
        let env = screenshot(&context(&spy), None, None).await;
        assert!(!env.is_success());
        assert_eq!(env.message(), "Failed to capture screenshot on device");
        assert_eq!(env.error(), Some("screencap: permission denied"));
        assert_eq!(
            spy.device_commands(),
            vec!["shell screencap -p /sdcard/screenshot.png"]
        );
    }

    #[tokio::test]
    async fn screenshot_cleanup_failure_is_still_success() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        spy.respond(
            "shell rm /sdcard/screenshot.png",
            CommandOutcome::failure("rm: /sdcard/screenshot.png: Read-only file system", Some(1)),
        );
        let env = screenshot(&context(&spy), None, None).await;
        assert!(env.is_success());
        assert!(env.error().is_none());
        assert_eq!(env.data().unwrap()["fileSize"], "Unknown");
        assert_eq!(spy.device_commands().len(), 3);
    }

    #[tokio::test]
    async fn input_text_literal_percent_s_becomes_space() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let env = input_text(&context(&spy), "a%sb c", None).await;
        assert!(env.is_success());
        assert_eq!(env.data().unwrap()["text"], "a%sb c");
        assert_eq!(spy.device_commands(), vec!["shell input text 'a%sb%sc'"]);
    }

    #[test]
    fn kilobytes_rounds() {
        assert_eq!(kilobytes(0), 0);
        assert_eq!(kilobytes(511), 0);
        assert_eq!(kilobytes(512), 1);
        assert_eq!(kilobytes(2048), 2);
    }
}
