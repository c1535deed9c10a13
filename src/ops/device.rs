//! Device discovery and default-device handlers.

use serde_json::json;

use crate::envelope::Envelope;
use crate::ops::{with_device, ToolContext};

pub async fn list(ctx: &ToolContext) -> Envelope {
    match ctx.registry.list_devices().await {
        Ok(devices) => {
            let message = format!("Found {} device(s)", devices.len());
            Envelope::ok(devices, message)
        }
        Err(e) => Envelope::fail(e.to_string(), "Failed to list devices"),
    }
}

pub async fn info(ctx: &ToolContext, device: Option<&str>) -> Envelope {
    match ctx.registry.device_info(device).await {
        Ok(info) => {
            let message = format!("Device info retrieved for {}", info.id);
            Envelope::ok(info, message)
        }
        Err(e) => Envelope::fail(e.to_string(), "Failed to get device info"),
    }
}

pub async fn check_connection(ctx: &ToolContext, device: Option<&str>) -> Envelope {
    let connected = ctx.registry.is_connected(device).await;
    let message = if connected {
        "Device is connected"
    } else {
        "Device is not connected"
    };
    let target = ctx.registry.resolve(device).await;
    Envelope::ok(with_device(json!({ "connected": connected }), target), message)
}

/// Only an attached device can become the default.
pub async fn set_default(ctx: &ToolContext, device: &str) -> Envelope {
    if device.is_empty() {
        return Envelope::missing_param("deviceId");
    }
    if let Err(envelope) = ctx
        .ensure_connected(Some(device), "set default device")
        .await
    {
        return envelope;
    }
    ctx.registry.set_default(device).await;
    Envelope::ok(
        json!({ "deviceId": device }),
        format!("Default device set to {device}"),
    )
}

pub async fn get_default(ctx: &ToolContext) -> Envelope {
    let current = ctx.registry.default_device().await;
    let message = match &current {
        Some(d) => format!("Default device is {d}"),
        None => "No default device set".to_string(),
    };
    Envelope::ok(with_device(json!({}), current), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::{context, SpyRunner};
    use crate::runner::CommandOutcome;
    use std::sync::Arc;

    #[tokio::test]
    async fn list_reports_count() {
        let spy = Arc::new(SpyRunner::connected("emulator-5554"));
        let env = list(&context(&spy)).await;
        assert!(env.is_success());
        assert_eq!(env.message(), "Found 1 device(s)");
        let data = env.data().unwrap();
        assert_eq!(data[0]["id"], "emulator-5554");
        assert_eq!(data[0]["status"], "device");
        assert_eq!(data[0]["model"], "Pixel_7");
    }

    #[tokio::test]
    async fn list_failure_is_an_envelope() {
        let spy = Arc::new(SpyRunner::new());
        spy.respond("devices -l", CommandOutcome::failure("adb: not found", None));
        let env = list(&context(&spy)).await;
        assert!(!env.is_success());
        assert_eq!(env.message(), "Failed to list devices");
        assert!(env.error().unwrap().contains("adb: not found"));
    }

    #[tokio::test]
    async fn info_without_device_fails() {
        let spy = Arc::new(SpyRunner::new());
        let env = info(&context(&spy), None).await;
        assert!(!env.is_success());
        assert_eq!(env.error(), Some("No device specified"));
    }

    #[tokio::test]
    async fn info_serializes_camel_case() {
        let spy = Arc::new(SpyRunner::new());
        spy.respond("shell getprop ro.build.version.sdk", CommandOutcome::success("33"));
        let env = info(&context(&spy), Some("abc")).await;
        let data = env.data().unwrap();
        assert_eq!(data["apiLevel"], 33);
        assert_eq!(data["screenSize"]["width"], 0);
        assert_eq!(env.message(), "Device info retrieved for abc");
    }

    #[tokio::test]
    async fn set_default_requires_connection() {
        let spy = Arc::new(SpyRunner::connected("abc"));
        let ctx = context(&spy);
        let env = set_default(&ctx, "other").await;
        assert!(!env.is_success());
        assert_eq!(
            env.message(),
            "Cannot set default device - device is not connected"
        );
        assert_eq!(ctx.registry.default_device().await, None);

        let env = set_default(&ctx, "abc").await;
        assert!(env.is_success());
        assert_eq!(ctx.registry.default_device().await.as_deref(), Some("abc"));

        let env = get_default(&ctx).await;
        assert_eq!(env.data().unwrap()["deviceId"], "abc");
        assert_eq!(env.message(), "Default device is abc");
    }

    #[tokio::test]
    async fn get_default_unset() {
        let spy = Arc::new(SpyRunner::new());
        let env = get_default(&context(&spy)).await;
        assert!(env.is_success());
        assert_eq!(env.message(), "No default device set");
        assert!(env.data().unwrap().get("deviceId").is_none());
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn check_connection_is_always_success() {
        let spy = Arc::new(SpyRunner::new());
        spy.respond("devices -l", CommandOutcome::failure("boom", None));
        let env = check_connection(&context(&spy), Some("abc")).await;
        assert!(env.is_success());
        assert_eq!(env.data().unwrap()["connected"], false);
        assert_eq!(env.message(), "Device is not connected");
    }
}
