//! Device registry: default-device state, enumeration and connectivity.
//!
//! [`DeviceRegistry`] owns the process-wide default device and the
//! [`CommandRunner`] every operation goes through. Handlers receive it by
//! reference; tests build a fresh one around a spy runner.
//!
//! ## Device resolution
//!
//! All handlers call [`DeviceRegistry::resolve`] with an optional serial.
//! An explicit, non-empty serial wins; otherwise the default device is
//! used; otherwise no `-s` flag is passed and `adb` picks the only attached
//! device itself.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::argv;
use crate::error::AdbError;
use crate::parse::{self, DeviceRecord, DeviceStatus};
use crate::runner::CommandRunner;

/// Properties read by [`DeviceRegistry::device_info`].
const PROP_MODEL: &str = "ro.product.model";
const PROP_MANUFACTURER: &str = "ro.product.manufacturer";
const PROP_RELEASE: &str = "ro.build.version.release";
const PROP_SDK: &str = "ro.build.version.sdk";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// Summary of a single device, assembled from several property reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    pub model: String,
    pub manufacturer: String,
    pub android_version: String,
    pub api_level: u32,
    pub screen_size: ScreenSize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u32>,
}

/// Registry of attached devices plus the current default.
pub struct DeviceRegistry {
    runner: Arc<dyn CommandRunner>,
    default_device: RwLock<Option<String>>,
}

impl DeviceRegistry {
    #[cfg(test)]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            default_device: RwLock::new(None),
        }
    }

    /// Build a registry whose default device is pre-selected (from config).
    pub fn with_default(runner: Arc<dyn CommandRunner>, default_device: Option<String>) -> Self {
        Self {
            runner,
            default_device: RwLock::new(default_device.filter(|d| !d.is_empty())),
        }
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Effective serial: explicit argument, else the default, else `None`.
    pub async fn resolve(&self, device: Option<&str>) -> Option<String> {
        match device.filter(|d| !d.is_empty()) {
            Some(d) => Some(d.to_string()),
            None => self.default_device.read().await.clone(),
        }
    }

    pub async fn set_default(&self, device: &str) {
        info!(device, "default device set");
        *self.default_device.write().await = Some(device.to_string());
    }

    pub async fn default_device(&self) -> Option<String> {
        self.default_device.read().await.clone()
    }

    /// Run `adb devices -l` and parse it. Fails only if `adb` itself failed.
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, AdbError> {
        let outcome = self.runner.run(&argv!["devices", "-l"], None).await;
        if !outcome.succeeded {
            return Err(AdbError::Enumeration(outcome.failure_text()));
        }
        Ok(parse::parse_device_list(&outcome.output))
    }

    /// Whether the resolved device (or, with none resolved, any device) is
    /// attached with status `device`. Enumeration failure counts as
    /// disconnected.
    pub async fn is_connected(&self, device: Option<&str>) -> bool {
        let devices = match self.list_devices().await {
            Ok(d) => d,
            Err(e) => {
                debug!(error = %e, "treating enumeration failure as disconnected");
                return false;
            }
        };
        let target = self.resolve(device).await;
        match target {
            None => devices.iter().any(|d| d.status == DeviceStatus::Connected),
            Some(id) => devices
                .iter()
                .any(|d| d.id == id && d.status == DeviceStatus::Connected),
        }
    }

    /// Read model, manufacturer, Android version, API level, screen size and
    /// battery level. Individual read failures leave that field empty/zero.
    pub async fn device_info(&self, device: Option<&str>) -> Result<DeviceInfo, AdbError> {
        let id = self.resolve(device).await.ok_or(AdbError::NoDevice)?;

        let model = self.read_prop(&id, PROP_MODEL).await;
        let manufacturer = self.read_prop(&id, PROP_MANUFACTURER).await;
        let android_version = self.read_prop(&id, PROP_RELEASE).await;
        let api_level = self.read_prop(&id, PROP_SDK).await;
        let screen = self.read_or_empty(&id, &argv!["shell", "wm", "size"]).await;
        let battery = self
            .read_or_empty(&id, &argv!["shell", "dumpsys", "battery"])
            .await;

        let (width, height) = parse::parse_screen_size(&screen);

        Ok(DeviceInfo {
            id,
            model,
            manufacturer,
            android_version,
            api_level: parse::parse_api_level(&api_level),
            screen_size: ScreenSize { width, height },
            battery_level: parse::parse_battery_level(&battery),
        })
    }

    async fn read_prop(&self, device: &str, prop: &str) -> String {
        self.read_or_empty(device, &argv!["shell", "getprop", prop])
            .await
    }

    async fn read_or_empty(&self, device: &str, args: &[String]) -> String {
        let outcome = self.runner.run(args, Some(device)).await;
        if outcome.succeeded {
            outcome.output
        } else {
            String::new()
        }
    }
}
