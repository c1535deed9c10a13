//! Operation handlers, one module per domain.
//!
//! Every handler returns an [`Envelope`]. Device-targeted handlers share one
//! sequence, implemented once in [`ToolContext::guarded`]:
//!
//! 1. validate arguments (done by the handler before anything else)
//! 2. connectivity guard: no device command is issued if the target is not
//!    attached with status `device`
//! 3. run the `adb` command
//! 4. a failed outcome, or a failure marker in stdout, becomes a failure
//!    envelope; otherwise the handler builds the success payload
//!
//! Handlers with several commands (screenshot, system info) use
//! [`ToolContext::ensure_connected`] and [`ToolContext::run`] directly.

pub mod app;
pub mod device;
pub mod file;
pub mod screen;
pub mod shell;

#[cfg(test)]
pub(crate) mod testing;

use serde_json::{json, Value};

use crate::config::PathConfig;
use crate::devices::DeviceRegistry;
use crate::envelope::Envelope;
use crate::runner::CommandOutcome;

/// Everything a handler needs: the registry (runner + default device) and
/// the host paths for pulled screenshots.
pub struct ToolContext {
    pub registry: DeviceRegistry,
    pub paths: PathConfig,
}

/// Wording for one guarded command.
#[derive(Clone, Copy)]
pub(crate) struct Step<'a> {
    /// Completes "Cannot {action} - device is not connected".
    pub action: &'a str,
    /// `message` of the failure envelope when the command fails.
    pub failure: &'a str,
    /// Substring of stdout that signals failure despite exit status 0.
    pub failure_marker: Option<&'a str>,
}

impl<'a> Step<'a> {
    pub(crate) fn new(action: &'a str, failure: &'a str) -> Self {
        Self {
            action,
            failure,
            failure_marker: None,
        }
    }

    pub(crate) fn with_marker(mut self, marker: &'a str) -> Self {
        self.failure_marker = Some(marker);
        self
    }
}

impl ToolContext {
    pub fn new(registry: DeviceRegistry, paths: PathConfig) -> Self {
        Self { registry, paths }
    }

    /// Connectivity guard. `Err` carries the ready-made failure envelope.
    pub(crate) async fn ensure_connected(
        &self,
        device: Option<&str>,
        action: &str,
    ) -> Result<(), Envelope> {
        if self.registry.is_connected(device).await {
            Ok(())
        } else {
            Err(Envelope::not_connected(action))
        }
    }

    /// Run one command against the resolved device.
    pub(crate) async fn run(&self, device: Option<&str>, args: &[String]) -> CommandOutcome {
        let target = self.registry.resolve(device).await;
        self.registry.runner().run(args, target.as_deref()).await
    }

    /// Guard, run, classify. `on_success` receives the outcome and the
    /// resolved device to echo back in the payload.
    pub(crate) async fn guarded<F>(
        &self,
        device: Option<&str>,
        step: Step<'_>,
        args: Vec<String>,
        on_success: F,
    ) -> Envelope
    where
        F: FnOnce(CommandOutcome, Option<String>) -> Envelope,
    {
        if let Err(envelope) = self.ensure_connected(device, step.action).await {
            return envelope;
        }
        let target = self.registry.resolve(device).await;
        let outcome = self.registry.runner().run(&args, target.as_deref()).await;

        let marked = step
            .failure_marker
            .is_some_and(|m| outcome.output.contains(m));
        if !outcome.succeeded || marked {
            return Envelope::fail(outcome.failure_text(), step.failure);
        }
        on_success(outcome, target)
    }
}

/// Add `deviceId` to an object payload when a device is known.
pub(crate) fn with_device(mut payload: Value, device: Option<String>) -> Value {
    if let (Some(obj), Some(id)) = (payload.as_object_mut(), device) {
        obj.insert("deviceId".to_string(), json!(id));
    }
    payload
}

/// JSON number for a coordinate: integral values stay integers.
pub(crate) fn number(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        #[allow(clippy::cast_possible_truncation)]
        let n = v as i64;
        json!(n)
    } else {
        json!(v)
    }
}
