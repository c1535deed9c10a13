//! Test doubles shared by handler tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::PathConfig;
use crate::devices::DeviceRegistry;
use crate::ops::ToolContext;
use crate::runner::{CommandOutcome, CommandRunner};

const ENUMERATE: &str = "devices -l";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub args: Vec<String>,
    pub device: Option<String>,
}

impl RecordedCall {
    pub fn command(&self) -> String {
        self.args.join(" ")
    }
}

/// Records every invocation and replays canned outcomes keyed by the
/// space-joined argument vector. Unmatched commands get the fallback
/// (an empty success unless changed).
pub struct SpyRunner {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<HashMap<String, CommandOutcome>>,
    fallback: Mutex<CommandOutcome>,
}

impl SpyRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(HashMap::new()),
            fallback: Mutex::new(CommandOutcome::success("")),
        }
    }

    /// A runner whose `adb devices -l` lists `serial` as connected.
    pub fn connected(serial: &str) -> Self {
        let spy = Self::new();
        spy.respond(
            ENUMERATE,
            CommandOutcome::success(format!(
                "List of devices attached\n{serial}\tdevice product:sdk model:Pixel_7 transport_id:1"
            )),
        );
        spy
    }

    pub fn respond(&self, command: &str, outcome: CommandOutcome) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), outcome);
    }

    pub fn set_fallback(&self, outcome: CommandOutcome) {
        *self.fallback.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Commands other than device enumeration, space-joined.
    pub fn device_commands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(RecordedCall::command)
            .filter(|c| c != ENUMERATE)
            .collect()
    }
}

#[async_trait]
impl CommandRunner for SpyRunner {
    async fn run(&self, args: &[String], device: Option<&str>) -> CommandOutcome {
        let call = RecordedCall {
            args: args.to_vec(),
            device: device.map(String::from),
        };
        let key = call.command();
        self.calls.lock().unwrap().push(call);
        let responses = self.responses.lock().unwrap();
        match responses.get(&key) {
            Some(o) => o.clone(),
            None => self.fallback.lock().unwrap().clone(),
        }
    }
}

/// A [`ToolContext`] around `spy` with throwaway screenshot paths.
pub fn context(spy: &Arc<SpyRunner>) -> ToolContext {
    context_with_paths(
        spy,
        PathConfig {
            download_path: "/tmp/adb-mcp-test".into(),
            read_path: "/nonexistent/adb-mcp-test".into(),
        },
    )
}

pub fn context_with_paths(spy: &Arc<SpyRunner>, paths: PathConfig) -> ToolContext {
    ToolContext::new(DeviceRegistry::new(spy.clone()), paths)
}
