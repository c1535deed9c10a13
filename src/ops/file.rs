//! File transfer and remote filesystem handlers.

use std::path::PathBuf;

use serde_json::json;

use crate::argv;
use crate::envelope::Envelope;
use crate::ops::{with_device, Step, ToolContext};
use crate::parse;
use crate::runner::shell_quote;

pub async fn push(
    ctx: &ToolContext,
    local_path: &str,
    remote_path: &str,
    device: Option<&str>,
) -> Envelope {
    let step = Step::new("push file", "Failed to push file");
    ctx.guarded(device, step, argv!["push", local_path, remote_path], |_, target| {
        Envelope::ok(
            with_device(
                json!({ "localPath": local_path, "remotePath": remote_path }),
                target,
            ),
            format!("File pushed from {local_path} to {remote_path}"),
        )
    })
    .await
}

/// Pull `remote_path`; without `local_path` the file lands in the working
/// directory under its remote basename.
pub async fn pull(
    ctx: &ToolContext,
    remote_path: &str,
    local_path: Option<&str>,
    device: Option<&str>,
) -> Envelope {
    let local = match local_path {
        Some(p) => p.to_string(),
        None => default_local_path(remote_path),
    };
    let step = Step::new("pull file", "Failed to pull file");
    ctx.guarded(device, step, argv!["pull", remote_path, local], |_, target| {
        let message = format!("File pulled from {remote_path} to {local}");
        Envelope::ok(
            with_device(
                json!({ "remotePath": remote_path, "localPath": local }),
                target,
            ),
            message,
        )
    })
    .await
}

fn default_local_path(remote_path: &str) -> String {
    let name = remote_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(remote_path);
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    cwd.join(name).to_string_lossy().into_owned()
}

pub async fn list(ctx: &ToolContext, remote_path: &str, device: Option<&str>) -> Envelope {
    let step = Step::new("list files", "Failed to list files");
    let args = argv!["shell", "ls", "-la", shell_quote(remote_path)];
    ctx.guarded(device, step, args, |outcome, target| {
        let files = parse::parse_directory_listing(&outcome.output);
        let count = files.len();
        Envelope::ok(
            with_device(
                json!({ "path": remote_path, "files": files, "count": count }),
                target,
            ),
            format!("Listed {count} files in {remote_path}"),
        )
    })
    .await
}

pub async fn delete(ctx: &ToolContext, remote_path: &str, device: Option<&str>) -> Envelope {
    let step = Step::new("delete file", "Failed to delete file");
    let args = argv!["shell", "rm", shell_quote(remote_path)];
    ctx.guarded(device, step, args, |_, target| {
        Envelope::ok(
            with_device(json!({ "remotePath": remote_path }), target),
            format!("File deleted: {remote_path}"),
        )
    })
    .await
}

pub async fn mkdir(ctx: &ToolContext, remote_path: &str, device: Option<&str>) -> Envelope {
    let step = Step::new("create directory", "Failed to create directory");
    let args = argv!["shell", "mkdir", "-p", shell_quote(remote_path)];
    ctx.guarded(device, step, args, |_, target| {
        Envelope::ok(
            with_device(json!({ "remotePath": remote_path }), target),
            format!("Directory created: {remote_path}"),
        )
    })
    .await
}
