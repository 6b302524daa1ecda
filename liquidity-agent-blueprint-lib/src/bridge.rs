//! Process bridge: runs one script per command and turns its stdout into a
//! [`CommandResult`].
//!
//! Scripts live under a fixed root (`<scripts_dir>/<script_name>[.ext]`), so
//! resolution never depends on the caller's working directory. The child
//! inherits this process's environment with the chain overlay applied, and
//! stdout/stderr are captured in full. Nothing here returns an error: every
//! failure is classified into the result.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use blueprint_sdk::{debug, warn};
use serde_json::value::RawValue;
use tokio::process::Command as ProcessCommand;
use tokio::sync::Mutex;

use crate::command::{Command, CommandRequest};
use crate::config::BridgeConfig;
use crate::context::{ChainContext, ENV_DEBUG};
use crate::error::BridgeError;
use crate::metrics::metrics;
use crate::result::CommandResult;
use crate::util::log_excerpt;

/// Capability seam between dispatch and whatever performs the on-chain work.
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run one validated request. Exactly one result per request.
    async fn submit(&self, request: &CommandRequest) -> CommandResult;
}

/// [`CommandExecutor`] backed by external scripts.
pub struct ProcessBridge {
    config: BridgeConfig,
    chain: Arc<ChainContext>,
    serial: Mutex<()>,
}

struct ProcessOutput {
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
}

impl ProcessBridge {
    pub fn new(config: BridgeConfig, chain: Arc<ChainContext>) -> Self {
        Self {
            config,
            chain,
            serial: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn chain(&self) -> &ChainContext {
        &self.chain
    }

    /// Absolute path of the script that implements `command`.
    pub fn script_path(&self, command: Command) -> PathBuf {
        let mut file = command.script_name().to_string();
        if !self.config.script_extension.is_empty() {
            file.push('.');
            file.push_str(&self.config.script_extension);
        }
        self.config.scripts_dir.join(file)
    }

    /// Run the script for `command` with `args` as positional arguments, in
    /// exactly the order given. No name-to-position mapping happens here.
    pub async fn invoke(&self, command: Command, args: &[String]) -> CommandResult {
        let script = self.script_path(command);
        if !script.exists() {
            warn!("Script not found: {}", script.display());
            return BridgeError::ExecutableNotFound(format!(
                "Script not found: {}",
                script.display()
            ))
            .into();
        }

        ensure_executable(&script);

        let _serial = if self.config.serialize_invocations {
            Some(self.serial.lock().await)
        } else {
            None
        };

        let m = metrics();
        let _guard = m.invocation_guard();
        let started = Instant::now();
        let outcome = self.run(&script, args).await;
        m.record_duration(started.elapsed().as_millis() as u64);

        let output = match outcome {
            Ok(output) => output,
            Err(err) => {
                warn!("{command}: {err}");
                return err.into();
            }
        };

        if self.config.debug {
            debug!("{command} stdout: {}", log_excerpt(&output.stdout, 2048));
            if !output.stderr.trim().is_empty() {
                debug!("{command} stderr: {}", log_excerpt(&output.stderr, 2048));
            }
        }
        if output.exit_code != Some(0) {
            warn!(
                "{command} exited with status {}",
                output
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |code| code.to_string())
            );
        }

        parse_output(&output.stdout, &output.stderr)
    }

    async fn run(&self, script: &Path, args: &[String]) -> Result<ProcessOutput, BridgeError> {
        let mut cmd = match self.config.interpreter.as_deref() {
            Some(interpreter) => {
                let mut cmd = ProcessCommand::new(interpreter);
                cmd.arg(script);
                cmd
            }
            None => ProcessCommand::new(script),
        };

        cmd.args(args)
            .current_dir(self.working_dir())
            .envs(self.env_overlay())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running {} {}", script.display(), args.join(" "));

        let output = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| {
                    BridgeError::Timeout(format!(
                        "{} did not finish within {limit:?}",
                        script.display()
                    ))
                })?,
            None => cmd.output().await,
        }
        .map_err(|err| BridgeError::Spawn(err.to_string()))?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }

    /// Scripts run from the package root that contains the scripts directory.
    fn working_dir(&self) -> &Path {
        self.config
            .scripts_dir
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(self.config.scripts_dir.as_path())
    }

    fn env_overlay(&self) -> Vec<(&'static str, String)> {
        let mut overlay = self.chain.env_overlay();
        if self.config.debug {
            overlay.push((ENV_DEBUG, "true".to_string()));
        }
        overlay
    }
}

#[async_trait::async_trait]
impl CommandExecutor for ProcessBridge {
    async fn submit(&self, request: &CommandRequest) -> CommandResult {
        self.invoke(request.command(), &request.positional()).await
    }
}

/// Stdout must be a single JSON document; anything else keeps both streams.
pub fn parse_output(stdout: &str, stderr: &str) -> CommandResult {
    match serde_json::from_str::<Box<RawValue>>(stdout).and_then(CommandResult::from_raw) {
        Ok(result) => result,
        Err(err) => {
            warn!("stdout is not a JSON document: {err}");
            CommandResult::parse_failure(stdout, stderr)
        }
    }
}

/// Mark the script executable. Failure is logged only; the spawn that follows
/// reports the real problem.
#[cfg(unix)]
fn ensure_executable(script: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let result = std::fs::metadata(script).and_then(|meta| {
        let mut perms = meta.permissions();
        if perms.mode() & 0o111 == 0o111 {
            return Ok(());
        }
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(script, perms)
    });
    if let Err(err) = result {
        warn!("Failed to mark {} executable: {err}", script.display());
    }
}

#[cfg(not(unix))]
fn ensure_executable(_script: &Path) {}
