//! Process bridge tests against real child processes.
//!
//! Each test writes small `sh` scripts into a temp scripts root, then drives
//! `ProcessBridge` (directly or through the registry). Scripts echo their
//! positional arguments and selected environment variables back as JSON, so
//! assertions see exactly what the child saw.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use liquidity_agent_blueprint_lib::*;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Echo the script name and positional args as `{success, script, args}`.
const ECHO_ARGS: &str = r#"#!/bin/sh
out='{"success":true,"script":"__NAME__","args":['
sep=''
for a in "$@"; do
  out="$out$sep\"$a\""
  sep=','
done
printf '%s]}\n' "$out"
"#;

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("scripts");
        fs::create_dir_all(&root).unwrap();
        Self { _dir: dir, root }
    }

    fn script(&self, name: &str, body: &str, mode: u32) -> PathBuf {
        let path = self.root.join(name);
        fs::write(&path, body.replace("__NAME__", name)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    fn echo_all(&self) {
        for cmd in Command::ALL {
            self.script(cmd.script_name(), ECHO_ARGS, 0o755);
        }
    }

    fn config(&self) -> BridgeConfig {
        let mut config = BridgeConfig::new(&self.root);
        config.interpreter = None;
        config.script_extension = String::new();
        config
    }

    fn bridge(&self) -> ProcessBridge {
        self.bridge_with(self.config(), ChainContext::default())
    }

    fn bridge_with(&self, config: BridgeConfig, chain: ChainContext) -> ProcessBridge {
        ProcessBridge::new(config, Arc::new(chain))
    }
}

fn object(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn full_args(command: Command) -> serde_json::Map<String, Value> {
    object(match command {
        Command::CreatePosition => json!({
            "token0": "WETH", "token1": "USDC", "fee": 3000,
            "amount0": 0.1, "amount1": 100, "slippage": 50, "chainId": 1
        }),
        Command::AddLiquidity => json!({
            "tokenId": "42", "amount0": "1.5", "amount1": 2, "slippage": 50, "chainId": 1
        }),
        Command::RemoveLiquidity => json!({
            "tokenId": "42", "percent": 50, "slippage": 50, "chainId": 1
        }),
        Command::CollectFees => json!({"tokenId": "42", "chainId": 1}),
        Command::ClosePosition => json!({"tokenId": "42", "slippage": 50, "chainId": 1}),
    })
}

fn expected_positional(command: Command) -> Vec<&'static str> {
    match command {
        Command::CreatePosition => vec!["WETH", "USDC", "3000", "0.1", "100", "50", "1"],
        Command::AddLiquidity => vec!["42", "1.5", "2", "50", "1"],
        Command::RemoveLiquidity => vec!["42", "50", "50", "1"],
        Command::CollectFees => vec!["42", "1"],
        Command::ClosePosition => vec!["42", "50", "1"],
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DISPATCH → PROCESS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn every_command_runs_its_script_with_schema_ordered_args() {
    let fx = Fixture::new();
    fx.echo_all();
    let registry = CommandRegistry::new(Arc::new(fx.bridge()));

    for command in Command::ALL {
        let result = registry.dispatch(command.name(), &full_args(command)).await;
        assert!(result.success(), "{command}: {:?}", result.body());
        assert_eq!(result.error_kind(), None);
        assert_eq!(
            result.body(),
            &json!({
                "success": true,
                "script": command.script_name(),
                "args": expected_positional(command),
            })
        );
    }
}

#[tokio::test]
async fn invoke_preserves_caller_order() {
    let fx = Fixture::new();
    fx.echo_all();
    let bridge = fx.bridge();

    let args = vec!["1".to_string(), "42".to_string()];
    let result = bridge.invoke(Command::CollectFees, &args).await;
    assert_eq!(result.body()["args"], json!(["1", "42"]));
}

#[tokio::test]
async fn interpreter_and_extension_are_applied() {
    let fx = Fixture::new();
    fx.script("collect_fees.sh", ECHO_ARGS, 0o644);

    let mut config = fx.config();
    config.interpreter = Some("sh".to_string());
    config.script_extension = "sh".to_string();
    let bridge = fx.bridge_with(config, ChainContext::default());

    let result = bridge
        .invoke(Command::CollectFees, &["7".to_string(), "10".to_string()])
        .await;
    assert!(result.success(), "{:?}", result.body());
    assert_eq!(result.body()["args"], json!(["7", "10"]));
}

// ═══════════════════════════════════════════════════════════════════════════
// FAILURE CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn missing_script_is_executable_not_found() {
    let fx = Fixture::new();
    let bridge = fx.bridge();

    let result = bridge.invoke(Command::CollectFees, &[]).await;
    assert!(!result.success());
    assert_eq!(result.error_kind(), Some(ErrorKind::ExecutableNotFound));
    let message = result.error_message().unwrap();
    assert!(message.starts_with("Script not found: "));
    assert!(message.ends_with("collect_fees"));
}

#[tokio::test]
async fn missing_script_does_not_spawn() {
    // Interpreter that cannot exist; reaching spawn would give SpawnError instead.
    let fx = Fixture::new();
    let mut config = fx.config();
    config.interpreter = Some("/nonexistent/interpreter".to_string());
    let bridge = fx.bridge_with(config, ChainContext::default());

    let result = bridge.invoke(Command::ClosePosition, &[]).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::ExecutableNotFound));
}

#[tokio::test]
async fn non_json_stdout_is_output_parse_error() {
    let fx = Fixture::new();
    fx.script(
        "create_position",
        "#!/bin/sh\necho 'Creating position'\necho '{\"success\":false,\"error\":\"Token not found: FOO\"}' >&2\nexit 1\n",
        0o755,
    );
    let bridge = fx.bridge();

    let result = bridge.invoke(Command::CreatePosition, &[]).await;
    assert!(!result.success());
    assert_eq!(result.error_kind(), Some(ErrorKind::OutputParseError));
    assert_eq!(result.error_message(), Some("Failed to parse JSON output"));
    assert_eq!(result.raw_stdout(), Some("Creating position\n"));
    assert_eq!(
        result.raw_stderr(),
        Some("{\"success\":false,\"error\":\"Token not found: FOO\"}\n")
    );
}

#[tokio::test]
async fn empty_stdout_is_output_parse_error() {
    let fx = Fixture::new();
    fx.script("collect_fees", "#!/bin/sh\nexit 0\n", 0o755);

    let result = fx.bridge().invoke(Command::CollectFees, &[]).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::OutputParseError));
    assert_eq!(result.raw_stdout(), Some(""));
}

#[tokio::test]
async fn json_failure_from_script_is_passed_through() {
    let fx = Fixture::new();
    fx.script(
        "remove_liquidity",
        "#!/bin/sh\necho '{\"success\":false,\"error\":\"execution reverted\"}'\nexit 1\n",
        0o755,
    );

    let result = fx.bridge().invoke(Command::RemoveLiquidity, &[]).await;
    assert!(!result.success());
    assert_eq!(result.error_kind(), None);
    assert_eq!(result.error_message(), Some("execution reverted"));
}

#[tokio::test]
async fn unrunnable_interpreter_is_spawn_error() {
    let fx = Fixture::new();
    fx.echo_all();
    let mut config = fx.config();
    config.interpreter = Some("/nonexistent/interpreter".to_string());
    let bridge = fx.bridge_with(config, ChainContext::default());

    let result = bridge.invoke(Command::CollectFees, &[]).await;
    assert!(!result.success());
    assert_eq!(result.error_kind(), Some(ErrorKind::SpawnError));
    assert!(!result.error_message().unwrap().is_empty());
}

#[tokio::test]
async fn slow_script_times_out_and_is_killed() {
    let fx = Fixture::new();
    let marker = fx.root.join("finished");
    fx.script(
        "close_position",
        &format!(
            "#!/bin/sh\nsleep 1\ntouch '{}'\necho '{{}}'\n",
            marker.display()
        ),
        0o755,
    );
    let mut config = fx.config();
    config.timeout = Some(Duration::from_millis(200));
    let bridge = fx.bridge_with(config, ChainContext::default());

    let started = std::time::Instant::now();
    let result = bridge.invoke(Command::ClosePosition, &[]).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(result.error_message().unwrap().ends_with("200ms"));

    // Past the point the script would have finished had it survived.
    tokio::time::sleep(Duration::from_millis(1800)).await;
    assert!(!marker.exists(), "timed-out script kept running");
}

// ═══════════════════════════════════════════════════════════════════════════
// ENVIRONMENT AND PERMISSIONS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn chain_context_is_overlaid_on_child_env() {
    let fx = Fixture::new();
    fx.script(
        "collect_fees",
        r#"#!/bin/sh
printf '{"success":true,"rpc":"%s","chain":"%s","factory":"%s","nft":"%s","key":"%s","cwd":"%s"}\n' \
  "$RPC_URL" "$CHAIN_ID" "$UNISWAP_FACTORY_ADDRESS" "$UNISWAP_NFT_MANAGER_ADDRESS" "$PRIVATE_KEY" "$(pwd)"
"#,
        0o755,
    );
    let chain = ChainContext {
        target_chain: "BASE".into(),
        chain_id: 8453,
        rpc_url: "https://base.example".into(),
        contracts: ContractAddresses {
            factory: "0xfactory".into(),
            router: String::new(),
            position_manager: "0xnft".into(),
        },
        private_key: "0xkey".into(),
    };
    let bridge = fx.bridge_with(fx.config(), chain);

    let result = bridge.invoke(Command::CollectFees, &[]).await;
    assert!(result.success(), "{:?}", result.body());
    let body = result.body();
    assert_eq!(body["rpc"], "https://base.example");
    assert_eq!(body["chain"], "8453");
    assert_eq!(body["factory"], "0xfactory");
    assert_eq!(body["nft"], "0xnft");
    assert_eq!(body["key"], "0xkey");

    let cwd = PathBuf::from(body["cwd"].as_str().unwrap());
    let expected = fx.root.parent().unwrap();
    assert_eq!(cwd.canonicalize().unwrap(), expected.canonicalize().unwrap());
}

#[tokio::test]
async fn script_is_marked_executable_before_running() {
    let fx = Fixture::new();
    let path = fx.script("add_liquidity", ECHO_ARGS, 0o644);

    let result = fx.bridge().invoke(Command::AddLiquidity, &[]).await;
    assert!(result.success(), "{:?}", result.body());
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o755, 0o755);
}

/// Script that flags an overlap when another copy holds the guard directory.
fn guarded_script(fx: &Fixture) -> PathBuf {
    let guard = fx.root.join("guard");
    let overlap = fx.root.join("overlap");
    fx.script(
        "collect_fees",
        &format!(
            "#!/bin/sh\nif ! mkdir '{guard}' 2>/dev/null; then touch '{overlap}'; fi\nsleep 1\nrmdir '{guard}' 2>/dev/null\necho '{{\"success\":true}}'\n",
            guard = guard.display(),
            overlap = overlap.display(),
        ),
        0o755,
    );
    overlap
}

async fn run_concurrently(bridge: ProcessBridge, count: usize) {
    let bridge = Arc::new(bridge);
    let tasks: Vec<_> = (0..count)
        .map(|i| {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .invoke(Command::CollectFees, &[i.to_string(), "1".into()])
                    .await
            })
        })
        .collect();
    for task in tasks {
        let result = task.await.unwrap();
        assert!(result.success(), "{:?}", result.body());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn serialized_invocations_never_overlap() {
    let fx = Fixture::new();
    let overlap = guarded_script(&fx);
    let mut config = fx.config();
    config.serialize_invocations = true;

    run_concurrently(fx.bridge_with(config, ChainContext::default()), 3).await;
    assert!(!overlap.exists(), "serialized invocations overlapped");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unserialized_invocations_run_in_parallel() {
    let fx = Fixture::new();
    let overlap = guarded_script(&fx);

    let started = std::time::Instant::now();
    run_concurrently(fx.bridge(), 3).await;
    assert!(overlap.exists(), "invocations did not run concurrently");
    assert!(started.elapsed() < Duration::from_secs(3));
}

// ═══════════════════════════════════════════════════════════════════════════
// REPLY FIDELITY
// ═══════════════════════════════════════════════════════════════════════════

const COLLECTED: &str = r#"{"success":true,"collected":{"amount0":"10","amount1":"5"}}"#;
const WIDE_LIQUIDITY: &str =
    r#"{"success":true,"liquidity":123456789012345678901234567890,"amount0":"1.5"}"#;

fn printing_script(fx: &Fixture, command: Command, stdout: &str) {
    fx.script(
        command.script_name(),
        &format!("#!/bin/sh\ncat <<'EOF'\n{stdout}\nEOF\n"),
        0o755,
    );
}

#[tokio::test]
async fn inbound_reply_is_script_stdout_byte_for_byte() {
    let fx = Fixture::new();
    printing_script(&fx, Command::CollectFees, COLLECTED);
    let registry = CommandRegistry::new(Arc::new(fx.bridge()));
    let (outbox, mut rx) = ChannelOutbox::new();
    let handler = InboundHandler::new(registry, ReplyChannel::new("agent-1", Arc::new(outbox)));

    handler
        .on_message(&InboundMessage::new(
            "agent-7",
            r#"{"command":"collect-fees","args":{"tokenId":"42","chainId":1}}"#,
        ))
        .await;

    let envelope = rx.try_recv().unwrap();
    assert_eq!(envelope.to, "agent-7");
    assert_eq!(envelope.body, COLLECTED);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn wide_integers_survive_the_bridge() {
    let fx = Fixture::new();
    printing_script(&fx, Command::RemoveLiquidity, WIDE_LIQUIDITY);
    let registry = CommandRegistry::new(Arc::new(fx.bridge()));

    let args = object(json!({"tokenId": "42", "percent": 100, "slippage": 50, "chainId": 1}));
    let response = run_command(&registry, Command::RemoveLiquidity, args).await;
    assert_eq!(response.json, WIDE_LIQUIDITY);
}
