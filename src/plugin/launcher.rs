//! Plugin Launchers
//!
//! Two transport strategies for reaching a provider subprocess: loopback
//! TCP after a port handshake on the child's first stdout line, or gRPC
//! framed directly over the stdin/stdout pair. Either way the result is a
//! live tonic channel plus the child handle.

use crate::error::{CostError, Result};
use hyper_util::rt::TokioIo;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tonic::transport::{Channel, Endpoint, Uri};
use tracing::{debug, warn};

/// The provider must print its port line within this window.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval at which the handshake read is retried.
pub const HANDSHAKE_POLL_INTERVAL: Duration = Duration::from_millis(100);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Dial attempts against a freshly handshaken provider before giving up.
const DIAL_ATTEMPTS: u32 = 3;

/// A spawned provider with its channel established
pub struct LaunchedPlugin {
    pub child: Child,
    pub channel: Channel,
}

/// Spawn `executable`, wait for the decimal port on its first stdout line,
/// and dial `127.0.0.1:<port>`. Later stdout lines and all stderr are
/// forwarded to the diagnostic stream under the plugin's name.
pub async fn launch_tcp(
    executable: &Path,
    plugin_name: &str,
    env: &[(String, String)],
) -> Result<LaunchedPlugin> {
    let mut child = spawn(executable, plugin_name, env, Stdio::null())?;

    let stdout = child.stdout.take().ok_or_else(|| startup_error(
        plugin_name,
        "child stdout not captured",
    ))?;
    let mut lines = BufReader::new(stdout).lines();

    let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
    let port = loop {
        match tokio::time::timeout(HANDSHAKE_POLL_INTERVAL, lines.next_line()).await {
            Ok(Ok(Some(line))) => match parse_handshake_line(&line) {
                Some(port) => break port,
                None => {
                    // The handshake contract requires the port on the
                    // first output line.
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    return Err(startup_error(
                        plugin_name,
                        &format!("unparseable handshake line: '{line}'"),
                    ));
                }
            },
            Ok(Ok(None)) => {
                let _ = child.wait().await;
                return Err(startup_error(plugin_name, "exited before handshake"));
            }
            Ok(Err(err)) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(startup_error(plugin_name, &format!("handshake read: {err}")));
            }
            Err(_elapsed) => {
                if Instant::now() >= deadline {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    return Err(startup_error(plugin_name, "no handshake within 10s"));
                }
            }
        }
    };
    debug!(plugin = plugin_name, port, "handshake complete");

    forward_stdout(lines, plugin_name);
    if let Some(stderr) = child.stderr.take() {
        forward_stderr(stderr, plugin_name);
    }

    let endpoint = Endpoint::from_shared(format!("http://127.0.0.1:{port}"))
        .map_err(|err| startup_error(plugin_name, &err.to_string()))?
        .connect_timeout(CONNECT_TIMEOUT);
    let channel = dial_provider(&endpoint, plugin_name, port).await?;

    Ok(LaunchedPlugin { child, channel })
}

// A provider prints its port a beat before its listener accepts
// connections, so the dial backs off briefly before the handshake is
// declared dead. Exhaustion is a startup failure for this host instance.
async fn dial_provider(endpoint: &Endpoint, plugin_name: &str, port: u16) -> Result<Channel> {
    let mut delay = HANDSHAKE_POLL_INTERVAL;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match endpoint.connect().await {
            Ok(channel) => {
                if attempt > 1 {
                    debug!(plugin = plugin_name, attempt, "provider accepted after backoff");
                }
                return Ok(channel);
            }
            Err(err) if attempt >= DIAL_ATTEMPTS => {
                return Err(startup_error(
                    plugin_name,
                    &format!("dial 127.0.0.1:{port}: {err}"),
                ));
            }
            Err(err) => {
                debug!(
                    plugin = plugin_name,
                    attempt,
                    error = %err,
                    "provider not accepting yet"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}

/// Spawn `executable` and run gRPC over its stdin/stdout pair. No port
/// handshake; stderr is forwarded to the diagnostic stream.
pub async fn launch_stdio(
    executable: &Path,
    plugin_name: &str,
    env: &[(String, String)],
) -> Result<LaunchedPlugin> {
    let mut child = spawn(executable, plugin_name, env, Stdio::piped())?;

    let stdin = child.stdin.take().ok_or_else(|| startup_error(
        plugin_name,
        "child stdin not captured",
    ))?;
    let stdout = child.stdout.take().ok_or_else(|| startup_error(
        plugin_name,
        "child stdout not captured",
    ))?;
    if let Some(stderr) = child.stderr.take() {
        forward_stderr(stderr, plugin_name);
    }

    // The stdio pair exists exactly once, so the connector hands it out
    // exactly once; a reconnect attempt surfaces as an IO error instead of
    // silently hanging.
    let io_slot = Arc::new(parking_lot::Mutex::new(Some(tokio::io::join(stdout, stdin))));
    let connector = tower::service_fn(move |_: Uri| {
        let slot = Arc::clone(&io_slot);
        async move {
            slot.lock().take().map(TokioIo::new).ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "stdio channel already consumed",
                )
            })
        }
    });

    let channel = tokio::time::timeout(
        HANDSHAKE_TIMEOUT,
        Endpoint::try_from("http://stdio.plugin.invalid")
            .map_err(|err| startup_error(plugin_name, &err.to_string()))?
            .connect_with_connector(connector),
    )
    .await
    .map_err(|_| startup_error(plugin_name, "no stdio channel within 10s"))?
    .map_err(|err| startup_error(plugin_name, &format!("stdio connect: {err}")))?;

    Ok(LaunchedPlugin { child, channel })
}

/// First-line handshake forms: a bare decimal port, a `host:port` tail, or
/// `|`-separated handshake tokens whose network-address segment carries
/// the port.
pub fn parse_handshake_line(line: &str) -> Option<u16> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Ok(port) = line.parse::<u16>() {
        return Some(port);
    }
    for token in line.split('|').rev() {
        let token = token.trim();
        if let Ok(port) = token.parse::<u16>() {
            return Some(port);
        }
        if let Some(tail) = token.rsplit(':').next() {
            if let Ok(port) = tail.parse::<u16>() {
                return Some(port);
            }
        }
    }
    None
}

fn spawn(
    executable: &Path,
    plugin_name: &str,
    env: &[(String, String)],
    stdin: Stdio,
) -> Result<Child> {
    let mut command = Command::new(executable);
    command
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in env {
        command.env(key, value);
    }
    command
        .spawn()
        .map_err(|err| startup_error(plugin_name, &format!("spawn {}: {err}", executable.display())))
}

fn forward_stdout(
    mut lines: tokio::io::Lines<BufReader<ChildStdout>>,
    plugin_name: &str,
) {
    let plugin = plugin_name.to_string();
    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(plugin = %plugin, "{line}");
        }
    });
}

fn forward_stderr(stderr: ChildStderr, plugin_name: &str) {
    let plugin = plugin_name.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            warn!(plugin = %plugin, "{line}");
        }
    });
}

fn startup_error(plugin_name: &str, reason: &str) -> CostError {
    CostError::PluginStartup {
        name: plugin_name.to_string(),
        reason: reason.to_string(),
    }
}
