//! Plugin Host
//!
//! Owns one provider subprocess and its gRPC channel, exposing the typed
//! provider API. Startup must yield a unary-ready channel within 10 s or
//! fail; close must signal the subprocess and wait for it to exit, on every
//! path, or process slots leak across long analyzer sessions.

use crate::error::{CostError, Result};
use crate::plugin::launcher::{self, LaunchedPlugin};
use crate::plugin::manifest::Transport;
use crate::proto::convert;
use crate::proto::costsource::v1 as pb;
use crate::proto::costsource::v1::cost_source_service_client::CostSourceServiceClient;
use crate::schemas::ResourceDescriptor;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;
use tracing::{debug, info, warn};

/// Overall budget for spawn + handshake + liveness probe.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline applied to each provider RPC.
pub const RPC_DEADLINE: Duration = Duration::from_secs(30);

/// Lifecycle phases of one host instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Spawning,
    HandshakeWaiting,
    Ready,
    Closing,
    Closed,
}

/// Everything needed to start one provider
#[derive(Debug, Clone)]
pub struct PluginLaunchSpec {
    pub name: String,
    pub executable: PathBuf,
    pub transport: Transport,
    pub env: Vec<(String, String)>,
}

/// A live provider subprocess plus its gRPC channel
pub struct PluginHost {
    adapter_name: String,
    state: Mutex<HostState>,
    child: tokio::sync::Mutex<Option<tokio::process::Child>>,
    client: CostSourceServiceClient<Channel>,
    cancel: CancellationToken,
}

impl PluginHost {
    /// Spawn the provider, establish its channel, and confirm liveness
    /// with a `Name()` probe whose answer becomes the adapter label. The
    /// whole sequence is bounded by [`STARTUP_TIMEOUT`].
    pub async fn start(spec: PluginLaunchSpec) -> Result<Self> {
        tokio::time::timeout(STARTUP_TIMEOUT, Self::start_inner(spec.clone()))
            .await
            .map_err(|_| CostError::PluginStartup {
                name: spec.name,
                reason: "startup exceeded 10s".to_string(),
            })?
    }

    async fn start_inner(spec: PluginLaunchSpec) -> Result<Self> {
        debug!(plugin = %spec.name, transport = ?spec.transport, "starting plugin");
        let state = Mutex::new(HostState::Spawning);

        // The launcher spawns and then blocks on the handshake, so the
        // observable phase for the whole await is HandshakeWaiting.
        *state.lock() = HostState::HandshakeWaiting;
        let LaunchedPlugin { child, channel } = match spec.transport {
            Transport::Tcp => {
                launcher::launch_tcp(&spec.executable, &spec.name, &spec.env).await?
            }
            Transport::Stdio => {
                launcher::launch_stdio(&spec.executable, &spec.name, &spec.env).await?
            }
        };

        let mut client = CostSourceServiceClient::new(channel);
        let reported = client
            .name(pb::NameRequest {})
            .await
            .map_err(|status| CostError::PluginStartup {
                name: spec.name.clone(),
                reason: format!("liveness probe failed: {status}"),
            })?
            .into_inner()
            .name;

        let adapter_name = if reported.is_empty() {
            spec.name.clone()
        } else {
            reported
        };
        info!(plugin = %spec.name, adapter = %adapter_name, "plugin ready");

        *state.lock() = HostState::Ready;
        Ok(Self {
            adapter_name,
            state,
            child: tokio::sync::Mutex::new(Some(child)),
            client,
            cancel: CancellationToken::new(),
        })
    }

    /// The provider's self-reported identity, used as the adapter label.
    pub fn name(&self) -> &str {
        &self.adapter_name
    }

    pub fn state(&self) -> HostState {
        *self.state.lock()
    }

    /// Move to `Closing` regardless of the current phase and wake every
    /// in-flight RPC.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, HostState::Closed) {
            *state = HostState::Closing;
        }
        drop(state);
        self.cancel.cancel();
    }

    pub async fn supports(&self, type_token: &str) -> Result<bool> {
        let response = self
            .unary(|mut client| async move {
                client
                    .supports(pb::SupportsRequest {
                        r#type: type_token.to_string(),
                    })
                    .await
            })
            .await?;
        Ok(response.supported)
    }

    pub async fn get_projected_cost(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<pb::GetProjectedCostResponse> {
        let wire = pb::ResourceDescriptor::from(resource);
        self.unary(|mut client| async move {
            client
                .get_projected_cost(pb::GetProjectedCostRequest {
                    resource: Some(wire),
                })
                .await
        })
        .await
    }

    pub async fn get_actual_cost(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<pb::GetActualCostResponse> {
        let request = pb::GetActualCostRequest {
            resource_id: resource_id.to_string(),
            start: Some(convert::timestamp_from_datetime(start)),
            end: Some(convert::timestamp_from_datetime(end)),
        };
        self.unary(|mut client| async move { client.get_actual_cost(request).await })
            .await
    }

    pub async fn get_plugin_info(&self) -> Result<pb::GetPluginInfoResponse> {
        self.unary(|mut client| async move {
            client.get_plugin_info(pb::GetPluginInfoRequest {}).await
        })
        .await
    }

    // One unary call with the per-call deadline and cancellation applied.
    // Transport errors surface to the caller without a state transition;
    // retrying is the caller's decision.
    async fn unary<F, Fut, R>(&self, call: F) -> Result<R>
    where
        F: FnOnce(CostSourceServiceClient<Channel>) -> Fut,
        Fut: std::future::Future<Output = std::result::Result<tonic::Response<R>, tonic::Status>>,
    {
        self.ensure_ready()?;
        let fut = call(self.client.clone());
        tokio::select! {
            _ = self.cancel.cancelled() => Err(self.rpc_error(tonic::Status::cancelled("host closing"))),
            outcome = tokio::time::timeout(RPC_DEADLINE, fut) => match outcome {
                Ok(Ok(response)) => Ok(response.into_inner()),
                Ok(Err(status)) => Err(self.rpc_error(status)),
                Err(_) => Err(self.rpc_error(tonic::Status::deadline_exceeded(
                    format!("no answer within {}s", RPC_DEADLINE.as_secs()),
                ))),
            },
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        match *self.state.lock() {
            HostState::Ready => Ok(()),
            other => Err(self.rpc_error(tonic::Status::failed_precondition(format!(
                "host is {other:?}, not Ready"
            )))),
        }
    }

    fn rpc_error(&self, status: tonic::Status) -> CostError {
        CostError::PluginRpc {
            name: self.adapter_name.clone(),
            status,
        }
    }

    /// Close the channel, signal the subprocess, and wait for it to exit.
    /// Idempotent; later calls are no-ops.
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if matches!(*state, HostState::Closed) {
                return Ok(());
            }
            *state = HostState::Closing;
        }
        self.cancel.cancel();

        // Dropping the last channel clone closes the connection; the child
        // handle is what must be reaped explicitly.
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                warn!(plugin = %self.adapter_name, error = %err, "kill failed; waiting anyway");
            }
            match child.wait().await {
                Ok(status) => {
                    debug!(plugin = %self.adapter_name, %status, "plugin exited");
                }
                Err(err) => {
                    warn!(plugin = %self.adapter_name, error = %err, "wait failed");
                }
            }
        }

        *self.state.lock() = HostState::Closed;
        Ok(())
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        // Best effort only; `close()` is the contractual path. The spawn
        // also sets kill_on_drop, so an un-closed host cannot outlive the
        // parent process.
        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(child) = guard.as_mut() {
                let _ = child.start_kill();
            }
        }
    }
}
