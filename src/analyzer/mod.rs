//! Analyzer Server
//!
//! Implements the plan tool's five-RPC analyzer protocol so resources are
//! costed during preview and surface as inline advisory diagnostics. The
//! per-session cost cache feeds the end-of-walk stack summary; the server
//! is hit concurrently by the engine's RPC workers, so the cache and the
//! canceled flag are the only mutable shared state and both are
//! thread-safe.

pub mod diagnostics;

use crate::engine::Engine;
use crate::error::{CostError, Result};
use crate::ingest;
use crate::proto::analyzer::v1::analyzer_server::{Analyzer, AnalyzerServer};
use crate::proto::analyzer::v1::{
    AnalyzeRequest, AnalyzeResponse, AnalyzeStackRequest, AnalyzeStackResponse, CancelRequest,
    CancelResponse, ConfigureStackRequest, ConfigureStackResponse, HandshakeRequest,
    HandshakeResponse,
};
use crate::proto::convert;
use crate::schemas::{Confidence, CostResult, ResourceDescriptor};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

pub const NOTE_INTERNAL_RESOURCE: &str = "Internal Pulumi resource (no cloud cost)";

/// Stack metadata recorded by `ConfigureStack`
#[derive(Debug, Clone, Default)]
pub struct StackContext {
    pub stack: String,
    pub project: String,
    pub organization: String,
    pub dry_run: bool,
}

/// The analyzer service state for one session
pub struct CostAnalyzer {
    engine: Arc<Engine>,
    stack: RwLock<Option<StackContext>>,
    engine_address: RwLock<Option<String>>,
    // URN -> cached result; writes on Analyze, reads on AnalyzeStack
    cache: DashMap<String, CostResult>,
    canceled: AtomicBool,
}

impl CostAnalyzer {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            stack: RwLock::new(None),
            engine_address: RwLock::new(None),
            cache: DashMap::new(),
            canceled: AtomicBool::new(false),
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    /// The engine address recorded at handshake, if any. Unused beyond
    /// diagnostics for now.
    pub fn engine_address(&self) -> Option<String> {
        self.engine_address.read().clone()
    }

    fn cached_results(&self) -> Vec<CostResult> {
        self.cache.iter().map(|entry| entry.value().clone()).collect()
    }

    // Map the wire request into a descriptor without ever trusting the
    // outer envelope for properties.
    fn descriptor_from(request: &AnalyzeRequest) -> ResourceDescriptor {
        let properties = request
            .properties
            .as_ref()
            .map(convert::struct_to_properties)
            .unwrap_or_default();
        let id = if request.name.is_empty() {
            ingest::resource_id_from_urn(&request.urn)
        } else {
            request.name.clone()
        };
        ResourceDescriptor::new(
            request.r#type.clone(),
            id,
            ResourceDescriptor::provider_from_type(&request.r#type),
            properties,
        )
    }
}

#[tonic::async_trait]
impl Analyzer for CostAnalyzer {
    async fn handshake(
        &self,
        request: Request<HandshakeRequest>,
    ) -> std::result::Result<Response<HandshakeResponse>, Status> {
        let address = request.into_inner().engine_address;
        debug!(engine = %address, "handshake");
        *self.engine_address.write() = Some(address);
        Ok(Response::new(HandshakeResponse {}))
    }

    async fn configure_stack(
        &self,
        request: Request<ConfigureStackRequest>,
    ) -> std::result::Result<Response<ConfigureStackResponse>, Status> {
        let request = request.into_inner();
        info!(
            stack = %request.stack,
            project = %request.project,
            dry_run = request.dry_run,
            "stack configured"
        );
        *self.stack.write() = Some(StackContext {
            stack: request.stack,
            project: request.project,
            organization: request.organization,
            dry_run: request.dry_run,
        });
        Ok(Response::new(ConfigureStackResponse {}))
    }

    async fn analyze(
        &self,
        request: Request<AnalyzeRequest>,
    ) -> std::result::Result<Response<AnalyzeResponse>, Status> {
        let request = request.into_inner();

        if self.is_canceled() {
            return Ok(Response::new(AnalyzeResponse {
                diagnostics: vec![diagnostics::warning_diagnostic(
                    &request.urn,
                    diagnostics::MSG_ANALYSIS_CANCELED,
                )],
            }));
        }

        let resource = Self::descriptor_from(&request);

        // Tooling resources are answered without touching any plugin.
        if resource.is_internal() {
            let result = CostResult::projected(
                &resource.type_token,
                &resource.id,
                crate::schemas::ADAPTER_NONE,
                "USD",
                0.0,
                0.0,
            )
            .with_notes(NOTE_INTERNAL_RESOURCE)
            .with_confidence(Confidence::High);
            let diagnostic = diagnostics::resource_diagnostic(&request.urn, &result);
            self.cache.insert(request.urn.clone(), result);
            return Ok(Response::new(AnalyzeResponse {
                diagnostics: vec![diagnostic],
            }));
        }

        let diagnostic = match self.engine.projected_costs(std::slice::from_ref(&resource)).await {
            Ok(results) => match results.into_iter().next() {
                Some(result) => {
                    let diagnostic = diagnostics::resource_diagnostic(&request.urn, &result);
                    self.cache.insert(request.urn.clone(), result);
                    diagnostic
                }
                None => diagnostics::warning_diagnostic(
                    &request.urn,
                    diagnostics::MSG_UNABLE_TO_ESTIMATE,
                ),
            },
            Err(err) => {
                // Internal failures become advisory warnings; preview is
                // never aborted.
                warn!(urn = %request.urn, error = %err, "analysis failed");
                diagnostics::warning_diagnostic(
                    &request.urn,
                    format!("Cost analysis failed: {err}"),
                )
            }
        };

        Ok(Response::new(AnalyzeResponse {
            diagnostics: vec![diagnostic],
        }))
    }

    async fn analyze_stack(
        &self,
        _request: Request<AnalyzeStackRequest>,
    ) -> std::result::Result<Response<AnalyzeStackResponse>, Status> {
        let results = self.cached_results();
        debug!(cached = results.len(), "stack summary");
        Ok(Response::new(AnalyzeStackResponse {
            diagnostics: vec![diagnostics::stack_summary(&results)],
        }))
    }

    async fn cancel(
        &self,
        _request: Request<CancelRequest>,
    ) -> std::result::Result<Response<CancelResponse>, Status> {
        info!("cancel requested");
        self.canceled.store(true, Ordering::Relaxed);
        self.engine.cancellation_token().cancel();
        Ok(Response::new(CancelResponse {}))
    }
}

/// Serve the analyzer on loopback. The only line ever written to stdout is
/// the decimal port (the handshake the plan tool expects); all logging
/// goes to the diagnostic stream.
pub async fn serve(engine: Engine, port: Option<u16>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port.unwrap_or(0)))
        .await
        .map_err(CostError::Io)?;
    let addr = listener.local_addr().map_err(CostError::Io)?;

    println!("{}", addr.port());
    std::io::stdout().flush().map_err(CostError::Io)?;
    info!(%addr, "analyzer listening");

    let analyzer = CostAnalyzer::new(Arc::new(engine));
    tonic::transport::Server::builder()
        .add_service(AnalyzerServer::new(analyzer))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down analyzer");
        })
        .await
        .map_err(|err| {
            CostError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("analyzer server: {err}"),
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::specstore::SpecStore;

    fn analyzer() -> CostAnalyzer {
        CostAnalyzer::new(Arc::new(Engine::local_only(
            Arc::new(SpecStore::empty()),
            EngineConfig::default(),
        )))
    }

    #[tokio::test]
    async fn internal_type_short_circuits() {
        let analyzer = analyzer();
        let response = analyzer
            .analyze(Request::new(AnalyzeRequest {
                urn: "urn:pulumi:dev::app::pulumi:providers:aws::default".to_string(),
                r#type: "pulumi:providers:aws".to_string(),
                name: "default".to_string(),
                properties: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].message, NOTE_INTERNAL_RESOURCE);
        assert_eq!(analyzer.cache.len(), 1);
    }

    #[tokio::test]
    async fn canceled_flag_short_circuits_analyze() {
        let analyzer = analyzer();
        analyzer
            .cancel(Request::new(CancelRequest {}))
            .await
            .unwrap();

        let response = analyzer
            .analyze(Request::new(AnalyzeRequest {
                urn: "urn:x".to_string(),
                r#type: "aws:ec2/instance:Instance".to_string(),
                name: "web".to_string(),
                properties: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics[0]
            .message
            .contains("canceled"));
        assert!(analyzer.cache.is_empty());
    }

    #[tokio::test]
    async fn handshake_records_engine_address() {
        let analyzer = analyzer();
        analyzer
            .handshake(Request::new(HandshakeRequest {
                engine_address: "127.0.0.1:43021".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(
            analyzer.engine_address().as_deref(),
            Some("127.0.0.1:43021")
        );
    }

    #[tokio::test]
    async fn configure_stack_records_context() {
        let analyzer = analyzer();
        analyzer
            .configure_stack(Request::new(ConfigureStackRequest {
                stack: "dev".to_string(),
                project: "billing".to_string(),
                organization: "acme".to_string(),
                dry_run: true,
            }))
            .await
            .unwrap();

        let ctx = analyzer.stack.read().clone().unwrap();
        assert_eq!(ctx.stack, "dev");
        assert!(ctx.dry_run);
    }
}
