//! cloudcost
//!
//! A stateless orchestrator that computes cloud-infrastructure cost
//! estimates from declarative plans. Resources are fanned out to
//! out-of-process cost providers over gRPC, with a local YAML pricing
//! store as the deterministic fallback, and the aggregated results are
//! rendered as a table, JSON, or NDJSON. The same engine also serves the
//! plan tool's analyzer protocol so estimates appear inline during
//! preview.
//!
//! Nothing is persisted between invocations: no cache, no database, and
//! no cloud API is ever called directly — providers are the sole
//! authority for external pricing data.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod plugin;
pub mod proto;
pub mod render;
pub mod schemas;
pub mod specstore;
