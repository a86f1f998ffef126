//! The composition root (§A): wires `turna-jobs`'s engine to the
//! per-kind handlers in `turna-schedule`. No HTTP routing lives here
//! (§1) — callers reach this crate's operations directly, the way the
//! teacher's worker binaries are driven by a queue rather than a router.

pub mod collaborators;
pub mod config;
pub mod worker;

use std::sync::Arc;

use turna_domain::JobKind;
use turna_jobs::{JobEngine, MessageBroker};
use turna_schedule::{BlobStore, DemandExtractor, PdfRenderer, ScheduleHandler, ThumbnailHandler, ThumbnailRenderer};
use turna_store::DomainStore;

use crate::config::Config;

/// The pluggable collaborators named in §6. Swap these for real
/// implementations (S3-backed `BlobStore`, an LLM-backed
/// `DemandExtractor`, a real `PdfRenderer`/`ThumbnailRenderer`) to move
/// from local/dev to production; nothing else in this crate changes.
pub struct Collaborators {
    pub blobs: Arc<dyn BlobStore>,
    pub extractor: Arc<dyn DemandExtractor>,
    pub pdf_renderer: Arc<dyn PdfRenderer>,
    pub thumbnail_renderer: Arc<dyn ThumbnailRenderer>,
}

/// A transient liveness probe handler (`JobKind::Ping`); never
/// requeueable (§4.3) and never surfaced as a spec operation beyond
/// smoke-testing that the engine and its broker are alive end to end.
struct PingHandler;

#[async_trait::async_trait]
impl turna_jobs::JobHandler for PingHandler {
    async fn handle(&self, _job: &turna_domain::Job) -> turna_errors::TurnaResult<serde_json::Value> {
        Ok(serde_json::json!({ "pong": true }))
    }
}

/// Builds a fully wired [`JobEngine`]: every [`JobKind`] this workspace
/// knows about gets a registered handler.
pub fn build_job_engine(
    config: &Config,
    store: Arc<dyn DomainStore>,
    broker: Arc<dyn MessageBroker>,
    clock: Arc<dyn turna_common::Clock>,
    collaborators: Collaborators,
) -> JobEngine {
    let mut engine = JobEngine::new(store.clone(), broker, clock, config.jobs_config());

    engine.register_handler(JobKind::Ping, Arc::new(PingHandler));
    engine.register_handler(
        JobKind::ExtractDemand,
        Arc::new(turna_schedule::ExtractionHandler::new(store.clone(), collaborators.blobs.clone(), collaborators.extractor)),
    );
    engine.register_handler(
        JobKind::GenerateSchedule,
        Arc::new(ScheduleHandler::new(store.clone(), config.solver_config())),
    );
    engine.register_handler(
        JobKind::GenerateThumbnail,
        Arc::new(ThumbnailHandler::new(store, collaborators.blobs, collaborators.thumbnail_renderer)),
    );

    engine
}
