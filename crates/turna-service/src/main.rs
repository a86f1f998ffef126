use std::sync::Arc;
use std::time::Duration as StdDuration;

use clap::Parser;
use tokio::sync::Mutex;
use turna_common::SystemClock;
use turna_jobs::InMemoryBroker;
use turna_service::collaborators::{InMemoryBlobStore, UnconfiguredExtractor, UnconfiguredPdfRenderer, UnconfiguredThumbnailRenderer};
use turna_service::config::Config;
use turna_service::worker::{run_reconciler_loop, run_worker};
use turna_service::{build_job_engine, Collaborators};
use turna_store::InMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::parse();
    tracing::info!(?config, "starting turna-worker");

    let store: Arc<dyn turna_store::DomainStore> = Arc::new(InMemoryStore::new());
    let broker = Arc::new(InMemoryBroker::new());
    let clock = Arc::new(SystemClock);
    let collaborators = Collaborators {
        blobs: InMemoryBlobStore::new(),
        extractor: Arc::new(UnconfiguredExtractor),
        pdf_renderer: Arc::new(UnconfiguredPdfRenderer),
        thumbnail_renderer: Arc::new(UnconfiguredThumbnailRenderer),
    };

    let engine = Arc::new(build_job_engine(&config, store, broker.clone(), clock, collaborators));

    let receiver = broker.take_receiver().expect("broker receiver already taken");
    let receiver = Arc::new(Mutex::new(receiver));

    let mut tasks = tokio::task::JoinSet::new();
    for worker_index in 0..config.solver_workers {
        let engine = engine.clone();
        let receiver = receiver.clone();
        tasks.spawn(async move {
            tracing::info!(worker_index, "worker started");
            run_worker(engine, receiver).await;
        });
    }

    let reconciler_engine = engine.clone();
    let reconciler_interval = StdDuration::from_secs(config.reconciler_interval_seconds);
    tasks.spawn(async move {
        run_reconciler_loop(reconciler_engine, reconciler_interval).await;
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
        _ = tasks.join_next() => {
            tracing::warn!("a worker task exited unexpectedly");
        }
    }

    Ok(())
}
