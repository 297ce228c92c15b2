use std::sync::Arc;

use tokio::net::TcpListener;

use llm_relay::{JobHandler, WorkerConfig, build_engine, build_worker_router, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = WorkerConfig::from_env()?;
    tracing::info!(
        model = %config.model_name,
        model_path = %config.model_path.display(),
        engine = config.engine.as_str(),
        "initializing inference engine"
    );

    let engine = build_engine(&config)?;
    let handler = Arc::new(JobHandler::new(engine, config.model_name.clone()));
    let router = build_worker_router(handler, config.model_path.clone());

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "worker ready");

    axum::serve(listener, router).await?;

    Ok(())
}
