use std::sync::Arc;

use tokio::net::TcpListener;

use llm_relay::{AgentSlot, BridgeConfig, CliAgent, build_bridge_router, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = BridgeConfig::from_env()?;
    let slot = AgentSlot::new();

    // Serve health checks while the agent comes up.
    {
        let slot = slot.clone();
        let config = config.clone();
        tokio::spawn(async move {
            match CliAgent::initialize(&config).await {
                Ok(agent) => {
                    slot.install(Arc::new(agent));
                }
                Err(err) => {
                    tracing::error!(error = %err, program = %config.agent_command, "failed to initialize agent");
                }
            }
        });
    }

    let router = build_bridge_router(slot, config.workspace_dir.clone());

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, workspace = %config.workspace_dir.display(), "bridge ready");

    axum::serve(listener, router).await?;

    Ok(())
}
