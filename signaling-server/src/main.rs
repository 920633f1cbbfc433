use anyhow::Context;
use clap::Parser;
use log::{debug, info};
use peer_relay::Relay;
use peer_relay_signaling_server::config::Config;
use peer_relay_signaling_server::router::{self, ServerState};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    TermLogger::init(
        config.log_level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("failed to initialize logger")?;

    let (relay, mut reports) = Relay::new(config.relay_config());
    tokio::spawn(async move {
        // reports are already logged by the relay when raised
        while let Some(report) = reports.recv().await {
            debug!("error report: {:?}", report);
        }
    });

    let app = router::create(ServerState::new(relay), &config.path);
    info!(
        "relay listening on ws://{}{} (controller subprotocol `{}`)",
        config.address, config.path, config.controller_protocol
    );
    axum::Server::try_bind(&config.address)
        .with_context(|| format!("failed to bind {}", config.address))?
        .serve(app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}
