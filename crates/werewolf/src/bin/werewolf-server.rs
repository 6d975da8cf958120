//! The werewolf server binary.
//!
//! Environment:
//! - `WEREWOLF_ADDR`: listen address (default `0.0.0.0:21567`)
//! - `WEREWOLF_PRESET`: built-in roster size, 6, 8, 10 or 12 (default 12)
//! - `WEREWOLF_ROSTER`: JSON role-count map, overrides the preset
//! - `RUST_LOG`: log filter (default `info`)

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use werewolf::prelude::*;

#[tokio::main]
async fn main() -> Result<(), WerewolfError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("WEREWOLF_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let mut builder = WerewolfServer::builder().bind(&addr);
    if let Ok(preset) = std::env::var("WEREWOLF_PRESET") {
        let players = preset.parse().map_err(|_| {
            GameError::Configuration(format!("WEREWOLF_PRESET is not a number: {preset}"))
        })?;
        builder = builder.preset(players);
    }
    if let Ok(json) = std::env::var("WEREWOLF_ROSTER") {
        builder = builder.roster_json(&json);
    }
    let server = builder.build().await?;

    let shutdown = CancellationToken::new();
    let on_ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            on_ctrl_c.cancel();
        }
    });

    match server.run_until(shutdown).await? {
        Some(status) => tracing::info!(%status, code = status.code(), "game finished"),
        None => tracing::info!("server stopped"),
    }
    Ok(())
}
