//! Run command: the long-lived engine process.

use tokio_util::sync::CancellationToken;

use crate::cli::RunArgs;
use crate::config::EngineConfig;
use crate::health::HealthChecker;
use crate::logging::init_tracing;
use crate::orchestrator::DeliveryOrchestrator;

/// Load config, apply CLI and environment overrides.
pub fn load_config_with_overrides(args: &RunArgs) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let path = if args.config.exists() {
        Some(args.config.as_path())
    } else {
        None
    };
    let mut config = EngineConfig::load(path)?.with_env_overrides();

    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(strategy) = &args.strategy {
        config.rotation.strategy = strategy.parse()?;
    }
    if args.no_health_check {
        config.health_check.enabled = false;
    }

    Ok(config)
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }

    cancel_token.cancel();
}

/// Main run command handler
pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    init_tracing(&config.logging)?;

    tracing::info!(
        strategy = %config.rotation.strategy,
        proxies = config.proxies.len(),
        relays = config.relays.len(),
        "Starting rotation engine"
    );

    let orchestrator = DeliveryOrchestrator::from_config(&config)?;

    let cancel_token = CancellationToken::new();
    let checker = HealthChecker::new(orchestrator.registry(), config.health_check.clone());
    let health_handle = checker.start(cancel_token.clone());

    shutdown_signal(cancel_token).await;

    health_handle.await?;
    tracing::info!("Rotation engine stopped");

    Ok(())
}
