use std::sync::Arc;
use std::time::Duration;

use kiosk_client::Gateway;
use kiosk_controller::{
    Config, Dispatcher, IdentityDoors, LogNotifier, OrderBoard, PickupCenter, PickupStaging,
    PositionWatcher, logger,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    logger::init("info", config.is_production(), config.log_dir.as_deref())?;

    tracing::info!(
        branch_id = %config.branch_id,
        api = %config.api_base_url,
        "Kiosk pickup controller starting"
    );

    let client_config = config.client_config();
    let http = Arc::new(client_config.build_http_client());
    let gateway = Gateway::connect(&client_config);

    let notifier = Arc::new(LogNotifier);
    let board = Arc::new(OrderBoard::new(http.clone(), notifier.clone()));
    let staging = Arc::new(PickupStaging::new(
        Arc::new(gateway.clone()),
        http.clone(),
        Arc::new(IdentityDoors),
        notifier.clone(),
    ));
    let watcher = Arc::new(PositionWatcher::new(
        http.clone(),
        Duration::from_millis(config.poll_interval_ms),
    ));
    let dispatcher = Dispatcher::new(
        staging.clone(),
        board.clone(),
        http.clone(),
        Arc::new(gateway.clone()),
        notifier,
    );
    let center = PickupCenter::new(
        board,
        staging,
        watcher,
        dispatcher,
        gateway,
        Duration::from_millis(config.refresh_debounce_ms),
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    center.run(shutdown).await;
    Ok(())
}
