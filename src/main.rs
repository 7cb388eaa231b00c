use dotenvy::dotenv;
use tracing::info;

use std::net::SocketAddr;
use telesub::infra::{
    app::create_app, expiry_sweeper::run_expiry_sweep_loop, setup::init_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let app_state = init_app_state().await?;

    let bind_addr = app_state.config.bind_addr;
    let sweep_every = app_state.config.expiry_sweep_secs;

    let app = create_app(app_state.clone());

    // Spawned after create_app so the sweeper logs through the installed subscriber
    let subscription_use_cases = app_state.subscription_use_cases.clone();
    tokio::spawn(async move {
        run_expiry_sweep_loop(subscription_use_cases, sweep_every).await;
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
