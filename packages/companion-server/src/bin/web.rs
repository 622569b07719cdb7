//! `web`: the HTTP surface (§6.3) — `GET /healthz` and `POST /schedule`,
//! standing in for the real chat-platform ingestion endpoint spec.md
//! scopes out.

use companion_server::http::{router, AppState};
use companion_server::{startup, Config};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "web exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    startup::init_tracing();
    tracing::info!("starting web process");

    let config = Config::from_env()?;
    let pool = startup::connect(&config).await?;
    let adapters = startup::build_adapters(&config, pool);

    let app = router(AppState {
        schedule: adapters.schedule,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "web listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(startup::shutdown_signal())
        .await?;

    Ok(())
}
