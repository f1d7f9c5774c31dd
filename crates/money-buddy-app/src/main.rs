// Money Buddy entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config (copying defaults on first run)
// 3. Build shared state: LLM client, Aptos client, Twitter service
// 4. Serve HTTP until Ctrl+C

use anyhow::Context;
use tracing::info;

use money_buddy_app::runtime::AppState;
use money_buddy_app::server;
use money_buddy_core::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Money Buddy starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: network={:?}, model={}, twitter login attempts={}",
        config.chain.network, config.llm.model, config.twitter.max_login_attempts
    );

    // 3. Build shared state
    let state = AppState::from_config(&config).context("failed to initialize services")?;

    // 4. Serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server error")?;

    info!("Money Buddy shut down cleanly");
    Ok(())
}

/// Initialize tracing to stdout, filtered by `RUST_LOG` when set.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("money_buddy=info,tower_http=info,warn")
            }),
        )
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
