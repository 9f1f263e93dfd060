//! PostingExpert gateway server
//!
//! Serves `/api/*` and `/api/queue/*` as same-origin proxies so the dashboard
//! never calls the API Gateway or the queue host cross-origin.

use anyhow::Context;
use postingexpert_connect::ConnectConfig;
use postingexpert_core::{branding, Platform};
use postingexpert_gateway::{GatewayConfig, GatewayServer};
use tracing::{info, warn};

fn init_tracing() -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info")
            .add_directive("postingexpert_core=debug".parse()?)
            .add_directive("postingexpert_gateway=debug".parse()?)
            .add_directive("postingexpert_connect=debug".parse()?)
            .add_directive("tower_http=info".parse()?)
            .add_directive("hyper=warn".parse()?),
    };

    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    // Daily files like postingexpert.2026-10-18.log; console-only if the
    // logs directory is not writable
    let logs_dir = branding::logs_dir();
    let appender = std::fs::create_dir_all(&logs_dir)
        .map_err(anyhow::Error::from)
        .and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(branding::LOG_PREFIX)
                .filename_suffix("log")
                .build(&logs_dir)
                .map_err(anyhow::Error::from)
        });

    let (file_layer, guard) = match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "Warning: file logging disabled ({}): {}",
                logs_dir.display(),
                e
            );
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _guard = init_tracing()?;

    info!("{} gateway v{}", branding::DISPLAY_NAME, env!("CARGO_PKG_VERSION"));
    info!("Logs: {}", branding::logs_dir().display());

    let config = GatewayConfig::from_env().context("invalid gateway configuration")?;

    let connect = ConnectConfig::from_env();
    info!("API base: {}", connect.api_base());
    for platform in Platform::ALL {
        match connect.credentials(platform) {
            Some(_) => info!("{} OAuth client configured", platform.display_name()),
            None => warn!("{} OAuth client not configured", platform.display_name()),
        }
    }

    let server = GatewayServer::new(config);
    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    server.run().await
}
