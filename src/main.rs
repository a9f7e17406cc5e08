use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use prometheus::Registry;
use pulumi_exporter::api::PulumiClient;
use pulumi_exporter::settings::{load_settings, CliOptions};
use pulumi_exporter::tracing::{get_subscriber, init_subscriber};
use pulumi_exporter::{server, Collector, CollectorSettings, ExporterError};
use tokio_util::sync::CancellationToken;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("pulumi_exporter", "info");
    init_subscriber(subscriber)?;

    let options = CliOptions::parse();
    let settings = load_settings(&options).context("failed to load settings")?;
    tracing::info!(?settings, version=%env!("CARGO_PKG_VERSION"), "starting pulumi exporter");

    let registry = Registry::new();
    #[cfg(target_os = "linux")]
    registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

    let client = PulumiClient::from_settings(&settings.pulumi).context("failed to create pulumi api client")?;
    let collector = Collector::new(Arc::new(client), CollectorSettings::from(&settings.pulumi), &registry)
        .context("failed to create metrics collector")?;
    let collector = Arc::new(collector);

    let shutdown = CancellationToken::new();

    let collection = tokio::spawn({
        let collector = Arc::clone(&collector);
        let shutdown = shutdown.clone();
        async move {
            match collector.run(shutdown).await {
                Ok(()) | Err(ExporterError::Cancelled) => {},
                Err(err) => tracing::error!(error=?err, "metrics collection failed"),
            }
        }
    });

    let router = server::router(registry.clone(), collector.passes());
    let listen_address = settings.http.listen_address;
    let serving = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let result = server::serve(listen_address, router, shutdown.clone()).await;
            if let Err(err) = &result {
                tracing::error!(error=?err, "metrics server failed; shutting down");
                shutdown.cancel();
            }
            result
        }
    });

    tokio::select! {
        signal = shutdown_signal() => {
            let signal = signal.context("failed to listen for shutdown signals")?;
            tracing::info!(%signal, "shutdown signal received");
        },
        _ = shutdown.cancelled() => {},
    }
    shutdown.cancel();

    let stopped = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let collected = collection.await;
        let served = serving.await;
        (collected, served)
    })
    .await;

    match stopped {
        Ok((collected, served)) => {
            if let Err(err) = collected {
                tracing::error!(error=?err, "metrics collection task failed");
            }

            match served {
                Ok(Ok(())) => {},
                Ok(Err(err)) => return Err(err.into()),
                Err(err) => tracing::error!(error=?err, "metrics server task failed"),
            }
        },
        Err(_) => tracing::warn!(timeout=?SHUTDOWN_TIMEOUT, "shutdown timed out; exiting"),
    }

    tracing::info!("pulumi exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        interrupted = tokio::signal::ctrl_c() => interrupted.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
}
