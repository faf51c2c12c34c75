use anyhow::Result;
use spdk_telemetry_collector::collector::{Collector, CounterRegistry, RpcStatsFetcher};
use spdk_telemetry_collector::config::loader;
use spdk_telemetry_collector::{CollectorConfig, TelemetryProvider};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<CollectorConfig> {
    let config = match std::env::var("COLLECTOR_CONFIG") {
        Ok(path) => loader::load_from_yaml(path)?,
        Err(_) => loader::load_from_env()?,
    };
    Ok(config)
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("COLLECTOR_LOG_FORMAT").as_deref() == Ok("json") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let provider = TelemetryProvider::init(&config.telemetry)?;
    let telemetry = provider.telemetry();

    let fetcher = RpcStatsFetcher::new(&config, telemetry.clone())?;
    let counters = CounterRegistry::new(telemetry.meter());
    let collector = Collector::new(fetcher, counters, &telemetry, config.poll_interval())
        .with_failure_policy(config.failure_policy.into());

    tracing::info!(
        endpoint = %config.rpc_endpoint,
        method = %config.rpc_method,
        "Polling SPDK"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Received shutdown signal");
        signal_token.cancel();
    });

    let result = collector.run(shutdown).await;
    provider.shutdown().await;

    result?;
    Ok(())
}
