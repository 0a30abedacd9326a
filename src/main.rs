use anyhow::{Context, Result};
use healthmon::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load().context("configuration error")?;
    tracing::info!(
        name = version::NAME,
        version = version::VERSION,
        "starting"
    );

    let sample_repo = Arc::new(
        sample_repo::SampleRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    sample_repo.init().await?;
    let target_repo = Arc::new(
        target_repo::TargetRepo::open(&app_config.targets.path)
            .with_context(|| format!("opening target registry {}", app_config.targets.path))?,
    );
    let resource_repo = Arc::new(resource_repo::ResourceRepo::new(
        &app_config.resources.disk_path,
    ));
    let retention = Arc::new(retention::RetentionManager::new(
        sample_repo.clone(),
        app_config.database.retention_days,
    ));
    let prober = Arc::new(probe::PingProber::new(probe::ProbeConfig::new(
        app_config.probe.count,
        Duration::from_secs(app_config.probe.timeout_secs),
    )));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = Arc::new(scheduler::Scheduler::new(
        scheduler::SchedulerDeps {
            sample_repo: sample_repo.clone(),
            target_repo: target_repo.clone(),
            resource_repo: resource_repo.clone(),
            retention: retention.clone(),
            prober: prober.clone(),
        },
        scheduler::SchedulerConfig {
            probe_interval: Duration::from_secs(app_config.probe.interval_secs),
            resource_interval: Duration::from_secs(app_config.resources.interval_secs),
            retention_every_ticks: app_config.retention.every_ticks,
        },
    ));
    let scheduler_handle = scheduler.spawn(shutdown_rx.clone());

    let vacuum_schedule = match &app_config.retention.vacuum_schedule {
        Some(cron) => retention::VacuumSchedule::Cron(cron.clone()),
        None => retention::VacuumSchedule::Every(Duration::from_secs(
            app_config.retention.vacuum_interval_secs,
        )),
    };
    let vacuum_handle =
        retention::spawn_vacuum(sample_repo.clone(), vacuum_schedule, shutdown_rx.clone());

    let health = Arc::new(health::HealthChecker::new(
        resource_repo,
        target_repo.clone(),
        prober,
    ));
    let app = routes::app(
        sample_repo,
        target_repo,
        retention,
        health,
        app_config.clone(),
    );
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let mut server_shutdown = shutdown_rx;
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        scheduler::wait_for_shutdown(&mut server_shutdown).await;
    });
    let mut server_handle = tokio::spawn(async move { server.await });

    // The server only ends on its own if it failed; stop the loops either way.
    let early_exit = tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            None
        }
        result = &mut server_handle => Some(result),
    };
    let _ = shutdown_tx.send(true);

    let _ = scheduler_handle.await;
    let _ = vacuum_handle.await;
    match early_exit {
        Some(result) => result??,
        None => server_handle.await??,
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

/// SIGINT or SIGTERM (SIGINT only off unix).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable, using ctrl-c only");
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
