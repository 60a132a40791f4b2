//! Creo Probe: a host and container telemetry sampler that persists bounded
//! metric history to a MySQL database.
//!
//! Every round reads host metrics from procfs and container metrics from the
//! Docker Engine, writes them through a [`persistence::StorageSink`] and sweeps
//! rows older than their class's retention window.

use std::sync::Arc;

use persistence::MySqlStore;

pub mod cache;
pub mod config;
pub mod docker;
pub mod error;
pub mod filter;
pub mod persistence;
pub mod procfs;
pub mod provider;
pub mod query;
pub mod sample;
pub mod sampler;

// Running in a container:
//  mount the host root read-only at /rootfs and set ROOTFS_MOUNT_PATH=/rootfs,
//  otherwise /proc reports the container's own network namespace
//  mount /var/run/docker.sock (or set DOCKER_SOCKET_PATH)
//  run with the host network if interface counters of the host are wanted

/// Reads the configuration, connects to the database and samples until interrupted.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the database cannot be
/// reached or migrated, or the signal handler cannot be installed.
pub async fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Root filesystem: {}", config.rootfs.display());

    let store = MySqlStore::connect(&config.database_url, config.max_connections).await?;
    let provider = procfs::ProcfsProvider::new(&config.rootfs);

    let cache = Arc::new(cache::CounterCache::new());
    let janitor = cache.spawn_janitor(cache::JANITOR_INTERVAL);

    let settings = config.sampler_settings();
    let mut round_sampler: sampler::Sampler<_, docker::DockerClient, _> =
        sampler::Sampler::new(provider, store, Arc::clone(&cache), settings);
    if config.monitor_containers {
        log::debug!(
            "Monitoring containers via {}",
            config.docker_socket.display()
        );
        round_sampler =
            round_sampler.with_runtime(docker::DockerClient::new(&config.docker_socket));
    }

    let handle = sampler::Scheduler::new(Arc::new(round_sampler), config.interval).start();
    log::info!(
        "Sampling every {}s: devices={}, interfaces={}",
        config.interval.as_secs(),
        config.filter.devices.len(),
        config.filter.interfaces.len()
    );

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down...");
    handle.stop();
    handle.join().await?;
    janitor.abort();

    Ok(())
}
