//! Collectors reading the container runtime.
//!
//! All runtime calls of one collector share a single deadline; when it passes
//! the collector gives up without writing.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;

use super::{Error, Result, Sampler, images};
use crate::cache::image_cache_key;
use crate::error::ResultOkLogExt;
use crate::persistence::StorageSink;
use crate::provider::{self, ContainerRuntime, ContainerUsage, MetricsProvider};
use crate::sample::{
    ContainerSample, ImageSample, MetricClass, RuntimeVersionSample, Sample, Timestamp,
};

/// Awaits a runtime call, failing once `deadline` has passed.
async fn runtime_call<T>(
    deadline: Instant,
    timeout: Duration,
    call: &'static str,
    metric: MetricClass,
    fut: impl Future<Output = provider::Result<T>>,
) -> Result<T> {
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| Error::ProviderTimeout { call, timeout })?
        .map_err(|source| Error::ProviderRead { metric, source })
}

impl<P, R, S> Sampler<P, R, S>
where
    P: MetricsProvider,
    R: ContainerRuntime,
    S: StorageSink,
{
    fn deadline(&self) -> (Instant, Duration) {
        let timeout = self.settings.runtime_timeout;
        (Instant::now() + timeout, timeout)
    }

    /// Stores running containers and counts one sighting per container for its image.
    pub(super) async fn collect_containers(
        self: &Arc<Self>,
        timestamp: Timestamp,
    ) -> Result<usize> {
        let Some(runtime) = self.runtime.clone() else {
            return Ok(0);
        };
        let (deadline, timeout) = self.deadline();
        let containers = runtime_call(
            deadline,
            timeout,
            "list_containers",
            MetricClass::Container,
            runtime.list_containers(),
        )
        .await?;

        let mut set = JoinSet::new();
        for (idx, info) in containers.iter().enumerate() {
            let runtime = Arc::clone(&runtime);
            let id = info.id.clone();
            set.spawn(async move { (idx, runtime.container_usage(&id).await) });
        }
        let mut usages: Vec<Option<ContainerUsage>> = vec![None; containers.len()];
        let joined = tokio::time::timeout_at(deadline, async {
            while let Some(res) = set.join_next().await {
                match res {
                    Ok((idx, usage)) => {
                        usages[idx] = usage.ok_log(format_args!(
                            "Failed to read container stats: container_id={}",
                            containers[idx].short_id()
                        ));
                    }
                    Err(err) => log::warn!("Container stats task aborted: error={}", err),
                }
            }
        })
        .await;
        if joined.is_err() {
            return Err(Error::ProviderTimeout {
                call: "container_usage",
                timeout,
            });
        }

        let mut samples: Vec<Sample> = Vec::with_capacity(containers.len());
        for (info, usage) in containers.iter().zip(usages) {
            self.cache
                .observe(&image_cache_key(&info.image), self.settings.sighting_ttl);
            let usage = usage.unwrap_or_default();
            samples.push(
                ContainerSample {
                    timestamp,
                    container_id: info.short_id().to_owned(),
                    name: info.name.clone(),
                    image: info.image.clone(),
                    state: info.state.clone(),
                    uptime: info.status.clone(),
                    ip: info.ip.clone(),
                    cpu_percent: usage.cpu_percent,
                    mem_percent: usage.memory.percent,
                    mem_usage: usage.memory.used,
                    mem_limit: usage.memory.limit,
                }
                .into(),
            );
        }

        self.replace(MetricClass::Container, samples).await
    }

    pub(super) async fn collect_runtime_version(
        self: &Arc<Self>,
        timestamp: Timestamp,
    ) -> Result<usize> {
        let Some(runtime) = self.runtime.as_ref() else {
            return Ok(0);
        };
        let (deadline, timeout) = self.deadline();
        let version = runtime_call(
            deadline,
            timeout,
            "version",
            MetricClass::RuntimeVersion,
            runtime.version(),
        )
        .await?;
        let sample = RuntimeVersionSample {
            timestamp,
            version: version.version,
            api_version: version.api_version,
            min_api_version: version.min_api_version,
            git_commit: version.git_commit,
            go_version: version.go_version,
            os: version.os,
            arch: version.arch,
        };
        self.replace(MetricClass::RuntimeVersion, vec![sample.into()])
            .await
    }

    /// Stores deduplicated images with the sightings counted since the last image round.
    pub(super) async fn collect_images(self: &Arc<Self>, timestamp: Timestamp) -> Result<usize> {
        let Some(runtime) = self.runtime.as_ref() else {
            return Ok(0);
        };
        let (deadline, timeout) = self.deadline();
        let images = runtime_call(
            deadline,
            timeout,
            "list_images",
            MetricClass::Image,
            runtime.list_images(),
        )
        .await?;

        let samples: Vec<Sample> = images::dedup_images(images)
            .into_iter()
            .map(|image| {
                let containers = self
                    .cache
                    .take(&image_cache_key(&image.reference()))
                    .unwrap_or(0);
                ImageSample {
                    timestamp,
                    image_id: image.short_id().to_owned(),
                    name: image.name,
                    tag: image.tag,
                    created: image.created,
                    size: image.size,
                    containers,
                }
                .into()
            })
            .collect();

        self.replace(MetricClass::Image, samples).await
    }
}
