//! Collectors reading the host through the [`MetricsProvider`].

use std::sync::Arc;

use super::{Result, Sampler, delta};
use crate::persistence::StorageSink;
use crate::provider::{ContainerRuntime, MetricsProvider};
use crate::sample::{
    CpuSample, DiskSample, HostSample, MemorySample, MetricClass, NetSample, Sample, Timestamp,
};

impl<P, R, S> Sampler<P, R, S>
where
    P: MetricsProvider,
    R: ContainerRuntime,
    S: StorageSink,
{
    pub(super) async fn collect_host(self: &Arc<Self>, timestamp: Timestamp) -> Result<usize> {
        let info = self
            .read_blocking(MetricClass::Host, |p| p.host_info())
            .await?;
        let sample = HostSample {
            timestamp,
            hostname: info.hostname,
            uptime: info.uptime,
            boot_time: info.boot_time,
            os: info.os,
            platform: info.platform,
            platform_version: info.platform_version,
            kernel_version: info.kernel_version,
            kernel_arch: info.kernel_arch,
        };
        self.replace(MetricClass::Host, vec![sample.into()]).await
    }

    pub(super) async fn collect_cpu(self: &Arc<Self>, timestamp: Timestamp) -> Result<usize> {
        let window = self.settings.cpu_window;
        let percent = self
            .read_blocking(MetricClass::Cpu, move |p| p.cpu_percent(window))
            .await?;
        self.append(
            MetricClass::Cpu,
            vec![CpuSample { timestamp, percent }.into()],
        )
        .await
    }

    pub(super) async fn collect_memory(self: &Arc<Self>, timestamp: Timestamp) -> Result<usize> {
        let info = self
            .read_blocking(MetricClass::Memory, |p| p.memory_info())
            .await?;
        let sample = MemorySample {
            timestamp,
            percent: info.percent,
            total: info.total,
            used: info.used,
        };
        self.append(MetricClass::Memory, vec![sample.into()]).await
    }

    pub(super) async fn collect_disk(self: &Arc<Self>, timestamp: Timestamp) -> Result<usize> {
        let devices = self.settings.filter.devices.clone();
        let counters = self
            .read_blocking(MetricClass::Disk, move |p| p.disk_counters(&devices))
            .await?;

        let mut samples: Vec<DiskSample> = counters
            .into_iter()
            .filter(|(device, _)| self.settings.filter.devices.contains(device))
            .map(|(device, c)| DiskSample {
                timestamp,
                device,
                read_ops: c.read_ops,
                write_ops: c.write_ops,
            })
            .collect();
        if samples.is_empty() {
            log::warn!(
                "No configured disk device reported counters: configured={}",
                self.settings.filter.devices.len()
            );
            return Ok(0);
        }
        samples.sort_by(|a, b| a.device.cmp(&b.device));

        self.append(
            MetricClass::Disk,
            samples.into_iter().map(Sample::from).collect(),
        )
        .await
    }

    /// Takes two counter snapshots `net_window` apart and stores the difference.
    pub(super) async fn collect_net(self: &Arc<Self>, timestamp: Timestamp) -> Result<usize> {
        let interfaces = self.settings.filter.interfaces.clone();
        let before = {
            let interfaces = interfaces.clone();
            self.read_blocking(MetricClass::Net, move |p| p.network_counters(&interfaces))
                .await?
        };
        tokio::time::sleep(self.settings.net_window).await;
        let after = self
            .read_blocking(MetricClass::Net, move |p| p.network_counters(&interfaces))
            .await?;

        let samples: Vec<Sample> = delta::throughput(&before, &after)
            .into_iter()
            .filter(|d| self.settings.filter.interfaces.contains(&d.interface))
            .map(|d| {
                if d.reset {
                    log::warn!(
                        "Network counter went backwards, reporting zero: interface={}",
                        d.interface
                    );
                }
                NetSample {
                    timestamp,
                    interface: d.interface,
                    bytes_sent: d.bytes_sent,
                    bytes_recv: d.bytes_recv,
                }
                .into()
            })
            .collect();
        if samples.is_empty() {
            log::debug!("No interface reported counters in both snapshots");
            return Ok(0);
        }

        self.append(MetricClass::Net, samples).await
    }
}
