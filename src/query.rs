//! Read side: latest snapshots and per-device series built from stored samples.
mod error;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub use error::{Error, Result};

use crate::filter::Allowlist;
use crate::persistence::SampleReader;
use crate::provider::{DiskCapacity, MetricsProvider};
use crate::sample::{
    ContainerSample, CpuSample, DiskSample, HostSample, ImageSample, MemorySample, MetricClass,
    NetSample, RuntimeVersionSample, Sample, Timestamp,
};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct UsagePoint {
    pub timestamp: Timestamp,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DiskPoint {
    pub timestamp: Timestamp,
    pub read_ops: u64,
    pub write_ops: u64,
}

/// Operation counts of one device, with the current size of its filesystem.
///
/// Capacity fields are empty or zero when the device is not mounted or no
/// capacity source is configured.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DiskSeries {
    pub device: String,
    pub mount_point: String,
    /// Bytes.
    pub total: u64,
    /// Bytes.
    pub used: u64,
    pub percent: f64,
    pub data: Vec<DiskPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct NetPoint {
    pub timestamp: Timestamp,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NetSeries {
    pub interface: String,
    pub data: Vec<NetPoint>,
}

/// Groups disk rows by device and attaches each device's capacity.
/// Series are sorted by device and keep row order.
pub fn disk_series(
    rows: impl IntoIterator<Item = DiskSample>,
    capacity: &HashMap<String, DiskCapacity>,
) -> Vec<DiskSeries> {
    let mut by_device: BTreeMap<String, Vec<DiskPoint>> = BTreeMap::new();
    for row in rows {
        by_device.entry(row.device).or_default().push(DiskPoint {
            timestamp: row.timestamp,
            read_ops: row.read_ops,
            write_ops: row.write_ops,
        });
    }
    by_device
        .into_iter()
        .map(|(device, data)| {
            let fs = capacity.get(&device).cloned().unwrap_or_default();
            DiskSeries {
                device,
                mount_point: fs.mount_point,
                total: fs.total,
                used: fs.used,
                percent: fs.percent,
                data,
            }
        })
        .collect()
}

/// Groups network rows by interface. Series are sorted by interface and keep row order.
pub fn net_series(rows: impl IntoIterator<Item = NetSample>) -> Vec<NetSeries> {
    let mut by_interface: BTreeMap<String, Vec<NetPoint>> = BTreeMap::new();
    for row in rows {
        let points = by_interface.entry(row.interface).or_default();
        points.push(NetPoint {
            timestamp: row.timestamp,
            bytes_sent: row.bytes_sent,
            bytes_recv: row.bytes_recv,
        });
    }
    by_interface
        .into_iter()
        .map(|(interface, data)| NetSeries { interface, data })
        .collect()
}

macro_rules! unwrap_rows {
    ($rows:expr, $variant:ident) => {
        $rows
            .into_iter()
            .filter_map(|sample| match sample {
                Sample::$variant(row) => Some(row),
                _ => None,
            })
            .collect::<Vec<_>>()
    };
}

pub struct Query<Rd> {
    reader: Rd,
    capacity: Option<Arc<dyn MetricsProvider>>,
}

impl<Rd: SampleReader> Query<Rd> {
    pub fn new(reader: Rd) -> Self {
        Self {
            reader,
            capacity: None,
        }
    }

    /// Reads mount points and filesystem sizes for [`Query::disk_usage`] from `provider`.
    pub fn with_capacity(mut self, provider: Arc<dyn MetricsProvider>) -> Self {
        self.capacity = Some(provider);
        self
    }

    async fn range(
        &self,
        class: MetricClass,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Sample>> {
        if from > to {
            return Err(Error::InvalidRange { from, to });
        }
        Ok(self.reader.fetch_range(class, from, to).await?)
    }

    async fn latest(&self, class: MetricClass) -> Result<Vec<Sample>> {
        Ok(self.reader.fetch_latest(class).await?)
    }

    /// Current capacity of `devices`. A failed read leaves the figures empty.
    async fn disk_capacity(&self, devices: Allowlist) -> HashMap<String, DiskCapacity> {
        let Some(provider) = self.capacity.clone() else {
            return HashMap::new();
        };
        let task = tokio::task::spawn_blocking(move || provider.disk_capacity(&devices));
        match task.await {
            Ok(Ok(capacity)) => capacity,
            Ok(Err(err)) => {
                log::warn!("Failed to read disk capacity: error={}", err);
                HashMap::new()
            }
            Err(err) => {
                log::warn!("Disk capacity read aborted: error={}", err);
                HashMap::new()
            }
        }
    }

    pub async fn host_info(&self) -> Result<Option<HostSample>> {
        let rows = self.latest(MetricClass::Host).await?;
        Ok(unwrap_rows!(rows, Host).into_iter().next())
    }

    pub async fn cpu_info(&self) -> Result<Option<CpuSample>> {
        let rows = self.latest(MetricClass::Cpu).await?;
        Ok(unwrap_rows!(rows, Cpu).into_iter().next())
    }

    pub async fn memory_info(&self) -> Result<Option<MemorySample>> {
        let rows = self.latest(MetricClass::Memory).await?;
        Ok(unwrap_rows!(rows, Memory).into_iter().next())
    }

    pub async fn runtime_version(&self) -> Result<Option<RuntimeVersionSample>> {
        let rows = self.latest(MetricClass::RuntimeVersion).await?;
        Ok(unwrap_rows!(rows, RuntimeVersion).into_iter().next())
    }

    pub async fn containers(&self) -> Result<Vec<ContainerSample>> {
        let rows = self.latest(MetricClass::Container).await?;
        Ok(unwrap_rows!(rows, Container))
    }

    pub async fn images(&self) -> Result<Vec<ImageSample>> {
        let rows = self.latest(MetricClass::Image).await?;
        Ok(unwrap_rows!(rows, Image))
    }

    pub async fn cpu_usage(&self, from: Timestamp, to: Timestamp) -> Result<Vec<UsagePoint>> {
        let rows = self.range(MetricClass::Cpu, from, to).await?;
        Ok(unwrap_rows!(rows, Cpu)
            .into_iter()
            .map(|row| UsagePoint {
                timestamp: row.timestamp,
                value: row.percent,
            })
            .collect())
    }

    pub async fn memory_usage(&self, from: Timestamp, to: Timestamp) -> Result<Vec<UsagePoint>> {
        let rows = self.range(MetricClass::Memory, from, to).await?;
        Ok(unwrap_rows!(rows, Memory)
            .into_iter()
            .map(|row| UsagePoint {
                timestamp: row.timestamp,
                value: row.percent,
            })
            .collect())
    }

    pub async fn disk_usage(&self, from: Timestamp, to: Timestamp) -> Result<Vec<DiskSeries>> {
        let rows = self.range(MetricClass::Disk, from, to).await?;
        let rows = unwrap_rows!(rows, Disk);
        let devices = Allowlist::new(rows.iter().map(|row| row.device.clone()));
        let capacity = self.disk_capacity(devices).await;
        Ok(disk_series(rows, &capacity))
    }

    pub async fn net_usage(&self, from: Timestamp, to: Timestamp) -> Result<Vec<NetSeries>> {
        let rows = self.range(MetricClass::Net, from, to).await?;
        Ok(net_series(unwrap_rows!(rows, Net)))
    }
}
