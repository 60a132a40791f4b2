use std::time::Duration;

use sqlx::mysql::{MySqlArguments, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{MySql, MySqlPool};

use super::sink::ensure_class;
use super::{Error, Filter, Result, SampleReader, StorageSink};
use crate::sample::{
    ContainerSample, CpuSample, DiskSample, HostSample, ImageSample, MemorySample, MetricClass,
    NetSample, RuntimeVersionSample, Sample, Timestamp,
};

/// MySQL backed storage with one table per [`MetricClass`].
#[derive(Debug, Clone)]
pub struct MySqlStore {
    db: MySqlPool,
}

impl MySqlStore {
    pub fn new(db: MySqlPool) -> Self {
        Self { db }
    }

    /// Opens a pool to `url` and applies the embedded migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let db = MySqlPoolOptions::new()
            .acquire_timeout(Duration::from_secs(10))
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(Error::Connection)?;
        sqlx::migrate!().run(&db).await.map_err(Error::Migration)?;
        log::debug!("Connected to database: max_connections={}", max_connections);

        Ok(Self::new(db))
    }

    async fn fetch<T>(&self, sql: &str, args: &[Timestamp]) -> Result<Vec<Sample>>
    where
        T: for<'r> sqlx::FromRow<'r, MySqlRow> + Into<Sample> + Send + Unpin,
    {
        let mut query = sqlx::query_as::<_, T>(sql);
        for arg in args {
            query = query.bind(*arg);
        }
        let rows = query.fetch_all(&self.db).await.map_err(Error::Read)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch_class(
        &self,
        class: MetricClass,
        sql: &str,
        args: &[Timestamp],
    ) -> Result<Vec<Sample>> {
        match class {
            MetricClass::Host => self.fetch::<HostSample>(sql, args).await,
            MetricClass::Cpu => self.fetch::<CpuSample>(sql, args).await,
            MetricClass::Memory => self.fetch::<MemorySample>(sql, args).await,
            MetricClass::Disk => self.fetch::<DiskSample>(sql, args).await,
            MetricClass::Net => self.fetch::<NetSample>(sql, args).await,
            MetricClass::Container => self.fetch::<ContainerSample>(sql, args).await,
            MetricClass::RuntimeVersion => self.fetch::<RuntimeVersionSample>(sql, args).await,
            MetricClass::Image => self.fetch::<ImageSample>(sql, args).await,
        }
    }
}

fn delete_sql(class: MetricClass, filter: Filter) -> String {
    match filter {
        Filter::All => format!("DELETE FROM {}", class.table()),
        Filter::OlderThan(_) => format!("DELETE FROM {} WHERE timestamp < ?", class.table()),
    }
}

fn delete_query(sql: &str, filter: Filter) -> Query<'_, MySql, MySqlArguments> {
    let query = sqlx::query(sql);
    match filter {
        Filter::All => query,
        Filter::OlderThan(ts) => query.bind(ts),
    }
}

/// Binds every column of `sample` to its class's insert statement.
fn insert_query(sample: &Sample) -> Query<'_, MySql, MySqlArguments> {
    match sample {
        Sample::Host(s) => sqlx::query(
            r#"
INSERT INTO host_samples (
    timestamp, hostname, uptime, boot_time, os,
    platform, platform_version, kernel_version, kernel_arch
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(s.timestamp)
        .bind(&s.hostname)
        .bind(s.uptime)
        .bind(s.boot_time)
        .bind(&s.os)
        .bind(&s.platform)
        .bind(&s.platform_version)
        .bind(&s.kernel_version)
        .bind(&s.kernel_arch),
        Sample::Cpu(s) => sqlx::query("INSERT INTO cpu_samples (timestamp, percent) VALUES (?, ?)")
            .bind(s.timestamp)
            .bind(s.percent),
        Sample::Memory(s) => sqlx::query(
            "INSERT INTO memory_samples (timestamp, percent, total, used) VALUES (?, ?, ?, ?)",
        )
        .bind(s.timestamp)
        .bind(s.percent)
        .bind(s.total)
        .bind(s.used),
        Sample::Disk(s) => sqlx::query(
            "INSERT INTO disk_samples (timestamp, device, read_ops, write_ops) VALUES (?, ?, ?, ?)",
        )
        .bind(s.timestamp)
        .bind(&s.device)
        .bind(s.read_ops)
        .bind(s.write_ops),
        Sample::Net(s) => sqlx::query(
            "INSERT INTO net_samples (timestamp, interface, bytes_sent, bytes_recv) VALUES (?, ?, ?, ?)",
        )
        .bind(s.timestamp)
        .bind(&s.interface)
        .bind(s.bytes_sent)
        .bind(s.bytes_recv),
        Sample::Container(s) => sqlx::query(
            r#"
INSERT INTO container_samples (
    timestamp, container_id, name, image, state, uptime, ip,
    cpu_percent, mem_percent, mem_usage, mem_limit
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(s.timestamp)
        .bind(&s.container_id)
        .bind(&s.name)
        .bind(&s.image)
        .bind(&s.state)
        .bind(&s.uptime)
        .bind(&s.ip)
        .bind(s.cpu_percent)
        .bind(s.mem_percent)
        .bind(s.mem_usage)
        .bind(s.mem_limit),
        Sample::RuntimeVersion(s) => sqlx::query(
            r#"
INSERT INTO runtime_version_samples (
    timestamp, version, api_version, min_api_version,
    git_commit, go_version, os, arch
) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(s.timestamp)
        .bind(&s.version)
        .bind(&s.api_version)
        .bind(&s.min_api_version)
        .bind(&s.git_commit)
        .bind(&s.go_version)
        .bind(&s.os)
        .bind(&s.arch),
        Sample::Image(s) => sqlx::query(
            r#"
INSERT INTO image_samples (
    timestamp, image_id, name, tag, created, size, containers
) VALUES (?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(s.timestamp)
        .bind(&s.image_id)
        .bind(&s.name)
        .bind(&s.tag)
        .bind(s.created)
        .bind(s.size)
        .bind(s.containers),
    }
}

impl StorageSink for MySqlStore {
    /// Inserts all samples in a single transaction; a failing insert rolls back the batch.
    async fn create(&self, samples: &[Sample]) -> Result<()> {
        let mut tx: sqlx::Transaction<'_, MySql> = self.db.begin().await.map_err(Error::Insert)?;
        for sample in samples {
            insert_query(sample)
                .execute(&mut *tx)
                .await
                .map_err(Error::Insert)?;
        }
        tx.commit().await.map_err(Error::Insert)?;

        Ok(())
    }

    async fn delete_where(&self, class: MetricClass, filter: Filter) -> Result<u64> {
        let sql = delete_sql(class, filter);
        let result = delete_query(&sql, filter)
            .execute(&self.db)
            .await
            .map_err(Error::Delete)?;
        Ok(result.rows_affected())
    }

    /// Deletes and inserts in one transaction so readers never see an empty table.
    async fn replace(&self, class: MetricClass, samples: &[Sample]) -> Result<()> {
        ensure_class(class, samples)?;
        let sql = delete_sql(class, Filter::All);
        let mut tx: sqlx::Transaction<'_, MySql> = self.db.begin().await.map_err(Error::Delete)?;
        delete_query(&sql, Filter::All)
            .execute(&mut *tx)
            .await
            .map_err(Error::Delete)?;
        for sample in samples {
            insert_query(sample)
                .execute(&mut *tx)
                .await
                .map_err(Error::Insert)?;
        }
        tx.commit().await.map_err(Error::Insert)?;

        Ok(())
    }
}

impl SampleReader for MySqlStore {
    async fn fetch_range(
        &self,
        class: MetricClass,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Sample>> {
        let sql = format!(
            "SELECT * FROM {} WHERE timestamp >= ? AND timestamp <= ? ORDER BY timestamp, id",
            class.table()
        );
        self.fetch_class(class, &sql, &[from, to]).await
    }

    async fn fetch_latest(&self, class: MetricClass) -> Result<Vec<Sample>> {
        let table = class.table();
        let sql = format!(
            "SELECT * FROM {table} WHERE timestamp = (SELECT MAX(timestamp) FROM {table}) ORDER BY id"
        );
        self.fetch_class(class, &sql, &[]).await
    }
}
