mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::{
    GIB, ScriptedRuntime, SlowInsertStore, StaticProvider, container, image, sampler, settings,
};
use creo_probe::cache::{CounterCache, DEFAULT_TTL};
use creo_probe::persistence::{Filter, MemoryStore, Operation};
use creo_probe::sample::{
    ClassKind, CpuSample, DiskSample, HostSample, MemorySample, MetricClass, NetSample, Sample,
};
use creo_probe::sampler::{Job, JobOutcome, Sampler};

const ROUND: u64 = 1_700_000_000;

#[tokio::test(start_paused = true)]
async fn test_round_writes_fixed_readings() {
    let store = MemoryStore::new();
    let sampler = sampler(StaticProvider::default(), None, &store);

    let report = sampler.run_round(ROUND).await;
    assert_eq!(report.failures(), 0);

    assert_eq!(
        store.rows(MetricClass::Cpu),
        vec![Sample::Cpu(CpuSample {
            timestamp: ROUND,
            percent: 42.5,
        })]
    );
    assert_eq!(
        store.rows(MetricClass::Memory),
        vec![Sample::Memory(MemorySample {
            timestamp: ROUND,
            percent: 60.0,
            total: 16 * GIB,
            used: (9.6 * GIB as f64) as u64,
        })]
    );
    let hosts = store.rows(MetricClass::Host);
    assert_eq!(hosts.len(), 1);
    assert!(matches!(
        &hosts[0],
        Sample::Host(HostSample { timestamp: ROUND, hostname, .. }) if hostname == "node-1"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_device_filter_is_respected() {
    let store = MemoryStore::new();
    let sampler = sampler(StaticProvider::default(), None, &store);
    sampler.run_round(ROUND).await;

    assert_eq!(
        store.rows(MetricClass::Disk),
        vec![Sample::Disk(DiskSample {
            timestamp: ROUND,
            device: "/dev/sda".into(),
            read_ops: 100,
            write_ops: 200,
        })]
    );
    assert_eq!(
        store.rows(MetricClass::Net),
        vec![Sample::Net(NetSample {
            timestamp: ROUND,
            interface: "eth0".into(),
            bytes_sent: 500,
            bytes_recv: 4_000,
        })]
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_configured_disk_writes_nothing() {
    let store = MemoryStore::new();
    let provider = StaticProvider {
        disks: Default::default(),
        ..StaticProvider::default()
    };
    let sampler = sampler(provider, None, &store);
    let report = sampler.run_round(ROUND).await;

    assert_eq!(
        report.outcome(Job::Collect(MetricClass::Disk)),
        Some(&JobOutcome::Completed { rows: 0 })
    );
    assert!(store.rows(MetricClass::Disk).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_counter_reset_is_stored_as_zero() {
    let store = MemoryStore::new();
    let provider = StaticProvider {
        net: vec![
            common::snapshot(&[("eth0", 9_000, 100)]),
            common::snapshot(&[("eth0", 50, 300)]),
        ],
        ..StaticProvider::default()
    };
    let sampler = sampler(provider, None, &store);
    sampler.run_round(ROUND).await;

    assert_eq!(
        store.rows(MetricClass::Net),
        vec![Sample::Net(NetSample {
            timestamp: ROUND,
            interface: "eth0".into(),
            bytes_sent: 0,
            bytes_recv: 200,
        })]
    );
}

#[tokio::test(start_paused = true)]
async fn test_container_sightings_are_counted() {
    let store = MemoryStore::new();
    let runtime = ScriptedRuntime {
        containers: vec![
            container("aaaaaaaaaaaa1111", "web-1", "nginx:latest"),
            container("bbbbbbbbbbbb2222", "web-2", "nginx"),
            container("cccccccccccc3333", "cache", "redis:7"),
        ],
        ..ScriptedRuntime::default()
    };
    let sampler = sampler(StaticProvider::default(), Some(runtime), &store);
    sampler.run_round(ROUND).await;

    assert_eq!(sampler.cache().get("nginx:latest"), Some(2));
    assert_eq!(sampler.cache().get("redis:7"), Some(1));

    let ids: Vec<String> = store
        .rows(MetricClass::Container)
        .into_iter()
        .map(|row| match row {
            Sample::Container(c) => c.container_id,
            other => panic!("unexpected row: {other:?}"),
        })
        .collect();
    assert_eq!(ids, vec!["aaaaaaaaaaaa", "bbbbbbbbbbbb", "cccccccccccc"]);

    // sightings expire when nobody lists images in time
    tokio::time::advance(DEFAULT_TTL + Duration::from_secs(1)).await;
    assert_eq!(sampler.cache().get("nginx:latest"), None);
}

#[tokio::test(start_paused = true)]
async fn test_images_take_counts_and_dedup() {
    let store = MemoryStore::new();
    let runtime = ScriptedRuntime {
        images: vec![
            image("sha256:1111111111111111aaaa", "nginx", "1.25"),
            image("sha256:1111111111111111aaaa", "nginx", "latest"),
            image("sha256:1111111111111111aaaa", "nginx", "stable"),
            image("sha256:2222222222222222bbbb", "redis", "7"),
        ],
        ..ScriptedRuntime::default()
    };
    let sampler = sampler(StaticProvider::default(), Some(runtime), &store);
    sampler.cache().set("nginx:latest", 3, DEFAULT_TTL);
    sampler.cache().set("redis:7", 1, DEFAULT_TTL);

    sampler.run_round(ROUND).await;

    let images: Vec<(String, String, i64)> = store
        .rows(MetricClass::Image)
        .into_iter()
        .map(|row| match row {
            Sample::Image(i) => (i.image_id, i.tag, i.containers),
            other => panic!("unexpected row: {other:?}"),
        })
        .collect();
    assert_eq!(
        images,
        vec![
            ("111111111111".to_owned(), "1.25".to_owned(), 0),
            ("111111111111".to_owned(), "latest".to_owned(), 3),
            ("222222222222".to_owned(), "7".to_owned(), 1),
        ]
    );
    assert_eq!(sampler.cache().get("nginx:latest"), None);
    assert_eq!(sampler.cache().get("redis:7"), None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_container_stats_degrade_to_zero() {
    let store = MemoryStore::new();
    let runtime = ScriptedRuntime {
        containers: vec![
            container("aaaaaaaaaaaa1111", "ok", "nginx:latest"),
            container("bbbbbbbbbbbb2222", "broken", "nginx:latest"),
        ],
        failing_stats: HashSet::from(["bbbbbbbbbbbb2222".to_owned()]),
        ..ScriptedRuntime::default()
    };
    let sampler = sampler(StaticProvider::default(), Some(runtime), &store);
    let report = sampler.run_round(ROUND).await;

    assert_eq!(
        report.outcome(Job::Collect(MetricClass::Container)),
        Some(&JobOutcome::Completed { rows: 2 })
    );
    let rows = store.rows(MetricClass::Container);
    let Sample::Container(ok) = &rows[0] else {
        panic!("unexpected row: {:?}", rows[0]);
    };
    let Sample::Container(broken) = &rows[1] else {
        panic!("unexpected row: {:?}", rows[1]);
    };
    assert_eq!(ok.cpu_percent, 5.0);
    assert_eq!(ok.mem_limit, 1024);
    assert_eq!(broken.name, "broken");
    assert_eq!(broken.cpu_percent, 0.0);
    assert_eq!(broken.mem_usage, 0);
    assert_eq!(broken.mem_limit, 0);
}

#[tokio::test(start_paused = true)]
async fn test_hung_runtime_abandons_collector_only() {
    let store = MemoryStore::new();
    let stale = Sample::Container(creo_probe::sample::ContainerSample {
        timestamp: ROUND - 30,
        container_id: "old".into(),
        name: "old".into(),
        image: "nginx".into(),
        state: "running".into(),
        uptime: "Up".into(),
        ip: String::new(),
        cpu_percent: 0.0,
        mem_percent: 0.0,
        mem_usage: 0,
        mem_limit: 0,
    });
    store.seed([stale.clone()]);
    let runtime = ScriptedRuntime {
        containers: vec![container("aaaaaaaaaaaa1111", "web", "nginx")],
        list_delay: Some(Duration::from_secs(120)),
        ..ScriptedRuntime::default()
    };
    let sampler = sampler(StaticProvider::default(), Some(runtime), &store);
    let report = sampler.run_round(ROUND).await;

    match report.outcome(Job::Collect(MetricClass::Container)) {
        Some(JobOutcome::Failed(msg)) => assert!(msg.contains("list_containers"), "{msg}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.failures(), 1);
    assert_eq!(store.rows(MetricClass::Container), vec![stale]);
    assert_eq!(store.rows(MetricClass::RuntimeVersion).len(), 1);
    assert_eq!(store.rows(MetricClass::Cpu).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_storage_failure_is_isolated() {
    let store = MemoryStore::new();
    store.fail_writes(MetricClass::Cpu);
    let sampler = sampler(StaticProvider::default(), None, &store);
    let report = sampler.run_round(ROUND).await;

    assert!(matches!(
        report.outcome(Job::Collect(MetricClass::Cpu)),
        Some(JobOutcome::Failed(_))
    ));
    assert!(matches!(
        report.outcome(Job::Collect(MetricClass::Memory)),
        Some(JobOutcome::Completed { rows: 1 })
    ));
    // the sweep cannot delete cpu rows either, but still handles the others
    assert!(matches!(
        report.outcome(Job::Sweep),
        Some(JobOutcome::Failed(_))
    ));
    assert_eq!(store.rows(MetricClass::Memory).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_round_sweeps_expired_rows() {
    let store = MemoryStore::new();
    store.seed([
        Sample::Cpu(CpuSample {
            timestamp: ROUND - 172_801,
            percent: 1.0,
        }),
        Sample::Cpu(CpuSample {
            timestamp: ROUND - 172_800,
            percent: 2.0,
        }),
    ]);
    let sampler = sampler(StaticProvider::default(), None, &store);
    sampler.run_round(ROUND).await;

    let timestamps: HashSet<u64> = store
        .rows(MetricClass::Cpu)
        .iter()
        .map(Sample::timestamp)
        .collect();
    assert_eq!(timestamps, HashSet::from([ROUND - 172_800, ROUND]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_rounds_never_interleave_replaces() {
    let store = MemoryStore::new();
    let sink = SlowInsertStore {
        inner: store.clone(),
        insert_delay: Duration::from_millis(200),
    };
    let runtime = ScriptedRuntime {
        containers: vec![
            container("aaaaaaaaaaaa1111", "web", "nginx:latest"),
            container("bbbbbbbbbbbb2222", "db", "postgres:16"),
        ],
        images: vec![image("sha256:1111111111111111", "nginx", "latest")],
        ..ScriptedRuntime::default()
    };
    let mut provider = StaticProvider::default();
    provider.disks.clear();
    let sampler = Sampler::new(provider, sink, Arc::new(CounterCache::new()), settings());
    let sampler = Arc::new(sampler.with_runtime(runtime));

    let rounds: Vec<_> = (0..4).map(|i| sampler.spawn_round(ROUND + i)).collect();
    let mut skipped = 0;
    for round in rounds {
        let report = round.await.unwrap();
        skipped += report
            .outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == JobOutcome::Skipped)
            .count();
    }
    assert!(skipped > 0, "rounds did not overlap");

    let ops = store.operations();
    for class in MetricClass::ALL {
        if class.kind() != ClassKind::CurrentState {
            continue;
        }
        let mut half_replaced = false;
        for op in ops.iter().filter(|op| op.class() == class) {
            match op {
                Operation::Delete {
                    filter: Filter::All,
                    ..
                } => {
                    assert!(!half_replaced, "replaces of {class} interleaved: {ops:?}");
                    half_replaced = true;
                }
                Operation::Create { .. } => half_replaced = false,
                Operation::Delete { .. } => {}
            }
        }

        let rows = store.rows(class);
        assert!(!rows.is_empty(), "{class} has no rows");
        let rounds: HashSet<u64> = rows.iter().map(Sample::timestamp).collect();
        assert_eq!(rounds.len(), 1, "{class} mixes rounds: {rows:?}");
    }
    assert_eq!(store.rows(MetricClass::Container).len(), 2);
}
