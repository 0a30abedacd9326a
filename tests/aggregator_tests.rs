// Aggregator tests against a real store: windows, no-data shape, per-target stats

mod common;

use common::{probe, resource, temp_repo};
use healthmon::aggregator::Aggregator;
use healthmon::models::now_ms;

const MINUTE: i64 = 60_000;

#[tokio::test]
async fn empty_store_yields_no_data_shape() {
    let (_dir, repo) = temp_repo().await;
    let agg = Aggregator::new(repo);

    let r = agg.compute_resource_stats(24).await;
    assert!(!r.has_data);
    assert_eq!(r.period_hours, 24);
    assert_eq!(r.cpu.avg, None);
    assert_eq!(r.memory.max, None);
    assert_eq!(r.disk.samples, 0);
    assert!(r.error.is_none());

    let p = agg.compute_probe_stats(24, None).await;
    assert!(p.targets.is_empty());

    let s = agg.compute_summary(24).await;
    assert_eq!(s.system.cpu_avg, None);
    assert_eq!(s.probes.targets_monitored, 0);
    assert_eq!(s.probes.overall_availability, None);
}

#[tokio::test]
async fn requested_target_without_samples_is_present_and_empty() {
    let (_dir, repo) = temp_repo().await;
    let agg = Aggregator::new(repo);
    let p = agg.compute_probe_stats(24, Some("10.9.9.9")).await;
    let t = &p.targets["10.9.9.9"];
    assert!(!t.has_data);
    assert_eq!(t.samples, 0);
    assert_eq!(t.availability_pct, None);
}

#[tokio::test]
async fn mixed_target_scenario() {
    let (_dir, repo) = temp_repo().await;
    let now = now_ms();
    repo.append_probe(&probe(now - 3 * MINUTE, "10.0.0.1", true, Some(10.0)))
        .await
        .unwrap();
    repo.append_probe(&probe(now - 2 * MINUTE, "10.0.0.1", true, Some(20.0)))
        .await
        .unwrap();
    repo.append_probe(&probe(now - MINUTE, "10.0.0.1", false, None))
        .await
        .unwrap();

    let agg = Aggregator::new(repo);
    let p = agg.compute_probe_stats(24, Some("10.0.0.1")).await;
    let a = &p.targets["10.0.0.1"];
    assert_eq!(a.availability_pct, Some(66.67));
    assert_eq!(a.avg_latency_ms, Some(15.0));
    assert_eq!(a.samples, 3);
    assert_eq!(a.name.as_deref(), Some("host-10.0.0.1"));
}

#[tokio::test]
async fn samples_outside_window_are_ignored() {
    let (_dir, repo) = temp_repo().await;
    let now = now_ms();
    repo.append_resource(&resource(now - 3 * 60 * MINUTE, 90.0, 90.0, 90.0))
        .await
        .unwrap();
    repo.append_resource(&resource(now - 10 * MINUTE, 10.0, 20.0, 30.0))
        .await
        .unwrap();

    let agg = Aggregator::new(repo);
    let last_hour = agg.compute_resource_stats(1).await;
    assert_eq!(last_hour.cpu.samples, 1);
    assert_eq!(last_hour.cpu.avg, Some(10.0));

    let day = agg.compute_resource_stats(24).await;
    assert_eq!(day.cpu.samples, 2);
    assert_eq!(day.cpu.avg, Some(50.0));
}

#[tokio::test]
async fn min_avg_max_are_ordered_and_availability_bounded() {
    let (_dir, repo) = temp_repo().await;
    let now = now_ms();
    let cpu = [3.3, 97.1, 42.0, 12.75, 150.0];
    for (i, c) in cpu.iter().enumerate() {
        let ts = now - (i as i64 + 1) * MINUTE;
        repo.append_resource(&resource(ts, *c, 100.0 - *c / 2.0, 55.5))
            .await
            .unwrap();
        repo.append_probe(&probe(ts, "10.0.0.2", i % 2 == 0, (i % 2 == 0).then_some(*c)))
            .await
            .unwrap();
    }

    let agg = Aggregator::new(repo);
    let r = agg.compute_resource_stats(24).await;
    for m in [&r.cpu, &r.memory, &r.disk] {
        let (min, avg, max) = (m.min.unwrap(), m.avg.unwrap(), m.max.unwrap());
        assert!(min <= avg && avg <= max, "{min} <= {avg} <= {max}");
    }
    // load-derived cpu is not clamped
    assert_eq!(r.cpu.max, Some(150.0));

    let p = agg.compute_probe_stats(24, None).await;
    let t = &p.targets["10.0.0.2"];
    let availability = t.availability_pct.unwrap();
    assert!((0.0..=100.0).contains(&availability));
    assert_eq!(availability, 60.0);
    assert!(t.min_latency_ms.unwrap() <= t.avg_latency_ms.unwrap());
    assert!(t.avg_latency_ms.unwrap() <= t.max_latency_ms.unwrap());
}

#[tokio::test]
async fn summary_averages_availability_across_targets() {
    let (_dir, repo) = temp_repo().await;
    let now = now_ms();
    repo.append_resource(&resource(now - MINUTE, 25.0, 50.0, 75.0))
        .await
        .unwrap();
    repo.append_probe(&probe(now - MINUTE, "10.0.0.1", true, Some(1.0)))
        .await
        .unwrap();
    repo.append_probe(&probe(now - MINUTE, "10.0.0.2", false, None))
        .await
        .unwrap();

    let s = Aggregator::new(repo).compute_summary(24).await;
    assert_eq!(s.system.cpu_avg, Some(25.0));
    assert_eq!(s.system.memory_avg, Some(50.0));
    assert_eq!(s.system.disk_avg, Some(75.0));
    assert_eq!(s.system.samples, 1);
    assert_eq!(s.probes.targets_monitored, 2);
    assert_eq!(s.probes.overall_availability, Some(50.0));
    assert!(s.generated_at >= now);
}
