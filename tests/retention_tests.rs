// RetentionManager tests: horizon, boundary, idempotence

mod common;

use common::{probe, resource, temp_repo};
use healthmon::models::now_ms;
use healthmon::retention::RetentionManager;

const DAY: i64 = 24 * 60 * 60 * 1000;

#[tokio::test]
async fn purge_removes_only_samples_past_horizon() {
    let (_dir, repo) = temp_repo().await;
    let now = now_ms();
    for age_days in [10, 8, 6, 1] {
        let ts = now - age_days * DAY;
        repo.append_resource(&resource(ts, 1.0, 1.0, 1.0))
            .await
            .unwrap();
        repo.append_probe(&probe(ts, "10.0.0.1", true, Some(1.0)))
            .await
            .unwrap();
    }

    let retention = RetentionManager::new(repo.clone(), 7);
    let counts = retention.purge_default().await.unwrap();
    assert_eq!(counts.resource_samples, 2);
    assert_eq!(counts.probe_samples, 2);

    let again = retention.purge_default().await.unwrap();
    assert_eq!(again.total(), 0);
    assert_eq!(repo.query_resources_since(0).await.unwrap().len(), 2);

    // a shorter on-demand horizon goes further
    let counts = retention.purge(2).await.unwrap();
    assert_eq!(counts.total(), 2);
    assert_eq!(repo.query_probes_since(0, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn purge_before_keeps_cutoff_sample() {
    let (_dir, repo) = temp_repo().await;
    for ts in [4_999, 5_000] {
        repo.append_probe(&probe(ts, "10.0.0.1", false, None))
            .await
            .unwrap();
    }
    let retention = RetentionManager::new(repo.clone(), 7);
    let counts = retention.purge_before(5_000).await.unwrap();
    assert_eq!(counts.probe_samples, 1);
    let left = repo.query_probes_since(0, None).await.unwrap();
    assert_eq!(left[0].timestamp, 5_000);
}

#[tokio::test]
async fn zero_day_horizon_is_rejected() {
    let (_dir, repo) = temp_repo().await;
    let retention = RetentionManager::new(repo, 7);
    let err = retention.purge(0).await.unwrap_err();
    assert!(err.to_string().contains("max_age_days"));
}
