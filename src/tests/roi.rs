use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::{
    catalog::{get_gpu, GpuSpec},
    errors::{Feed, RoiError},
    market_data::MockMarketDataSource,
    models::{MarketSnapshot, RoiReport, RoiRequest},
    roi::{compute_roi, RoiOrchestrator},
    sessions::{RoiStage, Session},
    stats::{Stats, StatsKind},
    utils::format_fixed,
};

const MAX_AGE: Duration = Duration::from_secs(300);

fn reference_gpu() -> GpuSpec {
    GpuSpec {
        id: "REF120".to_string(),
        hash_rate: 120.0,
        watts: 100,
        display_hash_rate: "120".to_string(),
    }
}

fn mocked_source(eth_usd_rate: f64, block_reward: f64, times: usize) -> MockMarketDataSource {
    let mut source = MockMarketDataSource::new();
    source
        .expect_fetch_eth_usd_rate()
        .times(times)
        .returning(move || Ok(eth_usd_rate));
    source
        .expect_fetch_block_reward()
        .times(times)
        .returning(move || Ok(block_reward));
    source
}

fn orchestrator(source: MockMarketDataSource) -> (RoiOrchestrator, Arc<Mutex<Stats>>) {
    let stats = Arc::new(Mutex::new(Stats::new()));
    (
        RoiOrchestrator::new(Arc::new(source), stats.clone(), MAX_AGE),
        stats,
    )
}

fn awaiting_cost(gpu_id: &str, snapshot: MarketSnapshot) -> Session {
    Session {
        stage: RoiStage::AwaitingCostInput {
            gpu_id: gpu_id.to_string(),
            snapshot,
        },
        ..Session::default()
    }
}

#[test]
fn test_compute_roi_reference_numbers() {
    let snapshot = MarketSnapshot::new(2000.0, 0.01);
    let request = RoiRequest::parse(reference_gpu(), "3000").unwrap();

    let result = compute_roi(&snapshot, &request).unwrap();

    assert!((result.daily_revenue_usd - 57600.0).abs() < 1e-6);
    assert!((result.monthly_revenue_usd - 1_728_000.0).abs() < 1e-6);
    assert_eq!(result.roi_months, 0.0);

    let report = RoiReport::new(&request, &result);
    assert_eq!(report.daily_revenue_usd, "57600.00");
    assert_eq!(report.monthly_revenue_usd, "1728000.00");
    assert_eq!(report.roi_months, "0.00");
    assert_eq!(report.cost, "3000");
}

#[test]
fn test_compute_roi_fractional_months() {
    let snapshot = MarketSnapshot::new(2000.0, 1.2e-11);
    let gpu = get_gpu("RTX3090").unwrap().clone();
    let request = RoiRequest::parse(gpu, "1500").unwrap();

    let result = compute_roi(&snapshot, &request).unwrap();

    assert_eq!(format_fixed(result.daily_revenue_usd, 2), "69.12");
    assert_eq!(format_fixed(result.monthly_revenue_usd, 2), "2073.60");
    assert_eq!(result.roi_months, 0.72);
}

#[test]
fn test_compute_roi_is_idempotent() {
    let snapshot = MarketSnapshot::new(1834.27, 1.37e-11);
    let gpu = get_gpu("RX6800XT").unwrap().clone();
    let request = RoiRequest::parse(gpu, "579.99").unwrap();

    assert_eq!(
        compute_roi(&snapshot, &request),
        compute_roi(&snapshot, &request)
    );
}

#[test]
fn test_compute_roi_refuses_non_finite() {
    let snapshot = MarketSnapshot::new(2000.0, 0.01);
    let mut gpu = reference_gpu();
    gpu.hash_rate = 0.0;
    let request = RoiRequest::parse(gpu, "3000").unwrap();

    assert_eq!(
        compute_roi(&snapshot, &request),
        Err(RoiError::NonFiniteResult)
    );
}

#[tokio::test]
async fn test_full_flow() {
    let (orchestrator, stats) = orchestrator(mocked_source(2500.0, 1.2e-11, 1));
    let mut session = Session::default();

    let gpu = orchestrator.select_gpu(&mut session, "RTX3090").await.unwrap();
    assert_eq!(gpu.id, "RTX3090");
    match &session.stage {
        RoiStage::AwaitingCostInput { gpu_id, snapshot } => {
            assert_eq!(gpu_id, "RTX3090");
            assert_eq!(snapshot.eth_usd_rate, 2500.0);
            assert_eq!(snapshot.block_reward, 1.2e-11);
        }
        stage => panic!("unexpected stage {:?}", stage),
    }

    let report = orchestrator.submit_cost(&mut session, "1500").await.unwrap();
    assert_eq!(
        report,
        RoiReport {
            gpu_id: "RTX3090".to_string(),
            display_hash_rate: "120 MH/s".to_string(),
            watts: 290,
            cost: "1500".to_string(),
            daily_revenue_usd: "86.40".to_string(),
            monthly_revenue_usd: "2592.00".to_string(),
            roi_months: "0.58".to_string(),
        }
    );
    assert_eq!(session.stage, RoiStage::AwaitingGpuSelection);

    let stats_locked = stats.lock().await;
    assert_eq!(stats_locked.records(StatsKind::EthPriceFetch), 1);
    assert_eq!(stats_locked.records(StatsKind::BlockRewardFetch), 1);
    assert_eq!(stats_locked.records(StatsKind::RoiCalculation), 1);
}

#[tokio::test]
async fn test_unknown_gpu_fetches_nothing() {
    let (orchestrator, _) = orchestrator(mocked_source(2000.0, 0.01, 0));
    let mut session = Session::default();

    assert_eq!(
        orchestrator.select_gpu(&mut session, "GTX1080").await,
        Err(RoiError::UnknownGpu("GTX1080".to_string()))
    );
    assert_eq!(session.stage, RoiStage::AwaitingGpuSelection);
}

#[tokio::test]
async fn test_failed_fetch_keeps_waiting_for_selection() {
    let mut source = MockMarketDataSource::new();
    source
        .expect_fetch_eth_usd_rate()
        .times(1)
        .returning(|| Err(RoiError::upstream(Feed::EthPrice, "connection refused")));
    source
        .expect_fetch_block_reward()
        .times(1)
        .returning(|| Ok(1.2e-11));
    let (orchestrator, stats) = orchestrator(source);
    let mut session = Session::default();

    let err = orchestrator
        .select_gpu(&mut session, "RTX3080")
        .await
        .unwrap_err();

    // both fetches ran to completion and were timed
    let stats_locked = stats.lock().await;
    assert_eq!(stats_locked.records(StatsKind::EthPriceFetch), 1);
    assert_eq!(stats_locked.records(StatsKind::BlockRewardFetch), 1);
    drop(stats_locked);

    assert!(matches!(
        err,
        RoiError::UpstreamFetch {
            feed: Feed::EthPrice,
            ..
        }
    ));
    assert_eq!(session.stage, RoiStage::AwaitingGpuSelection);
}

#[tokio::test]
async fn test_non_positive_feed_value_is_rejected() {
    let (orchestrator, _) = orchestrator(mocked_source(2000.0, 0.0, 1));
    let mut session = Session::default();

    let err = orchestrator
        .select_gpu(&mut session, "RTX3080")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RoiError::UpstreamFetch {
            feed: Feed::BlockReward,
            ..
        }
    ));
}

#[tokio::test]
async fn test_invalid_cost_keeps_selection_and_snapshot() {
    let (orchestrator, stats) = orchestrator(mocked_source(2000.0, 0.01, 0));
    let snapshot = MarketSnapshot::new(2000.0, 1.2e-11);
    let mut session = awaiting_cost("RTX3090", snapshot.clone());

    assert_eq!(
        orchestrator.submit_cost(&mut session, "abc").await,
        Err(RoiError::InvalidCostInput("abc".to_string()))
    );
    assert_eq!(session, awaiting_cost("RTX3090", snapshot));
    assert_eq!(stats.lock().await.records(StatsKind::RoiCalculation), 0);

    // retry with the same selection
    let report = orchestrator.submit_cost(&mut session, "1500").await.unwrap();
    assert_eq!(report.roi_months, "0.72");
}

#[tokio::test]
async fn test_cost_without_selection() {
    let (orchestrator, _) = orchestrator(mocked_source(2000.0, 0.01, 0));
    let mut session = Session::default();

    assert_eq!(
        orchestrator.submit_cost(&mut session, "1500").await,
        Err(RoiError::NoGpuSelected)
    );
}

#[tokio::test]
async fn test_stale_snapshot_is_refreshed() {
    let (orchestrator, _) = orchestrator(mocked_source(2500.0, 1.2e-11, 1));
    let mut snapshot = MarketSnapshot::new(2000.0, 1.2e-11);
    snapshot.fetched_at = snapshot.fetched_at - chrono::Duration::seconds(301);
    let mut session = awaiting_cost("RTX3090", snapshot);

    let report = orchestrator.submit_cost(&mut session, "1500").await.unwrap();

    // priced with the refreshed 2500 rate, not the stale 2000 one
    assert_eq!(report.daily_revenue_usd, "86.40");
    assert_eq!(session.stage, RoiStage::AwaitingGpuSelection);
}

#[tokio::test]
async fn test_stale_snapshot_refresh_failure_keeps_selection() {
    let mut source = MockMarketDataSource::new();
    source
        .expect_fetch_eth_usd_rate()
        .returning(|| Ok(2000.0));
    source
        .expect_fetch_block_reward()
        .returning(|| Err(RoiError::upstream(Feed::BlockReward, "timeout")));
    let (orchestrator, _) = orchestrator(source);
    let mut snapshot = MarketSnapshot::new(2000.0, 1.2e-11);
    snapshot.fetched_at = snapshot.fetched_at - chrono::Duration::seconds(600);
    let mut session = awaiting_cost("RTX3090", snapshot.clone());

    assert!(orchestrator.submit_cost(&mut session, "1500").await.is_err());
    assert_eq!(session, awaiting_cost("RTX3090", snapshot));
}

#[tokio::test]
async fn test_sessions_do_not_share_state() {
    let (orchestrator, _) = orchestrator(mocked_source(2000.0, 1.2e-11, 2));
    let mut first = Session::default();
    let mut second = Session::default();

    orchestrator.select_gpu(&mut first, "RTX3090").await.unwrap();
    orchestrator.select_gpu(&mut second, "RX580").await.unwrap();

    let first_report = orchestrator.submit_cost(&mut first, "1500").await.unwrap();
    let second_report = orchestrator.submit_cost(&mut second, "200").await.unwrap();

    assert_eq!(first_report.gpu_id, "RTX3090");
    assert_eq!(second_report.gpu_id, "RX580");
    assert_eq!(second_report.display_hash_rate, "30 MH/s");
}
