use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    catalog::{get_gpu, GpuSpec},
    consts::{DAYS_PER_MONTH, MONEY_DECIMALS},
    errors::RoiError,
    market_data::{fetch_snapshot, MarketDataSource},
    models::{MarketSnapshot, RoiReport, RoiRequest, RoiResult},
    normalizer::normalize_value,
    revenue::calculate_revenue,
    sessions::{RoiStage, Session},
    stats::{Stats, StatsKind},
    utils::round_half_up,
};

/// Pure part of the flow: revenue in USD per day and month, and the months
/// the hardware cost needs to be paid back.
pub fn compute_roi(snapshot: &MarketSnapshot, request: &RoiRequest) -> Result<RoiResult, RoiError> {
    let daily_tokens: f64 = calculate_revenue(request.gpu.hash_rate, snapshot.block_reward)
        .parse()
        .map_err(|_| RoiError::NonFiniteResult)?;

    let daily_revenue_usd = daily_tokens * snapshot.eth_usd_rate;
    let monthly_revenue_usd = normalize_value(daily_revenue_usd) * DAYS_PER_MONTH;
    let roi_months = request.hardware_cost_usd / monthly_revenue_usd;

    if !(daily_revenue_usd.is_finite() && monthly_revenue_usd.is_finite() && roi_months.is_finite())
    {
        return Err(RoiError::NonFiniteResult);
    }

    Ok(RoiResult {
        daily_revenue_usd,
        monthly_revenue_usd,
        roi_months: round_half_up(roi_months, MONEY_DECIMALS),
    })
}

/// Drives one chat session through GPU selection and cost input. Holds no
/// per-chat data itself: everything in flight lives in the `Session`.
pub struct RoiOrchestrator {
    source: Arc<dyn MarketDataSource>,
    stats: Arc<Mutex<Stats>>,
    snapshot_max_age: Duration,
}

impl RoiOrchestrator {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        stats: Arc<Mutex<Stats>>,
        snapshot_max_age: Duration,
    ) -> Self {
        RoiOrchestrator {
            source,
            stats,
            snapshot_max_age,
        }
    }

    /// AwaitingGpuSelection -> AwaitingCostInput. A failed fetch leaves the
    /// session waiting for a selection.
    pub async fn select_gpu(
        &self,
        session: &mut Session,
        gpu_id: &str,
    ) -> Result<&'static GpuSpec, RoiError> {
        let gpu = get_gpu(gpu_id)?;

        let snapshot = match fetch_snapshot(self.source.as_ref(), &self.stats).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                session.stage = RoiStage::AwaitingGpuSelection;
                return Err(err);
            }
        };

        info!(
            "GPU {} selected | eth ${} | reward {}",
            gpu.id, snapshot.eth_usd_rate, snapshot.block_reward
        );
        session.stage = RoiStage::AwaitingCostInput {
            gpu_id: gpu.id.clone(),
            snapshot,
        };

        Ok(gpu)
    }

    /// Validates the cost text and computes the ROI.
    ///
    /// Non-numeric input keeps the selected GPU and its snapshot so the user
    /// can simply send the cost again. A snapshot older than the configured
    /// age is re-fetched first. A computed (or non-finite) result ends the
    /// flow and the session goes back to waiting for a selection.
    pub async fn submit_cost(
        &self,
        session: &mut Session,
        cost_text: &str,
    ) -> Result<RoiReport, RoiError> {
        let (gpu_id, snapshot) = match &session.stage {
            RoiStage::AwaitingGpuSelection => return Err(RoiError::NoGpuSelected),
            RoiStage::AwaitingCostInput { gpu_id, snapshot } => (gpu_id.clone(), snapshot.clone()),
        };

        let gpu = match get_gpu(&gpu_id) {
            Ok(gpu) => gpu,
            Err(err) => {
                // Catalog changed since the session was saved
                session.stage = RoiStage::AwaitingGpuSelection;
                return Err(err);
            }
        };

        let request = match RoiRequest::parse(gpu.clone(), cost_text) {
            Ok(request) => request,
            Err(err) => {
                debug!("Rejected cost input {:?} for {}", cost_text, gpu_id);
                return Err(err);
            }
        };

        let snapshot = if !snapshot.is_usable() || snapshot.is_stale(self.snapshot_max_age, Utc::now())
        {
            warn!(
                "Snapshot for {} fetched at {} is stale, refreshing",
                gpu_id, snapshot.fetched_at
            );
            let fresh = fetch_snapshot(self.source.as_ref(), &self.stats).await?;
            session.stage = RoiStage::AwaitingCostInput {
                gpu_id: gpu_id.clone(),
                snapshot: fresh.clone(),
            };
            fresh
        } else {
            snapshot
        };

        let _start = Instant::now();
        let result = compute_roi(&snapshot, &request);
        let _duration = _start.elapsed();
        self.stats
            .lock()
            .await
            .register_duration(StatsKind::RoiCalculation, _duration);

        session.stage = RoiStage::AwaitingGpuSelection;

        let result = result?;
        info!(
            "ROI for {} at ${}: {} months (daily ${:.2})",
            gpu_id, request.hardware_cost_usd, result.roi_months, result.daily_revenue_usd
        );

        Ok(RoiReport::new(&request, &result))
    }
}
