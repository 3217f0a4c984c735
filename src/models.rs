use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{GpuId, GpuSpec};
use crate::consts::MONEY_DECIMALS;
use crate::errors::RoiError;
use crate::utils::{format_fixed, lenient_f64, parse_numeric};

#[derive(Debug, Deserialize, Clone)]
pub struct EthPriceResult {
    #[serde(deserialize_with = "lenient_f64")]
    pub ethusd: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EthPriceResponse {
    pub result: EthPriceResult,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlockRewardEntry {
    #[serde(deserialize_with = "lenient_f64")]
    pub reward: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub eth_usd_rate: f64,
    pub block_reward: f64,
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(eth_usd_rate: f64, block_reward: f64) -> Self {
        MarketSnapshot {
            eth_usd_rate,
            block_reward,
            fetched_at: Utc::now(),
        }
    }

    pub fn is_usable(&self) -> bool {
        is_positive_finite(self.eth_usd_rate) && is_positive_finite(self.block_reward)
    }

    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => now - self.fetched_at > max_age,
            Err(_) => false,
        }
    }
}

#[inline]
pub fn is_positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoiRequest {
    pub gpu: GpuSpec,
    pub hardware_cost_usd: f64,
    // as typed by the user, echoed back in the reply
    pub hardware_cost_text: String,
}

impl RoiRequest {
    pub fn parse(gpu: GpuSpec, cost_text: &str) -> Result<Self, RoiError> {
        match parse_numeric(cost_text) {
            Some(cost) if cost >= 0.0 => Ok(RoiRequest {
                gpu,
                hardware_cost_usd: cost,
                hardware_cost_text: cost_text.trim().to_string(),
            }),
            _ => Err(RoiError::InvalidCostInput(cost_text.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiResult {
    pub daily_revenue_usd: f64,
    pub monthly_revenue_usd: f64,
    pub roi_months: f64,
}

/// Presentation fields handed to the chat layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiReport {
    pub gpu_id: GpuId,
    pub display_hash_rate: String,
    pub watts: u32,
    pub cost: String,
    pub daily_revenue_usd: String,
    pub monthly_revenue_usd: String,
    pub roi_months: String,
}

impl RoiReport {
    pub fn new(request: &RoiRequest, result: &RoiResult) -> Self {
        RoiReport {
            gpu_id: request.gpu.id.clone(),
            display_hash_rate: request.gpu.display_hash_rate.clone(),
            watts: request.gpu.watts,
            cost: request.hardware_cost_text.clone(),
            daily_revenue_usd: format_fixed(result.daily_revenue_usd, MONEY_DECIMALS),
            monthly_revenue_usd: format_fixed(result.monthly_revenue_usd, MONEY_DECIMALS),
            roi_months: format_fixed(result.roi_months, MONEY_DECIMALS),
        }
    }
}
