use crate::{
    consts::REWARD_HOURS_PER_DAY,
    normalizer::{normalize, normalize_value},
};

/// Daily revenue in reward-token units for `hashpower` at the current
/// per-hash hourly `block_reward`.
///
/// Both the scaled reward and the final product are normalized; the
/// intermediate normalization changes the value the product is computed
/// from, so neither step may be dropped.
#[inline]
pub fn calculate_revenue(hashpower: f64, block_reward: f64) -> String {
    let reward_per_day = normalize_value(block_reward * REWARD_HOURS_PER_DAY);
    normalize(reward_per_day * hashpower)
}
