use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    consts::HTTP_USER_AGENT,
    errors::{Feed, RoiError},
    models::{is_positive_finite, BlockRewardEntry, EthPriceResponse, MarketSnapshot},
    settings::Settings,
    stats::{Stats, StatsKind},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_eth_usd_rate(&self) -> Result<f64, RoiError>;
    async fn fetch_block_reward(&self) -> Result<f64, RoiError>;
}

pub struct HttpMarketData {
    client: Client,
    eth_price_url: String,
    block_reward_url: String,
    etherscan_api_key: Option<String>,
}

impl HttpMarketData {
    pub fn from_settings(settings: &Settings) -> Result<HttpMarketData, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.http_timeout)
            .user_agent(HTTP_USER_AGENT)
            .build()?;

        Ok(HttpMarketData {
            client,
            eth_price_url: settings.eth_price_url.clone(),
            block_reward_url: settings.block_reward_url.clone(),
            etherscan_api_key: settings.etherscan_api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        feed: Feed,
        request: RequestBuilder,
    ) -> Result<T, RoiError> {
        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| RoiError::upstream(feed, err))?;

        response
            .json::<T>()
            .await
            .map_err(|err| RoiError::upstream(feed, err))
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketData {
    async fn fetch_eth_usd_rate(&self) -> Result<f64, RoiError> {
        let mut request = self.client.get(&self.eth_price_url);
        if let Some(api_key) = &self.etherscan_api_key {
            request = request.query(&[("apikey", api_key)]);
        }

        let response: EthPriceResponse = Self::get_json(Feed::EthPrice, request).await?;
        Ok(response.result.ethusd)
    }

    async fn fetch_block_reward(&self) -> Result<f64, RoiError> {
        let request = self.client.get(&self.block_reward_url);
        let entries: Vec<BlockRewardEntry> = Self::get_json(Feed::BlockReward, request).await?;

        match entries.first() {
            Some(entry) => Ok(entry.reward),
            None => Err(RoiError::upstream(Feed::BlockReward, "empty response")),
        }
    }
}

fn checked_feed_value(feed: Feed, value: f64) -> Result<f64, RoiError> {
    if is_positive_finite(value) {
        Ok(value)
    } else {
        Err(RoiError::upstream(
            feed,
            format!("expected a positive number, got {}", value),
        ))
    }
}

async fn timed<F, T>(fut: F) -> (T, Duration)
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let output = fut.await;
    (output, start.elapsed())
}

/// Fetches both feeds concurrently and waits for both before building the snapshot.
pub async fn fetch_snapshot(
    source: &dyn MarketDataSource,
    stats: &Mutex<Stats>,
) -> Result<MarketSnapshot, RoiError> {
    let ((eth_usd_rate, eth_duration), (block_reward, reward_duration)) = tokio::join!(
        timed(source.fetch_eth_usd_rate()),
        timed(source.fetch_block_reward())
    );

    {
        let mut stats_locked = stats.lock().await;
        stats_locked.register_duration(StatsKind::EthPriceFetch, eth_duration);
        stats_locked.register_duration(StatsKind::BlockRewardFetch, reward_duration);
    }

    let checked = eth_usd_rate
        .and_then(|rate| checked_feed_value(Feed::EthPrice, rate))
        .and_then(|rate| {
            block_reward
                .and_then(|reward| checked_feed_value(Feed::BlockReward, reward))
                .map(|reward| MarketSnapshot::new(rate, reward))
        });

    let snapshot = match checked {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!("Market snapshot fetch failed: {}", err);
            return Err(err);
        }
    };

    debug!(
        "Fetched market snapshot: eth ${} | reward {} in {:?}/{:?}",
        snapshot.eth_usd_rate, snapshot.block_reward, eth_duration, reward_duration
    );

    Ok(snapshot)
}
