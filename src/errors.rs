use std::fmt::{self, Display, Formatter};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    EthPrice,
    BlockReward,
}

impl Display for Feed {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Feed::EthPrice => write!(f, "eth price"),
            Feed::BlockReward => write!(f, "block reward"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum RoiError {
    #[error("Failed to fetch {feed} feed: {reason}")]
    UpstreamFetch { feed: Feed, reason: String },

    #[error("Hardware cost is not a valid number: {0:?}")]
    InvalidCostInput(String),

    #[error("Unknown GPU identifier: {0}")]
    UnknownGpu(String),

    #[error("No GPU selected for this chat")]
    NoGpuSelected,

    #[error("ROI calculation produced a non-finite value")]
    NonFiniteResult,
}

impl RoiError {
    pub fn upstream(feed: Feed, reason: impl ToString) -> Self {
        RoiError::UpstreamFetch {
            feed,
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}
