use std::time::Duration;

// Upstream reward is an hourly-equivalent figure per hash unit.
pub const REWARD_HOURS_PER_DAY: f64 = 24.0;

// Days->month, not calendar-accurate.
pub const DAYS_PER_MONTH: f64 = 30.0;

// Fraction digits used when a number would otherwise be printed in exponential form.
pub const NORMALIZE_SCALE: usize = 24;

// The default number-to-string form switches to exponents outside [1e-6, 1e21).
pub const EXPONENTIAL_LOWER_BOUND: f64 = 1e-6;
pub const EXPONENTIAL_UPPER_BOUND: f64 = 1e21;

pub const MONEY_DECIMALS: usize = 2;

pub const DEFAULT_ETH_PRICE_URL: &str = "https://api.etherscan.io/api?module=stats&action=ethprice";
pub const DEFAULT_BLOCK_REWARD_URL: &str = "https://api.minerstat.com/v2/coins?list=ETH";
pub const DEFAULT_SESSION_DB_PATH: &str = "session_db.json";

// Snapshot older than this is re-fetched before the ROI is computed.
pub const DEFAULT_SNAPSHOT_MAX_AGE: Duration = Duration::from_secs(300);

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const HTTP_USER_AGENT: &str = concat!("gpu_roi_bot/", env!("CARGO_PKG_VERSION"));

// Sessions are small, dumping them once per minute is enough
// to lose at most one minute of language/GPU choices on a crash.
pub const SESSION_SAVE_INTERVAL: Duration = Duration::from_secs(60);
