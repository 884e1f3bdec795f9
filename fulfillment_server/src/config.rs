use std::{env, ops::RangeInclusive, str::FromStr, time::Duration};

use chrono::NaiveTime;
use fulfillment_common::{helpers::parse_boolean_flag, Secret};
use fulfillment_engine::{api::MAX_CONFIRMATION_TIMEOUT_MINUTES, FulfillmentPolicy};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

const DEFAULT_FMS_HOST: &str = "127.0.0.1";
const DEFAULT_FMS_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/fulfillment.db";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const MAX_WALLET_STALENESS_SECS: i64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub identity: IdentityConfig,
    /// Slot, confirmation and wallet rules handed to the engine APIs.
    pub policy: FulfillmentPolicy,
    /// How often the confirmation-timeout sweep runs.
    pub sweep_interval: Duration,
    /// How often the backstop assignment repair runs for today's date. `None` disables the worker.
    pub repair_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FMS_HOST.to_string(),
            port: DEFAULT_FMS_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            identity: IdentityConfig::default(),
            policy: FulfillmentPolicy::default(),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            repair_interval: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("FMS_HOST").ok().unwrap_or_else(|| DEFAULT_FMS_HOST.into());
        let port = env_or_default("FMS_PORT", DEFAULT_FMS_PORT);
        let database_url = env::var("FMS_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ FMS_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.into()
        });
        let identity = IdentityConfig::from_env_or_default();
        let policy = policy_from_env();
        let sweep_secs = env_or_default("FMS_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS).max(1);
        let repair_secs = env_or_default("FMS_REPAIR_INTERVAL_SECS", 0u64);
        let repair_interval = (repair_secs > 0).then(|| Duration::from_secs(repair_secs));
        if repair_interval.is_none() {
            info!("🪛️ The assignment repair worker is disabled. Set FMS_REPAIR_INTERVAL_SECS to enable it.");
        }
        Self {
            host,
            port,
            database_url,
            identity,
            policy,
            sweep_interval: Duration::from_secs(sweep_secs),
            repair_interval,
        }
    }
}

/// The engine rules from `FMS_PREORDER_THRESHOLD`, `FMS_CONFIRMATION_TIMEOUT_MINUTES` and
/// `FMS_WALLET_STALENESS_SECS`. Shared with the operator tools so that both apply the same rules.
pub fn policy_from_env() -> FulfillmentPolicy {
    let defaults = FulfillmentPolicy::default();
    let preorder_threshold = env::var("FMS_PREORDER_THRESHOLD")
        .ok()
        .and_then(|s| {
            NaiveTime::parse_from_str(s.trim(), "%H:%M")
                .map_err(|e| warn!("🪛️ {s} is not a valid time for FMS_PREORDER_THRESHOLD. {e}"))
                .ok()
        })
        .unwrap_or(defaults.preorder_threshold);
    let confirmation_timeout_minutes = env_in_range(
        "FMS_CONFIRMATION_TIMEOUT_MINUTES",
        1..=MAX_CONFIRMATION_TIMEOUT_MINUTES,
        defaults.confirmation_timeout_minutes,
    );
    let wallet_staleness_secs =
        env_in_range("FMS_WALLET_STALENESS_SECS", 0..=MAX_WALLET_STALENESS_SECS, defaults.wallet_staleness_secs);
    FulfillmentPolicy { preorder_threshold, confirmation_timeout_minutes, wallet_staleness_secs }
}

/// Reads and parses `name`, falling back to `default` (with a warning) if the value is not valid.
fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

/// Like [`env_or_default`], but values outside `range` are also replaced by `default`.
fn env_in_range(name: &str, range: RangeInclusive<i64>, default: i64) -> i64 {
    let value = env_or_default(name, default);
    if range.contains(&value) {
        value
    } else {
        warn!(
            "🪛️ {name} must be between {} and {}. Using the default, {default}, instead.",
            range.start(),
            range.end()
        );
        default
    }
}

//-------------------------------------------------  IdentityConfig  ---------------------------------------------------
/// The key shared with the identity provider that signs the `X-Actor-*` headers.
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub secret: Secret<String>,
    /// When false, signatures are not checked at all. For development only.
    pub checks_enabled: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The identity secret has not been set. I'm using a random value for this session. No identity \
             provider will be able to sign requests for this server. 🚨️🚨️🚨️"
        );
        let key = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { secret: Secret::new(key), checks_enabled: true }
    }
}

impl IdentityConfig {
    pub fn new(secret: &str) -> Self {
        Self { secret: Secret::new(secret.to_string()), checks_enabled: true }
    }

    pub fn from_env_or_default() -> Self {
        let checks_enabled = parse_boolean_flag(env::var("FMS_IDENTITY_CHECKS").ok(), true);
        if !checks_enabled {
            warn!("🚨️ Identity signature checks are DISABLED. Any caller can claim any role. Never do this in production.");
        }
        match env::var("FMS_IDENTITY_SECRET") {
            Ok(s) if !s.trim().is_empty() => Self { secret: Secret::new(s), checks_enabled },
            _ => Self { checks_enabled, ..Self::default() },
        }
    }
}
