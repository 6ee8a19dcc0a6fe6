//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use rust_decimal::Decimal;

use stockroom_infra::RetryPolicy;
use stockroom_invoicing::LateFeePolicy;
use stockroom_inventory::RECENT_MOVEMENTS_LIMIT;
use stockroom_sales::CommissionRates;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// When set, the Postgres store is used; otherwise an in-memory store seeded with the default catalog.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub store_retry: RetryPolicy,
    pub commission_rates: CommissionRates,
    pub late_fees: LateFeePolicy,
    pub recent_movements_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            database_max_connections: 10,
            store_retry: RetryPolicy::default(),
            commission_rates: CommissionRates::default(),
            late_fees: LateFeePolicy::default(),
            recent_movements_limit: RECENT_MOVEMENTS_LIMIT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let bind_addr = parse_or(&get, "BIND_ADDR", defaults.bind_addr)?;
        let database_url = get("DATABASE_URL");
        let database_max_connections =
            parse_or(&get, "DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?;
        if database_max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }

        let retry_attempts = parse_or(&get, "STORE_RETRY_ATTEMPTS", defaults.store_retry.max_attempts)?;
        let retry_base_ms = parse_or(
            &get,
            "STORE_RETRY_BASE_DELAY_MS",
            defaults.store_retry.base_delay.as_millis() as u64,
        )?;
        let store_retry = RetryPolicy::exponential(
            retry_attempts,
            Duration::from_millis(retry_base_ms),
            defaults.store_retry.max_delay,
        );

        let rate_low = parse_or(&get, "COMMISSION_RATE_LOW", defaults.commission_rates.low)?;
        let rate_high = parse_or(&get, "COMMISSION_RATE_HIGH", defaults.commission_rates.high)?;
        let commission_rates =
            CommissionRates::new(rate_low, rate_high).context("invalid commission rates")?;

        let daily_rate: Decimal = parse_or(&get, "FEES_DAILY_RATE", defaults.late_fees.daily_rate)?;
        let utc_offset_hours = parse_or(
            &get,
            "FEES_UTC_OFFSET_HOURS",
            defaults.late_fees.utc_offset_hours,
        )?;
        let late_fees =
            LateFeePolicy::new(daily_rate, utc_offset_hours).context("invalid late fee policy")?;

        let recent_movements_limit =
            parse_or(&get, "RECENT_MOVEMENTS_LIMIT", defaults.recent_movements_limit)?;
        if recent_movements_limit == 0 {
            bail!("RECENT_MOVEMENTS_LIMIT must be at least 1");
        }

        Ok(Self {
            bind_addr,
            database_url,
            database_max_connections,
            store_retry,
            commission_rates,
            late_fees,
            recent_movements_limit,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {key} ('{raw}'): {e}")),
    }
}
