use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::domain::{Decimal, RankTable};

/// Server configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub plan: CompPlan,
}

/// Compensation plan snapshot injected into every engine operation.
///
/// Engine code never reads ambient settings; tests construct fixed plans
/// and an admin layer may swap the snapshot between requests.
#[derive(Debug, Clone)]
pub struct CompPlan {
    /// PV applied when a member is placed into the tree.
    pub registration_volume_units: i64,
    /// CV carried alongside the registration, for bonus math and notes.
    pub registration_monetary_value: Decimal,
    /// Fraction of registration CV paid one hop to the sponsor.
    pub referral_bonus_rate: Decimal,
    /// Fraction of matched short-leg volume paid as cash.
    pub matching_rate: Decimal,
    /// Generation number -> override rate. Sparse: the first missing
    /// generation terminates upward payout.
    pub generation_rates: BTreeMap<u32, Decimal>,
    /// Hard cap on generation hops regardless of configured rates.
    pub max_generation_depth: u32,
    /// Upline walk guard: exceeding it is a data-integrity fault.
    pub max_propagation_hops: u32,
    pub rank_table: RankTable,
}

impl CompPlan {
    /// The plan the system ships with.
    pub fn standard() -> Self {
        let mut generation_rates = BTreeMap::new();
        generation_rates.insert(1, dec_const(10, 2)); // 0.10
        generation_rates.insert(2, dec_const(8, 2)); // 0.08
        generation_rates.insert(3, dec_const(5, 2)); // 0.05
        generation_rates.insert(4, dec_const(3, 2)); // 0.03
        generation_rates.insert(5, dec_const(2, 2)); // 0.02

        CompPlan {
            registration_volume_units: 100,
            registration_monetary_value: Decimal::from(50),
            referral_bonus_rate: dec_const(40, 2), // 0.40
            matching_rate: dec_const(13, 2),       // 0.13
            generation_rates,
            max_generation_depth: 10,
            max_propagation_hops: 500,
            rank_table: RankTable::standard(),
        }
    }
}

fn dec_const(mantissa: i64, scale: u32) -> Decimal {
    Decimal::new(rust_decimal::Decimal::new(mantissa, scale))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let mut plan = CompPlan::standard();

        if let Some(rate) = env_map.get("MATCHING_RATE") {
            plan.matching_rate = parse_rate("MATCHING_RATE", rate)?;
        }
        if let Some(rate) = env_map.get("REFERRAL_BONUS_RATE") {
            plan.referral_bonus_rate = parse_rate("REFERRAL_BONUS_RATE", rate)?;
        }
        if let Some(units) = env_map.get("REGISTRATION_VOLUME_UNITS") {
            plan.registration_volume_units = units.parse::<i64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "REGISTRATION_VOLUME_UNITS".to_string(),
                    "must be a valid i64".to_string(),
                )
            })?;
        }
        if let Some(hops) = env_map.get("MAX_PROPAGATION_HOPS") {
            plan.max_propagation_hops = hops.parse::<u32>().map_err(|_| {
                ConfigError::InvalidValue(
                    "MAX_PROPAGATION_HOPS".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?;
        }

        Ok(Config {
            port,
            database_path,
            plan,
        })
    }
}

fn parse_rate(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str_canonical(value).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), "must be a valid decimal".to_string())
    })
}
