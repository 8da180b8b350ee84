use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::model::allocation::AllocationPolicy;

#[derive(Clone)]
pub struct Config {
    /// `None` runs the ledger on the in-memory store
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Days granted per year when an allocation is first created
    pub default_sick_days: u32,
    pub default_casual_days: u32,
    pub default_vacation_days: u32,

    /// Attempts per unit of work when the database reports a lock conflict
    pub ledger_max_retries: u32,
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,

            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            default_sick_days: parsed_or("LEAVE_DEFAULT_SICK", 15)?,
            default_casual_days: parsed_or("LEAVE_DEFAULT_CASUAL", 5)?,
            default_vacation_days: parsed_or("LEAVE_DEFAULT_VACATION", 10)?,

            ledger_max_retries: parsed_or("LEDGER_MAX_RETRIES", 3)?,
        })
    }

    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy::new(
            self.default_sick_days,
            self.default_casual_days,
            self.default_vacation_days,
        )
    }
}
