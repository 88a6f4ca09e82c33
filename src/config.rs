use crate::{FactsheetError, Result, SchemaProfile};
use std::net::SocketAddr;
use std::str::FromStr;

pub const BIND_ADDR_VAR: &str = "FACTSHEET_BIND_ADDR";
pub const MAX_UPLOAD_BYTES_VAR: &str = "FACTSHEET_MAX_UPLOAD_BYTES";
pub const PROFILE_VAR: &str = "FACTSHEET_PROFILE";
pub const MAX_BATCHES_VAR: &str = "FACTSHEET_MAX_BATCHES";
pub const BATCH_TTL_SECS_VAR: &str = "FACTSHEET_BATCH_TTL_SECS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_MAX_BATCHES: usize = 100;
const DEFAULT_BATCH_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
    pub default_profile: SchemaProfile,
    // Batches kept in memory for download; the oldest goes first.
    pub max_batches: usize,
    pub batch_ttl_secs: u64,
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| FactsheetError::Configuration(format!("{}: {}", var, e))),
        None => Ok(default),
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup(BIND_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| FactsheetError::Configuration(format!("{}: {}", BIND_ADDR_VAR, e)))?;

        let max_upload_bytes = parse_var(&lookup, MAX_UPLOAD_BYTES_VAR, DEFAULT_MAX_UPLOAD_BYTES)?;

        let default_profile = match lookup(PROFILE_VAR) {
            Some(raw) => raw.parse()?,
            None => SchemaProfile::Standard,
        };

        let max_batches = parse_var(&lookup, MAX_BATCHES_VAR, DEFAULT_MAX_BATCHES)?;
        if max_batches == 0 {
            return Err(FactsheetError::Configuration(format!(
                "{}: must be at least 1",
                MAX_BATCHES_VAR
            )));
        }
        let batch_ttl_secs = parse_var(&lookup, BATCH_TTL_SECS_VAR, DEFAULT_BATCH_TTL_SECS)?;

        Ok(Self {
            bind_addr,
            max_upload_bytes,
            default_profile,
            max_batches,
            batch_ttl_secs,
        })
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            default_profile: SchemaProfile::Standard,
            max_batches: DEFAULT_MAX_BATCHES,
            batch_ttl_secs: DEFAULT_BATCH_TTL_SECS,
        }
    }
}
