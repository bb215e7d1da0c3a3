use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::export::raster::DEFAULT_RASTERIZER_ARGS;
use crate::store::DEFAULT_STORAGE_KEY;

/// Where the saved document lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    File,
    Memory,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => bail!("STORE_BACKEND must be one of file, memory, redis (got '{other}')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable has a default except `REDIS_URL`, required for the redis backend.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub store_backend: StoreBackend,
    pub data_dir: PathBuf,
    pub redis_url: Option<String>,
    pub storage_key: String,
    /// `None` means unlimited (`STORE_QUOTA_BYTES=0`).
    pub store_quota_bytes: Option<usize>,
    pub autosave_debounce: Duration,
    pub periodic_save: Duration,
    pub export_settle: Duration,
    pub region_width_px: Option<u32>,
    /// Unset disables PDF export.
    pub rasterizer_cmd: Option<String>,
    pub rasterizer_args: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_backend: StoreBackend = parse_var(&var, "STORE_BACKEND", StoreBackend::File)?;
        let redis_url = var("REDIS_URL");
        if store_backend == StoreBackend::Redis && redis_url.is_none() {
            bail!("Required environment variable 'REDIS_URL' is not set (STORE_BACKEND=redis)");
        }

        let quota: usize = parse_var(&var, "STORE_QUOTA_BYTES", 5 * 1024 * 1024)?;
        let region_width: u32 = parse_var(&var, "REGION_WIDTH_PX", 794)?;
        let periodic_secs: u64 = parse_var(&var, "PERIODIC_SAVE_SECS", 30)?;
        if periodic_secs == 0 {
            bail!("Environment variable 'PERIODIC_SAVE_SECS' must be at least 1");
        }

        Ok(Config {
            port: parse_var(&var, "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            store_backend,
            data_dir: var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            redis_url,
            storage_key: var("STORAGE_KEY").unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            store_quota_bytes: (quota > 0).then_some(quota),
            autosave_debounce: Duration::from_millis(parse_var(&var, "AUTOSAVE_DEBOUNCE_MS", 1000)?),
            periodic_save: Duration::from_secs(periodic_secs),
            export_settle: Duration::from_millis(parse_var(&var, "EXPORT_SETTLE_MS", 500)?),
            region_width_px: (region_width > 0).then_some(region_width),
            rasterizer_cmd: var("RASTERIZER_CMD"),
            rasterizer_args: var("RASTERIZER_ARGS")
                .unwrap_or_else(|| DEFAULT_RASTERIZER_ARGS.to_string()),
        })
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Into<anyhow::Error>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(Into::<anyhow::Error>::into)
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.store_backend, StoreBackend::File);
        assert_eq!(c.storage_key, "edufolio_data");
        assert_eq!(c.store_quota_bytes, Some(5 * 1024 * 1024));
        assert_eq!(c.autosave_debounce, Duration::from_secs(1));
        assert_eq!(c.periodic_save, Duration::from_secs(30));
        assert_eq!(c.export_settle, Duration::from_millis(500));
        assert_eq!(c.region_width_px, Some(794));
        assert!(c.rasterizer_cmd.is_none());
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("PORT", "9000"),
            ("STORE_BACKEND", "Memory"),
            ("STORE_QUOTA_BYTES", "0"),
            ("RASTERIZER_CMD", "wkhtmltoimage"),
        ])
        .unwrap();
        assert_eq!(c.port, 9000);
        assert_eq!(c.store_backend, StoreBackend::Memory);
        assert_eq!(c.store_quota_bytes, None);
        assert_eq!(c.rasterizer_cmd.as_deref(), Some("wkhtmltoimage"));
    }

    #[test]
    fn test_redis_needs_url() {
        assert!(config(&[("STORE_BACKEND", "redis")]).is_err());
        let c = config(&[("STORE_BACKEND", "redis"), ("REDIS_URL", "redis://localhost")]).unwrap();
        assert_eq!(c.redis_url.as_deref(), Some("redis://localhost"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("STORE_BACKEND", "s3")]).is_err());
    }

    #[test]
    fn test_zero_periodic_save_rejected() {
        let err = config(&[("PERIODIC_SAVE_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("PERIODIC_SAVE_SECS"));
        let c = config(&[("PERIODIC_SAVE_SECS", "5")]).unwrap();
        assert_eq!(c.periodic_save, Duration::from_secs(5));
    }
}
