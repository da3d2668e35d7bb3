//! Configuration: `~/.chronos/config.toml` plus two environment overrides
//! (`GENAI_API_KEY` for the model credential, `CHRONOS_CURRENT_DATE` for the
//! process-wide reference-date override). Both are resolved at load time; the
//! loaded `Config` is passed into the router at construction and nothing
//! reads ambient state after startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_chronos_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerSection,
    pub llm: LlmSection,
    pub calendar: CalendarSection,
    pub planner: PlannerSection,
    pub audit: AuditSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    pub model: String,
    pub base_url: String,
    /// Low temperature for deterministic packing.
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSection {
    pub calendar_id: String,
    /// Timezone label attached to created events and used to interpret naive
    /// model timestamps.
    pub timezone: String,
    /// OAuth client config (client_id/client_secret) used by the consent
    /// flow. Relative paths resolve under ~/.chronos.
    pub oauth_client_file: String,
    /// Token cache written by the OAuth flow.
    pub token_cache_file: String,
    /// Fixed local port for the consent redirect listener.
    pub oauth_redirect_port: u16,
    /// Busy-interval fetch range: start of today to +lookahead_days.
    pub lookahead_days: i64,
    /// Known limitation: the provider query is capped at this many events;
    /// busy calendars past the cap can produce missed conflicts.
    pub max_busy_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerSection {
    /// Default free window when an optimize request supplies none.
    pub day_start_hour: u32,
    pub day_end_hour: u32,
    /// Optional fixed reference date (ISO date), normally unset; the
    /// CHRONOS_CURRENT_DATE env var takes precedence when present.
    pub current_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSection {
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSection {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            llm: LlmSection {
                model: "gemini-2.5-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                temperature: 0.2,
            },
            calendar: CalendarSection {
                calendar_id: "primary".to_string(),
                timezone: "America/New_York".to_string(),
                oauth_client_file: "google_oauth.json".to_string(),
                token_cache_file: "google_token_cache.json".to_string(),
                oauth_redirect_port: 9090,
                lookahead_days: 7,
                max_busy_results: 10,
            },
            planner: PlannerSection {
                day_start_hour: 9,
                day_end_hour: 18,
                current_date: None,
            },
            audit: AuditSection {
                log_file: "audit.jsonl".to_string(),
            },
        }
    }
}

impl Config {
    /// Fold environment overrides into the config once. Called at load time;
    /// request handlers only ever see the resulting fields.
    pub fn apply_env_overrides(&mut self) {
        if let Some(date) = std::env::var("CHRONOS_CURRENT_DATE")
            .ok()
            .filter(|s| !s.is_empty())
        {
            self.planner.current_date = Some(date);
        }
    }

    /// Reference date for a request that carries none. The
    /// `CHRONOS_CURRENT_DATE` override is already resolved into this field
    /// by `load_config`; flipping the env var later has no effect.
    pub fn current_date_override(&self) -> Option<String> {
        self.planner.current_date.clone()
    }

    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.calendar
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timezone: {}", self.calendar.timezone))
    }

    /// Resolve a possibly-relative state file path under ~/.chronos.
    pub fn state_path(&self, file: &str) -> Result<PathBuf> {
        let p = PathBuf::from(file);
        if p.is_absolute() {
            return Ok(p);
        }
        Ok(ensure_chronos_home()?.join(p))
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_chronos_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    let mut cfg: Config = if p.exists() {
        let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
        toml::from_str(&s).context("parse config.toml")?
    } else {
        Config::default()
    };
    cfg.apply_env_overrides();
    Ok(cfg)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let cfg = Config::default();
    save_config(&cfg)?;
    println!("Wrote {}", p.display());
    Ok(())
}

/// Model API key. Required for serving; read from the environment only so it
/// never lands in the config file.
pub fn genai_api_key() -> Result<String> {
    std::env::var("GENAI_API_KEY")
        .ok()
        .filter(|s| !s.is_empty())
        .context("GENAI_API_KEY is not set")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_toml() {
        let cfg = Config::default();
        let s = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.llm.model, "gemini-2.5-flash");
        assert_eq!(back.calendar.max_busy_results, 10);
        assert_eq!(back.planner.day_start_hour, 9);
    }

    #[test]
    fn test_env_override_is_resolved_once_not_per_read() {
        let mut cfg = Config::default();
        unsafe { std::env::set_var("CHRONOS_CURRENT_DATE", "2024-06-07") };
        cfg.apply_env_overrides();
        // flipping the var after resolution must not move the date
        unsafe { std::env::set_var("CHRONOS_CURRENT_DATE", "2024-12-31") };
        assert_eq!(cfg.current_date_override().as_deref(), Some("2024-06-07"));
        unsafe { std::env::remove_var("CHRONOS_CURRENT_DATE") };
        assert_eq!(cfg.current_date_override().as_deref(), Some("2024-06-07"));
    }

    #[test]
    fn test_timezone_parses() {
        let cfg = Config::default();
        assert!(cfg.timezone().is_ok());
    }
}
