use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use crate::executor::{DEFAULT_REMNANT_THRESHOLD_MM, PlanExecutor};
use crate::solver::{DEFAULT_GRID_MM, DEFAULT_MAX_SEARCH_CELLS, Planner};
use crate::store::Storage;
use crate::types::{Constraints, DEFAULT_KERF_MM, DEFAULT_TRIM_MARGIN_MM};
use crate::workshop::Workshop;

/// Runtime settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub kerf_mm: f64,
    pub trim_margin_mm: f64,
    pub remnant_threshold_mm: f64,
    pub grid_mm: f64,
    pub max_search_cells: usize,
    pub port: u16,
    pub rust_log: String,
    pub sentry_dsn: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            kerf_mm: DEFAULT_KERF_MM,
            trim_margin_mm: DEFAULT_TRIM_MARGIN_MM,
            remnant_threshold_mm: DEFAULT_REMNANT_THRESHOLD_MM,
            grid_mm: DEFAULT_GRID_MM,
            max_search_cells: DEFAULT_MAX_SEARCH_CELLS,
            port: 3001,
            rust_log: "info".to_string(),
            sentry_dsn: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let config = Config {
            data_dir: lookup("SLIT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            kerf_mm: parse_or(&lookup, "SLIT_KERF_MM", defaults.kerf_mm)?,
            trim_margin_mm: parse_or(&lookup, "SLIT_TRIM_MARGIN_MM", defaults.trim_margin_mm)?,
            remnant_threshold_mm: parse_or(
                &lookup,
                "SLIT_REMNANT_THRESHOLD_MM",
                defaults.remnant_threshold_mm,
            )?,
            grid_mm: parse_or(&lookup, "SLIT_GRID_MM", defaults.grid_mm)?,
            max_search_cells: parse_or(&lookup, "SLIT_MAX_SEARCH_CELLS", defaults.max_search_cells)?,
            port: parse_or(&lookup, "PORT", defaults.port)?,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Catches values that would otherwise trip the constraint asserts.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("SLIT_KERF_MM", self.kerf_mm),
            ("SLIT_TRIM_MARGIN_MM", self.trim_margin_mm),
            ("SLIT_REMNANT_THRESHOLD_MM", self.remnant_threshold_mm),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be a non-negative number, got {value}");
            }
        }
        if !self.grid_mm.is_finite() || self.grid_mm <= 0.0 {
            bail!("SLIT_GRID_MM must be greater than zero, got {}", self.grid_mm);
        }
        Ok(())
    }

    pub fn constraints(&self) -> Constraints {
        Constraints::new(self.kerf_mm, self.trim_margin_mm)
    }

    pub fn planner(&self) -> Planner {
        Planner::new(self.constraints())
            .with_grid(self.grid_mm)
            .with_search_budget(self.max_search_cells)
    }

    pub fn executor(&self) -> PlanExecutor {
        PlanExecutor::new(self.remnant_threshold_mm).with_constraints(self.constraints())
    }

    pub fn storage(&self) -> Storage {
        Storage::json_dir(&self.data_dir)
    }

    pub fn open_workshop(&self) -> Workshop {
        Workshop::open(self.storage(), self.planner(), self.executor())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
