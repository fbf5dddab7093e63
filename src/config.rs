use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub sweep_interval_secs: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Fruit pantry API with capacity-constrained buckets")]
pub struct Args {
    /// Host to bind to (overrides FRUIT_PANTRY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FRUIT_PANTRY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides FRUIT_PANTRY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Seconds between expiration sweeps (overrides FRUIT_PANTRY_SWEEP_INTERVAL_SECS)
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("FRUIT_PANTRY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("FRUIT_PANTRY_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FRUIT_PANTRY_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 8080,
            Err(err) => return Err(err).context("reading FRUIT_PANTRY_PORT"),
        };
        let env_db = env::var("FRUIT_PANTRY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/fruit_pantry.db".into());
        let env_sweep = match env::var("FRUIT_PANTRY_SWEEP_INTERVAL_SECS") {
            Ok(value) => value.parse::<u64>().with_context(|| {
                format!("parsing FRUIT_PANTRY_SWEEP_INTERVAL_SECS value `{}`", value)
            })?,
            Err(env::VarError::NotPresent) => 1,
            Err(err) => return Err(err).context("reading FRUIT_PANTRY_SWEEP_INTERVAL_SECS"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            sweep_interval_secs: args.sweep_interval_secs.unwrap_or(env_sweep),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
