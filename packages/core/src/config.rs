use std::env;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub openfda_base_url: String,
    pub drug_info_cache_ttl_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL is required")?;

        let bind_addr =
            env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let openfda_base_url = env::var("OPENFDA_BASE_URL")
            .unwrap_or_else(|_| "https://api.fda.gov".to_string());

        let drug_info_cache_ttl_seconds = match env::var("DRUG_INFO_CACHE_TTL_SECONDS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| "DRUG_INFO_CACHE_TTL_SECONDS must be a valid number")?,
            Err(_) => 300,
        };

        Ok(Self {
            database_url,
            bind_addr,
            openfda_base_url,
            drug_info_cache_ttl_seconds,
        })
    }

    /// CLI flags take precedence over environment variables.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(database_url) = &cli.database_url {
            self.database_url = database_url.clone();
        }
        if let Some(bind_addr) = &cli.bind_addr {
            self.bind_addr = bind_addr.clone();
        }
        if let Some(openfda_url) = &cli.openfda_url {
            self.openfda_base_url = openfda_url.clone();
        }
        if let Some(ttl) = cli.drug_info_cache_ttl {
            self.drug_info_cache_ttl_seconds = ttl;
        }
        self
    }
}
