use clap::Parser;

/// Medication tracker CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "medtracker",
    version,
    about = "CRUD backend for medication schedules, dose logs, and clinical notes"
)]
pub struct Cli {
    /// SQLite database URL (e.g. sqlite://medtracker.db)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long)]
    pub bind_addr: Option<String>,

    /// OpenFDA API base URL
    #[arg(long)]
    pub openfda_url: Option<String>,

    /// Drug-info cache TTL in seconds
    #[arg(long)]
    pub drug_info_cache_ttl: Option<u64>,
}
