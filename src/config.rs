use crate::error::{AppError, Result};

pub const URA_BASE_URL: &str = "https://www.ura.gov.sg/uraDataService/";

/// Token endpoint, relative to the base URL.
pub const TOKEN_PATH: &str = "insertNewToken.action";

/// Private residential transaction service; the batch number is appended.
pub const TRANSACTION_PATH: &str = "invokeUraDS?service=PMI_Resi_Transaction&batch=";

/// The URA gateway rejects requests without a curl-like user agent.
pub const USER_AGENT: &str = "curl/7.68.0";

/// Square metres → square feet.
pub const SQFT_PER_SQM: f64 = 10.76391042;

/// Lease-left assigned to rows whose tenure is unknown and carries no lease numbers.
pub const DEFAULT_LEASE_LEFT: i64 = 99;

/// Sentinel accepted by categorical criteria meaning "unconstrained".
pub const ALL: &str = "All";

/// Largest `noOfUnits` accepted for a single reported sale.
pub const MAX_UNITS_PER_SALE: u32 = 10_000;

/// Upper bound on concurrent partition fetches regardless of partition count.
pub const MAX_FETCH_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct Config {
    pub access_key: String,
    pub base_url: String,
    pub log_level: String,
    pub api_port: u16,
    /// Batch numbers to request (URA_PARTITIONS, comma-separated)
    pub partitions: Vec<String>,
    /// Concurrent partition fetches (FETCH_WORKERS), capped at MAX_FETCH_WORKERS
    pub fetch_workers: usize,
    /// Per-request timeout in seconds (FETCH_TIMEOUT_SECS)
    pub fetch_timeout_secs: u64,
    /// Number of calendar months kept in the dataset, current month included (WINDOW_MONTHS)
    pub window_months: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let access_key = std::env::var("URA_ACCESS_KEY")
            .map_err(|_| AppError::Config("URA_ACCESS_KEY must be set".to_string()))?;

        let window_months = std::env::var("WINDOW_MONTHS")
            .unwrap_or_else(|_| "6".to_string())
            .parse::<u32>()
            .map_err(|_| AppError::Config("WINDOW_MONTHS must be a positive integer".to_string()))?;
        if window_months == 0 {
            return Err(AppError::Config("WINDOW_MONTHS must be at least 1".to_string()));
        }

        let partitions: Vec<String> = std::env::var("URA_PARTITIONS")
            .unwrap_or_else(|_| "1,2,3,4".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if partitions.is_empty() {
            return Err(AppError::Config("URA_PARTITIONS must name at least one batch".to_string()));
        }

        Ok(Self {
            access_key,
            base_url: std::env::var("URA_BASE_URL").unwrap_or_else(|_| URA_BASE_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8050".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            partitions,
            fetch_workers: std::env::var("FETCH_WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse::<usize>()
                .unwrap_or(MAX_FETCH_WORKERS)
                .clamp(1, MAX_FETCH_WORKERS),
            fetch_timeout_secs: std::env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .unwrap_or(30),
            window_months,
        })
    }
}
