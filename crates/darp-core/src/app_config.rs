use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    // Filter rules applied by the prescore stage.
    pub allowed_tlds: Vec<String>,
    pub min_name_length: usize,
    pub max_name_length: usize,
    pub allow_hyphens: bool,
    pub allow_digits: bool,

    // Age-score curve shape: days of listing age at which the score
    // reaches half of its ceiling.
    pub age_halflife_days: f64,

    // Default batch size for the scoring stage when the caller omits one.
    pub scoring_batch_size: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("allowed_tlds", &self.allowed_tlds)
            .field("min_name_length", &self.min_name_length)
            .field("max_name_length", &self.max_name_length)
            .field("allow_hyphens", &self.allow_hyphens)
            .field("allow_digits", &self.allow_digits)
            .field("age_halflife_days", &self.age_halflife_days)
            .field("scoring_batch_size", &self.scoring_batch_size)
            .finish()
    }
}
