use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime in days. Default: 7.
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
}

fn default_token_ttl_days() -> i64 {
    7
}

/// Payout request limits, in INR.
#[derive(Debug, Deserialize, Clone)]
pub struct PayoutConfig {
    /// Smallest amount a developer may withdraw. Default: 500.
    #[serde(default = "default_payout_min")]
    pub min_amount: i64,
    /// Largest single withdrawal. Default: 100000.
    #[serde(default = "default_payout_max")]
    pub max_amount: i64,
}

fn default_payout_min() -> i64 {
    500
}
fn default_payout_max() -> i64 {
    100_000
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            min_amount: default_payout_min(),
            max_amount: default_payout_max(),
        }
    }
}

/// Payment gateway credentials.
#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    pub key_id: String,
    /// Shared secret used to verify payment signatures.
    pub key_secret: String,
    /// Currency code sent with orders. Default: "INR".
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "INR".into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
    #[serde(default)]
    pub payout: PayoutConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., MARKETPLACE__AUTH__JWT_SECRET)
            .add_source(
                Environment::with_prefix("MARKETPLACE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
