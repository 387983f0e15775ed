use std::env;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub receipt_parser: Option<ParserCommand>,
    /// Demo mode: echo reset passwords in the API response.
    pub expose_generated_passwords: bool,
    pub cors_origins: Vec<String>,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let port = match env::var("PORT") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            Err(_) => 3000,
        };

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()).into();

        let receipt_parser = env::var("RECEIPT_PARSER_CMD")
            .ok()
            .filter(|program| !program.trim().is_empty())
            .map(|program| ParserCommand {
                program,
                args: env::var("RECEIPT_PARSER_ARGS")
                    .map(|args| args.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default(),
            });

        let expose_generated_passwords = match env::var("EXPOSE_GENERATED_PASSWORDS") {
            Ok(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: "EXPOSE_GENERATED_PASSWORDS",
                value,
            })?,
            Err(_) => false,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid { name: "BCRYPT_COST", value })?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            database_url,
            port,
            jwt_secret,
            upload_dir,
            receipt_parser,
            expose_generated_passwords,
            cors_origins,
            bcrypt_cost,
        })
    }

    /// Configuration for tests and local experiments: in-memory store, no parser.
    pub fn for_memory(jwt_secret: &str, upload_dir: PathBuf) -> Self {
        Self {
            database_url: "memory://".to_string(),
            port: 0,
            jwt_secret: jwt_secret.to_string(),
            upload_dir,
            receipt_parser: None,
            expose_generated_passwords: false,
            cors_origins: Vec::new(),
            // bcrypt's minimum; hashing at the default cost makes test suites crawl.
            bcrypt_cost: 4,
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory://")
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
