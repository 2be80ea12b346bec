use std::env;
use thiserror::Error;

const DEFAULT_JWT_SECRET: &str = "default_jwt_secret_change_me";

/// Upper bound for TOKEN_TTL_DAYS
const MAX_TOKEN_TTL_DAYS: i64 = 36_500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got '{value}'")]
    NotANumber { name: &'static str, value: String },
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Runtime settings, read from the environment (and `.env` when present)
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub bcrypt_cost: u32,
    pub mail_webhook_url: Option<String>,
    pub mail_from: String,
    pub workers: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                log::warn!("JWT_SECRET not set, using default (not secure for production!)");
                DEFAULT_JWT_SECRET.to_string()
            });

        let token_ttl_days: i64 = parse_var(&lookup, "TOKEN_TTL_DAYS", 7)?;
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&token_ttl_days) {
            return Err(ConfigError::OutOfRange {
                name: "TOKEN_TTL_DAYS",
                value: token_ttl_days,
                min: 1,
                max: MAX_TOKEN_TTL_DAYS,
            });
        }

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", 8069)?,
            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "wishlist.db".to_string()),
            jwt_secret,
            token_ttl_days,
            bcrypt_cost: parse_var(&lookup, "BCRYPT_COST", 10)?,
            mail_webhook_url: lookup("MAIL_WEBHOOK_URL").filter(|s| !s.is_empty()),
            mail_from: lookup("MAIL_FROM").unwrap_or_else(|| "wishlistapp1@gmail.com".to_string()),
            workers: parse_var(&lookup, "WORKERS", 1)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::NotANumber { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 8069);
        assert_eq!(config.database_path, "wishlist.db");
        assert_eq!(config.jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(config.token_ttl_days, 7);
        assert!(config.mail_webhook_url.is_none());
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("JWT_SECRET", "s3cret"),
            ("MAIL_WEBHOOK_URL", "http://relay/mail"),
            ("BCRYPT_COST", "4"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.mail_webhook_url.as_deref(), Some("http://relay/mail"));
        assert_eq!(config.bcrypt_cost, 4);
    }

    #[test]
    fn test_token_ttl_out_of_range() {
        for value in ["0", "-1", "9223372036854775807"] {
            let err = Config::from_lookup(lookup_from(&[("TOKEN_TTL_DAYS", value)])).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::OutOfRange { name: "TOKEN_TTL_DAYS", .. }
            ));
        }

        let config = Config::from_lookup(lookup_from(&[("TOKEN_TTL_DAYS", "30")])).unwrap();
        assert_eq!(config.token_ttl_days, 30);
    }

    #[test]
    fn test_bad_number() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
