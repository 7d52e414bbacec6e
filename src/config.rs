use std::{env, str::FromStr};

use dotenvy::dotenv;
use rust_decimal::Decimal;

use crate::{constants::DEFAULT_SERVER_ADDR, error::CustomError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sql,
    Memory,
}

pub struct Config {
    pub database_url: Option<String>,
    pub server_addr: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub store: StoreKind,
    /// Opening balances for the in-memory store, `LEDGER_SEED=1=100.00,2=50`.
    pub seed: Vec<(i64, Decimal)>,
}

impl Config {
    pub fn from_env() -> Result<Self, CustomError> {
        dotenv().ok(); // Load environment variables

        let store = match env::var("LEDGER_STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            Ok("sql") | Err(_) => StoreKind::Sql,
            Ok(_) => return Err(CustomError::EnvParseError("LEDGER_STORE".to_string())),
        };
        let database_url = match store {
            StoreKind::Sql => Some(
                env::var("DATABASE_URL")
                    .map_err(|e| CustomError::EnvError("DATABASE_URL".to_string(), e))?,
            ),
            StoreKind::Memory => env::var("DATABASE_URL").ok(),
        };

        Ok(Config {
            database_url,
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string()),
            max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            min_connections: parse_or("DB_MIN_CONNECTIONS", 5)?,
            store,
            seed: match env::var("LEDGER_SEED") {
                Ok(raw) => parse_seed(&raw)?,
                Err(_) => Vec::new(),
            },
        })
    }
}

fn parse_or(key: &str, default: u32) -> Result<u32, CustomError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| CustomError::EnvParseError(key.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_seed(raw: &str) -> Result<Vec<(i64, Decimal)>, CustomError> {
    let invalid = || CustomError::EnvParseError("LEDGER_SEED".to_string());
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, balance) = entry.split_once('=').ok_or_else(invalid)?;
            let id = id.trim().parse().map_err(|_| invalid())?;
            let balance = Decimal::from_str(balance.trim()).map_err(|_| invalid())?;
            Ok((id, balance))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_seed_entries() {
        let seed = parse_seed("1=100.00, 2=50").unwrap();
        assert_eq!(seed, vec![(1, dec!(100.00)), (2, dec!(50))]);
        assert!(parse_seed("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_seed() {
        assert!(matches!(
            parse_seed("1:100"),
            Err(CustomError::EnvParseError(_))
        ));
        assert!(parse_seed("x=1").is_err());
    }
}
