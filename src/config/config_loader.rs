use std::str::FromStr;

use anyhow::{Context, Result, bail};

use super::config_model::{Database, DotEnvyConfig, Server};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT: u64 = 5;

/// Reads the process environment; `main` loads `.env` into it beforehand.
pub fn load() -> Result<DotEnvyConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Builds the config from any key lookup, so tests don't have to mutate the
/// process environment.
pub fn from_lookup<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let require = |key: &str| lookup(key).with_context(|| format!("{key} is invalid"));

    let server = Server {
        port: require("SERVER_PORT")?
            .parse()
            .context("SERVER_PORT is invalid")?,
        body_limit: require("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: require("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: require("DATABASE_URL")?,
        max_connections: parse_or(
            lookup("DATABASE_MAX_CONNECTIONS"),
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_MAX_CONNECTIONS,
        )?,
        connect_timeout: parse_or(
            lookup("DATABASE_CONNECT_TIMEOUT"),
            "DATABASE_CONNECT_TIMEOUT",
            DEFAULT_CONNECT_TIMEOUT,
        )?,
    };

    // r2d2 panics on an empty pool.
    if database.max_connections == 0 {
        bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
    }

    Ok(DotEnvyConfig { server, database })
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw.parse().with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}
