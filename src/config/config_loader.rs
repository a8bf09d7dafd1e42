use anyhow::{Context, Result};
use std::str::FromStr;

use super::config_model::{Auth, BackendServer, Database, DotEnvyConfig};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

/// Builds the config from an arbitrary variable lookup.
pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let backend_server = BackendServer {
        port: parse_var(&lookup, "SERVER_PORT")?,
        body_limit: parse_var(&lookup, "SERVER_BODY_LIMIT")?,
        timeout: parse_var(&lookup, "SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required_var(&lookup, "DATABASE_URL")?,
    };

    let auth = Auth {
        jwt_secret: required_var(&lookup, "AUTH_JWT_SECRET")?,
        jwt_audience: lookup("AUTH_JWT_AUDIENCE").filter(|v| !v.trim().is_empty()),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        auth,
    })
}

fn required_var<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{key} is missing"))
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required_var(lookup, key)?
        .trim()
        .parse()
        .with_context(|| format!("{key} is invalid"))
}
