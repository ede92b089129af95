// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH0_DOMAIN` | Issuer domain; issuer becomes `https://{domain}/` | Required |
//! | `AUTH0_AUDIENCE` | Expected JWT audience claim | Required |
//! | `AUTH0_ISSUER` | Expected JWT issuer claim, used verbatim | Derived from domain |
//! | `JWKS_URL` | JWKS endpoint for JWT verification | `{issuer}.well-known/jwks.json` |
//! | `PROFILE_DB_PATH` | Profile database file | `./data/profiles.redb` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWKS_CACHE_TTL_SECS` | Max age of cached signing keys | `600` |
//! | `JWKS_MIN_REFRESH_SECS` | Min spacing of refreshes on unknown `kid` | `10` |
//! | `AUTH_LEEWAY_SECS` | Clock skew tolerance for `exp`/`nbf` | `0` |
//! | `UPSTREAM_TIMEOUT_SECS` | Bound on JWKS fetch and storage calls | `5` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use url::Url;

pub const AUTH0_DOMAIN_ENV: &str = "AUTH0_DOMAIN";
pub const AUTH0_AUDIENCE_ENV: &str = "AUTH0_AUDIENCE";
pub const AUTH0_ISSUER_ENV: &str = "AUTH0_ISSUER";
pub const JWKS_URL_ENV: &str = "JWKS_URL";
pub const PROFILE_DB_PATH_ENV: &str = "PROFILE_DB_PATH";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const JWKS_MIN_REFRESH_ENV: &str = "JWKS_MIN_REFRESH_SECS";
pub const AUTH_LEEWAY_ENV: &str = "AUTH_LEEWAY_SECS";
pub const UPSTREAM_TIMEOUT_ENV: &str = "UPSTREAM_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_PROFILE_DB_PATH: &str = "./data/profiles.redb";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Well-known JWKS path, relative to the issuer.
const JWKS_PATH: &str = ".well-known/jwks.json";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::Invalid {
                var: LOG_FORMAT_ENV,
                reason: format!("expected `json` or `pretty`, got `{other}`"),
            }),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub issuer: String,
    pub audience: String,
    pub jwks_url: String,
    pub profile_db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub jwks_cache_ttl: Duration,
    pub jwks_min_refresh: Duration,
    pub leeway_secs: u64,
    pub upstream_timeout: Duration,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| non_empty(lookup(var));

        let audience = get(AUTH0_AUDIENCE_ENV).ok_or(ConfigError::Missing(AUTH0_AUDIENCE_ENV))?;
        let issuer = match get(AUTH0_ISSUER_ENV) {
            Some(issuer) => issuer,
            None => {
                let domain =
                    get(AUTH0_DOMAIN_ENV).ok_or(ConfigError::Missing(AUTH0_DOMAIN_ENV))?;
                issuer_from_domain(&domain)
            }
        };
        let jwks_url = match get(JWKS_URL_ENV) {
            Some(url) => {
                Url::parse(&url).map_err(|e| ConfigError::Invalid {
                    var: JWKS_URL_ENV,
                    reason: e.to_string(),
                })?;
                url
            }
            None => jwks_url_for_issuer(&issuer)?,
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    var: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            issuer,
            audience,
            jwks_url,
            profile_db_path: get(PROFILE_DB_PATH_ENV)
                .unwrap_or_else(|| DEFAULT_PROFILE_DB_PATH.to_string())
                .into(),
            bind_addr,
            jwks_cache_ttl: Duration::from_secs(parse_or(
                get(JWKS_CACHE_TTL_ENV),
                JWKS_CACHE_TTL_ENV,
                600,
            )?),
            jwks_min_refresh: Duration::from_secs(parse_or(
                get(JWKS_MIN_REFRESH_ENV),
                JWKS_MIN_REFRESH_ENV,
                10,
            )?),
            leeway_secs: parse_or(get(AUTH_LEEWAY_ENV), AUTH_LEEWAY_ENV, 0)?,
            upstream_timeout: Duration::from_secs(parse_or(
                get(UPSTREAM_TIMEOUT_ENV),
                UPSTREAM_TIMEOUT_ENV,
                5,
            )?),
            log_format,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// `tenant.auth0.com` (or `https://tenant.auth0.com/`) → `https://tenant.auth0.com/`
fn issuer_from_domain(domain: &str) -> String {
    let host = domain
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("https://{host}/")
}

fn jwks_url_for_issuer(issuer: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: AUTH0_ISSUER_ENV,
        reason,
    };
    let mut base = Url::parse(issuer).map_err(|e| invalid(e.to_string()))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(JWKS_PATH)
        .map(String::from)
        .map_err(|e| invalid(e.to_string()))
}
