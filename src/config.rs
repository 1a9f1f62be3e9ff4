// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup into an
//! [`AppConfig`] and handed to the components that need it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the redb database file | `./data` |
//! | `JWT_SECRET` | HS256 signing secret for session tokens (>= 32 bytes) | Required |
//! | `JWT_EXPIRES_IN_HOURS` | Session token lifetime | `24` |
//! | `CORS_ORIGINS` | Comma-separated allowed origins | permissive |
//! | `BLOCKCHAIN_RPC_URL` | EVM JSON-RPC endpoint | Optional |
//! | `CONTRACT_ADDRESS` | Credential registry contract | Optional |
//! | `PRIVATE_KEY` | Hex signing key for contract writes | Optional |
//! | `PINATA_API_KEY` | Pinning service API key | Optional |
//! | `PINATA_SECRET_API_KEY` | Pinning service API secret | Optional |
//! | `PINATA_API_URL` | Pinning service base URL | `https://api.pinata.cloud` |
//! | `IPFS_GATEWAYS` | Comma-separated public gateway bases | see [`DEFAULT_IPFS_GATEWAYS`] |
//! | `INSTITUTION_NAME` | Issuer name embedded in credentials | `MarkChain University` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! The blockchain gateway is enabled only when all three of its variables are
//! set; the pinning client only when both credentials are set. Setting some
//! but not all variables of a group is a configuration error.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the database directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRES_IN_HOURS_ENV: &str = "JWT_EXPIRES_IN_HOURS";
pub const CORS_ORIGINS_ENV: &str = "CORS_ORIGINS";

pub const RPC_URL_ENV: &str = "BLOCKCHAIN_RPC_URL";
pub const CONTRACT_ADDRESS_ENV: &str = "CONTRACT_ADDRESS";
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

pub const PINATA_API_KEY_ENV: &str = "PINATA_API_KEY";
pub const PINATA_SECRET_ENV: &str = "PINATA_SECRET_API_KEY";
pub const PINATA_API_URL_ENV: &str = "PINATA_API_URL";
pub const IPFS_GATEWAYS_ENV: &str = "IPFS_GATEWAYS";

pub const INSTITUTION_NAME_ENV: &str = "INSTITUTION_NAME";

/// Environment variable selecting `json` or `pretty` log output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_INSTITUTION_NAME: &str = "MarkChain University";
pub const DEFAULT_JWT_EXPIRES_IN_HOURS: i64 = 24;

/// Public gateways tried in order when reading pinned content.
pub const DEFAULT_IPFS_GATEWAYS: &[&str] = &[
    "https://gateway.pinata.cloud/ipfs",
    "https://ipfs.io/ipfs",
    "https://cloudflare-ipfs.com/ipfs",
    "https://dweb.link/ipfs",
];

/// HS256 secrets shorter than this are rejected at startup.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Upper bound for `JWT_EXPIRES_IN_HOURS` (one year).
pub const MAX_JWT_EXPIRES_IN_HOURS: i64 = 8760;

/// Name of the database file inside `DATA_DIR`.
const DATABASE_FILE: &str = "markchain.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("incomplete {group} configuration: {missing} is not set")]
    Incomplete {
        group: &'static str,
        missing: &'static str,
    },
}

/// Blockchain gateway settings.
#[derive(Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub contract_address: String,
    /// Hex-encoded signing key (with or without `0x`). Never logged.
    pub private_key: String,
}

impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("private_key", &REDACTED)
            .finish()
    }
}

/// Pinning service settings.
#[derive(Clone)]
pub struct PinataConfig {
    pub api_url: String,
    pub api_key: String,
    pub secret_api_key: String,
}

impl fmt::Debug for PinataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinataConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &REDACTED)
            .field("secret_api_key", &REDACTED)
            .finish()
    }
}

const REDACTED: &str = "[redacted]";

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_expires_in_hours: i64,
    /// Empty means any origin is allowed.
    pub cors_origins: Vec<String>,
    pub institution_name: String,
    pub chain: Option<ChainConfig>,
    pub pinata: Option<PinataConfig>,
    /// Gateway list used for reads, available even without pinning credentials.
    pub ipfs_gateways: Vec<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("jwt_secret", &REDACTED)
            .field("jwt_expires_in_hours", &self.jwt_expires_in_hours)
            .field("cors_origins", &self.cors_origins)
            .field("institution_name", &self.institution_name)
            .field("chain", &self.chain)
            .field("pinata", &self.pinata)
            .field("ipfs_gateways", &self.ipfs_gateways)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: format!("{e}"),
            })?,
            None => 8080,
        };

        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: JWT_SECRET_ENV,
                reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            });
        }

        let jwt_expires_in_hours = match get(JWT_EXPIRES_IN_HOURS_ENV) {
            Some(raw) => {
                let hours: i64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    name: JWT_EXPIRES_IN_HOURS_ENV,
                    reason: format!("{e}"),
                })?;
                if !(1..=MAX_JWT_EXPIRES_IN_HOURS).contains(&hours) {
                    return Err(ConfigError::Invalid {
                        name: JWT_EXPIRES_IN_HOURS_ENV,
                        reason: format!("must be between 1 and {MAX_JWT_EXPIRES_IN_HOURS}"),
                    });
                }
                hours
            }
            None => DEFAULT_JWT_EXPIRES_IN_HOURS,
        };

        let ipfs_gateways = get(IPFS_GATEWAYS_ENV)
            .map(|raw| split_list(&raw))
            .unwrap_or_else(|| DEFAULT_IPFS_GATEWAYS.iter().map(|s| s.to_string()).collect());

        let chain = load_group(
            "blockchain",
            [RPC_URL_ENV, CONTRACT_ADDRESS_ENV, PRIVATE_KEY_ENV],
            &get,
        )?
        .map(|[rpc_url, contract_address, private_key]| ChainConfig {
            rpc_url,
            contract_address,
            private_key,
        });

        let pinata = load_group("pinata", [PINATA_API_KEY_ENV, PINATA_SECRET_ENV], &get)?.map(
            |[api_key, secret_api_key]| PinataConfig {
                api_url: get(PINATA_API_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_PINATA_API_URL.to_string()),
                api_key,
                secret_api_key,
            },
        );

        Ok(Self {
            host,
            port,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.into())),
            jwt_secret,
            jwt_expires_in_hours,
            cors_origins: get(CORS_ORIGINS_ENV)
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            institution_name: get(INSTITUTION_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_INSTITUTION_NAME.to_string()),
            chain,
            pinata,
            ipfs_gateways,
        })
    }

    /// Parse the bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: HOST_ENV,
                reason: format!("{e}"),
            })
    }

    /// Full path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

/// Read an all-or-nothing group of variables.
fn load_group<const N: usize, F>(
    group: &'static str,
    names: [&'static str; N],
    get: &F,
) -> Result<Option<[String; N]>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let values = names.map(|name| get(name));
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    if let Some(idx) = values.iter().position(Option::is_none) {
        return Err(ConfigError::Incomplete {
            group,
            missing: names[idx],
        });
    }
    Ok(Some(values.map(|v| v.unwrap_or_default())))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
