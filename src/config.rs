use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base URL objects are publicly reachable under; presigned URLs are used when unset.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub s3: S3Config,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let require = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let store_backend = get("STORE_BACKEND")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(StoreBackend::Postgres);

        let database_url = get("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }

        let jwt = JwtConfig {
            secret: require("JWT_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "recipebook".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "recipebook-users".into()),
        };

        let s3 = S3Config {
            endpoint: require("S3_ENDPOINT")?,
            bucket: require("S3_BUCKET")?,
            access_key: require("S3_ACCESS_KEY")?,
            secret_key: require("S3_SECRET_KEY")?,
            region: get("S3_REGION").unwrap_or_else(|| "us-east-1".into()),
            public_url: get("S3_PUBLIC_URL").filter(|v| !v.trim().is_empty()),
        };

        Ok(Self {
            store_backend,
            database_url,
            database_max_connections: get("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            jwt,
            s3,
        })
    }
}
