use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use crate::config::{AppConfig, JwtConfig, S3Config, StoreBackend};
use crate::storage::{Storage, StorageClient};
use crate::store::{memory::MemoryStore, postgres::PgDocumentStore, DocumentStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub storage: Arc<dyn StorageClient>,
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
                let pg = PgDocumentStore::connect(url, config.database_max_connections).await?;
                pg.migrate().await?;
                info!("document store: postgres");
                Arc::new(pg)
            }
            StoreBackend::Memory => {
                info!("document store: in-memory");
                Arc::new(MemoryStore::new())
            }
        };

        let storage = Arc::new(Storage::new(&config.s3).await?) as Arc<dyn StorageClient>;

        Ok(Self::from_parts(store, storage, config))
    }

    pub fn from_parts(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn StorageClient>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            storage,
            config,
            http: reqwest::Client::new(),
        }
    }

    /// In-memory store, no-op object storage and a fixed test JWT config.
    pub fn fake() -> Self {
        #[derive(Clone)]
        struct FakeStorage;

        #[async_trait]
        impl StorageClient for FakeStorage {
            async fn put_object(&self, _k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
                Ok(())
            }
            async fn download_url(&self, k: &str) -> anyhow::Result<String> {
                Ok(format!("https://fake.local/{}", k))
            }
        }

        let config = Arc::new(AppConfig {
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
            },
            s3: S3Config {
                endpoint: "fake".into(),
                bucket: "fake".into(),
                access_key: "fake".into(),
                secret_key: "fake".into(),
                region: "us-east-1".into(),
                public_url: None,
            },
        });

        Self::from_parts(
            Arc::new(MemoryStore::new()),
            Arc::new(FakeStorage),
            config,
        )
    }
}
