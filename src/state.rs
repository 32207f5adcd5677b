use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;

use crate::{
    auth::repo::{PgUserRepository, UserRepository},
    blogs::repo::{BlogRepository, PgBlogRepository},
    config::AppConfig,
    db,
    memory::MemoryStore,
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub blogs: Arc<dyn BlogRepository>,
    pub config: Arc<AppConfig>,
    db: Option<PgPool>,
}

impl AppState {
    /// Postgres when `DATABASE_URL` is set, otherwise the in-process store.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let Some(url) = config.database_url.clone() else {
            warn!("DATABASE_URL not set; data will not outlive the process");
            return Ok(Self::in_memory(config));
        };

        let pool = db::connect(&url, &config).await?;
        Ok(Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            blogs: Arc::new(PgBlogRepository::new(pool.clone())),
            config: Arc::new(config),
            db: Some(pool),
        })
    }

    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            users: store.clone(),
            blogs: store,
            config: Arc::new(config),
            db: None,
        }
    }

    /// Waits for pooled connections to close.
    pub async fn close(&self) {
        if let Some(db) = &self.db {
            db.close().await;
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, SeedConfig, DEFAULT_TOKEN_TTL_MINUTES};

        Self::in_memory(AppConfig {
            database_url: None,
            max_connections: 1,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            },
            seed: SeedConfig {
                enabled: false,
                email: "admin@example.com".into(),
                password: "admin123".into(),
                name: "admin".into(),
            },
        })
    }
}
