use crate::access_log::AccessLogger;
use crate::auth::{repo::CredentialStore, services::AuthService, token::TokenCodec};
use crate::config::{AppConfig, StoreBackend};
use crate::storage::{KvStore, MemoryKvStore, PgKvStore};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub logger: AccessLogger,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let (users, logs) = match config.store_backend {
            StoreBackend::Memory => {
                warn!("using in-memory store; users and logs are lost on restart");
                let users: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
                let logs: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
                (users, logs)
            }
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres backend")?;
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                let users: Arc<dyn KvStore> = Arc::new(PgKvStore::new(db.clone(), "users"));
                let logs: Arc<dyn KvStore> = Arc::new(PgKvStore::new(db, "logs"));
                (users, logs)
            }
        };

        let state = Self::from_parts(Arc::new(config), users, logs);
        if state.auth.tokens().is_signed() {
            info!("session tokens are HS256-signed");
        } else {
            warn!("session tokens are unsigned base64; any client can forge one");
        }
        info!(
            signup_mode = ?state.config.signup_mode,
            log_append_mode = ?state.config.log.append_mode,
            "write modes"
        );
        Ok(state)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn KvStore>,
        logs: Arc<dyn KvStore>,
    ) -> Self {
        let logger = AccessLogger::new(logs, config.log.clone());
        let auth = AuthService::new(
            CredentialStore::new(users),
            logger.clone(),
            TokenCodec::from_secret(config.token_secret.as_deref()),
            config.signup_mode,
        );
        Self {
            config,
            auth: Arc::new(auth),
            logger,
        }
    }

    /// In-memory state with default settings.
    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::default()),
            Arc::new(MemoryKvStore::new()),
            Arc::new(MemoryKvStore::new()),
        )
    }
}
