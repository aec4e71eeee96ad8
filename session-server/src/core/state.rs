//! Server State
//!
//! Every service is built once at startup and injected here; handlers and
//! middleware reach them through `State<ServerState>`. Cloning is cheap.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use crate::audit::{AuditService, AuditSink, AuditWorker, MemoryAuditSink, PgAuditSink};
use crate::auth::password::hash_password;
use crate::auth::revocation::{
    MemoryRevocationStore, PgRevocationStore, RevocationStore, Revocations,
};
use crate::auth::{CredentialValidator, JwtService, RateLimiter, SessionCookies};
use crate::core::config::{Config, SeedUser};
use crate::core::error::{Result, ServerError};
use crate::db::{MemoryUserStore, PgUserStore, UserRecord, UserStore, UserStoreError};

/// Rate limiter entries are swept at this period
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub jwt_service: Arc<JwtService>,
    pub validator: CredentialValidator,
    pub users: Arc<dyn UserStore>,
    pub revocations: Revocations,
    pub cookies: SessionCookies,
    pub audit_service: Arc<AuditService>,
    pub rate_limiter: RateLimiter,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("environment", &self.config.environment)
            .field("identity_strategy", &self.config.identity_strategy)
            .field("revocation_store", &self.revocations.backend())
            .finish_non_exhaustive()
    }
}

impl ServerState {
    /// Wire services around already constructed stores
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        revocation_store: Arc<dyn RevocationStore>,
        audit_service: Arc<AuditService>,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
        let revocations = Revocations::new(
            revocation_store,
            jwt_service.clone(),
            Duration::from_millis(config.revocation_timeout_ms),
            Duration::from_millis(config.revocation_write_timeout_ms),
        );

        if revocations.backend() == "memory" && !config.is_development() {
            tracing::warn!(
                environment = %config.environment,
                "In-process revocation store selected; revocations are not shared between instances"
            );
        }

        Self {
            validator: CredentialValidator::new(users.clone()),
            cookies: SessionCookies::new(config.cookies.clone()),
            config: Arc::new(config),
            jwt_service,
            users,
            revocations,
            audit_service,
            rate_limiter: RateLimiter::new(),
        }
    }

    /// Build stores from configuration and start the audit worker
    ///
    /// With `DATABASE_URL` every store is PostgreSQL-backed and migrations
    /// run first. Without it (development only) in-memory stores are used.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let (audit_service, audit_rx) = AuditService::new(config.audit_buffer_size);

        let (users, revocation_store, audit_sink) = match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await?;
                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Database ready, migrations applied");

                let users = PgUserStore::new(pool.clone());
                for seed in &config.dev_seed_users {
                    match users.create(&seed_record(seed)?).await {
                        Ok(()) => tracing::info!(username = %seed.username, "Seeded user"),
                        Err(UserStoreError::Duplicate(_)) => {}
                        Err(e) => return Err(ServerError::seed(&seed.username, e)),
                    }
                }

                (
                    Arc::new(users) as Arc<dyn UserStore>,
                    Arc::new(PgRevocationStore::new(pool.clone())) as Arc<dyn RevocationStore>,
                    Arc::new(PgAuditSink::new(pool)) as Arc<dyn AuditSink>,
                )
            }
            None => {
                let users = MemoryUserStore::new();
                for seed in &config.dev_seed_users {
                    users
                        .insert(seed_record(seed)?)
                        .map_err(|e| ServerError::seed(&seed.username, e))?;
                    tracing::info!(username = %seed.username, "Seeded in-memory user");
                }
                tracing::warn!("DATABASE_URL not set, using in-memory stores");

                (
                    Arc::new(users) as Arc<dyn UserStore>,
                    Arc::new(MemoryRevocationStore::new()) as Arc<dyn RevocationStore>,
                    Arc::new(MemoryAuditSink::new()) as Arc<dyn AuditSink>,
                )
            }
        };

        tokio::spawn(AuditWorker::new(audit_sink).run(audit_rx));

        Ok(Self::new(
            config.clone(),
            users,
            revocation_store,
            audit_service,
        ))
    }

    /// Start revocation purge and rate limiter cleanup loops
    pub fn start_background_tasks(&self) {
        self.revocations.spawn_purge_task(Duration::from_secs(
            self.config.revocation_purge_interval_secs,
        ));

        let rate_limiter = self.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                rate_limiter.cleanup().await;
            }
        });
    }
}

fn seed_record(seed: &SeedUser) -> Result<UserRecord> {
    let password_hash =
        hash_password(&seed.password).map_err(|e| ServerError::seed(&seed.username, e))?;

    Ok(UserRecord {
        id: uuid::Uuid::new_v4().to_string(),
        username: seed.username.clone(),
        password_hash,
        roles: seed.roles.clone(),
        permissions: seed.permissions.clone(),
        department_id: None,
        level: None,
        display_name: None,
        email: None,
        is_active: true,
        created_at: shared::util::now_millis(),
    })
}
