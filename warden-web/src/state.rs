//! Application state shared across all request handlers

use crate::business::{OrderStore, ProductStore};
use crate::{WebConfig, WebResult};
use sqlx::SqlitePool;
use tracing::info;
use warden_auth::{
    store, AccessConfig, AccessGate, AdminGate, RequestAuthenticator, RuleStore, SessionManager,
    UserStore,
};

/// All services a handler can reach, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub config: WebConfig,
    pub access: AccessConfig,
    pub pool: SqlitePool,
    pub users: UserStore,
    pub rules: RuleStore,
    pub sessions: SessionManager,
    pub gate: AccessGate,
    pub admin_gate: AdminGate,
    pub authenticator: RequestAuthenticator,
    pub products: ProductStore,
    pub orders: OrderStore,
}

impl AppState {
    /// Connect to the database, initialize schemas, and wire up services
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let access = AccessConfig::from_env();

        let pool = store::connect(&config.database_url).await?;
        crate::business::init_business_schema(&pool).await?;

        if config.seed_demo_data {
            warden_auth::seed::seed_demo_data(&pool).await?;
            crate::business::seed_business_data(&pool).await?;
            info!("Demo dataset seeded");
        }

        let sessions = SessionManager::new(pool.clone(), access.session_ttl_hours);
        let authenticator = RequestAuthenticator::new(access.clone(), sessions.clone());

        Ok(Self {
            users: UserStore::new(pool.clone()),
            rules: RuleStore::new(pool.clone()),
            gate: AccessGate::new(pool.clone()),
            admin_gate: AdminGate::new(access.admin_role.clone()),
            products: ProductStore::new(pool.clone()),
            orders: OrderStore::new(pool.clone()),
            sessions,
            authenticator,
            pool,
            access,
            config,
        })
    }
}
