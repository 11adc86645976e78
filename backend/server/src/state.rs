use std::{sync::Arc, time::Duration};

use anyhow::Result;
use forms::{Clock, Cooldown, FormPipeline, Gateway, IpRateLimiter, MemoryGateway, SystemClock};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    config::{Config, StoreKind},
    database::RedisGateway,
};

pub struct AppState {
    pub config: Config,
    pub pipeline: FormPipeline,
    pub ip_limiter: Arc<IpRateLimiter>,
    /// Tighter window for admin password guesses.
    pub login_limiter: Arc<IpRateLimiter>,
    /// Value of the admin session cookie for this process.
    pub admin_token: String,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let gateway: Arc<dyn Gateway> = match config.store {
            StoreKind::Memory => {
                warn!("Using in-memory store, submissions are lost on restart");
                Arc::new(MemoryGateway::new())
            }
            StoreKind::Redis => {
                info!("Connecting to Redis...");
                Arc::new(RedisGateway::connect(&config.redis_url).await?)
            }
        };

        Ok(Self::with_gateway(config, gateway, Arc::new(SystemClock)))
    }

    pub fn with_gateway(
        config: Config,
        gateway: Arc<dyn Gateway>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let cooldown = Cooldown::new(chrono::Duration::seconds(config.cooldown_secs));
        let window = Duration::from_secs(config.ip_window_secs);
        let ip_limiter = Arc::new(IpRateLimiter::new(window, config.ip_max_requests));
        let login_limiter = Arc::new(IpRateLimiter::new(window, config.login_max_attempts));

        if config.admin_password.is_none() {
            warn!("ADMIN_PASSWORD not set, admin area disabled");
        }

        Arc::new(Self {
            pipeline: FormPipeline::new(gateway, clock, cooldown),
            ip_limiter,
            login_limiter,
            admin_token: Uuid::new_v4().to_string(),
            config,
        })
    }
}
