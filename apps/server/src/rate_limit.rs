use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Availability reads.
    Public,
    /// Booking creation.
    Booking,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Tier {
    pub fn default_config(self) -> RateLimitConfig {
        match self {
            Tier::Public => RateLimitConfig {
                max_requests: 120,
                window: Duration::from_secs(60),
            },
            Tier::Booking => RateLimitConfig {
                max_requests: 10,
                window: Duration::from_secs(300),
            },
        }
    }
}

struct TierState {
    config: RateLimitConfig,
    hits: DashMap<IpAddr, Vec<Instant>>,
}

/// Per-IP sliding window limiter. Tiers without a config are not limited.
#[derive(Clone, Default)]
pub struct RateLimiter {
    tiers: Arc<DashMap<Tier, TierState>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limiter with every tier at its default config.
    pub fn with_defaults() -> Self {
        let limiter = Self::new();
        for tier in [Tier::Public, Tier::Booking] {
            limiter.configure(tier, tier.default_config());
        }
        limiter
    }

    pub fn configure(&self, tier: Tier, config: RateLimitConfig) {
        self.tiers.insert(
            tier,
            TierState {
                config,
                hits: DashMap::new(),
            },
        );
    }

    /// `Err(retry_after_secs)` once `ip` has used up the tier's window.
    pub fn check(&self, tier: Tier, ip: IpAddr) -> Result<(), u64> {
        let Some(state) = self.tiers.get(&tier) else {
            return Ok(());
        };
        let window = state.config.window;
        let now = Instant::now();

        let mut hits = state.hits.entry(ip).or_default();
        hits.retain(|t| now.duration_since(*t) < window);

        if hits.len() >= state.config.max_requests as usize {
            // A zero-request tier has no oldest hit; wait out a full window
            let reopens = hits.first().map_or(now + window, |oldest| *oldest + window);
            let retry_after = reopens.saturating_duration_since(now).as_secs().max(1);
            return Err(retry_after);
        }

        hits.push(now);
        Ok(())
    }

    /// Drop IPs idle for more than twice their tier's window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        for state in self.tiers.iter() {
            let cutoff = state.config.window * 2;
            state.hits.retain(|_, hits| {
                hits.retain(|t| now.duration_since(*t) < cutoff);
                !hits.is_empty()
            });
        }
    }
}

/// First `X-Forwarded-For` hop, else the peer address.
pub fn client_ip(req: &Request) -> IpAddr {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn too_many_requests(retry_after: u64) -> Response {
    let body = ApiError::new(format!(
        "Too many requests. Try again in {retry_after} seconds"
    ));
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("Retry-After", retry_after.to_string())],
        Json(body),
    )
        .into_response()
}

async fn limit(limiter: &RateLimiter, tier: Tier, req: Request, next: Next) -> Response {
    let ip = client_ip(&req);
    match limiter.check(tier, ip) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::debug!(?tier, %ip, retry_after, "rate limited");
            too_many_requests(retry_after)
        }
    }
}

pub async fn rate_limit_public(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    limit(&limiter, Tier::Public, req, next).await
}

pub async fn rate_limit_booking(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    limit(&limiter, Tier::Booking, req, next).await
}
