//! Environment configuration for the HTTP binary.

use std::net::SocketAddr;

use anyhow::Context;
use chrono::Duration;

use tenantgate_infra::WorkflowConfig;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `TENANTGATE_BIND`
    pub bind: SocketAddr,
    /// `JWT_SECRET`
    pub jwt_secret: String,
    /// `TENANTGATE_PUBLIC_URL`, prefix of redemption links.
    pub public_url: String,
    /// `TENANTGATE_INVITE_TTL_HOURS`
    pub invitation_ttl: Duration,
}

impl ApiConfig {
    /// Defaults with the given signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            public_url: "http://localhost:8080".to_string(),
            invitation_ttl: Duration::hours(168),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Malformed values are errors; missing ones fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });
        let mut config = Self::new(jwt_secret);

        if let Some(bind) = lookup("TENANTGATE_BIND") {
            config.bind = bind
                .parse()
                .with_context(|| format!("TENANTGATE_BIND is not a socket address: {bind}"))?;
        }
        if let Some(url) = lookup("TENANTGATE_PUBLIC_URL") {
            let url = url.trim().trim_end_matches('/').to_string();
            anyhow::ensure!(!url.is_empty(), "TENANTGATE_PUBLIC_URL is empty");
            config.public_url = url;
        }
        if let Some(hours) = lookup("TENANTGATE_INVITE_TTL_HOURS") {
            let hours: i64 = hours
                .trim()
                .parse()
                .with_context(|| format!("TENANTGATE_INVITE_TTL_HOURS is not a number: {hours}"))?;
            anyhow::ensure!(hours > 0, "TENANTGATE_INVITE_TTL_HOURS must be positive");
            config.invitation_ttl = Duration::hours(hours);
        }

        Ok(config)
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig::new(self.public_url.clone()).with_invitation_ttl(self.invitation_ttl)
    }
}
